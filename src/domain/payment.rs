//! Settlement artifact written once per completed proposal.

use crate::domain::{Decimal, PaymentId, ProfessionalId, ProposalId, ProposalKind, TimeMs};
use serde::{Deserialize, Serialize};

/// Durable record of a settled proposal or quote. Insert-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub proposal_id: ProposalId,
    pub kind: ProposalKind,
    pub professional_id: ProfessionalId,
    pub final_amount: Decimal,
    pub payment_method: String,
    /// Referrer share actually applied (0 for quotes).
    pub referrer_share_pct: Decimal,
    pub platform_commission: Decimal,
    pub referrer_commission: Decimal,
    pub professional_net: Decimal,
    pub notes: Option<String>,
    pub created_at: TimeMs,
}
