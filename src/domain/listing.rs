//! Leads and requests: the listings professionals bid on.

use crate::domain::{Decimal, LeadId, ProfessionalId, ProposalKind, RequestId, TimeMs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a listing.
///
/// `active → approved → completed`, or `active → cancelled`. Once a bid is
/// awarded the listing can only run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Active,
    Approved,
    Completed,
    Cancelled,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::Active,
        LeadStatus::Approved,
        LeadStatus::Completed,
        LeadStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Active => "active",
            LeadStatus::Approved => "approved",
            LeadStatus::Completed => "completed",
            LeadStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStatus::Completed | LeadStatus::Cancelled)
    }

    /// Whether `self → to` is a defined transition. Same-status writes are
    /// not transitions; callers treat them as no-ops.
    pub fn can_transition_to(&self, to: LeadStatus) -> bool {
        matches!(
            (self, to),
            (LeadStatus::Active, LeadStatus::Approved)
                | (LeadStatus::Approved, LeadStatus::Completed)
                | (LeadStatus::Active, LeadStatus::Cancelled)
        )
    }

    /// Every status with a defined transition into `to`. Conditional listing
    /// writes use this as their guard.
    pub fn sources_of(to: LeadStatus) -> Vec<LeadStatus> {
        Self::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(to))
            .collect()
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LeadStatus::Active),
            "approved" => Ok(LeadStatus::Approved),
            "completed" => Ok(LeadStatus::Completed),
            "cancelled" => Ok(LeadStatus::Cancelled),
            other => Err(format!("unknown lead status: {}", other)),
        }
    }
}

/// A referred job opportunity posted by a professional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    /// The referrer: the professional who posted the lead.
    pub owner_id: ProfessionalId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub budget: Option<Decimal>,
    /// Share of the final amount paid to the owner. `None` on legacy rows.
    pub referrer_share_pct: Option<u8>,
    pub status: LeadStatus,
    pub assigned_professional_id: Option<ProfessionalId>,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

/// A direct client inquiry. Follows the same lifecycle as a lead but carries
/// no referrer share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: RequestId,
    pub owner_id: ProfessionalId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub status: LeadStatus,
    pub assigned_professional_id: Option<ProfessionalId>,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

/// Reference to the listing a proposal bids on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ParentRef {
    Lead(LeadId),
    Request(RequestId),
}

impl ParentRef {
    pub fn kind(&self) -> ProposalKind {
        match self {
            ParentRef::Lead(_) => ProposalKind::Lead,
            ParentRef::Request(_) => ProposalKind::Request,
        }
    }

    pub fn id_str(&self) -> &str {
        match self {
            ParentRef::Lead(id) => id.as_str(),
            ParentRef::Request(id) => id.as_str(),
        }
    }

    /// Rebuild a reference from its stored `(kind, id)` columns.
    pub fn from_parts(kind: ProposalKind, id: String) -> Self {
        match kind {
            ProposalKind::Lead => ParentRef::Lead(LeadId::new(id)),
            ProposalKind::Request => ParentRef::Request(RequestId::new(id)),
        }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id_str())
    }
}

/// A loaded listing of either kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Lead(Lead),
    Request(Request),
}

impl Listing {
    pub fn parent_ref(&self) -> ParentRef {
        match self {
            Listing::Lead(l) => ParentRef::Lead(l.id.clone()),
            Listing::Request(r) => ParentRef::Request(r.id.clone()),
        }
    }

    pub fn owner_id(&self) -> &ProfessionalId {
        match self {
            Listing::Lead(l) => &l.owner_id,
            Listing::Request(r) => &r.owner_id,
        }
    }

    pub fn status(&self) -> LeadStatus {
        match self {
            Listing::Lead(l) => l.status,
            Listing::Request(r) => r.status,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Listing::Lead(l) => &l.title,
            Listing::Request(r) => &r.title,
        }
    }
}
