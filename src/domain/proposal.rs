//! Proposals (bids on leads) and quotes (bids on requests).

use crate::domain::{Decimal, ParentRef, ProfessionalId, ProposalId, ProposalKind, TimeMs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a proposal or quote.
///
/// `approved` is the request-level equivalent of `accepted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Approved,
    Scheduled,
    WaitingForRating,
    Rejected,
    Completed,
    Cancelled,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 8] = [
        ProposalStatus::Pending,
        ProposalStatus::Accepted,
        ProposalStatus::Approved,
        ProposalStatus::Scheduled,
        ProposalStatus::WaitingForRating,
        ProposalStatus::Rejected,
        ProposalStatus::Completed,
        ProposalStatus::Cancelled,
    ];

    /// Statuses that mean "this bid won the listing". At most one proposal
    /// per listing may hold one of these.
    pub const AWARDED: [ProposalStatus; 5] = [
        ProposalStatus::Accepted,
        ProposalStatus::Approved,
        ProposalStatus::Scheduled,
        ProposalStatus::WaitingForRating,
        ProposalStatus::Completed,
    ];

    /// Statuses from which work can be settled.
    pub const COMPLETABLE: [ProposalStatus; 4] = [
        ProposalStatus::Accepted,
        ProposalStatus::Approved,
        ProposalStatus::Scheduled,
        ProposalStatus::WaitingForRating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Scheduled => "scheduled",
            ProposalStatus::WaitingForRating => "waiting_for_rating",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Completed => "completed",
            ProposalStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Completed | ProposalStatus::Cancelled | ProposalStatus::Rejected
        )
    }

    pub fn holds_award(&self) -> bool {
        Self::AWARDED.contains(self)
    }

    pub fn is_completable(&self) -> bool {
        Self::COMPLETABLE.contains(self)
    }

    /// Whether `self → to` is a defined transition.
    ///
    /// `rejected → accepted|approved` is only reachable through an explicit
    /// reconsideration, which re-runs the mutual exclusion check.
    pub fn can_transition_to(&self, to: ProposalStatus) -> bool {
        use ProposalStatus::*;
        matches!(
            (self, to),
            (Pending, Accepted | Approved | Rejected | Cancelled)
                | (Accepted | Approved, Scheduled | WaitingForRating | Completed)
                | (Scheduled, Scheduled | WaitingForRating | Completed)
                | (WaitingForRating, Completed)
                | (Rejected, Accepted | Approved)
        )
    }

    /// Every status with a defined transition into `to`.
    pub fn sources_of(to: ProposalStatus) -> Vec<ProposalStatus> {
        Self::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(to))
            .collect()
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProposalStatus::Pending),
            "accepted" => Ok(ProposalStatus::Accepted),
            "approved" => Ok(ProposalStatus::Approved),
            "scheduled" => Ok(ProposalStatus::Scheduled),
            "waiting_for_rating" => Ok(ProposalStatus::WaitingForRating),
            "rejected" => Ok(ProposalStatus::Rejected),
            "completed" => Ok(ProposalStatus::Completed),
            "cancelled" => Ok(ProposalStatus::Cancelled),
            other => Err(format!("unknown proposal status: {}", other)),
        }
    }
}

impl ProposalKind {
    /// Status a winning bid of this kind moves to.
    pub fn accepted_status(&self) -> ProposalStatus {
        match self {
            ProposalKind::Lead => ProposalStatus::Accepted,
            ProposalKind::Request => ProposalStatus::Approved,
        }
    }
}

/// A professional's bid on a lead or request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    pub parent: ParentRef,
    pub professional_id: ProfessionalId,
    /// Some leads carry no fixed budget, so the bid may omit a price.
    pub price: Option<Decimal>,
    pub description: String,
    pub status: ProposalStatus,
    pub scheduled_at: Option<TimeMs>,
    pub final_amount: Option<Decimal>,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

impl Proposal {
    pub fn kind(&self) -> ProposalKind {
        self.parent.kind()
    }
}
