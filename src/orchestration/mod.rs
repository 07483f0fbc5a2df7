//! Workflows over the store: listings, proposal resolution, settlement.
//!
//! Every operation takes an explicit `IdentityContext`. Precondition failures
//! are detected before any write. Multi-step sequences are chains of
//! idempotent conditional writes; a caller that sees `PartialFailure` can
//! retry the whole operation.

use crate::domain::{IdentityContext, ProfessionalId, ProposalId};
use crate::engine::CommissionError;
use crate::store::StoreError;
use thiserror::Error;

pub mod listings;
pub mod resolution;
pub mod settlement;

pub use listings::{ListingService, NewLead, NewProposal, NewRequest};
pub use resolution::{AcceptOutcome, ProposalResolver};
pub use settlement::{CompleteWork, SettlementReceipt, WorkSettlement};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidInput(String),
    /// A multi-step sequence stopped partway. `rejected` lists the siblings
    /// already rejected before the failure.
    #[error("{message}")]
    PartialFailure {
        message: String,
        rejected: Vec<ProposalId>,
    },
    #[error("storage failure: {0}")]
    Persistence(#[from] StoreError),
}

impl From<CommissionError> for WorkflowError {
    fn from(err: CommissionError) -> Self {
        WorkflowError::InvalidInput(err.to_string())
    }
}

/// Resolve the caller or fail with `Unauthenticated`.
pub(crate) fn require_identity(
    identity: &IdentityContext,
) -> Result<&ProfessionalId, WorkflowError> {
    identity
        .professional_id()
        .ok_or(WorkflowError::Unauthenticated)
}
