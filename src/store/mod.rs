//! Store abstraction for listings, proposals and payments.
//!
//! Every mutating method is a single-record conditional write: it applies
//! only if the stated precondition still holds at write time and reports
//! whether it did. No multi-record transactions are assumed.

use crate::domain::{
    Decimal, Lead, LeadStatus, Listing, ParentRef, PaymentRecord, ProfessionalId, Proposal,
    ProposalId, ProposalKind, ProposalStatus, Request, TimeMs,
};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod memory;

pub use memory::{FailurePlan, MemoryStore};

#[async_trait]
pub trait MarketStore: Send + Sync + fmt::Debug {
    async fn insert_lead(&self, lead: &Lead) -> Result<(), StoreError>;

    async fn insert_request(&self, request: &Request) -> Result<(), StoreError>;

    async fn get_listing(&self, parent: &ParentRef) -> Result<Option<Listing>, StoreError>;

    /// Move a listing to `to` if its status is currently one of `from`.
    /// `assigned` overwrites the assigned professional when given.
    async fn update_listing_status(
        &self,
        parent: &ParentRef,
        from: &[LeadStatus],
        to: LeadStatus,
        assigned: Option<&ProfessionalId>,
    ) -> Result<bool, StoreError>;

    /// Insert a proposal unless its submitter already holds a non-terminal
    /// proposal on the same listing. Returns false on that conflict.
    async fn insert_proposal(&self, proposal: &Proposal) -> Result<bool, StoreError>;

    async fn get_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
    ) -> Result<Option<Proposal>, StoreError>;

    /// All proposals on a listing, oldest first.
    async fn list_proposals(&self, parent: &ParentRef) -> Result<Vec<Proposal>, StoreError>;

    /// Move a proposal to `to` if its status is currently one of `from`.
    async fn update_proposal_status(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        to: ProposalStatus,
    ) -> Result<bool, StoreError>;

    /// Move a proposal to the awarded status `to` if its status is one of
    /// `from` and no sibling on the same listing holds an awarded status.
    /// The check and the write are one atomic step.
    async fn award_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        to: ProposalStatus,
    ) -> Result<bool, StoreError>;

    /// Set `scheduled` with a date if the status is one of `from`.
    async fn schedule_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        scheduled_at: TimeMs,
    ) -> Result<bool, StoreError>;

    /// Set `completed` and stamp the settled amount if the status is one of `from`.
    async fn complete_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        final_amount: Decimal,
    ) -> Result<bool, StoreError>;

    /// Insert a payment record. At most one per proposal: a second insert
    /// fails with `StoreError::Duplicate`.
    async fn insert_payment(&self, payment: &PaymentRecord) -> Result<(), StoreError>;

    async fn get_payment_for_proposal(
        &self,
        kind: ProposalKind,
        proposal_id: &ProposalId,
    ) -> Result<Option<PaymentRecord>, StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(sqlx::Error),
    #[error("duplicate record: {0}")]
    Duplicate(String),
    /// A stored row no longer decodes into its record type.
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Decode(e) => StoreError::Corrupt(e.to_string()),
            sqlx::Error::ColumnDecode { index, source } => {
                StoreError::Corrupt(format!("column {}: {}", index, source))
            }
            other => StoreError::Db(other),
        }
    }
}
