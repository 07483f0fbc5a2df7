//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `listings.rs` - Lead and request operations
//! - `proposals.rs` - Proposal inserts and conditional status writes
//! - `payments.rs` - Payment records
//! - `notifications.rs` - Notification inserts and reads
//!
//! Inherent methods speak `sqlx::Error`; the `MarketStore` and `Notifier`
//! impls at the bottom adapt them to the workflow seams.

mod listings;
mod notifications;
mod payments;
mod proposals;

use crate::domain::{
    Decimal, Lead, LeadStatus, Listing, Notification, ParentRef, PaymentRecord, ProfessionalId,
    Proposal, ProposalId, ProposalKind, ProposalStatus, Request, TimeMs,
};
use crate::notify::{Notifier, NotifyError};
use crate::store::{MarketStore, StoreError};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Round-trip a trivial query to confirm the pool is usable.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// `?, ?, ?` for an `IN (...)` list of `n` items.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn decode_err(what: &str, value: &str, reason: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(format!("invalid {} {:?}: {}", what, value, reason).into())
}

fn parse_decimal(what: &str, value: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str(value).map_err(|e| decode_err(what, value, e))
}

fn parse_opt_decimal(what: &str, value: Option<String>) -> Result<Option<Decimal>, sqlx::Error> {
    value.map(|v| parse_decimal(what, &v)).transpose()
}

fn parse_enum<T: FromStr<Err = String>>(what: &str, value: &str) -> Result<T, sqlx::Error> {
    T::from_str(value).map_err(|e| decode_err(what, value, e))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl MarketStore for Repository {
    async fn insert_lead(&self, lead: &Lead) -> Result<(), StoreError> {
        Repository::insert_lead(self, lead).await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("lead {}", lead.id))
            } else {
                e.into()
            }
        })
    }

    async fn insert_request(&self, request: &Request) -> Result<(), StoreError> {
        Repository::insert_request(self, request)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Duplicate(format!("request {}", request.id))
                } else {
                    e.into()
                }
            })
    }

    async fn get_listing(&self, parent: &ParentRef) -> Result<Option<Listing>, StoreError> {
        Ok(match parent {
            ParentRef::Lead(id) => self.get_lead(id).await?.map(Listing::Lead),
            ParentRef::Request(id) => self.get_request(id).await?.map(Listing::Request),
        })
    }

    async fn update_listing_status(
        &self,
        parent: &ParentRef,
        from: &[LeadStatus],
        to: LeadStatus,
        assigned: Option<&ProfessionalId>,
    ) -> Result<bool, StoreError> {
        Ok(Repository::update_listing_status(self, parent, from, to, assigned).await?)
    }

    async fn insert_proposal(&self, proposal: &Proposal) -> Result<bool, StoreError> {
        Repository::insert_proposal(self, proposal)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Duplicate(format!("proposal {}", proposal.id))
                } else {
                    e.into()
                }
            })
    }

    async fn get_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
    ) -> Result<Option<Proposal>, StoreError> {
        Ok(Repository::get_proposal(self, kind, id).await?)
    }

    async fn list_proposals(&self, parent: &ParentRef) -> Result<Vec<Proposal>, StoreError> {
        Ok(Repository::list_proposals(self, parent).await?)
    }

    async fn update_proposal_status(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        to: ProposalStatus,
    ) -> Result<bool, StoreError> {
        Ok(Repository::update_proposal_status(self, kind, id, from, to).await?)
    }

    async fn award_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        to: ProposalStatus,
    ) -> Result<bool, StoreError> {
        Ok(Repository::award_proposal(self, kind, id, from, to).await?)
    }

    async fn schedule_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        scheduled_at: TimeMs,
    ) -> Result<bool, StoreError> {
        Ok(Repository::schedule_proposal(self, kind, id, from, scheduled_at).await?)
    }

    async fn complete_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        final_amount: Decimal,
    ) -> Result<bool, StoreError> {
        Ok(Repository::complete_proposal(self, kind, id, from, final_amount).await?)
    }

    async fn insert_payment(&self, payment: &PaymentRecord) -> Result<(), StoreError> {
        Repository::insert_payment(self, payment)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Duplicate(format!("payment for proposal {}", payment.proposal_id))
                } else {
                    e.into()
                }
            })
    }

    async fn get_payment_for_proposal(
        &self,
        kind: ProposalKind,
        proposal_id: &ProposalId,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(Repository::get_payment_for_proposal(self, kind, proposal_id).await?)
    }
}

#[async_trait]
impl Notifier for Repository {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.insert_notification(notification).await?;
        Ok(())
    }
}
