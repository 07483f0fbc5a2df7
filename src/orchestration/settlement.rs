//! Settling finished work.
//!
//! The payment insert is the only load-bearing write. Everything after it
//! (proposal status, notifications, listing completion) is best-effort and
//! logged on failure, because the payment record is what says the work was
//! paid.

use super::listings::related_type_for;
use super::resolution::proposal_related_type;
use super::{require_identity, WorkflowError};
use crate::domain::{
    Decimal, IdentityContext, LeadStatus, Listing, Notification, NotificationType, ParentRef,
    PaymentId, PaymentRecord, Proposal, ProposalId, ProposalKind, ProposalStatus, RelatedType,
    TimeMs,
};
use crate::engine::{CommissionCalculator, CommissionSplit};
use crate::notify::{emit, Notifier};
use crate::store::{MarketStore, StoreError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct CompleteWork {
    pub kind: ProposalKind,
    pub proposal_id: ProposalId,
    pub final_amount: Decimal,
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub payment_id: PaymentId,
    pub split: CommissionSplit,
    /// The lead moved to `completed` as part of this call.
    pub listing_completed: bool,
    /// A payment from an earlier, partially failed attempt was reused.
    pub reused_payment: bool,
}

#[derive(Debug, Clone)]
pub struct WorkSettlement {
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn Notifier>,
    calculator: CommissionCalculator,
}

impl WorkSettlement {
    pub fn new(
        store: Arc<dyn MarketStore>,
        notifier: Arc<dyn Notifier>,
        calculator: CommissionCalculator,
    ) -> Self {
        Self {
            store,
            notifier,
            calculator,
        }
    }

    pub fn calculator(&self) -> &CommissionCalculator {
        &self.calculator
    }

    /// Book a date for awarded work. Only the submitting professional may.
    pub async fn schedule_work(
        &self,
        identity: &IdentityContext,
        kind: ProposalKind,
        proposal_id: &ProposalId,
        scheduled_at: TimeMs,
    ) -> Result<Proposal, WorkflowError> {
        let caller = require_identity(identity)?;
        let proposal = self.load_proposal(kind, proposal_id).await?;
        if &proposal.professional_id != caller {
            return Err(WorkflowError::Forbidden(
                "you can only schedule your own work".into(),
            ));
        }

        let schedulable = ProposalStatus::sources_of(ProposalStatus::Scheduled);
        if !schedulable.contains(&proposal.status) {
            return Err(WorkflowError::InvalidState(format!(
                "proposal is {} and cannot be scheduled",
                proposal.status
            )));
        }
        if !self
            .store
            .schedule_proposal(kind, proposal_id, &schedulable, scheduled_at)
            .await?
        {
            return Err(WorkflowError::InvalidState(
                "proposal changed status while being scheduled".into(),
            ));
        }
        info!(proposal_id = %proposal_id, scheduled_at = scheduled_at.as_ms(), "Work scheduled");

        if let Ok(Some(listing)) = self.store.get_listing(&proposal.parent).await {
            emit(
                self.notifier.as_ref(),
                Notification::new(
                    listing.owner_id().clone(),
                    "Work scheduled",
                    format!("Work on \"{}\" has been scheduled", listing.title()),
                    NotificationType::WorkScheduled,
                    proposal_id.as_str(),
                    proposal_related_type(kind),
                ),
            )
            .await;
        }

        self.load_proposal(kind, proposal_id).await
    }

    /// Settle a finished proposal or quote and return the payment id.
    ///
    /// # Errors
    /// `Unauthenticated`, `NotFound`, `Forbidden` and `InvalidState` are
    /// checked in that order before anything is written. A cancelled listing
    /// is also `InvalidState`. `InvalidInput` for bad amounts. `Persistence`
    /// when the payment record cannot be written.
    pub async fn complete_work(
        &self,
        identity: &IdentityContext,
        cmd: CompleteWork,
    ) -> Result<SettlementReceipt, WorkflowError> {
        let caller = require_identity(identity)?;
        let proposal = self.load_proposal(cmd.kind, &cmd.proposal_id).await?;
        if &proposal.professional_id != caller {
            return Err(WorkflowError::Forbidden(
                "you can only complete your own work".into(),
            ));
        }
        if !proposal.status.is_completable() {
            return Err(WorkflowError::InvalidState(format!(
                "proposal is {} and cannot be completed",
                proposal.status
            )));
        }
        if cmd.payment_method.trim().is_empty() {
            return Err(WorkflowError::InvalidInput(
                "payment method is required".into(),
            ));
        }

        let listing = self
            .store
            .get_listing(&proposal.parent)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("{} not found", proposal.parent)))?;
        if listing.status() == LeadStatus::Cancelled {
            warn!(
                proposal_id = %cmd.proposal_id,
                parent = %proposal.parent,
                "Settlement refused: listing was cancelled"
            );
            return Err(WorkflowError::InvalidState(format!(
                "{} was cancelled and cannot be settled",
                proposal.parent
            )));
        }
        let share = match &listing {
            Listing::Lead(lead) => self
                .calculator
                .rates()
                .resolve_referrer_share(lead.referrer_share_pct),
            Listing::Request(_) => Decimal::zero(),
        };
        let split = self.calculator.split(cmd.final_amount, share, cmd.kind)?;

        let (payment, reused_payment) = self.record_payment(&cmd, &proposal, &split).await?;
        let split = split_of(&payment);

        match self
            .store
            .complete_proposal(
                cmd.kind,
                &cmd.proposal_id,
                &ProposalStatus::sources_of(ProposalStatus::Completed),
                payment.final_amount,
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(
                proposal_id = %cmd.proposal_id,
                payment_id = %payment.id,
                "Proposal was no longer completable after payment was recorded"
            ),
            Err(e) => error!(
                proposal_id = %cmd.proposal_id,
                payment_id = %payment.id,
                error = %e,
                "Failed to mark proposal completed after payment was recorded"
            ),
        }

        emit(
            self.notifier.as_ref(),
            Notification::new(
                caller.clone(),
                "Work completed",
                format!(
                    "You earned {} for \"{}\"",
                    split.professional_net.to_currency_string(),
                    listing.title()
                ),
                NotificationType::WorkCompleted,
                payment.id.as_str(),
                RelatedType::Payment,
            ),
        )
        .await;

        let mut listing_completed = false;
        if let Listing::Lead(lead) = &listing {
            if split.referrer_commission.is_positive() {
                emit(
                    self.notifier.as_ref(),
                    Notification::new(
                        lead.owner_id.clone(),
                        "Referral commission earned",
                        format!(
                            "You earned {} referral commission for \"{}\"",
                            split.referrer_commission.to_currency_string(),
                            lead.title
                        ),
                        NotificationType::ReferralCommission,
                        payment.id.as_str(),
                        RelatedType::Payment,
                    ),
                )
                .await;
            }
            listing_completed = self
                .complete_listing_if_settled(&proposal.parent, &cmd.proposal_id, &listing)
                .await;
        }

        info!(
            proposal_id = %cmd.proposal_id,
            payment_id = %payment.id,
            final_amount = %payment.final_amount,
            professional_net = %split.professional_net,
            referrer_commission = %split.referrer_commission,
            platform_commission = %split.platform_commission,
            listing_completed,
            "Work settled"
        );

        Ok(SettlementReceipt {
            payment_id: payment.id,
            split,
            listing_completed,
            reused_payment,
        })
    }

    pub async fn payment_for(
        &self,
        kind: ProposalKind,
        proposal_id: &ProposalId,
    ) -> Result<PaymentRecord, WorkflowError> {
        self.store
            .get_payment_for_proposal(kind, proposal_id)
            .await?
            .ok_or_else(|| {
                WorkflowError::NotFound(format!("no payment recorded for {}", proposal_id))
            })
    }

    /// Insert the payment, or reuse one left by an earlier attempt.
    async fn record_payment(
        &self,
        cmd: &CompleteWork,
        proposal: &Proposal,
        split: &CommissionSplit,
    ) -> Result<(PaymentRecord, bool), WorkflowError> {
        if let Some(existing) = self
            .store
            .get_payment_for_proposal(cmd.kind, &cmd.proposal_id)
            .await?
        {
            warn!(
                proposal_id = %cmd.proposal_id,
                payment_id = %existing.id,
                "Reusing payment from an earlier settlement attempt"
            );
            return Ok((existing, true));
        }

        let payment = PaymentRecord {
            id: PaymentId::generate(),
            proposal_id: cmd.proposal_id.clone(),
            kind: cmd.kind,
            professional_id: proposal.professional_id.clone(),
            final_amount: split.final_amount,
            payment_method: cmd.payment_method.trim().to_string(),
            referrer_share_pct: split.referrer_share_pct,
            platform_commission: split.platform_commission,
            referrer_commission: split.referrer_commission,
            professional_net: split.professional_net,
            notes: cmd.notes.clone().filter(|n| !n.trim().is_empty()),
            created_at: TimeMs::now(),
        };

        match self.store.insert_payment(&payment).await {
            Ok(()) => Ok((payment, false)),
            Err(StoreError::Duplicate(msg)) => {
                warn!(proposal_id = %cmd.proposal_id, "Concurrent settlement detected: {}", msg);
                Err(WorkflowError::InvalidState(
                    "this work has already been settled".into(),
                ))
            }
            Err(e) => {
                error!(proposal_id = %cmd.proposal_id, error = %e, "Failed to insert payment");
                Err(WorkflowError::Persistence(e))
            }
        }
    }

    /// Complete the lead once no sibling bid is still in play.
    async fn complete_listing_if_settled(
        &self,
        parent: &ParentRef,
        settled: &ProposalId,
        listing: &Listing,
    ) -> bool {
        let siblings = match self.store.list_proposals(parent).await {
            Ok(s) => s,
            Err(e) => {
                warn!(parent = %parent, error = %e, "Failed to load proposals for completion check");
                return false;
            }
        };
        if let Some(open) = siblings
            .iter()
            .find(|p| &p.id != settled && !p.status.is_terminal())
        {
            info!(
                parent = %parent,
                open_proposal_id = %open.id,
                open_status = %open.status,
                "Listing stays open: another proposal is still in play"
            );
            return false;
        }

        match self
            .store
            .update_listing_status(
                parent,
                &LeadStatus::sources_of(LeadStatus::Completed),
                LeadStatus::Completed,
                None,
            )
            .await
        {
            Ok(true) => {
                info!(parent = %parent, "Listing completed");
                emit(
                    self.notifier.as_ref(),
                    Notification::new(
                        listing.owner_id().clone(),
                        "Lead completed",
                        format!("\"{}\" has been completed", listing.title()),
                        NotificationType::LeadCompleted,
                        parent.id_str(),
                        related_type_for(parent),
                    ),
                )
                .await;
                true
            }
            Ok(false) => false,
            Err(e) => {
                error!(parent = %parent, error = %e, "Failed to complete listing");
                false
            }
        }
    }

    async fn load_proposal(
        &self,
        kind: ProposalKind,
        proposal_id: &ProposalId,
    ) -> Result<Proposal, WorkflowError> {
        self.store
            .get_proposal(kind, proposal_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("proposal {} not found", proposal_id)))
    }
}

fn split_of(payment: &PaymentRecord) -> CommissionSplit {
    CommissionSplit {
        final_amount: payment.final_amount,
        referrer_share_pct: payment.referrer_share_pct,
        platform_commission: payment.platform_commission,
        referrer_commission: payment.referrer_commission,
        professional_net: payment.professional_net,
    }
}
