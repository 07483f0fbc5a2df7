//! Accepting and rejecting bids with mutual exclusion per listing.
//!
//! Accepting is a chain of idempotent steps:
//! 1. atomically award the target (refused while a sibling holds the award)
//! 2. reject every still-pending sibling
//! 3. move the listing to `approved`
//! 4. notify, best-effort
//!
//! If step 2 or 3 fails the caller gets `PartialFailure` and should retry the
//! same accept; every step is a no-op when its target state already holds.

use super::listings::related_type_for;
use super::{require_identity, WorkflowError};
use crate::domain::{
    IdentityContext, LeadStatus, Listing, Notification, NotificationType, ParentRef, Proposal,
    ProposalId, ProposalKind, ProposalStatus, RelatedType,
};
use crate::notify::{emit, Notifier};
use crate::store::MarketStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptOutcome {
    pub proposal_id: ProposalId,
    pub status: ProposalStatus,
    /// Siblings rejected by this call.
    pub rejected: Vec<ProposalId>,
    /// The target already held the award before this call.
    pub already_awarded: bool,
}

impl AcceptOutcome {
    pub fn rejected_others(&self) -> bool {
        !self.rejected.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ProposalResolver {
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn Notifier>,
}

impl ProposalResolver {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Accept a pending bid and reject its pending competitors.
    pub async fn accept_proposal(
        &self,
        identity: &IdentityContext,
        kind: ProposalKind,
        proposal_id: &ProposalId,
    ) -> Result<AcceptOutcome, WorkflowError> {
        self.award(identity, kind, proposal_id, ProposalStatus::Pending)
            .await
    }

    /// Turn a previously rejected bid into the winner. Same exclusion rules
    /// as accepting.
    pub async fn reconsider_proposal(
        &self,
        identity: &IdentityContext,
        kind: ProposalKind,
        proposal_id: &ProposalId,
    ) -> Result<AcceptOutcome, WorkflowError> {
        self.award(identity, kind, proposal_id, ProposalStatus::Rejected)
            .await
    }

    /// Reject a single pending bid. Rejecting an already rejected bid is a no-op.
    pub async fn reject_proposal(
        &self,
        identity: &IdentityContext,
        kind: ProposalKind,
        proposal_id: &ProposalId,
    ) -> Result<(), WorkflowError> {
        let caller = require_identity(identity)?;
        let proposal = self.load_proposal(kind, proposal_id).await?;
        let listing = self.load_listing(&proposal.parent).await?;
        require_owner(&listing, caller)?;

        match proposal.status {
            ProposalStatus::Rejected => return Ok(()),
            ProposalStatus::Pending => {}
            other => {
                return Err(WorkflowError::InvalidState(format!(
                    "proposal is {} and can no longer be rejected",
                    other
                )))
            }
        }

        let changed = self
            .store
            .update_proposal_status(
                kind,
                proposal_id,
                &ProposalStatus::sources_of(ProposalStatus::Rejected),
                ProposalStatus::Rejected,
            )
            .await?;
        if !changed {
            let current = self.load_proposal(kind, proposal_id).await?;
            if current.status == ProposalStatus::Rejected {
                return Ok(());
            }
            return Err(WorkflowError::InvalidState(format!(
                "proposal moved to {} before it could be rejected",
                current.status
            )));
        }

        info!(proposal_id = %proposal_id, parent = %proposal.parent, "Proposal rejected");
        self.notify_rejected(&proposal, &listing).await;
        Ok(())
    }

    async fn award(
        &self,
        identity: &IdentityContext,
        kind: ProposalKind,
        proposal_id: &ProposalId,
        eligible_from: ProposalStatus,
    ) -> Result<AcceptOutcome, WorkflowError> {
        let caller = require_identity(identity)?;
        let proposal = self.load_proposal(kind, proposal_id).await?;
        let parent = proposal.parent.clone();
        let listing = self.load_listing(&parent).await?;
        require_owner(&listing, caller)?;

        let siblings = self.store.list_proposals(&parent).await?;
        if let Some(winner) = awarded_sibling(&siblings, proposal_id) {
            warn!(
                proposal_id = %proposal_id,
                awarded_id = %winner.id,
                parent = %parent,
                "Accept refused: another proposal already holds the award"
            );
            return Err(WorkflowError::Conflict(
                "another proposal has already been accepted for this listing".into(),
            ));
        }

        if !matches!(listing.status(), LeadStatus::Active | LeadStatus::Approved) {
            return Err(WorkflowError::InvalidState(format!(
                "{} is {}",
                parent,
                listing.status()
            )));
        }

        let awarded_status = kind.accepted_status();
        let already_awarded = proposal.status.holds_award();
        if !already_awarded {
            if proposal.status != eligible_from
                || !proposal.status.can_transition_to(awarded_status)
            {
                return Err(WorkflowError::InvalidState(format!(
                    "proposal is {} and cannot be accepted here",
                    proposal.status
                )));
            }

            let awarded = self
                .store
                .award_proposal(kind, proposal_id, &[eligible_from], awarded_status)
                .await?;
            if !awarded {
                let siblings = self.store.list_proposals(&parent).await?;
                if awarded_sibling(&siblings, proposal_id).is_some() {
                    warn!(proposal_id = %proposal_id, parent = %parent, "Lost accept race");
                    return Err(WorkflowError::Conflict(
                        "another proposal has already been accepted for this listing".into(),
                    ));
                }
                return Err(WorkflowError::InvalidState(
                    "proposal changed status while being accepted".into(),
                ));
            }
            info!(
                proposal_id = %proposal_id,
                parent = %parent,
                status = %awarded_status,
                "Proposal awarded"
            );
        }

        // Re-read so bids that arrived after the first listing are covered too.
        let siblings = self.store.list_proposals(&parent).await.map_err(|e| {
            error!(proposal_id = %proposal_id, error = %e, "Failed to list competing proposals");
            WorkflowError::PartialFailure {
                message: "proposal accepted but competing proposals could not be loaded; retry"
                    .into(),
                rejected: Vec::new(),
            }
        })?;

        let mut rejected: Vec<&Proposal> = Vec::new();
        for sibling in siblings
            .iter()
            .filter(|p| &p.id != proposal_id && p.status == ProposalStatus::Pending)
        {
            match self
                .store
                .update_proposal_status(
                    kind,
                    &sibling.id,
                    &ProposalStatus::sources_of(ProposalStatus::Rejected),
                    ProposalStatus::Rejected,
                )
                .await
            {
                Ok(true) => rejected.push(sibling),
                Ok(false) => {}
                Err(e) => {
                    error!(
                        proposal_id = %proposal_id,
                        sibling_id = %sibling.id,
                        rejected_so_far = rejected.len(),
                        error = %e,
                        "Failed to reject competing proposal"
                    );
                    return Err(WorkflowError::PartialFailure {
                        message: "proposal accepted but not all competing proposals were rejected; retry".into(),
                        rejected: rejected.iter().map(|p| p.id.clone()).collect(),
                    });
                }
            }
        }

        if let Err(e) = self
            .store
            .update_listing_status(
                &parent,
                &LeadStatus::sources_of(LeadStatus::Approved),
                LeadStatus::Approved,
                Some(&proposal.professional_id),
            )
            .await
        {
            error!(parent = %parent, error = %e, "Failed to approve listing");
            return Err(WorkflowError::PartialFailure {
                message: "proposal accepted but the listing could not be approved; retry".into(),
                rejected: rejected.iter().map(|p| p.id.clone()).collect(),
            });
        }

        for sibling in &rejected {
            self.notify_rejected(sibling, &listing).await;
        }
        if !already_awarded {
            emit(
                self.notifier.as_ref(),
                Notification::new(
                    proposal.professional_id.clone(),
                    "Your proposal was accepted",
                    format!("Your bid on \"{}\" was accepted", listing.title()),
                    NotificationType::ProposalAccepted,
                    proposal_id.as_str(),
                    proposal_related_type(kind),
                ),
            )
            .await;
        }

        Ok(AcceptOutcome {
            proposal_id: proposal_id.clone(),
            status: if already_awarded {
                proposal.status
            } else {
                awarded_status
            },
            rejected: rejected.into_iter().map(|p| p.id.clone()).collect(),
            already_awarded,
        })
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

    async fn load_listing(&self, parent: &ParentRef) -> Result<Listing, WorkflowError> {
        self.store
            .get_listing(parent)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("{} not found", parent)))
    }

    async fn notify_rejected(&self, proposal: &Proposal, listing: &Listing) {
        emit(
            self.notifier.as_ref(),
            Notification::new(
                proposal.professional_id.clone(),
                "Your proposal was not selected",
                format!("Another bid was chosen for \"{}\"", listing.title()),
                NotificationType::ProposalRejected,
                proposal.parent.id_str(),
                related_type_for(&proposal.parent),
            ),
        )
        .await;
    }
}

fn require_owner(
    listing: &Listing,
    caller: &crate::domain::ProfessionalId,
) -> Result<(), WorkflowError> {
    if listing.owner_id() != caller {
        return Err(WorkflowError::Forbidden(
            "only the listing owner can decide on its proposals".into(),
        ));
    }
    Ok(())
}

fn awarded_sibling<'a>(siblings: &'a [Proposal], target: &ProposalId) -> Option<&'a Proposal> {
    siblings
        .iter()
        .find(|p| &p.id != target && p.status.holds_award())
}

pub(crate) fn proposal_related_type(kind: ProposalKind) -> RelatedType {
    match kind {
        ProposalKind::Lead => RelatedType::Proposal,
        ProposalKind::Request => RelatedType::Quote,
    }
}
