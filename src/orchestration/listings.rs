use super::{require_identity, WorkflowError};
use crate::domain::{
    Decimal, IdentityContext, Lead, LeadId, LeadStatus, Listing, Notification, NotificationType,
    ParentRef, Proposal, ProposalId, ProposalKind, ProposalStatus, RelatedType, Request,
    RequestId, TimeMs,
};
use crate::notify::{emit, Notifier};
use crate::store::MarketStore;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct NewLead {
    pub title: String,
    pub description: String,
    pub location: String,
    pub budget: Option<Decimal>,
    pub referrer_share_pct: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub title: String,
    pub description: String,
    pub location: String,
}

#[derive(Debug, Clone)]
pub struct NewProposal {
    pub price: Option<Decimal>,
    pub description: String,
}

/// Creating, cancelling and bidding on listings.
#[derive(Debug, Clone)]
pub struct ListingService {
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn Notifier>,
}

impl ListingService {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn create_lead(
        &self,
        identity: &IdentityContext,
        new: NewLead,
    ) -> Result<Lead, WorkflowError> {
        let owner = require_identity(identity)?;
        require_text("title", &new.title)?;
        if let Some(budget) = new.budget {
            if budget.is_negative() {
                return Err(WorkflowError::InvalidInput(
                    "budget must not be negative".into(),
                ));
            }
        }
        if let Some(pct) = new.referrer_share_pct {
            if pct > 100 {
                return Err(WorkflowError::InvalidInput(format!(
                    "referrer share must be between 0 and 100, got {}",
                    pct
                )));
            }
        }

        let now = TimeMs::now();
        let lead = Lead {
            id: LeadId::generate(),
            owner_id: owner.clone(),
            title: new.title.trim().to_string(),
            description: new.description,
            location: new.location,
            budget: new.budget,
            referrer_share_pct: new.referrer_share_pct,
            status: LeadStatus::Active,
            assigned_professional_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_lead(&lead).await?;

        info!(lead_id = %lead.id, owner_id = %lead.owner_id, "Lead created");
        Ok(lead)
    }

    pub async fn create_request(
        &self,
        identity: &IdentityContext,
        new: NewRequest,
    ) -> Result<Request, WorkflowError> {
        let owner = require_identity(identity)?;
        require_text("title", &new.title)?;

        let now = TimeMs::now();
        let request = Request {
            id: RequestId::generate(),
            owner_id: owner.clone(),
            title: new.title.trim().to_string(),
            description: new.description,
            location: new.location,
            status: LeadStatus::Active,
            assigned_professional_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_request(&request).await?;

        info!(request_id = %request.id, owner_id = %request.owner_id, "Request created");
        Ok(request)
    }

    pub async fn get_listing(&self, parent: &ParentRef) -> Result<Listing, WorkflowError> {
        self.store
            .get_listing(parent)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("{} not found", parent)))
    }

    pub async fn list_proposals(&self, parent: &ParentRef) -> Result<Vec<Proposal>, WorkflowError> {
        self.get_listing(parent).await?;
        Ok(self.store.list_proposals(parent).await?)
    }

    /// Submit a bid. A professional may hold only one non-terminal bid per
    /// listing and may not bid on their own listing.
    pub async fn submit_proposal(
        &self,
        identity: &IdentityContext,
        parent: &ParentRef,
        new: NewProposal,
    ) -> Result<Proposal, WorkflowError> {
        let pro = require_identity(identity)?;
        let listing = self.get_listing(parent).await?;

        if listing.owner_id() == pro {
            return Err(WorkflowError::Forbidden(
                "you cannot submit a proposal on your own listing".into(),
            ));
        }
        if listing.status() != LeadStatus::Active {
            return Err(WorkflowError::InvalidState(format!(
                "{} is {} and no longer accepts proposals",
                parent,
                listing.status()
            )));
        }
        if let Some(price) = new.price {
            if price.is_negative() {
                return Err(WorkflowError::InvalidInput(
                    "price must not be negative".into(),
                ));
            }
        }

        let now = TimeMs::now();
        let proposal = Proposal {
            id: ProposalId::generate(),
            parent: parent.clone(),
            professional_id: pro.clone(),
            price: new.price,
            description: new.description,
            status: ProposalStatus::Pending,
            scheduled_at: None,
            final_amount: None,
            created_at: now,
            updated_at: now,
        };

        if !self.store.insert_proposal(&proposal).await? {
            return Err(WorkflowError::Conflict(
                "you already have an open proposal on this listing".into(),
            ));
        }

        info!(
            proposal_id = %proposal.id,
            parent = %parent,
            professional_id = %pro,
            "Proposal submitted"
        );

        let (title, related_type) = match parent.kind() {
            ProposalKind::Lead => ("New proposal on your lead", RelatedType::Proposal),
            ProposalKind::Request => ("New quote on your request", RelatedType::Quote),
        };
        emit(
            self.notifier.as_ref(),
            Notification::new(
                listing.owner_id().clone(),
                title,
                format!("A professional submitted a bid on \"{}\"", listing.title()),
                NotificationType::ProposalReceived,
                proposal.id.as_str(),
                related_type,
            ),
        )
        .await;

        Ok(proposal)
    }

    /// Cancel a listing that has not awarded a bid yet. Pending bids are
    /// rejected best-effort; the cancellation itself is what the caller sees.
    pub async fn cancel_listing(
        &self,
        identity: &IdentityContext,
        parent: &ParentRef,
    ) -> Result<Vec<ProposalId>, WorkflowError> {
        let pro = require_identity(identity)?;
        let listing = self.get_listing(parent).await?;

        if listing.owner_id() != pro {
            return Err(WorkflowError::Forbidden(
                "only the owner can cancel this listing".into(),
            ));
        }
        match listing.status() {
            LeadStatus::Cancelled => return Ok(Vec::new()),
            status if !status.can_transition_to(LeadStatus::Cancelled) => {
                return Err(WorkflowError::InvalidState(format!(
                    "{} is {} and can no longer be cancelled",
                    parent, status
                )))
            }
            _ => {}
        }

        let cancelled = self
            .store
            .update_listing_status(
                parent,
                &LeadStatus::sources_of(LeadStatus::Cancelled),
                LeadStatus::Cancelled,
                None,
            )
            .await?;
        if !cancelled {
            return Err(WorkflowError::InvalidState(format!(
                "{} changed status while cancelling",
                parent
            )));
        }
        info!(parent = %parent, "Listing cancelled");

        let mut rejected = Vec::new();
        let proposals = match self.store.list_proposals(parent).await {
            Ok(p) => p,
            Err(e) => {
                warn!(parent = %parent, error = %e, "Failed to load proposals of cancelled listing");
                return Ok(rejected);
            }
        };
        for proposal in proposals
            .into_iter()
            .filter(|p| p.status == ProposalStatus::Pending)
        {
            match self
                .store
                .update_proposal_status(
                    proposal.kind(),
                    &proposal.id,
                    &ProposalStatus::sources_of(ProposalStatus::Rejected),
                    ProposalStatus::Rejected,
                )
                .await
            {
                Ok(true) => {
                    emit(
                        self.notifier.as_ref(),
                        Notification::new(
                            proposal.professional_id.clone(),
                            "Listing cancelled",
                            format!("\"{}\" was cancelled by its owner", listing.title()),
                            NotificationType::LeadCancelled,
                            parent.id_str(),
                            related_type_for(parent),
                        ),
                    )
                    .await;
                    rejected.push(proposal.id);
                }
                Ok(false) => {}
                Err(e) => warn!(
                    proposal_id = %proposal.id,
                    error = %e,
                    "Failed to reject proposal of cancelled listing"
                ),
            }
        }

        Ok(rejected)
    }
}

pub(crate) fn related_type_for(parent: &ParentRef) -> RelatedType {
    match parent {
        ParentRef::Lead(_) => RelatedType::Lead,
        ParentRef::Request(_) => RelatedType::Request,
    }
}

fn require_text(field: &str, value: &str) -> Result<(), WorkflowError> {
    if value.trim().is_empty() {
        return Err(WorkflowError::InvalidInput(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}
