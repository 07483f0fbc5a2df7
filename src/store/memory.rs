//! In-process store for tests and local runs, with failure injection.

use super::{MarketStore, StoreError};
use crate::domain::{
    Decimal, Lead, LeadStatus, Listing, ParentRef, PaymentRecord, ProfessionalId, Proposal,
    ProposalId, ProposalKind, ProposalStatus, Request, TimeMs,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Writes to fail on purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailurePlan {
    /// Fail every transition to `rejected` once this many have succeeded.
    pub reject_after: Option<usize>,
    pub payment_insert: bool,
    pub proposal_completion: bool,
    pub listing_updates: bool,
}

#[derive(Debug, Default)]
struct State {
    leads: HashMap<String, Lead>,
    requests: HashMap<String, Request>,
    /// Insertion order doubles as creation order.
    proposals: Vec<Proposal>,
    payments: Vec<PaymentRecord>,
    failures: FailurePlan,
    rejections: usize,
}

impl State {
    fn proposal_mut(&mut self, kind: ProposalKind, id: &ProposalId) -> Option<&mut Proposal> {
        self.proposals
            .iter_mut()
            .find(|p| p.kind() == kind && &p.id == id)
    }
}

/// Store holding everything behind one async mutex, so each method is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active failure plan.
    pub async fn set_failures(&self, failures: FailurePlan) {
        let mut state = self.state.lock().await;
        state.failures = failures;
        state.rejections = 0;
    }

    /// Snapshot of every stored payment.
    pub async fn payments(&self) -> Vec<PaymentRecord> {
        self.state.lock().await.payments.clone()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn insert_lead(&self, lead: &Lead) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.leads.contains_key(lead.id.as_str()) {
            return Err(StoreError::Duplicate(format!("lead {}", lead.id)));
        }
        state.leads.insert(lead.id.0.clone(), lead.clone());
        Ok(())
    }

    async fn insert_request(&self, request: &Request) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.requests.contains_key(request.id.as_str()) {
            return Err(StoreError::Duplicate(format!("request {}", request.id)));
        }
        state.requests.insert(request.id.0.clone(), request.clone());
        Ok(())
    }

    async fn get_listing(&self, parent: &ParentRef) -> Result<Option<Listing>, StoreError> {
        let state = self.state.lock().await;
        Ok(match parent {
            ParentRef::Lead(id) => state.leads.get(id.as_str()).cloned().map(Listing::Lead),
            ParentRef::Request(id) => state
                .requests
                .get(id.as_str())
                .cloned()
                .map(Listing::Request),
        })
    }

    async fn update_listing_status(
        &self,
        parent: &ParentRef,
        from: &[LeadStatus],
        to: LeadStatus,
        assigned: Option<&ProfessionalId>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if state.failures.listing_updates {
            return Err(StoreError::Unavailable(format!("listing update {}", parent)));
        }
        let now = TimeMs::now();
        let (status, assigned_slot, updated_at) = match parent {
            ParentRef::Lead(id) => match state.leads.get_mut(id.as_str()) {
                Some(l) => (&mut l.status, &mut l.assigned_professional_id, &mut l.updated_at),
                None => return Ok(false),
            },
            ParentRef::Request(id) => match state.requests.get_mut(id.as_str()) {
                Some(r) => (&mut r.status, &mut r.assigned_professional_id, &mut r.updated_at),
                None => return Ok(false),
            },
        };
        if !from.contains(status) {
            return Ok(false);
        }
        *status = to;
        if let Some(pro) = assigned {
            *assigned_slot = Some(pro.clone());
        }
        *updated_at = now;
        Ok(true)
    }

    async fn insert_proposal(&self, proposal: &Proposal) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if state
            .proposals
            .iter()
            .any(|p| p.kind() == proposal.kind() && p.id == proposal.id)
        {
            return Err(StoreError::Duplicate(format!("proposal {}", proposal.id)));
        }
        let has_open = state.proposals.iter().any(|p| {
            p.parent == proposal.parent
                && p.professional_id == proposal.professional_id
                && !p.status.is_terminal()
        });
        if has_open {
            return Ok(false);
        }
        state.proposals.push(proposal.clone());
        Ok(true)
    }

    async fn get_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
    ) -> Result<Option<Proposal>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .proposals
            .iter()
            .find(|p| p.kind() == kind && &p.id == id)
            .cloned())
    }

    async fn list_proposals(&self, parent: &ParentRef) -> Result<Vec<Proposal>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .proposals
            .iter()
            .filter(|p| &p.parent == parent)
            .cloned()
            .collect())
    }

    async fn update_proposal_status(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        to: ProposalStatus,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if to == ProposalStatus::Rejected {
            if let Some(limit) = state.failures.reject_after {
                if state.rejections >= limit {
                    return Err(StoreError::Unavailable(format!("reject proposal {}", id)));
                }
            }
        }
        let applied = match state.proposal_mut(kind, id) {
            Some(p) if from.contains(&p.status) => {
                p.status = to;
                p.updated_at = TimeMs::now();
                true
            }
            _ => false,
        };
        if applied && to == ProposalStatus::Rejected {
            state.rejections += 1;
        }
        Ok(applied)
    }

    async fn award_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        to: ProposalStatus,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let parent = match state.proposal_mut(kind, id) {
            Some(p) if from.contains(&p.status) => p.parent.clone(),
            _ => return Ok(false),
        };
        let sibling_awarded = state
            .proposals
            .iter()
            .any(|p| p.parent == parent && &p.id != id && p.status.holds_award());
        if sibling_awarded {
            return Ok(false);
        }
        if let Some(p) = state.proposal_mut(kind, id) {
            p.status = to;
            p.updated_at = TimeMs::now();
        }
        Ok(true)
    }

    async fn schedule_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        scheduled_at: TimeMs,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.proposal_mut(kind, id) {
            Some(p) if from.contains(&p.status) => {
                p.status = ProposalStatus::Scheduled;
                p.scheduled_at = Some(scheduled_at);
                p.updated_at = TimeMs::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        final_amount: Decimal,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if state.failures.proposal_completion {
            return Err(StoreError::Unavailable(format!("complete proposal {}", id)));
        }
        match state.proposal_mut(kind, id) {
            Some(p) if from.contains(&p.status) => {
                p.status = ProposalStatus::Completed;
                p.final_amount = Some(final_amount);
                p.updated_at = TimeMs::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_payment(&self, payment: &PaymentRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.failures.payment_insert {
            return Err(StoreError::Unavailable(format!(
                "insert payment for {}",
                payment.proposal_id
            )));
        }
        let exists = state
            .payments
            .iter()
            .any(|p| p.kind == payment.kind && p.proposal_id == payment.proposal_id);
        if exists {
            return Err(StoreError::Duplicate(format!(
                "payment for proposal {}",
                payment.proposal_id
            )));
        }
        state.payments.push(payment.clone());
        Ok(())
    }

    async fn get_payment_for_proposal(
        &self,
        kind: ProposalKind,
        proposal_id: &ProposalId,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .payments
            .iter()
            .find(|p| p.kind == kind && &p.proposal_id == proposal_id)
            .cloned())
    }
}
