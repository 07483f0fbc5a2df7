//! End-to-end workflow tests over the in-memory store.
//!
//! Covers the accept/reject/complete lifecycle, the money split examples and
//! the failure paths of multi-step sequences.

use proleads::domain::{
    Decimal, IdentityContext, LeadStatus, Listing, NotificationType, ParentRef, ProfessionalId,
    Proposal, ProposalId, ProposalKind, ProposalStatus, TimeMs,
};
use proleads::engine::{CommissionCalculator, CommissionRates};
use proleads::notify::{Notifier, RecordingNotifier};
use proleads::orchestration::{
    CompleteWork, ListingService, NewLead, NewProposal, NewRequest, ProposalResolver,
    WorkSettlement, WorkflowError,
};
use proleads::store::{FailurePlan, MarketStore, MemoryStore};
use std::sync::Arc;

struct Harness {
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    listings: ListingService,
    resolver: ProposalResolver,
    settlement: WorkSettlement,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let dyn_store: Arc<dyn MarketStore> = store.clone();
    let dyn_notifier: Arc<dyn Notifier> = notifier.clone();

    Harness {
        listings: ListingService::new(dyn_store.clone(), dyn_notifier.clone()),
        resolver: ProposalResolver::new(dyn_store.clone(), dyn_notifier.clone()),
        settlement: WorkSettlement::new(
            dyn_store,
            dyn_notifier,
            CommissionCalculator::new(CommissionRates::default()),
        ),
        store,
        notifier,
    }
}

fn as_pro(id: &str) -> IdentityContext {
    IdentityContext::professional(ProfessionalId::new(id))
}

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

const OWNER: &str = "referrer";

async fn lead_with_bids(h: &Harness, share: Option<u8>, bidders: &[&str]) -> (ParentRef, Vec<ProposalId>) {
    let lead = h
        .listings
        .create_lead(
            &as_pro(OWNER),
            NewLead {
                title: "Kitchen renovation".into(),
                description: "Full remodel".into(),
                location: "Haifa".into(),
                budget: Some(d("20000")),
                referrer_share_pct: share,
            },
        )
        .await
        .unwrap();
    let parent = ParentRef::Lead(lead.id);

    let mut ids = Vec::new();
    for bidder in bidders {
        let proposal = h
            .listings
            .submit_proposal(
                &as_pro(bidder),
                &parent,
                NewProposal {
                    price: Some(d("1000")),
                    description: format!("Bid from {}", bidder),
                },
            )
            .await
            .unwrap();
        ids.push(proposal.id);
    }
    (parent, ids)
}

async fn status_of(h: &Harness, kind: ProposalKind, id: &ProposalId) -> ProposalStatus {
    h.store.get_proposal(kind, id).await.unwrap().unwrap().status
}

async fn listing_status(h: &Harness, parent: &ParentRef) -> LeadStatus {
    h.store.get_listing(parent).await.unwrap().unwrap().status()
}

fn complete_cmd(kind: ProposalKind, id: &ProposalId, amount: &str) -> CompleteWork {
    CompleteWork {
        kind,
        proposal_id: id.clone(),
        final_amount: d(amount),
        payment_method: "cash".into(),
        notes: None,
    }
}

#[tokio::test]
async fn test_accept_rejects_every_pending_competitor() {
    let h = harness();
    let (parent, ids) = lead_with_bids(&h, Some(15), &["pro-a", "pro-b", "pro-c"]).await;

    let outcome = h
        .resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();
    assert_eq!(outcome.status, ProposalStatus::Accepted);
    assert_eq!(outcome.rejected, vec![ids[1].clone(), ids[2].clone()]);
    assert!(!outcome.already_awarded);

    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[0]).await, ProposalStatus::Accepted);
    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[1]).await, ProposalStatus::Rejected);
    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[2]).await, ProposalStatus::Rejected);

    let listing = h.store.get_listing(&parent).await.unwrap().unwrap();
    assert_eq!(listing.status(), LeadStatus::Approved);
    match listing {
        Listing::Lead(lead) => {
            assert_eq!(lead.assigned_professional_id, Some(ProfessionalId::new("pro-a")))
        }
        Listing::Request(_) => panic!("expected a lead"),
    }

    let losers = h.notifier.sent_to(&ProfessionalId::new("pro-b")).await;
    assert!(losers
        .iter()
        .any(|n| n.notification_type == NotificationType::ProposalRejected));
    let winner = h.notifier.sent_to(&ProfessionalId::new("pro-a")).await;
    assert!(winner
        .iter()
        .any(|n| n.notification_type == NotificationType::ProposalAccepted));
}

#[tokio::test]
async fn test_second_accept_conflicts_and_changes_nothing() {
    let h = harness();
    let (_parent, ids) = lead_with_bids(&h, Some(10), &["pro-a", "pro-b"]).await;

    h.resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();

    let err = h
        .resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[1])
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Conflict(_)));
    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[0]).await, ProposalStatus::Accepted);
    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[1]).await, ProposalStatus::Rejected);
}

#[tokio::test]
async fn test_repeat_accept_of_winner_is_a_no_op() {
    let h = harness();
    let (_parent, ids) = lead_with_bids(&h, None, &["pro-a", "pro-b"]).await;

    h.resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();
    let again = h
        .resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();

    assert!(again.already_awarded);
    assert!(again.rejected.is_empty());
    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[1]).await, ProposalStatus::Rejected);
}

#[tokio::test]
async fn test_only_owner_may_accept() {
    let h = harness();
    let (_parent, ids) = lead_with_bids(&h, None, &["pro-a", "pro-b"]).await;

    let err = h
        .resolver
        .accept_proposal(&as_pro("pro-b"), ProposalKind::Lead, &ids[0])
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));

    let err = h
        .resolver
        .accept_proposal(&IdentityContext::anonymous(), ProposalKind::Lead, &ids[0])
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthenticated));

    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[0]).await, ProposalStatus::Pending);
}

#[tokio::test]
async fn test_lead_commission_example() {
    let h = harness();
    let (parent, ids) = lead_with_bids(&h, Some(15), &["pro-a"]).await;
    h.resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();

    let receipt = h
        .settlement
        .complete_work(&as_pro("pro-a"), complete_cmd(ProposalKind::Lead, &ids[0], "1000"))
        .await
        .unwrap();

    assert_eq!(receipt.split.platform_commission, d("50.00"));
    assert_eq!(receipt.split.referrer_commission, d("150.00"));
    assert_eq!(receipt.split.professional_net, d("800.00"));
    assert!(receipt.listing_completed);
    assert!(!receipt.reused_payment);

    assert_eq!(listing_status(&h, &parent).await, LeadStatus::Completed);
    let proposal = h
        .store
        .get_proposal(ProposalKind::Lead, &ids[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(proposal.status, ProposalStatus::Completed);
    assert_eq!(proposal.final_amount, Some(d("1000")));

    let referrer = h.notifier.sent_to(&ProfessionalId::new(OWNER)).await;
    assert!(referrer
        .iter()
        .any(|n| n.notification_type == NotificationType::ReferralCommission));
}

#[tokio::test]
async fn test_request_commission_example() {
    let h = harness();
    let request = h
        .listings
        .create_request(
            &as_pro("client"),
            NewRequest {
                title: "Fix leaking tap".into(),
                description: String::new(),
                location: "Eilat".into(),
            },
        )
        .await
        .unwrap();
    let parent = ParentRef::Request(request.id);
    let quote = h
        .listings
        .submit_proposal(
            &as_pro("plumber"),
            &parent,
            NewProposal {
                price: Some(d("500")),
                description: "Same day".into(),
            },
        )
        .await
        .unwrap();

    let outcome = h
        .resolver
        .accept_proposal(&as_pro("client"), ProposalKind::Request, &quote.id)
        .await
        .unwrap();
    assert_eq!(outcome.status, ProposalStatus::Approved);

    let receipt = h
        .settlement
        .complete_work(
            &as_pro("plumber"),
            complete_cmd(ProposalKind::Request, &quote.id, "500"),
        )
        .await
        .unwrap();
    assert_eq!(receipt.split.platform_commission, d("50.00"));
    assert!(receipt.split.referrer_commission.is_zero());
    assert_eq!(receipt.split.professional_net, d("450.00"));
    assert!(!receipt.listing_completed);
    assert_eq!(listing_status(&h, &parent).await, LeadStatus::Approved);
}

#[tokio::test]
async fn test_complete_requires_awarded_status() {
    let h = harness();
    let (_parent, ids) = lead_with_bids(&h, Some(10), &["pro-a", "pro-b"]).await;

    let err = h
        .settlement
        .complete_work(&as_pro("pro-a"), complete_cmd(ProposalKind::Lead, &ids[0], "800"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));

    h.resolver
        .reject_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[1])
        .await
        .unwrap();
    let err = h
        .settlement
        .complete_work(&as_pro("pro-b"), complete_cmd(ProposalKind::Lead, &ids[1], "800"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));

    assert!(h.store.payments().await.is_empty());
}

#[tokio::test]
async fn test_complete_by_someone_else_is_forbidden() {
    let h = harness();
    let (_parent, ids) = lead_with_bids(&h, Some(10), &["pro-a"]).await;
    h.resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();

    let err = h
        .settlement
        .complete_work(&as_pro("intruder"), complete_cmd(ProposalKind::Lead, &ids[0], "800"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));
    assert!(h.store.payments().await.is_empty());
}

#[tokio::test]
async fn test_lead_stays_approved_while_a_sibling_is_open() {
    let h = harness();
    let (parent, ids) = lead_with_bids(&h, Some(10), &["pro-a"]).await;
    h.resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();

    // A late bid that slipped in after approval.
    let late = Proposal {
        id: ProposalId::new("late"),
        parent: parent.clone(),
        professional_id: ProfessionalId::new("pro-late"),
        price: None,
        description: "Late".into(),
        status: ProposalStatus::Pending,
        scheduled_at: None,
        final_amount: None,
        created_at: TimeMs::now(),
        updated_at: TimeMs::now(),
    };
    assert!(h.store.insert_proposal(&late).await.unwrap());

    let receipt = h
        .settlement
        .complete_work(&as_pro("pro-a"), complete_cmd(ProposalKind::Lead, &ids[0], "1200"))
        .await
        .unwrap();
    assert!(!receipt.listing_completed);
    assert_eq!(listing_status(&h, &parent).await, LeadStatus::Approved);
}

#[tokio::test]
async fn test_scheduled_work_can_be_completed() {
    let h = harness();
    let (_parent, ids) = lead_with_bids(&h, Some(5), &["pro-a"]).await;
    h.resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();

    let scheduled = h
        .settlement
        .schedule_work(&as_pro("pro-a"), ProposalKind::Lead, &ids[0], TimeMs::new(1_800_000_000_000))
        .await
        .unwrap();
    assert_eq!(scheduled.status, ProposalStatus::Scheduled);
    assert_eq!(scheduled.scheduled_at, Some(TimeMs::new(1_800_000_000_000)));

    let receipt = h
        .settlement
        .complete_work(&as_pro("pro-a"), complete_cmd(ProposalKind::Lead, &ids[0], "333.33"))
        .await
        .unwrap();
    assert_eq!(receipt.split.total(), d("333.33"));
}

#[tokio::test]
async fn test_settlement_retry_reuses_payment() {
    let h = harness();
    let (_parent, ids) = lead_with_bids(&h, Some(10), &["pro-a"]).await;
    h.resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();

    h.store
        .set_failures(FailurePlan {
            proposal_completion: true,
            ..FailurePlan::default()
        })
        .await;
    let first = h
        .settlement
        .complete_work(&as_pro("pro-a"), complete_cmd(ProposalKind::Lead, &ids[0], "900"))
        .await
        .unwrap();
    assert!(!first.reused_payment);
    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[0]).await, ProposalStatus::Accepted);

    h.store.set_failures(FailurePlan::default()).await;
    let second = h
        .settlement
        .complete_work(&as_pro("pro-a"), complete_cmd(ProposalKind::Lead, &ids[0], "900"))
        .await
        .unwrap();
    assert!(second.reused_payment);
    assert_eq!(second.payment_id, first.payment_id);
    assert_eq!(h.store.payments().await.len(), 1);
    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[0]).await, ProposalStatus::Completed);
}

#[tokio::test]
async fn test_payment_failure_surfaces_and_leaves_proposal_open() {
    let h = harness();
    let (_parent, ids) = lead_with_bids(&h, Some(10), &["pro-a"]).await;
    h.resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();

    h.store
        .set_failures(FailurePlan {
            payment_insert: true,
            ..FailurePlan::default()
        })
        .await;
    let err = h
        .settlement
        .complete_work(&as_pro("pro-a"), complete_cmd(ProposalKind::Lead, &ids[0], "900"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Persistence(_)));
    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[0]).await, ProposalStatus::Accepted);
}

#[tokio::test]
async fn test_partial_rejection_is_reported_and_retry_finishes() {
    let h = harness();
    let (parent, ids) = lead_with_bids(&h, None, &["pro-a", "pro-b", "pro-c"]).await;

    h.store
        .set_failures(FailurePlan {
            reject_after: Some(1),
            ..FailurePlan::default()
        })
        .await;
    let err = h
        .resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap_err();
    match err {
        WorkflowError::PartialFailure { rejected, .. } => assert_eq!(rejected, vec![ids[1].clone()]),
        other => panic!("expected PartialFailure, got {:?}", other),
    }
    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[0]).await, ProposalStatus::Accepted);
    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[2]).await, ProposalStatus::Pending);

    h.store.set_failures(FailurePlan::default()).await;
    let outcome = h
        .resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();
    assert!(outcome.already_awarded);
    assert_eq!(outcome.rejected, vec![ids[2].clone()]);
    assert_eq!(listing_status(&h, &parent).await, LeadStatus::Approved);
}

#[tokio::test]
async fn test_notification_failures_do_not_fail_workflows() {
    let h = harness();
    let (_parent, ids) = lead_with_bids(&h, Some(20), &["pro-a", "pro-b"]).await;
    h.notifier.set_failing(true);

    h.resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();
    let receipt = h
        .settlement
        .complete_work(&as_pro("pro-a"), complete_cmd(ProposalKind::Lead, &ids[0], "100"))
        .await
        .unwrap();
    assert_eq!(receipt.split.referrer_commission, d("20.00"));
}

#[tokio::test]
async fn test_reconsider_turns_rejected_bid_into_winner() {
    let h = harness();
    let (_parent, ids) = lead_with_bids(&h, None, &["pro-a", "pro-b"]).await;

    h.resolver
        .reject_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();
    let outcome = h
        .resolver
        .reconsider_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();
    assert_eq!(outcome.status, ProposalStatus::Accepted);
    assert_eq!(outcome.rejected, vec![ids[1].clone()]);

    // With a winner in place, reconsidering the loser conflicts.
    let err = h
        .resolver
        .reconsider_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[1])
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Conflict(_)));
}

#[tokio::test]
async fn test_cancel_lead_rejects_pending_and_blocks_bids() {
    let h = harness();
    let (parent, ids) = lead_with_bids(&h, None, &["pro-a", "pro-b"]).await;

    let err = h
        .listings
        .cancel_listing(&as_pro("pro-a"), &parent)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));

    let rejected = h.listings.cancel_listing(&as_pro(OWNER), &parent).await.unwrap();
    assert_eq!(rejected, ids);
    assert_eq!(listing_status(&h, &parent).await, LeadStatus::Cancelled);

    let err = h
        .listings
        .submit_proposal(
            &as_pro("pro-c"),
            &parent,
            NewProposal {
                price: None,
                description: "Too late".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));
}

#[tokio::test]
async fn test_awarded_lead_cannot_be_cancelled_and_still_settles() {
    let h = harness();
    let (parent, ids) = lead_with_bids(&h, Some(15), &["pro-a"]).await;
    h.resolver
        .accept_proposal(&as_pro(OWNER), ProposalKind::Lead, &ids[0])
        .await
        .unwrap();

    let err = h
        .listings
        .cancel_listing(&as_pro(OWNER), &parent)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));
    assert_eq!(listing_status(&h, &parent).await, LeadStatus::Approved);
    assert_eq!(status_of(&h, ProposalKind::Lead, &ids[0]).await, ProposalStatus::Accepted);

    let receipt = h
        .settlement
        .complete_work(&as_pro("pro-a"), complete_cmd(ProposalKind::Lead, &ids[0], "1000"))
        .await
        .unwrap();
    assert_eq!(receipt.split.referrer_commission, d("150"));
    assert!(receipt.listing_completed);
    assert_eq!(listing_status(&h, &parent).await, LeadStatus::Completed);
    assert_eq!(h.store.payments().await.len(), 1);
}

#[tokio::test]
async fn test_duplicate_open_bid_conflicts() {
    let h = harness();
    let (parent, _ids) = lead_with_bids(&h, None, &["pro-a"]).await;

    let err = h
        .listings
        .submit_proposal(
            &as_pro("pro-a"),
            &parent,
            NewProposal {
                price: Some(d("950")),
                description: "Lower offer".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Conflict(_)));
}
