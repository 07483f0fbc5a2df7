use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::listings::ProposalDto;
use super::{identity_from_headers, parse_kind, parse_money, AppState};
use crate::domain::{PaymentRecord, ProposalId, ProposalStatus, TimeMs};
use crate::error::AppError;
use crate::orchestration::{AcceptOutcome, CompleteWork, SettlementReceipt};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBody {
    pub scheduled_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteBody {
    pub final_amount: String,
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub success: bool,
    pub proposal_id: String,
    pub status: String,
    pub rejected_others: bool,
    pub rejected: Vec<String>,
    pub already_awarded: bool,
}

impl From<AcceptOutcome> for AcceptResponse {
    fn from(outcome: AcceptOutcome) -> Self {
        Self {
            success: true,
            rejected_others: outcome.rejected_others(),
            proposal_id: outcome.proposal_id.to_string(),
            status: outcome.status.to_string(),
            rejected: outcome.rejected.iter().map(ProposalId::to_string).collect(),
            already_awarded: outcome.already_awarded,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectResponse {
    pub proposal_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub payment_id: String,
    pub final_amount: String,
    pub referrer_share_pct: String,
    pub platform_commission: String,
    pub referrer_commission: String,
    pub professional_net: String,
    pub listing_completed: bool,
    pub reused_payment: bool,
}

impl From<SettlementReceipt> for SettlementResponse {
    fn from(receipt: SettlementReceipt) -> Self {
        let split = receipt.split;
        Self {
            payment_id: receipt.payment_id.to_string(),
            final_amount: split.final_amount.to_canonical_string(),
            referrer_share_pct: split.referrer_share_pct.to_canonical_string(),
            platform_commission: split.platform_commission.to_currency_string(),
            referrer_commission: split.referrer_commission.to_currency_string(),
            professional_net: split.professional_net.to_currency_string(),
            listing_completed: receipt.listing_completed,
            reused_payment: receipt.reused_payment,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub id: String,
    pub proposal_id: String,
    pub kind: String,
    pub professional_id: String,
    pub final_amount: String,
    pub payment_method: String,
    pub referrer_share_pct: String,
    pub platform_commission: String,
    pub referrer_commission: String,
    pub professional_net: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
}

impl From<PaymentRecord> for PaymentDto {
    fn from(p: PaymentRecord) -> Self {
        Self {
            id: p.id.to_string(),
            proposal_id: p.proposal_id.to_string(),
            kind: p.kind.to_string(),
            professional_id: p.professional_id.to_string(),
            final_amount: p.final_amount.to_canonical_string(),
            payment_method: p.payment_method,
            referrer_share_pct: p.referrer_share_pct.to_canonical_string(),
            platform_commission: p.platform_commission.to_currency_string(),
            referrer_commission: p.referrer_commission.to_currency_string(),
            professional_net: p.professional_net.to_currency_string(),
            notes: p.notes,
            created_at: p.created_at.as_ms(),
        }
    }
}

pub async fn accept_proposal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<AcceptResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let identity = identity_from_headers(&headers);
    let outcome = state
        .resolver
        .accept_proposal(&identity, kind, &ProposalId::new(id))
        .await?;

    Ok(Json(outcome.into()))
}

pub async fn reconsider_proposal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<AcceptResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let identity = identity_from_headers(&headers);
    let outcome = state
        .resolver
        .reconsider_proposal(&identity, kind, &ProposalId::new(id))
        .await?;

    Ok(Json(outcome.into()))
}

pub async fn reject_proposal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<RejectResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let identity = identity_from_headers(&headers);
    let proposal_id = ProposalId::new(id);
    state
        .resolver
        .reject_proposal(&identity, kind, &proposal_id)
        .await?;

    Ok(Json(RejectResponse {
        proposal_id: proposal_id.to_string(),
        status: ProposalStatus::Rejected.to_string(),
    }))
}

pub async fn schedule_work(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((kind, id)): Path<(String, String)>,
    Json(body): Json<ScheduleBody>,
) -> Result<Json<ProposalDto>, AppError> {
    let kind = parse_kind(&kind)?;
    if body.scheduled_at <= 0 {
        return Err(AppError::BadRequest(
            "scheduledAt must be a positive epoch millisecond value".into(),
        ));
    }
    let identity = identity_from_headers(&headers);
    let proposal = state
        .settlement
        .schedule_work(
            &identity,
            kind,
            &ProposalId::new(id),
            TimeMs::new(body.scheduled_at),
        )
        .await?;

    Ok(Json(proposal.into()))
}

pub async fn complete_work(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((kind, id)): Path<(String, String)>,
    Json(body): Json<CompleteBody>,
) -> Result<Json<SettlementResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let final_amount = parse_money("finalAmount", &body.final_amount)?;
    if body.payment_method.trim().is_empty() {
        return Err(AppError::BadRequest("paymentMethod is required".into()));
    }
    let identity = identity_from_headers(&headers);

    let receipt = state
        .settlement
        .complete_work(
            &identity,
            CompleteWork {
                kind,
                proposal_id: ProposalId::new(id),
                final_amount,
                payment_method: body.payment_method.trim().to_string(),
                notes: body.notes.filter(|n| !n.trim().is_empty()),
            },
        )
        .await?;

    Ok(Json(receipt.into()))
}

/// Payment for a settled proposal. Visible to the paid professional and to
/// the owner of the listing.
pub async fn get_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<PaymentDto>, AppError> {
    let kind = parse_kind(&kind)?;
    let identity = identity_from_headers(&headers);
    let caller = identity
        .professional_id()
        .ok_or(AppError::Unauthenticated)?;

    let proposal_id = ProposalId::new(id);
    let payment = state.settlement.payment_for(kind, &proposal_id).await?;

    if &payment.professional_id != caller {
        let proposal = state
            .repo
            .get_proposal(kind, &proposal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("proposal {} not found", proposal_id)))?;
        let listing = state.listings.get_listing(&proposal.parent).await?;
        if listing.owner_id() != caller {
            return Err(AppError::Forbidden(
                "only the paid professional or the listing owner can view this payment".into(),
            ));
        }
    }

    Ok(Json(payment.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, PaymentId};
    use crate::engine::CommissionSplit;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_settlement_response_uses_currency_precision() {
        let receipt = SettlementReceipt {
            payment_id: PaymentId::new("pay1"),
            split: CommissionSplit {
                final_amount: d("1000"),
                referrer_share_pct: d("10"),
                platform_commission: d("50"),
                referrer_commission: d("100"),
                professional_net: d("850"),
            },
            listing_completed: true,
            reused_payment: false,
        };
        let json = serde_json::to_value(SettlementResponse::from(receipt)).unwrap();
        assert_eq!(json["paymentId"], "pay1");
        assert_eq!(json["platformCommission"], "50.00");
        assert_eq!(json["referrerCommission"], "100.00");
        assert_eq!(json["professionalNet"], "850.00");
        assert_eq!(json["listingCompleted"], true);
    }

    #[test]
    fn test_accept_response_lists_rejected() {
        let outcome = AcceptOutcome {
            proposal_id: ProposalId::new("p1"),
            status: ProposalStatus::Accepted,
            rejected: vec![ProposalId::new("p2"), ProposalId::new("p3")],
            already_awarded: false,
        };
        let json = serde_json::to_value(AcceptResponse::from(outcome)).unwrap();
        assert_eq!(json["status"], "accepted");
        assert_eq!(json["success"], true);
        assert_eq!(json["rejectedOthers"], true);
        assert_eq!(json["rejected"], serde_json::json!(["p2", "p3"]));
        assert_eq!(json["alreadyAwarded"], false);
    }

    #[test]
    fn test_accept_response_without_competitors() {
        let outcome = AcceptOutcome {
            proposal_id: ProposalId::new("q1"),
            status: ProposalStatus::Approved,
            rejected: Vec::new(),
            already_awarded: true,
        };
        let json = serde_json::to_value(AcceptResponse::from(outcome)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["rejectedOthers"], false);
        assert_eq!(json["status"], "approved");
    }
}
