use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{identity_from_headers, parse_money, AppState};
use crate::domain::{Lead, LeadId, Listing, ParentRef, Proposal, ProposalId, Request, RequestId};
use crate::error::AppError;
use crate::orchestration::{NewLead, NewProposal, NewRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub budget: Option<String>,
    pub referrer_share_pct: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProposalBody {
    pub price: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDto {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_share_pct: Option<u8>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_professional_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Lead> for LeadDto {
    fn from(lead: Lead) -> Self {
        Self {
            id: lead.id.to_string(),
            owner_id: lead.owner_id.to_string(),
            title: lead.title,
            description: lead.description,
            location: lead.location,
            budget: lead.budget.map(|b| b.to_canonical_string()),
            referrer_share_pct: lead.referrer_share_pct,
            status: lead.status.to_string(),
            assigned_professional_id: lead.assigned_professional_id.map(|p| p.to_string()),
            created_at: lead.created_at.as_ms(),
            updated_at: lead.updated_at.as_ms(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDto {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_professional_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Request> for RequestDto {
    fn from(request: Request) -> Self {
        Self {
            id: request.id.to_string(),
            owner_id: request.owner_id.to_string(),
            title: request.title,
            description: request.description,
            location: request.location,
            status: request.status.to_string(),
            assigned_professional_id: request.assigned_professional_id.map(|p| p.to_string()),
            created_at: request.created_at.as_ms(),
            updated_at: request.updated_at.as_ms(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDto {
    pub id: String,
    pub kind: String,
    pub parent_id: String,
    pub professional_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub description: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_amount: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Proposal> for ProposalDto {
    fn from(p: Proposal) -> Self {
        Self {
            kind: p.kind().to_string(),
            parent_id: p.parent.id_str().to_string(),
            id: p.id.to_string(),
            professional_id: p.professional_id.to_string(),
            price: p.price.map(|v| v.to_canonical_string()),
            description: p.description,
            status: p.status.to_string(),
            scheduled_at: p.scheduled_at.map(|t| t.as_ms()),
            final_amount: p.final_amount.map(|v| v.to_canonical_string()),
            created_at: p.created_at.as_ms(),
            updated_at: p.updated_at.as_ms(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalsResponse {
    pub proposals: Vec<ProposalDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub status: String,
    pub rejected: Vec<String>,
}

pub async fn create_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateLeadBody>,
) -> Result<(StatusCode, Json<LeadDto>), AppError> {
    let identity = identity_from_headers(&headers);
    let budget = body
        .budget
        .as_deref()
        .map(|b| parse_money("budget", b))
        .transpose()?;
    let referrer_share_pct = body
        .referrer_share_pct
        .map(|pct| {
            u8::try_from(pct)
                .ok()
                .filter(|v| *v <= 100)
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "referrerSharePct must be between 0 and 100, got {}",
                        pct
                    ))
                })
        })
        .transpose()?;

    let lead = state
        .listings
        .create_lead(
            &identity,
            NewLead {
                title: body.title,
                description: body.description,
                location: body.location,
                budget,
                referrer_share_pct,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(lead.into())))
}

pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LeadDto>, AppError> {
    match state
        .listings
        .get_listing(&ParentRef::Lead(LeadId::new(id)))
        .await?
    {
        Listing::Lead(lead) => Ok(Json(lead.into())),
        Listing::Request(_) => Err(AppError::Internal("store returned a request for a lead".into())),
    }
}

pub async fn cancel_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    cancel(&state, &headers, ParentRef::Lead(LeadId::new(id))).await
}

pub async fn create_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<RequestDto>), AppError> {
    let identity = identity_from_headers(&headers);
    let request = state
        .listings
        .create_request(
            &identity,
            NewRequest {
                title: body.title,
                description: body.description,
                location: body.location,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(request.into())))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RequestDto>, AppError> {
    match state
        .listings
        .get_listing(&ParentRef::Request(RequestId::new(id)))
        .await?
    {
        Listing::Request(request) => Ok(Json(request.into())),
        Listing::Lead(_) => Err(AppError::Internal("store returned a lead for a request".into())),
    }
}

pub async fn cancel_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    cancel(&state, &headers, ParentRef::Request(RequestId::new(id))).await
}

pub async fn submit_lead_proposal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<SubmitProposalBody>,
) -> Result<(StatusCode, Json<ProposalDto>), AppError> {
    submit(&state, &headers, ParentRef::Lead(LeadId::new(id)), body).await
}

pub async fn list_lead_proposals(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProposalsResponse>, AppError> {
    list(&state, ParentRef::Lead(LeadId::new(id))).await
}

pub async fn submit_quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<SubmitProposalBody>,
) -> Result<(StatusCode, Json<ProposalDto>), AppError> {
    submit(&state, &headers, ParentRef::Request(RequestId::new(id)), body).await
}

pub async fn list_quotes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProposalsResponse>, AppError> {
    list(&state, ParentRef::Request(RequestId::new(id))).await
}

async fn submit(
    state: &AppState,
    headers: &HeaderMap,
    parent: ParentRef,
    body: SubmitProposalBody,
) -> Result<(StatusCode, Json<ProposalDto>), AppError> {
    let identity = identity_from_headers(headers);
    let price = body
        .price
        .as_deref()
        .map(|p| parse_money("price", p))
        .transpose()?;

    let proposal = state
        .listings
        .submit_proposal(
            &identity,
            &parent,
            NewProposal {
                price,
                description: body.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(proposal.into())))
}

async fn list(state: &AppState, parent: ParentRef) -> Result<Json<ProposalsResponse>, AppError> {
    let proposals = state
        .listings
        .list_proposals(&parent)
        .await?
        .into_iter()
        .map(ProposalDto::from)
        .collect();

    Ok(Json(ProposalsResponse { proposals }))
}

async fn cancel(
    state: &AppState,
    headers: &HeaderMap,
    parent: ParentRef,
) -> Result<Json<CancelResponse>, AppError> {
    let identity = identity_from_headers(headers);
    let rejected = state.listings.cancel_listing(&identity, &parent).await?;
    let listing = state.listings.get_listing(&parent).await?;

    Ok(Json(CancelResponse {
        status: listing.status().to_string(),
        rejected: rejected.iter().map(ProposalId::to_string).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Decimal, LeadStatus, ProfessionalId, ProposalKind, ProposalStatus, TimeMs,
    };

    #[test]
    fn test_proposal_dto_flattens_parent_and_money() {
        let proposal = Proposal {
            id: ProposalId::new("q1"),
            parent: ParentRef::Request(RequestId::new("r9")),
            professional_id: ProfessionalId::new("pro"),
            price: Some(Decimal::from_str_canonical("120.50").unwrap()),
            description: "Two hours".into(),
            status: ProposalStatus::Approved,
            scheduled_at: None,
            final_amount: None,
            created_at: TimeMs::new(1),
            updated_at: TimeMs::new(2),
        };
        assert_eq!(proposal.kind(), ProposalKind::Request);

        let json = serde_json::to_value(ProposalDto::from(proposal)).unwrap();
        assert_eq!(json["kind"], "request");
        assert_eq!(json["parentId"], "r9");
        assert_eq!(json["price"], "120.5");
        assert_eq!(json["status"], "approved");
        assert!(json.get("finalAmount").is_none());
    }

    #[test]
    fn test_lead_dto_omits_missing_budget() {
        let lead = Lead {
            id: LeadId::new("l1"),
            owner_id: ProfessionalId::new("owner"),
            title: "Paint".into(),
            description: String::new(),
            location: String::new(),
            budget: None,
            referrer_share_pct: Some(15),
            status: LeadStatus::Active,
            assigned_professional_id: None,
            created_at: TimeMs::new(1),
            updated_at: TimeMs::new(1),
        };
        let json = serde_json::to_value(LeadDto::from(lead)).unwrap();
        assert!(json.get("budget").is_none());
        assert_eq!(json["referrerSharePct"], 15);
        assert_eq!(json["status"], "active");
    }
}
