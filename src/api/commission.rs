use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_kind, parse_money, AppState};
use crate::domain::{Decimal, ProposalKind};
use crate::error::AppError;
use crate::orchestration::WorkflowError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    pub amount: String,
    pub kind: String,
    /// Lead referrer share; defaults to the configured share for leads.
    pub referrer_share_pct: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub kind: String,
    pub platform_rate_pct: String,
    pub final_amount: String,
    pub referrer_share_pct: String,
    pub platform_commission: String,
    pub referrer_commission: String,
    pub professional_net: String,
}

pub async fn preview_commission(
    Query(params): Query<PreviewQuery>,
    State(state): State<AppState>,
) -> Result<Json<PreviewResponse>, AppError> {
    let kind = parse_kind(&params.kind)?;
    let amount = parse_money("amount", &params.amount)?;
    let calculator = state.settlement.calculator();

    let share = match (kind, params.referrer_share_pct.as_deref()) {
        (ProposalKind::Request, _) => Decimal::zero(),
        (ProposalKind::Lead, Some(raw)) => parse_money("referrerSharePct", raw)?,
        (ProposalKind::Lead, None) => calculator.rates().resolve_referrer_share(None),
    };

    let split = calculator
        .split(amount, share, kind)
        .map_err(WorkflowError::from)?;

    Ok(Json(PreviewResponse {
        kind: kind.to_string(),
        platform_rate_pct: calculator.rates().platform_pct(kind).to_canonical_string(),
        final_amount: split.final_amount.to_canonical_string(),
        referrer_share_pct: split.referrer_share_pct.to_canonical_string(),
        platform_commission: split.platform_commission.to_currency_string(),
        referrer_commission: split.referrer_commission.to_currency_string(),
        professional_net: split.professional_net.to_currency_string(),
    }))
}
