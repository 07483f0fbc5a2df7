pub mod commission;
pub mod health;
pub mod listings;
pub mod notifications;
pub mod proposals;

use crate::db::Repository;
use crate::domain::{Decimal, IdentityContext, ProfessionalId, ProposalKind};
use crate::engine::{CommissionCalculator, CommissionRates};
use crate::error::AppError;
use crate::notify::Notifier;
use crate::orchestration::{ListingService, ProposalResolver, WorkSettlement};
use crate::store::MarketStore;
use axum::http::HeaderMap;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Header carrying the caller's professional id. Token verification happens
/// upstream of this service.
pub const IDENTITY_HEADER: &str = "x-professional-id";

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub listings: Arc<ListingService>,
    pub resolver: Arc<ProposalResolver>,
    pub settlement: Arc<WorkSettlement>,
}

impl AppState {
    /// Wire the workflows over one repository, which also records notifications.
    pub fn new(repo: Arc<Repository>, rates: CommissionRates) -> Self {
        let store: Arc<dyn MarketStore> = repo.clone();
        let notifier: Arc<dyn Notifier> = repo.clone();

        Self {
            listings: Arc::new(ListingService::new(store.clone(), notifier.clone())),
            resolver: Arc::new(ProposalResolver::new(store.clone(), notifier.clone())),
            settlement: Arc::new(WorkSettlement::new(
                store,
                notifier,
                CommissionCalculator::new(rates),
            )),
            repo,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/leads", post(listings::create_lead))
        .route("/v1/leads/:id", get(listings::get_lead))
        .route("/v1/leads/:id/cancel", post(listings::cancel_lead))
        .route(
            "/v1/leads/:id/proposals",
            post(listings::submit_lead_proposal).get(listings::list_lead_proposals),
        )
        .route("/v1/requests", post(listings::create_request))
        .route("/v1/requests/:id", get(listings::get_request))
        .route("/v1/requests/:id/cancel", post(listings::cancel_request))
        .route(
            "/v1/requests/:id/quotes",
            post(listings::submit_quote).get(listings::list_quotes),
        )
        .route(
            "/v1/proposals/:kind/:id/accept",
            post(proposals::accept_proposal),
        )
        .route(
            "/v1/proposals/:kind/:id/reject",
            post(proposals::reject_proposal),
        )
        .route(
            "/v1/proposals/:kind/:id/reconsider",
            post(proposals::reconsider_proposal),
        )
        .route(
            "/v1/proposals/:kind/:id/schedule",
            post(proposals::schedule_work),
        )
        .route(
            "/v1/proposals/:kind/:id/complete",
            post(proposals::complete_work),
        )
        .route(
            "/v1/proposals/:kind/:id/payment",
            get(proposals::get_payment),
        )
        .route("/v1/commission/preview", get(commission::preview_commission))
        .route("/v1/notifications", get(notifications::list_notifications))
        .layer(cors)
        .with_state(state)
}

/// Build the caller identity from request headers. A missing or blank header
/// yields an anonymous caller; workflows decide whether that is allowed.
pub(crate) fn identity_from_headers(headers: &HeaderMap) -> IdentityContext {
    headers
        .get(IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| IdentityContext::professional(ProfessionalId::new(v)))
        .unwrap_or_default()
}

pub(crate) fn parse_kind(raw: &str) -> Result<ProposalKind, AppError> {
    raw.parse::<ProposalKind>().map_err(AppError::BadRequest)
}

/// Money arrives as a decimal string so it never passes through f64.
pub(crate) fn parse_money(field: &str, raw: &str) -> Result<Decimal, AppError> {
    Decimal::from_str_canonical(raw)
        .map_err(|_| AppError::BadRequest(format!("{} must be a decimal string", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_identity_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(identity_from_headers(&headers), IdentityContext::anonymous());

        headers.insert(IDENTITY_HEADER, HeaderValue::from_static("   "));
        assert_eq!(identity_from_headers(&headers), IdentityContext::anonymous());

        headers.insert(IDENTITY_HEADER, HeaderValue::from_static(" pro-7 "));
        assert_eq!(
            identity_from_headers(&headers).professional_id(),
            Some(&ProfessionalId::new("pro-7"))
        );
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("quotes").unwrap(), ProposalKind::Request);
        assert_eq!(parse_kind("lead").unwrap(), ProposalKind::Lead);
        assert!(matches!(parse_kind("invoice"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(
            parse_money("finalAmount", " 1000.50 ").unwrap().to_canonical_string(),
            "1000.5"
        );
        assert!(matches!(
            parse_money("finalAmount", "1e3x"),
            Err(AppError::BadRequest(_))
        ));
    }
}
