use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{identity_from_headers, AppState};
use crate::domain::Notification;
use crate::error::AppError;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub related_id: String,
    pub related_type: String,
    pub created_at: i64,
}

impl From<Notification> for NotificationDto {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id.to_string(),
            title: n.title,
            description: n.description,
            notification_type: n.notification_type.to_string(),
            related_id: n.related_id,
            related_type: n.related_type.as_str().to_string(),
            created_at: n.created_at.as_ms(),
        }
    }
}

/// The caller's notifications, newest first.
pub async fn list_notifications(
    Query(params): Query<NotificationsQuery>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NotificationsResponse>, AppError> {
    let identity = identity_from_headers(&headers);
    let caller = identity
        .professional_id()
        .ok_or(AppError::Unauthenticated)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let notifications = state
        .repo
        .list_notifications(caller, limit)
        .await?
        .into_iter()
        .map(NotificationDto::from)
        .collect();

    Ok(Json(NotificationsResponse { notifications }))
}
