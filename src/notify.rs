//! Notification sink. Notifications are informational: emitting one never
//! decides whether a workflow succeeded.

use crate::domain::{Notification, ProfessionalId};
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}

/// Send a notification, logging and swallowing any failure.
pub async fn emit(notifier: &dyn Notifier, notification: Notification) {
    if let Err(e) = notifier.notify(&notification).await {
        warn!(
            professional_id = %notification.professional_id,
            notification_type = %notification.notification_type,
            related_id = %notification.related_id,
            error = %e,
            "Failed to emit notification"
        );
    }
}

/// Keeps every notification in memory. Can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, professional_id: &ProfessionalId) -> Vec<Notification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| &n.professional_id == professional_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Unavailable("recording notifier set to fail".into()));
        }
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NotificationType, RelatedType};

    fn sample() -> Notification {
        Notification::new(
            ProfessionalId::new("pro-1"),
            "Proposal accepted",
            "Your proposal was accepted",
            NotificationType::ProposalAccepted,
            "p1",
            RelatedType::Proposal,
        )
    }

    #[tokio::test]
    async fn test_emit_records_notification() {
        let notifier = RecordingNotifier::new();
        emit(&notifier, sample()).await;
        let sent = notifier.sent_to(&ProfessionalId::new("pro-1")).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].notification_type, NotificationType::ProposalAccepted);
    }

    #[tokio::test]
    async fn test_emit_swallows_failures() {
        let notifier = RecordingNotifier::new();
        notifier.set_failing(true);
        emit(&notifier, sample()).await;
        assert!(notifier.sent().await.is_empty());
    }
}
