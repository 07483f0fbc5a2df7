//! Informational records read by the notification surface.

use crate::domain::{NotificationId, ProfessionalId, TimeMs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ProposalReceived,
    ProposalAccepted,
    ProposalRejected,
    WorkScheduled,
    WorkCompleted,
    ReferralCommission,
    LeadCompleted,
    LeadCancelled,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::ProposalReceived => "proposal_received",
            NotificationType::ProposalAccepted => "proposal_accepted",
            NotificationType::ProposalRejected => "proposal_rejected",
            NotificationType::WorkScheduled => "work_scheduled",
            NotificationType::WorkCompleted => "work_completed",
            NotificationType::ReferralCommission => "referral_commission",
            NotificationType::LeadCompleted => "lead_completed",
            NotificationType::LeadCancelled => "lead_cancelled",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposal_received" => Ok(NotificationType::ProposalReceived),
            "proposal_accepted" => Ok(NotificationType::ProposalAccepted),
            "proposal_rejected" => Ok(NotificationType::ProposalRejected),
            "work_scheduled" => Ok(NotificationType::WorkScheduled),
            "work_completed" => Ok(NotificationType::WorkCompleted),
            "referral_commission" => Ok(NotificationType::ReferralCommission),
            "lead_completed" => Ok(NotificationType::LeadCompleted),
            "lead_cancelled" => Ok(NotificationType::LeadCancelled),
            other => Err(format!("unknown notification type: {}", other)),
        }
    }
}

/// What a notification's `related_id` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedType {
    Lead,
    Request,
    Proposal,
    Quote,
    Payment,
}

impl RelatedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelatedType::Lead => "lead",
            RelatedType::Request => "request",
            RelatedType::Proposal => "proposal",
            RelatedType::Quote => "quote",
            RelatedType::Payment => "payment",
        }
    }
}

impl FromStr for RelatedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lead" => Ok(RelatedType::Lead),
            "request" => Ok(RelatedType::Request),
            "proposal" => Ok(RelatedType::Proposal),
            "quote" => Ok(RelatedType::Quote),
            "payment" => Ok(RelatedType::Payment),
            other => Err(format!("unknown related type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub professional_id: ProfessionalId,
    pub title: String,
    pub description: String,
    pub notification_type: NotificationType,
    pub related_id: String,
    pub related_type: RelatedType,
    pub created_at: TimeMs,
}

impl Notification {
    pub fn new(
        professional_id: ProfessionalId,
        title: impl Into<String>,
        description: impl Into<String>,
        notification_type: NotificationType,
        related_id: impl Into<String>,
        related_type: RelatedType,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            professional_id,
            title: title.into(),
            description: description.into(),
            notification_type,
            related_id: related_id.into(),
            related_type,
            created_at: TimeMs::now(),
        }
    }
}
