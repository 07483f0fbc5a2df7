//! Domain types for the lead/proposal marketplace.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Domain primitives: TimeMs, record ids, ProposalKind
//! - Lead/Request/Proposal records and their status transition tables
//! - Payment and notification records
//! - The explicit caller IdentityContext

pub mod decimal;
pub mod identity;
pub mod listing;
pub mod notification;
pub mod payment;
pub mod primitives;
pub mod proposal;

pub use decimal::Decimal;
pub use identity::IdentityContext;
pub use listing::{Lead, LeadStatus, Listing, ParentRef, Request};
pub use notification::{Notification, NotificationType, RelatedType};
pub use payment::PaymentRecord;
pub use primitives::{
    IdParseError, LeadId, NotificationId, PaymentId, ProfessionalId, ProposalId, ProposalKind,
    RequestId, TimeMs,
};
pub use proposal::{Proposal, ProposalStatus};
