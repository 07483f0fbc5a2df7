pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod notify;
pub mod orchestration;
pub mod store;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Decimal, IdentityContext, Lead, LeadStatus, ParentRef, PaymentRecord, ProfessionalId,
    Proposal, ProposalId, ProposalKind, ProposalStatus, Request, TimeMs,
};
pub use engine::{CommissionCalculator, CommissionRates, CommissionSplit};
pub use error::AppError;
pub use orchestration::{ListingService, ProposalResolver, WorkSettlement, WorkflowError};
pub use store::{MarketStore, MemoryStore, StoreError};
