//! Repository implementations for database operations.

mod filter;

pub mod activity_log;
pub mod blacklist;
pub mod complaint;
pub mod contract;
pub mod humanitarian_org;
pub mod notification;
pub mod parking_service;
pub mod provider;
pub mod renewal;
pub mod report;
pub mod revenue;
pub mod service;
pub mod user;

pub use activity_log::ActivityLogRepository;
pub use blacklist::BlacklistRepository;
pub use complaint::ComplaintRepository;
pub use contract::ContractRepository;
pub use humanitarian_org::HumanitarianOrgRepository;
pub use notification::{NewNotification, NotificationRepository};
pub use parking_service::{ImportedFile, ParkingServiceRepository};
pub use provider::ProviderRepository;
pub use renewal::{
    BulkRenewalDeletion, CreatedRenewal, NewRenewal, RenewalChange, RenewalDeletion,
    RenewalRepository, RenewalScope, RenewalUpdate,
};
pub use report::ScheduledReportRepository;
pub use revenue::{
    BulkServiceRepository, ParkingTransactionRepository, RevenueFilter, UpsertOutcome,
    VasServiceRepository,
};
pub use service::ServiceRepository;
pub use user::UserRepository;
