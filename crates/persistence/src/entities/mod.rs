//! Database entity definitions.
//!
//! Entities map database rows one to one; conversions into domain models
//! live next to them.

pub mod activity_log;
pub mod blacklist;
pub mod complaint;
pub mod contract;
pub mod notification;
pub mod partner;
pub mod renewal;
pub mod report;
pub mod revenue;
pub mod user;

pub use activity_log::ActivityLogEntity;
pub use blacklist::SenderBlacklistEntity;
pub use complaint::{
    ComplaintCommentEntity, ComplaintEntity, ComplaintSnapshotEntity, ComplaintStatusHistoryEntity,
    DailyCountEntity,
};
pub use contract::{ContractEntity, ExpiringContractEntity, ExpiryCandidateEntity};
pub use notification::NotificationEntity;
pub use partner::{
    HumanitarianOrgEntity, NameIdEntity, ParkingServiceEntity, ProviderEntity, ServiceEntity,
};
pub use renewal::{RenewalEntity, RenewalListEntity, RenewalLockEntity};
pub use report::ScheduledReportEntity;
pub use revenue::{PeriodTotalsEntity, RevenueRowEntity, UpsertOutcomeEntity};
pub use user::{RecipientEntity, UserEntity};
