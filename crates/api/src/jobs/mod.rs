//! Background job scheduler and job implementations.

mod contract_expiry_alert;
mod scheduled_report;
mod scheduler;

pub use contract_expiry_alert::{alert_candidates, ContractExpiryAlertJob};
pub use scheduled_report::ScheduledReportJob;
pub use scheduler::{Job, JobError, JobFrequency, JobScheduler};
