//! HTTP route handlers.

pub mod activity_logs;
pub mod analytics;
pub mod blacklist;
pub mod complaints;
pub mod contracts;
pub mod health;
pub mod humanitarian_orgs;
pub mod humanitarian_renewals;
pub mod imports;
pub mod notifications;
pub mod parking_services;
pub mod providers;
pub mod reports;
