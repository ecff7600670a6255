//! Domain services.
//!
//! Pure business logic over domain models; no I/O beyond the email channel
//! trait.

pub mod activity;
pub mod complaint_stats;
pub mod expiry;
pub mod import;
pub mod notification;
pub mod renewal;
pub mod revenue;

pub use activity::{activity_helpers, ActivityLogBuilder};
pub use complaint_stats::{compute_complaint_statistics, statistics_range, TREND_DAYS};
pub use expiry::{
    build_expiry_timeline, compute_expiry_statistics, sort_expiring, timeline_range, ExpiryWindow,
};
pub use import::{ImportProgress, NoopProgress, RawRow};
pub use notification::{
    plan_delivery, Audience, DeliveryPlan, DeliveryResult, EmailChannel, MockEmailChannel,
    NotificationEvent, Recipient,
};
pub use renewal::{compute_statistics, RenewalSnapshot};
pub use revenue::{aggregate_financials, aggregate_sales, growth, previous_window, resolve_window};
