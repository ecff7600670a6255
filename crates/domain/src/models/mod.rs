//! Domain models for the contract administration backend.

/// Declares a fieldless enum persisted and serialised as an upper-case text code.
///
/// Generates `as_str`, `ALL`, `Display` and `FromStr` (case-insensitive).
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $code)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($code => Ok($name::$variant),)+
                    _ => Err(format!("Unknown {}: {}", stringify!($name), s)),
                }
            }
        }
    };
}

pub mod activity_log;
pub mod blacklist;
pub mod complaint;
pub mod contract;
pub mod import;
pub mod notification;
pub mod partner;
pub mod renewal;
pub mod report;
pub mod revenue;
pub mod user;

pub use activity_log::{
    ActivityAction, ActivityLog, ActivityLogQuery, CreateActivityLogInput, LogSeverity,
};
pub use blacklist::{
    BlacklistQuery, CreateBlacklistEntryRequest, SenderBlacklistEntry, UpdateBlacklistEntryRequest,
};
pub use complaint::{
    AssignComplaintRequest, ChangeComplaintStatusRequest, Complaint, ComplaintComment,
    ComplaintExportFormat, ComplaintExportQuery, ComplaintQuery, ComplaintSnapshot,
    ComplaintStatistics, ComplaintStatisticsQuery, ComplaintStatus, ComplaintStatusCount,
    ComplaintStatusHistory, CreateComplaintCommentRequest, CreateComplaintRequest, DailyCount,
    FinancialImpactSummary, NamedCount, PriorityCount, StatisticsPeriod, StatusMilestones,
    UpdateComplaintRequest,
};
pub use contract::{
    Contract, ContractExportQuery, ContractQuery, ContractStatus, ContractType, ContractTypeCount,
    CreateContractRequest, ExpiryCandidate, ExpiryStatistics, ExpiryTimelineMonth,
    ExpiryTimelineQuery, PartnerRef, RenewalCoverage, TimelineContract, UpdateContractRequest,
    UpdateContractStatusRequest,
};
pub use import::{
    FileStatus, ImportKind, ImportLogLevel, ImportReport, ImportRequest, InvalidRow,
};
pub use notification::{
    CreateNotificationRequest, MarkReadRequest, Notification, NotificationChannels,
    NotificationPreferences, NotificationQuery, NotificationType,
};
pub use partner::{
    CreateHumanitarianOrgRequest, CreateParkingServiceRequest, CreateProviderRequest,
    HumanitarianOrg, ParkingService, ParkingTransaction, PartnerQuery, Provider, Service,
    ServiceType, UpdateHumanitarianOrgRequest, UpdateParkingServiceRequest, UpdateProviderRequest,
};
pub use renewal::{
    AdvanceRenewalRequest, BulkDeleteRenewalsRequest, ContractRenewal,
    CreateHumanitarianRenewalRequest, CreateRenewalRequest, ExpiringContract,
    HumanitarianRenewalQuery, LatestRenewalSummary, MonthlyCount, OrganizationCount, RenewalGates,
    RenewalListItem, RenewalStatistics, RenewalSubStatus, StatusCount, UpdateRenewalRequest,
};
pub use report::{
    ReportFrequency, ReportType, ScheduleReportRequest, ScheduledReport, ScheduledReportQuery,
};
pub use revenue::{
    BulkServiceRecord, FinancialMetrics, FinancialQuery, GrowthRate, MonthlyRevenue,
    MonthlyTransactions, PeriodTotals, ProviderRevenue, ProviderTransactions, RevenueRow,
    SalesMetrics, ServiceTypeRevenue, ServiceTypeTransactions, VasServiceRecord,
};
pub use user::{Actor, Permission, User, UserRole};
