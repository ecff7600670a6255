//! Application services used by the route handlers and background jobs.

pub mod email;
pub mod external_processor;
pub mod import;
pub mod notification_dispatcher;
pub mod provider_cache;

pub use email::EmailService;
pub use external_processor::{ExternalError, ExternalProcessor};
pub use import::{ImportError, ImportRunner};
pub use notification_dispatcher::NotificationDispatcher;
pub use provider_cache::ProviderCache;
