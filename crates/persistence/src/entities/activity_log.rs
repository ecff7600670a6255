//! Activity log entity.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for activity log entries.
#[derive(Debug, Clone, FromRow)]
pub struct ActivityLogEntity {
    /// Unique identifier.
    pub id: Uuid,

    /// Action code, e.g. `CREATE_CONTRACT_RENEWAL`.
    pub action: String,

    /// Kind of entity affected.
    pub entity_type: String,

    /// ID of the entity affected, when there is a single one.
    pub entity_id: Option<Uuid>,

    /// Free-form description.
    pub details: Option<String>,

    /// INFO, WARNING or ERROR.
    pub severity: String,

    /// Acting user; `None` for system jobs.
    pub user_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}
