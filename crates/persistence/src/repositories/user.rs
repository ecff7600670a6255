//! User repository.

use domain::models::{Actor, NotificationPreferences, User, UserRole};
use domain::services::Recipient;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::entities::{RecipientEntity, UserEntity};
use crate::metrics::QueryTimer;

const USER_COLUMNS: &str =
    "id, name, email, role, is_active, notification_preferences, created_at, updated_at";

impl From<RecipientEntity> for Recipient {
    fn from(e: RecipientEntity) -> Self {
        let preferences = e.preferences();
        Self {
            user_id: e.id,
            email: e.email,
            preferences,
        }
    }
}

/// Repository for users mirrored from the identity provider.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a user by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let result = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Finds a user by email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_email");
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        let result = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Mirrors the token's identity into the users table so foreign keys to
    /// the caller resolve. Returns whether the stored user is active.
    pub async fn sync_actor(&self, actor: &Actor) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("sync_actor");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO users (id, name, email, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = COALESCE(EXCLUDED.name, users.name),
                email = EXCLUDED.email,
                role = EXCLUDED.role,
                updated_at = NOW()
            RETURNING is_active
            "#,
        )
        .bind(actor.user_id)
        .bind(&actor.name)
        .bind(&actor.email)
        .bind(actor.role.as_str())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Active users holding any of `roles`.
    pub async fn recipients_with_roles(
        &self,
        roles: &[UserRole],
    ) -> Result<Vec<Recipient>, sqlx::Error> {
        let timer = QueryTimer::new("recipients_with_roles");
        let codes: Vec<&str> = roles.iter().map(UserRole::as_str).collect();
        let result = sqlx::query_as::<_, RecipientEntity>(
            r#"
            SELECT id, email, notification_preferences
            FROM users
            WHERE is_active AND role = ANY($1)
            "#,
        )
        .bind(&codes)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Notification recipient for an active user.
    pub async fn recipient(&self, user_id: Uuid) -> Result<Option<Recipient>, sqlx::Error> {
        let timer = QueryTimer::new("recipient_by_id");
        let result = sqlx::query_as::<_, RecipientEntity>(
            "SELECT id, email, notification_preferences FROM users WHERE id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Whether `user_id` is an active AGENT, the only role complaints can be assigned to.
    pub async fn is_active_agent(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("is_active_agent");
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_active AND role = 'AGENT')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Replaces a user's notification preferences.
    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: &NotificationPreferences,
    ) -> Result<Option<User>, sqlx::Error> {
        let timer = QueryTimer::new("update_notification_preferences");
        let sql = format!(
            r#"
            UPDATE users SET notification_preferences = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let result = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(user_id)
            .bind(Json(preferences))
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }
}
