//! Service catalogue repository.

use domain::models::{Service, ServiceType};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{NameIdEntity, ServiceEntity};
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct ServiceRepository {
    pool: PgPool,
}

impl ServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_type(&self, service_type: ServiceType) -> Result<Vec<Service>, sqlx::Error> {
        let timer = QueryTimer::new("list_services_by_type");
        let result = sqlx::query_as::<_, ServiceEntity>(
            r#"
            SELECT id, name, service_type, description, is_active, created_at, updated_at
            FROM services
            WHERE service_type = $1
            ORDER BY name
            "#,
        )
        .bind(service_type.as_str())
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    /// Names and ids of every service of one type, for import lookups.
    pub async fn name_index(
        &self,
        service_type: ServiceType,
    ) -> Result<Vec<(String, Uuid)>, sqlx::Error> {
        let timer = QueryTimer::new("service_name_index");
        let result = sqlx::query_as::<_, NameIdEntity>(
            "SELECT id, name FROM services WHERE service_type = $1",
        )
        .bind(service_type.as_str())
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(|e| (e.name, e.id)).collect())
    }

    /// Id of the `(name, type)` service, creating it if missing.
    pub async fn find_or_create(
        &self,
        name: &str,
        service_type: ServiceType,
    ) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("find_or_create_service");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO services (name, service_type)
            VALUES ($1, $2)
            ON CONFLICT ((LOWER(name)), service_type) DO UPDATE SET name = services.name
            RETURNING id
            "#,
        )
        .bind(name.trim())
        .bind(service_type.as_str())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}
