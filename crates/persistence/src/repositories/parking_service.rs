//! Parking service repository.

use domain::models::{
    CreateParkingServiceRequest, ParkingService, PartnerQuery, UpdateParkingServiceRequest,
};
use shared::pagination::PageRequest;
use sqlx::PgPool;
use uuid::Uuid;

use super::provider::{bind_partner_filters, build_partner_filter};
use crate::entities::ParkingServiceEntity;
use crate::metrics::QueryTimer;

const PARKING_COLUMNS: &str = r#"
    id, name, description, contact_name, email, phone, address, service_number, is_active,
    original_file_name, original_file_path, file_size, mime_type, last_import_date,
    import_status, created_at, updated_at
"#;

/// Metadata of the report a parking import read.
#[derive(Debug, Clone)]
pub struct ImportedFile {
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
}

/// Repository for parking services and their imported files.
#[derive(Clone)]
pub struct ParkingServiceRepository {
    pool: PgPool,
}

impl ParkingServiceRepository {
    /// Creates a new parking service repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Paginated parking services matching the query.
    pub async fn list(
        &self,
        query: &PartnerQuery,
        page: PageRequest,
    ) -> Result<(Vec<ParkingService>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_parking_services");
        let filter = build_partner_filter(query);

        let count_sql = format!(
            "SELECT COUNT(*) FROM parking_services WHERE {}",
            filter.where_clause()
        );
        let total: i64 = bind_partner_filters!(sqlx::query_scalar::<_, i64>(&count_sql), query)
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            "SELECT {} FROM parking_services WHERE {} ORDER BY {} {} {}",
            PARKING_COLUMNS,
            filter.where_clause(),
            query.sort_column(),
            query.sort_direction(),
            filter.limit_offset()
        );
        let entities =
            bind_partner_filters!(sqlx::query_as::<_, ParkingServiceEntity>(&list_sql), query)
                .bind(page.limit_i64())
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await;
        timer.record();

        Ok((entities?.into_iter().map(Into::into).collect(), total))
    }

    /// Finds a parking service by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ParkingService>, sqlx::Error> {
        let timer = QueryTimer::new("find_parking_service_by_id");
        let sql = format!("SELECT {} FROM parking_services WHERE id = $1", PARKING_COLUMNS);
        let result = sqlx::query_as::<_, ParkingServiceEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Inserts a parking service.
    pub async fn create(
        &self,
        req: &CreateParkingServiceRequest,
    ) -> Result<ParkingService, sqlx::Error> {
        let timer = QueryTimer::new("create_parking_service");
        let sql = format!(
            r#"
            INSERT INTO parking_services (
                name, description, contact_name, email, phone, address, service_number, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            PARKING_COLUMNS
        );
        let result = sqlx::query_as::<_, ParkingServiceEntity>(&sql)
            .bind(req.name.trim())
            .bind(&req.description)
            .bind(&req.contact_name)
            .bind(&req.email)
            .bind(&req.phone)
            .bind(&req.address)
            .bind(&req.service_number)
            .bind(req.is_active)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        Ok(result?.into())
    }

    /// Applies a partial update.
    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateParkingServiceRequest,
    ) -> Result<Option<ParkingService>, sqlx::Error> {
        let timer = QueryTimer::new("update_parking_service");
        let sql = format!(
            r#"
            UPDATE parking_services SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                contact_name = COALESCE($4, contact_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                address = COALESCE($7, address),
                service_number = COALESCE($8, service_number),
                is_active = COALESCE($9, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PARKING_COLUMNS
        );
        let result = sqlx::query_as::<_, ParkingServiceEntity>(&sql)
            .bind(id)
            .bind(req.name.as_deref().map(str::trim))
            .bind(&req.description)
            .bind(&req.contact_name)
            .bind(&req.email)
            .bind(&req.phone)
            .bind(&req.address)
            .bind(&req.service_number)
            .bind(req.is_active)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Id of the parking service named `name`, creating it if missing.
    pub async fn find_or_create(&self, name: &str) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("find_or_create_parking_service");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO parking_services (name)
            VALUES ($1)
            ON CONFLICT ((LOWER(name))) DO UPDATE SET name = parking_services.name
            RETURNING id
            "#,
        )
        .bind(name.trim())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Records the outcome of an import on the parking service row.
    pub async fn record_import(
        &self,
        id: Uuid,
        file: &ImportedFile,
        status: &str,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("record_parking_import");
        let result = sqlx::query(
            r#"
            UPDATE parking_services SET
                original_file_name = $2,
                original_file_path = $3,
                file_size = $4,
                mime_type = $5,
                last_import_date = NOW(),
                import_status = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&file.file_name)
        .bind(&file.file_path)
        .bind(file.file_size)
        .bind(&file.mime_type)
        .bind(status)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }
}
