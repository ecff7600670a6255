//! Drives one import run: resolve the upload, read it, validate rows, write
//! them and archive the file.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use domain::models::{
    FileStatus, ImportKind, ImportLogLevel, ImportReport, ParkingTransaction, ServiceType,
};
use domain::services::import::{bulk, parking, percent, vas};
use domain::services::{ImportProgress, RawRow};
use metrics::counter;
use persistence::repositories::{
    BlacklistRepository, BulkServiceRepository, ImportedFile, ParkingServiceRepository,
    ParkingTransactionRepository, ProviderRepository, ServiceRepository, UpsertOutcome,
    VasServiceRepository,
};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::files::{
    display_name, is_workbook, read_csv_grid, read_csv_rows, read_workbook_grid, UploadStore,
};
use super::ImportError;
use crate::config::ImportConfig;
use crate::services::external_processor::ExternalProcessor;

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub file_name: String,
    pub report: ImportReport,
    pub archived_to: Option<PathBuf>,
}

#[derive(Clone)]
pub struct ImportRunner {
    pool: PgPool,
    store: UploadStore,
    batch_size: usize,
    external: Option<ExternalProcessor>,
}

async fn blocking<T, F>(f: F) -> Result<T, ImportError>
where
    F: FnOnce() -> Result<T, ImportError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ImportError::Io(e.to_string()))?
}

/// Looks `name` up in a per-run cache, creating the row on a miss.
async fn cached_id<F, Fut>(
    cache: &mut HashMap<String, Uuid>,
    name: &str,
    create: F,
) -> Result<Uuid, sqlx::Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Uuid, sqlx::Error>>,
{
    let key = name.trim().to_lowercase();
    if let Some(id) = cache.get(&key) {
        return Ok(*id);
    }
    let id = create().await?;
    cache.insert(key, id);
    Ok(id)
}

/// Constraint violations reject the row; anything else aborts the run.
fn row_error(err: sqlx::Error) -> Result<String, ImportError> {
    match err {
        sqlx::Error::Database(db) => Ok(db.message().to_string()),
        other => Err(ImportError::Database(other)),
    }
}

fn count(report: &mut ImportReport, outcome: UpsertOutcome) {
    match outcome {
        UpsertOutcome::Inserted => report.imported += 1,
        UpsertOutcome::Updated => report.updated += 1,
    }
}

fn mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

impl ImportRunner {
    pub fn new(pool: PgPool, config: &ImportConfig) -> Self {
        Self {
            pool,
            store: UploadStore::new(config),
            batch_size: config.batch_size.max(1),
            external: ExternalProcessor::from_config(config),
        }
    }

    /// Runs one import of `kind` over the uploaded file.
    ///
    /// Fatal errors move the file to the error directory before returning.
    pub async fn run(
        &self,
        kind: ImportKind,
        uploaded_file_path: &str,
        provider_id: Option<Uuid>,
        progress: Arc<dyn ImportProgress>,
        cancel: CancellationToken,
    ) -> Result<ImportOutcome, ImportError> {
        let mut path = self.store.resolve(uploaded_file_path)?;
        let file_name = display_name(&path);
        progress.on_file_status(&file_name, FileStatus::Processing);
        progress.on_log(
            &format!("Processing {}", file_name),
            ImportLogLevel::Info,
            Some(&file_name),
        );

        if let Some(external) = &self.external {
            let output = external.run(&path, &cancel).await?;
            let produced = output.stdout.trim();
            if !produced.is_empty() {
                path = self.store.resolve(produced)?;
                progress.on_log(
                    &format!("Converted to {}", display_name(&path)),
                    ImportLogLevel::Info,
                    Some(&file_name),
                );
            }
        }

        let result = match kind {
            ImportKind::Bulk => self
                .run_bulk(&path, &file_name, progress.as_ref(), &cancel)
                .await
                .map(|r| (r, None)),
            ImportKind::Vas => self
                .run_vas(&path, &file_name, provider_id, progress.as_ref(), &cancel)
                .await
                .map(|r| (r, None)),
            ImportKind::Parking => self
                .run_parking(&path, &file_name, progress.as_ref(), &cancel)
                .await
                .map(|(r, id)| (r, Some(id))),
        };

        match result {
            Ok((report, parking_service_id)) => {
                let succeeded = report.wrote_anything();
                let archived_to = self.archive(&path, succeeded).await;

                if let Some(id) = parking_service_id {
                    self.record_parking_import(id, &path, archived_to.as_deref(), succeeded)
                        .await;
                }

                self.emit_metrics(kind, &report);
                progress.on_progress(&file_name, 100);
                progress.on_file_status(
                    &file_name,
                    if succeeded {
                        FileStatus::Success
                    } else {
                        FileStatus::Error
                    },
                );
                progress.on_log(
                    &format!(
                        "Finished {}: {} imported, {} updated, {} failed",
                        file_name,
                        report.imported,
                        report.updated,
                        report.failed()
                    ),
                    if succeeded {
                        ImportLogLevel::Success
                    } else {
                        ImportLogLevel::Warning
                    },
                    Some(&file_name),
                );
                info!(
                    kind = kind.metric_label(),
                    file = %file_name,
                    processed = report.records_processed,
                    imported = report.imported,
                    updated = report.updated,
                    failed = report.failed(),
                    "Import finished"
                );

                Ok(ImportOutcome {
                    file_name,
                    report,
                    archived_to,
                })
            }
            Err(e) => {
                warn!(kind = kind.metric_label(), file = %file_name, error = %e, "Import aborted");
                counter!("import_runs_failed_total", "kind" => kind.metric_label()).increment(1);
                self.archive(&path, false).await;
                progress.on_file_status(&file_name, FileStatus::Error);
                progress.on_log(&e.to_string(), ImportLogLevel::Error, Some(&file_name));
                Err(e)
            }
        }
    }

    async fn archive(&self, path: &Path, succeeded: bool) -> Option<PathBuf> {
        match self.store.archive(path, succeeded).await {
            Ok(target) => Some(target),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to archive import file");
                None
            }
        }
    }

    fn emit_metrics(&self, kind: ImportKind, report: &ImportReport) {
        let label = kind.metric_label();
        counter!("import_rows_total", "kind" => label, "outcome" => "imported")
            .increment(report.imported as u64);
        counter!("import_rows_total", "kind" => label, "outcome" => "updated")
            .increment(report.updated as u64);
        counter!("import_rows_total", "kind" => label, "outcome" => "failed")
            .increment(report.failed() as u64);
    }

    async fn run_bulk(
        &self,
        path: &Path,
        file: &str,
        progress: &dyn ImportProgress,
        cancel: &CancellationToken,
    ) -> Result<ImportReport, ImportError> {
        let owned = path.to_path_buf();
        let rows = blocking(move || read_csv_rows(&owned, b',')).await?;
        progress.on_log(
            &format!("Read {} rows", rows.len()),
            ImportLogLevel::Info,
            Some(file),
        );

        let providers = ProviderRepository::new(self.pool.clone()).name_index().await?;
        let services = ServiceRepository::new(self.pool.clone())
            .name_index(ServiceType::Bulk)
            .await?;
        let lookup = bulk::BulkLookup::new(providers, services);

        let today = Utc::now().date_naive();
        let blacklist = BlacklistRepository::new(self.pool.clone())
            .active_on(today)
            .await?;
        let repo = BulkServiceRepository::new(self.pool.clone());

        let mut report = ImportReport::default();
        let mut provider_failures = 0;
        let mut service_failures = 0;
        let mut batch = Vec::with_capacity(self.batch_size);
        let total = rows.len();

        for (i, row) in rows.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }
            report.records_processed += 1;

            let parsed = match bulk::parse_row(&row) {
                Ok(parsed) => parsed,
                Err(errors) => {
                    report.reject(i, errors, row);
                    continue;
                }
            };
            let record = match lookup.resolve(&parsed) {
                Ok(record) => record,
                Err(failure) => {
                    provider_failures += usize::from(failure.provider_missing);
                    service_failures += usize::from(failure.service_missing);
                    report.reject(i, failure.errors, row);
                    continue;
                }
            };

            if blacklist
                .iter()
                .any(|entry| entry.blocks(&record.sender_name, Some(record.provider_id), today))
            {
                let warning = bulk::blacklisted_warning(&record.sender_name, &record.provider_name);
                progress.on_log(&warning, ImportLogLevel::Warning, Some(file));
                report.warnings.push(warning);
            }

            batch.push(record);
            if batch.len() >= self.batch_size {
                report.imported += repo.insert_batch(&batch).await? as usize;
                batch.clear();
            }
            progress.on_progress(file, percent(i + 1, total));
        }

        if !batch.is_empty() {
            report.imported += repo.insert_batch(&batch).await? as usize;
        }
        if let Some(summary) = bulk::mapping_summary(provider_failures, service_failures) {
            progress.on_log(&summary, ImportLogLevel::Warning, Some(file));
            report.warnings.push(summary);
        }
        Ok(report)
    }

    async fn run_vas(
        &self,
        path: &Path,
        file: &str,
        default_provider: Option<Uuid>,
        progress: &dyn ImportProgress,
        cancel: &CancellationToken,
    ) -> Result<ImportReport, ImportError> {
        let providers = ProviderRepository::new(self.pool.clone());
        if let Some(id) = default_provider {
            providers
                .find_by_id(id)
                .await?
                .ok_or(ImportError::ProviderNotFound(id))?;
        }

        let owned = path.to_path_buf();
        let grid = blocking(move || {
            if is_workbook(&owned) {
                read_workbook_grid(&owned, 0)
            } else {
                read_csv_grid(&owned, b';')
            }
        })
        .await?;

        let rows = vas::rows_from_grid(&grid).ok_or_else(|| {
            ImportError::Format(format!(
                "Header row with \"{}\" not found in the first {} rows",
                vas::HEADER_MARKER,
                vas::HEADER_SEARCH_ROWS
            ))
        })?;
        progress.on_log(
            &format!("Found {} data rows", rows.len()),
            ImportLogLevel::Info,
            Some(file),
        );

        let services = ServiceRepository::new(self.pool.clone());
        let repo = VasServiceRepository::new(self.pool.clone());
        let mut provider_ids = HashMap::new();
        let mut service_ids = HashMap::new();
        let mut report = ImportReport::default();
        let total = rows.len();

        for (done, (row_index, row)) in rows.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }
            report.records_processed += 1;

            let parsed = match vas::parse_row(&row, default_provider.is_some()) {
                Ok(parsed) => parsed,
                Err(errors) => {
                    report.reject(row_index, errors, row);
                    continue;
                }
            };

            let provider_id = match default_provider {
                Some(id) => id,
                None => {
                    let name = parsed.provider_name.clone().unwrap_or_default();
                    cached_id(&mut provider_ids, &name, || providers.find_or_create(&name)).await?
                }
            };
            let product = parsed.proizvod.clone();
            let service_id = cached_id(&mut service_ids, &product, || {
                services.find_or_create(&product, ServiceType::Vas)
            })
            .await?;

            match repo.upsert(&parsed.into_record(provider_id, service_id)).await {
                Ok(outcome) => count(&mut report, outcome),
                Err(e) => {
                    let message = row_error(e)?;
                    report.reject(row_index, vec![message], row);
                }
            }
            progress.on_progress(file, percent(done + 1, total));
        }
        Ok(report)
    }

    async fn run_parking(
        &self,
        path: &Path,
        file: &str,
        progress: &dyn ImportProgress,
        cancel: &CancellationToken,
    ) -> Result<(ImportReport, Uuid), ImportError> {
        let today = Utc::now().date_naive();
        let provider_name = parking::extract_provider(file);
        let year = parking::extract_year_from_filename(file, today.year());
        progress.on_log(
            &format!("Provider: {}, report year: {}", provider_name, year),
            ImportLogLevel::Info,
            Some(file),
        );

        let owned = path.to_path_buf();
        let grid = blocking(move || {
            if is_workbook(&owned) {
                read_workbook_grid(&owned, parking::REPORT_SHEET_INDEX)
            } else {
                read_csv_grid(&owned, b',')
            }
        })
        .await?;
        let sheet = parking::parse_sheet(&grid);

        let mut report = ImportReport::default();
        for raw in &sheet.invalid_dates {
            report.warnings.push(format!("Invalid date in header: {}", raw));
        }
        if sheet.records.is_empty() {
            report
                .warnings
                .push("No prepaid transactions found in report".to_string());
        }
        let outside_year = sheet.records.iter().filter(|r| r.date.year() != year).count();
        if outside_year > 0 {
            report.warnings.push(format!(
                "{} transaction(s) dated outside report year {}",
                outside_year, year
            ));
        }
        for warning in &report.warnings {
            progress.on_log(warning, ImportLogLevel::Warning, Some(file));
        }
        progress.on_log(
            &format!(
                "Found {} services and {} transactions",
                sheet.service_count,
                sheet.records.len()
            ),
            ImportLogLevel::Info,
            Some(file),
        );

        let parking_service_id = ParkingServiceRepository::new(self.pool.clone())
            .find_or_create(&provider_name)
            .await?;
        let services = ServiceRepository::new(self.pool.clone());
        let repo = ParkingTransactionRepository::new(self.pool.clone());
        let mut service_ids = HashMap::new();
        let total = sheet.records.len();

        for (i, record) in sheet.records.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }
            report.records_processed += 1;

            let service_id = match &record.service_code {
                Some(code) => Some(
                    cached_id(&mut service_ids, code, || {
                        services.find_or_create(code, ServiceType::Parking)
                    })
                    .await?,
                ),
                None => None,
            };

            let transaction = ParkingTransaction {
                parking_service_id,
                service_id,
                date: record.date,
                group: record.group.clone(),
                service_name: record.service_name.clone(),
                price: record.price.unwrap_or(0.0),
                quantity: record.quantity,
                amount: record.amount.unwrap_or(0.0),
            };
            match repo.upsert(&transaction).await {
                Ok(outcome) => count(&mut report, outcome),
                Err(e) => {
                    let message = row_error(e)?;
                    report.reject(i, vec![message], transaction_row(&transaction));
                }
            }
            progress.on_progress(file, percent(i + 1, total));
        }
        Ok((report, parking_service_id))
    }

    async fn record_parking_import(
        &self,
        parking_service_id: Uuid,
        original: &Path,
        archived: Option<&Path>,
        succeeded: bool,
    ) {
        let stored = archived.unwrap_or(original);
        let file_size = tokio::fs::metadata(stored)
            .await
            .map(|m| m.len() as i64)
            .unwrap_or(0);
        let file = ImportedFile {
            file_name: display_name(original),
            file_path: stored.display().to_string(),
            file_size,
            mime_type: mime_type(original).to_string(),
        };
        let status = if succeeded { "success" } else { "failed" };
        if let Err(e) = ParkingServiceRepository::new(self.pool.clone())
            .record_import(parking_service_id, &file, status)
            .await
        {
            warn!(parking_service_id = %parking_service_id, error = %e, "Failed to record import metadata");
        }
    }
}

fn transaction_row(tx: &ParkingTransaction) -> RawRow {
    let mut row = BTreeMap::new();
    row.insert("date".to_string(), format_date(tx.date));
    row.insert("group".to_string(), tx.group.clone());
    row.insert("service_name".to_string(), tx.service_name.clone());
    row.insert("quantity".to_string(), tx.quantity.to_string());
    row
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_by_extension() {
        assert_eq!(mime_type(Path::new("r.XLSX")), "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet");
        assert_eq!(mime_type(Path::new("r.csv")), "text/csv");
        assert_eq!(mime_type(Path::new("r")), "application/octet-stream");
    }

    #[test]
    fn test_count_outcomes() {
        let mut report = ImportReport::default();
        count(&mut report, UpsertOutcome::Inserted);
        count(&mut report, UpsertOutcome::Updated);
        count(&mut report, UpsertOutcome::Inserted);
        assert_eq!((report.imported, report.updated), (2, 1));
    }

    #[test]
    fn test_row_error_aborts_on_connection_errors() {
        assert!(matches!(
            row_error(sqlx::Error::PoolTimedOut),
            Err(ImportError::Database(_))
        ));
    }

    #[test]
    fn test_transaction_row() {
        let tx = ParkingTransaction {
            parking_service_id: Uuid::new_v4(),
            service_id: None,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            group: "prepaid".into(),
            service_name: "Zona 1 9100".into(),
            price: 60.0,
            quantity: 4.0,
            amount: 240.0,
        };
        let row = transaction_row(&tx);
        assert_eq!(row["date"], "2025-03-01");
        assert_eq!(row["group"], "prepaid");
    }

    #[tokio::test]
    async fn test_cached_id_creates_once() {
        let mut cache = HashMap::new();
        let id = Uuid::new_v4();
        let first = cached_id(&mut cache, " Telekom ", || async move { Ok(id) }).await.unwrap();
        let second = cached_id(&mut cache, "TELEKOM", || async { Err(sqlx::Error::PoolTimedOut) })
            .await
            .unwrap();
        assert_eq!(first, id);
        assert_eq!(second, id);
    }
}
