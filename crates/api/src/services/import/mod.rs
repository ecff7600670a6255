//! File-driven imports of VAS, bulk and parking revenue data.

mod files;
mod progress;
mod runner;

pub use files::{display_name, is_workbook, read_csv_grid, read_csv_rows, read_workbook_grid, UploadStore};
pub use progress::{ChannelProgress, ImportEvent};
pub use runner::{ImportOutcome, ImportRunner};

use thiserror::Error;

use crate::error::ApiError;
use crate::services::external_processor::ExternalError;

/// Failures that abort a whole import run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unable to read file: {0}")]
    Io(String),

    #[error("Invalid file format: {0}")]
    Format(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(uuid::Uuid),

    #[error("Import cancelled")]
    Cancelled,

    #[error(transparent)]
    External(#[from] ExternalError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::InvalidPath(msg) => ApiError::validation(msg),
            ImportError::Format(msg) => ApiError::validation(format!("Invalid file format: {}", msg)),
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("File not found: {}", path)),
            ImportError::ProviderNotFound(id) => ApiError::NotFound(format!("Provider {} not found", id)),
            ImportError::Cancelled => ApiError::Cancelled("Import cancelled".into()),
            ImportError::Io(msg) => ApiError::Internal(msg),
            ImportError::External(e) => e.into(),
            ImportError::Database(e) => e.into(),
        }
    }
}
