//! Upload directory handling and spreadsheet readers.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, DataType, Reader};
use domain::services::RawRow;
use tracing::{debug, warn};

use super::ImportError;
use crate::config::ImportConfig;

/// The upload, processed and error directories of the import pipeline.
#[derive(Debug, Clone)]
pub struct UploadStore {
    upload_dir: PathBuf,
    processed_dir: PathBuf,
    error_dir: PathBuf,
}

impl UploadStore {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            processed_dir: config.processed_dir.clone(),
            error_dir: config.error_dir.clone(),
        }
    }

    /// Resolves a client-supplied path to an existing file inside the
    /// upload directory.
    ///
    /// Relative paths are taken relative to the upload directory. Anything
    /// that canonicalizes outside of it is rejected.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, ImportError> {
        let requested = requested.trim();
        if requested.is_empty() {
            return Err(ImportError::InvalidPath("uploadedFilePath is required".into()));
        }

        let root = self
            .upload_dir
            .canonicalize()
            .map_err(|e| ImportError::Io(format!("Upload directory unavailable: {}", e)))?;

        let candidate = Path::new(requested);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            root.join(candidate)
        };

        let resolved = joined
            .canonicalize()
            .map_err(|_| ImportError::FileNotFound(requested.to_string()))?;

        if !resolved.starts_with(&root) {
            warn!(path = %requested, "Rejected upload path outside upload directory");
            return Err(ImportError::InvalidPath(
                "File path must be inside the upload directory".into(),
            ));
        }
        if !resolved.is_file() {
            return Err(ImportError::FileNotFound(requested.to_string()));
        }
        Ok(resolved)
    }

    /// Moves a processed file to the processed or error directory and
    /// returns the new location.
    pub async fn archive(&self, path: &Path, succeeded: bool) -> Result<PathBuf, ImportError> {
        let target_dir = if succeeded {
            &self.processed_dir
        } else {
            &self.error_dir
        };
        tokio::fs::create_dir_all(target_dir)
            .await
            .map_err(|e| ImportError::Io(e.to_string()))?;

        let file_name = path
            .file_name()
            .ok_or_else(|| ImportError::InvalidPath("Path has no file name".into()))?;
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let target = target_dir.join(format!("{}_{}", stamp, file_name.to_string_lossy()));

        tokio::fs::rename(path, &target)
            .await
            .map_err(|e| ImportError::Io(e.to_string()))?;
        debug!(from = %path.display(), to = %target.display(), "Archived import file");
        Ok(target)
    }
}

/// Whether the file should be read as a workbook rather than CSV.
pub fn is_workbook(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods")
    )
}

/// Base file name as UTF-8, for filename heuristics and log lines.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn strip_bom(cell: &str) -> &str {
    cell.strip_prefix('\u{feff}').unwrap_or(cell)
}

/// Reads a delimited file into a grid of trimmed cells.
pub fn read_csv_grid(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ImportError::Io(e.to_string()))?;

    let mut grid = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ImportError::Format(e.to_string()))?;
        grid.push(
            record
                .iter()
                .map(|c| if i == 0 { strip_bom(c) } else { c })
                .map(|c| c.trim().to_string())
                .collect(),
        );
    }
    Ok(grid)
}

/// Reads a delimited file with a header line into header-keyed rows.
///
/// Header names are trimmed and lowercased.
pub fn read_csv_rows(path: &Path, delimiter: u8) -> Result<Vec<RawRow>, ImportError> {
    let mut grid = read_csv_grid(path, delimiter)?.into_iter();
    let Some(header) = grid.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.iter().map(|h| h.to_lowercase()).collect();

    Ok(grid
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .map(|row| {
            header
                .iter()
                .enumerate()
                .filter(|(_, name)| !name.is_empty())
                .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string().trim().to_string(),
    }
}

/// Reads one worksheet of a workbook into a grid of cells.
///
/// Date cells are rendered as `dd.mm.yyyy`.
pub fn read_workbook_grid(path: &Path, sheet_index: usize) -> Result<Vec<Vec<String>>, ImportError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ImportError::Io(e.to_string()))?;
    let sheet_count = workbook.sheet_names().len();
    let range = workbook
        .worksheet_range_at(sheet_index)
        .ok_or_else(|| {
            ImportError::Format(format!(
                "Workbook has {} sheet(s), sheet {} is required",
                sheet_count,
                sheet_index + 1
            ))
        })?
        .map_err(|e| ImportError::Format(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ca-import-{}-{}", name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn store(root: &Path) -> UploadStore {
        UploadStore {
            upload_dir: root.join("uploads"),
            processed_dir: root.join("processed"),
            error_dir: root.join("errors"),
        }
    }

    fn write(path: &Path, content: &str) {
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_resolve_inside_upload_dir() {
        let root = temp_dir("resolve");
        let store = store(&root);
        std::fs::create_dir_all(root.join("uploads")).unwrap();
        write(&root.join("uploads/vas.csv"), "x");

        let resolved = store.resolve("vas.csv").unwrap();
        assert!(resolved.ends_with("vas.csv"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let root = temp_dir("traversal");
        let store = store(&root);
        std::fs::create_dir_all(root.join("uploads")).unwrap();
        write(&root.join("secret.csv"), "x");

        assert!(matches!(
            store.resolve("../secret.csv"),
            Err(ImportError::InvalidPath(_))
        ));
        assert!(matches!(
            store.resolve("missing.csv"),
            Err(ImportError::FileNotFound(_))
        ));
        assert!(matches!(store.resolve("  "), Err(ImportError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_archive_moves_file() {
        let root = temp_dir("archive");
        let store = store(&root);
        std::fs::create_dir_all(root.join("uploads")).unwrap();
        let file = root.join("uploads/bulk.csv");
        write(&file, "x");

        let target = store.archive(&file, false).await.unwrap();
        assert!(target.starts_with(root.join("errors")));
        assert!(target.exists());
        assert!(!file.exists());
    }

    #[test]
    fn test_read_csv_rows_keys_by_lowercase_header() {
        let root = temp_dir("csv");
        let file = root.join("bulk.csv");
        write(
            &file,
            "\u{feff}Provider_Name,requests\nTelekom, 12 \n,\nMTS,3\n",
        );

        let rows = read_csv_rows(&file, b',').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["provider_name"], "Telekom");
        assert_eq!(rows[0]["requests"], "12");
        assert_eq!(rows[1]["provider_name"], "MTS");
    }

    #[test]
    fn test_read_csv_grid_semicolon() {
        let root = temp_dir("grid");
        let file = root.join("vas.csv");
        write(&file, "Izvestaj;;\nProizvod;Mesec pruzanja usluge\nSMS;01.2025\n");

        let grid = read_csv_grid(&file, b';').unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[1][0], "Proizvod");
        assert_eq!(grid[2][1], "01.2025");
    }

    #[test]
    fn test_is_workbook() {
        assert!(is_workbook(Path::new("a/report.XLSX")));
        assert!(!is_workbook(Path::new("a/report.csv")));
        assert_eq!(display_name(Path::new("/x/y/Parking_Beograd_20250101.xlsx")), "Parking_Beograd_20250101.xlsx");
    }
}
