//! Bulk import of task trees from uploaded files.
//!
//! Three formats are understood: the native nested JSON and flat CSV written
//! by [`crate::export`], and the flat CSV backup of an external task manager.
//! Imports are idempotent: native rows are matched by (section, title,
//! parent) and external rows by their external id, so re-importing a file
//! creates nothing new.
//!
//! A whole import runs in one transaction. Each row runs in a savepoint and a
//! malformed row is rolled back and reported in [`ImportStats`] while the rest
//! of the batch continues.

use crate::error::CoreError;
use crate::models::Section;
use crate::repository::{ImportRepository, SqliteRepository};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use tracing::{info, warn};

mod external_csv;
mod native_csv;
mod native_json;

/// List name used when a row leaves it blank.
pub const DEFAULT_LIST_NAME: &str = "Imported";
/// Section name used when a row leaves it blank.
pub const DEFAULT_SECTION_NAME: &str = "(default)";

const UTF8_BOM: &str = "\u{feff}";

/// Outcome counters for one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub lists_created: usize,
    pub sections_created: usize,
    pub tags_created: usize,
    pub tasks_created: usize,
    pub tasks_skipped: usize,
    pub parents_linked: usize,
    pub errors: usize,
    pub error_details: Vec<String>,
}

impl ImportStats {
    pub(crate) fn record_error(&mut self, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(%detail, "import row rejected");
        self.errors += 1;
        self.error_details.push(detail);
    }

    /// Adds the counters of a committed row.
    pub(crate) fn absorb(&mut self, row: ImportStats) {
        self.lists_created += row.lists_created;
        self.sections_created += row.sections_created;
        self.tags_created += row.tags_created;
        self.tasks_created += row.tasks_created;
        self.tasks_skipped += row.tasks_skipped;
        self.parents_linked += row.parents_linked;
        self.errors += row.errors;
        self.error_details.extend(row.error_details);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    NativeJson,
    NativeCsv,
    ExternalCsv,
}

/// Chooses a format from the file extension and, for CSV, the header row.
pub fn detect_format(file_name: &str, text: &str) -> Result<ImportFormat, CoreError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => Ok(ImportFormat::NativeJson),
        Some("csv") => detect_csv_format(text).ok_or_else(|| {
            CoreError::UnsupportedImport(
                "Unrecognized CSV format: expected a native export (list, section, task) \
                 or an external backup (taskId, Title)"
                    .to_string(),
            )
        }),
        _ => Err(CoreError::UnsupportedImport(format!(
            "Unsupported file type: '{}'. Upload a .json or .csv file",
            file_name
        ))),
    }
}

/// Looks for the external header anywhere (it follows a preamble), otherwise
/// for a native header.
pub fn detect_csv_format(text: &str) -> Option<ImportFormat> {
    let records = read_records(text);
    if find_header(&records, external_csv::REQUIRED_COLUMNS).is_some() {
        Some(ImportFormat::ExternalCsv)
    } else if find_header(&records, native_csv::REQUIRED_COLUMNS).is_some() {
        Some(ImportFormat::NativeCsv)
    } else {
        None
    }
}

#[async_trait]
impl ImportRepository for SqliteRepository {
    async fn import_file(&self, file_name: &str, bytes: &[u8]) -> Result<ImportStats, CoreError> {
        let mut tx = self.pool().begin().await?;
        let stats = self
            .import_file_in_transaction(&mut tx, file_name, bytes)
            .await?;
        tx.commit().await?;
        Ok(stats)
    }
}

impl SqliteRepository {
    /// Detects the format of `bytes` and ingests it inside `tx`.
    ///
    /// Unsupported files are rejected before anything is written.
    pub async fn import_file_in_transaction<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<ImportStats, CoreError> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            CoreError::UnsupportedImport(format!("'{}' is not valid UTF-8: {}", file_name, e))
        })?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

        let format = detect_format(file_name, text)?;
        info!(file = file_name, ?format, "importing file");

        let stats = match format {
            ImportFormat::NativeJson => self.import_native_json(tx, text).await?,
            ImportFormat::NativeCsv => self.import_native_csv(tx, text).await?,
            ImportFormat::ExternalCsv => self.import_external_csv(tx, text).await?,
        };

        info!(
            file = file_name,
            created = stats.tasks_created,
            skipped = stats.tasks_skipped,
            linked = stats.parents_linked,
            errors = stats.errors,
            "import finished"
        );
        Ok(stats)
    }

    /// Get-or-create for the list and section named by an import row.
    pub(crate) async fn resolve_import_section<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        list_name: &str,
        section_name: &str,
        stats: &mut ImportStats,
    ) -> Result<Section, CoreError> {
        let (list, list_created) = Self::get_or_create_list_in_transaction(tx, list_name, "").await?;
        if list_created {
            stats.lists_created += 1;
        }
        let (section, section_created) =
            Self::get_or_create_section_in_transaction(tx, list.id, section_name, "").await?;
        if section_created {
            stats.sections_created += 1;
        }
        Ok(section)
    }
}

/// All CSV records, header included, with ragged rows allowed.
pub(crate) fn read_records(text: &str) -> Vec<csv::StringRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    reader
        .records()
        .filter_map(|record| match record {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "unreadable CSV record dropped");
                None
            }
        })
        .collect()
}

/// Index of the first record containing every one of `columns`.
pub(crate) fn find_header(records: &[csv::StringRecord], columns: &[&str]) -> Option<usize> {
    records.iter().position(|record| {
        columns
            .iter()
            .all(|column| record.iter().any(|cell| cell.trim() == *column))
    })
}

/// Column lookup for the records that follow a header row.
pub(crate) struct Columns<'h> {
    header: &'h csv::StringRecord,
}

impl<'h> Columns<'h> {
    pub(crate) fn new(header: &'h csv::StringRecord) -> Self {
        Self { header }
    }

    /// The trimmed cell under `name`, or "" when the column or cell is missing.
    pub(crate) fn get<'r>(&self, record: &'r csv::StringRecord, name: &str) -> &'r str {
        self.header
            .iter()
            .position(|cell| cell.trim() == name)
            .and_then(|index| record.get(index))
            .map(str::trim)
            .unwrap_or("")
    }
}

/// Parses an ISO `YYYY-MM-DD` date; blank and `None` mean no date.
pub(crate) fn parse_date(raw: &str) -> Result<Option<NaiveDate>, CoreError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "None" {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| CoreError::InvalidInput(format!("Invalid date '{}'", raw)))
}

/// Parses an RFC 3339 or space-separated timestamp; offset-less values are
/// taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<Option<DateTime<Utc>>, CoreError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "None" {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Some(naive.and_utc()));
    }
    Err(CoreError::InvalidInput(format!("Invalid timestamp '{}'", raw)))
}

/// Splits a tag cell on commas and semicolons.
pub(crate) fn split_tags(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
