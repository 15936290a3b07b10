//! Flat CSV backups exported by an external task manager.
//!
//! The file opens with a free-form preamble; the real header is the first
//! row naming both `taskId` and `Title`. Parents are referenced by external
//! id and may appear after their children, so linking happens in a second
//! pass once every row has been ingested.

use super::{
    find_header, parse_timestamp, read_records, split_tags, Columns, ImportStats,
    DEFAULT_LIST_NAME, DEFAULT_SECTION_NAME,
};
use crate::error::CoreError;
use crate::models::{MoveTaskData, NewTaskData, TaskPriority};
use crate::repository::SqliteRepository;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{Connection, Sqlite, Transaction};
use std::collections::HashMap;
use tracing::debug;

pub(super) const REQUIRED_COLUMNS: &[&str] = &["taskId", "Title"];

/// A row that names a parent, waiting for the second pass.
struct PendingLink {
    child_id: i64,
    child_external_id: String,
    parent_external_id: String,
}

/// A committed row: its task id under its external id, plus the parent it names.
struct IngestedRow {
    task_id: i64,
    external_id: String,
    parent_external_id: Option<String>,
}

impl SqliteRepository {
    pub(super) async fn import_external_csv<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        text: &str,
    ) -> Result<ImportStats, CoreError> {
        let mut stats = ImportStats::default();
        let records = read_records(text);
        let Some(header_index) = find_header(&records, REQUIRED_COLUMNS) else {
            stats.record_error("Could not find CSV header row (expected columns: Title, taskId)");
            return Ok(stats);
        };
        let columns = Columns::new(&records[header_index]);

        // Pass 1: ingest rows in file order, all at the top level.
        let mut ids: HashMap<String, i64> = HashMap::new();
        let mut links: Vec<PendingLink> = Vec::new();
        for (offset, record) in records[header_index + 1..].iter().enumerate() {
            let row_num = offset + 1;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let mut savepoint = Connection::begin(&mut **tx).await?;
            let mut row = ImportStats::default();
            match self
                .import_external_row(&mut savepoint, &columns, record, &mut row)
                .await
            {
                Ok(ingested) => {
                    savepoint.commit().await?;
                    stats.absorb(row);
                    if let Some(parent_external_id) = ingested.parent_external_id {
                        links.push(PendingLink {
                            child_id: ingested.task_id,
                            child_external_id: ingested.external_id.clone(),
                            parent_external_id,
                        });
                    }
                    ids.insert(ingested.external_id, ingested.task_id);
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    stats.record_error(format!("Row {}: {}", row_num, e));
                }
            }
        }

        // Pass 2: resolve parents now that every row has an id.
        for link in links {
            let Some(&parent_id) = ids.get(&link.parent_external_id) else {
                debug!(
                    child = %link.child_external_id,
                    parent = %link.parent_external_id,
                    "parent not in import, left unlinked"
                );
                continue;
            };

            let child = Self::fetch_task_in_transaction(tx, link.child_id).await?;
            if child.parent_id == Some(parent_id) {
                continue;
            }

            let mut savepoint = Connection::begin(&mut **tx).await?;
            let relink = MoveTaskData {
                parent_id: Some(Some(parent_id)),
                ..Default::default()
            };
            match self
                .move_task_in_transaction(&mut savepoint, link.child_id, relink)
                .await
            {
                Ok(_) => {
                    savepoint.commit().await?;
                    stats.parents_linked += 1;
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    stats.record_error(format!(
                        "Task {}: cannot link to parent {}: {}",
                        link.child_external_id, link.parent_external_id, e
                    ));
                }
            }
        }

        Ok(stats)
    }

    async fn import_external_row<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        columns: &Columns<'_>,
        record: &csv::StringRecord,
        row: &mut ImportStats,
    ) -> Result<IngestedRow, CoreError> {
        let title = columns.get(record, "Title");
        if title.is_empty() {
            return Err(CoreError::InvalidInput("missing title, skipped".to_string()));
        }
        let external_id = columns.get(record, "taskId");
        if external_id.is_empty() {
            return Err(CoreError::InvalidInput("missing taskId, skipped".to_string()));
        }
        let parent_external_id = match columns.get(record, "parentId") {
            "" => None,
            parent => Some(parent.to_string()),
        };

        if let Some(existing) = Self::find_task_by_external_id_in_transaction(tx, external_id).await? {
            row.tasks_skipped += 1;
            return Ok(IngestedRow {
                task_id: existing.id,
                external_id: external_id.to_string(),
                parent_external_id,
            });
        }

        let list_name = match columns.get(record, "List Name") {
            "" => DEFAULT_LIST_NAME,
            name => name,
        };
        let section_name = match columns.get(record, "Column Name") {
            "" => DEFAULT_SECTION_NAME,
            name => name,
        };
        let section = Self::resolve_import_section(tx, list_name, section_name, row).await?;

        let priority = priority_from_code(parse_code(columns.get(record, "Priority"), "Priority")?);
        let is_completed = matches!(parse_code(columns.get(record, "Status"), "Status")?, 1 | 2);
        let (due_date, due_time) =
            parse_due(columns.get(record, "Due Date"), columns.get(record, "Is All Day"))?;
        let completed_at = parse_completed_time(columns.get(record, "Completed Time"))?;

        let task = self
            .create_task_in_transaction(
                tx,
                NewTaskData {
                    section_id: Some(section.id),
                    title: title.to_string(),
                    notes: columns.get(record, "Content").to_string(),
                    priority,
                    due_date,
                    due_time,
                    external_id: Some(external_id.to_string()),
                    is_completed,
                    completed_at: if is_completed { completed_at } else { None },
                    ..Default::default()
                },
            )
            .await?;
        row.tasks_created += 1;

        let tags = split_tags(columns.get(record, "Tags"));
        row.tags_created += Self::attach_tags_in_transaction(tx, task.id, &tags).await?;

        Ok(IngestedRow {
            task_id: task.id,
            external_id: external_id.to_string(),
            parent_external_id,
        })
    }
}

fn parse_code(raw: &str, column: &str) -> Result<i64, CoreError> {
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse()
        .map_err(|_| CoreError::InvalidInput(format!("Invalid {} '{}'", column, raw)))
}

/// Maps the external priority scale (0, 1, 3, 5) onto ours.
fn priority_from_code(code: i64) -> TaskPriority {
    match code {
        1 => TaskPriority::Low,
        3 => TaskPriority::Medium,
        5 => TaskPriority::High,
        _ => TaskPriority::None,
    }
}

/// Splits a due timestamp into a date and, unless the task is all-day, the
/// wall-clock time in the timestamp's own offset.
fn parse_due(
    raw: &str,
    all_day: &str,
) -> Result<(Option<NaiveDate>, Option<NaiveTime>), CoreError> {
    if raw.is_empty() {
        return Ok((None, None));
    }
    let due = parse_external_datetime(raw)
        .ok_or_else(|| CoreError::InvalidInput(format!("Invalid due date '{}'", raw)))?;
    let is_all_day = all_day.is_empty()
        || matches!(all_day.to_ascii_lowercase().as_str(), "true" | "1" | "yes");

    if is_all_day {
        Ok((Some(due.date()), None))
    } else {
        Ok((Some(due.date()), Some(due.time())))
    }
}

/// Backup timestamps carry a `+0000` style offset, which RFC 3339 rejects.
fn parse_external_offset(raw: &str) -> Option<DateTime<FixedOffset>> {
    ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z"]
        .iter()
        .find_map(|format| DateTime::<FixedOffset>::parse_from_str(raw, format).ok())
}

fn parse_completed_time(raw: &str) -> Result<Option<DateTime<Utc>>, CoreError> {
    match parse_external_offset(raw) {
        Some(dt) => Ok(Some(dt.with_timezone(&Utc))),
        None => parse_timestamp(raw),
    }
}

fn parse_external_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Some(dt) = parse_external_offset(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
