use super::{
    find_header, parse_date, read_records, split_tags, Columns, ImportStats, DEFAULT_LIST_NAME,
    DEFAULT_SECTION_NAME,
};
use crate::error::CoreError;
use crate::models::NewTaskData;
use crate::repository::SqliteRepository;
use sqlx::{Connection, Sqlite, Transaction};
use std::collections::HashMap;

pub(super) const REQUIRED_COLUMNS: &[&str] = &["list", "section", "task"];

/// Recently seen rows of one section as (depth, title, task id).
type SectionStack = Vec<(i64, String, i64)>;

/// What a committed row contributes to parent resolution.
struct SeenRow {
    section_id: i64,
    depth: i64,
    title: String,
    task_id: i64,
}

impl SqliteRepository {
    pub(super) async fn import_native_csv<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        text: &str,
    ) -> Result<ImportStats, CoreError> {
        let mut stats = ImportStats::default();
        let records = read_records(text);
        let Some(header_index) = find_header(&records, REQUIRED_COLUMNS) else {
            stats.record_error("CSV missing required columns (expected: list, section, task)");
            return Ok(stats);
        };
        let columns = Columns::new(&records[header_index]);

        let mut stacks: HashMap<i64, SectionStack> = HashMap::new();
        for (offset, record) in records[header_index + 1..].iter().enumerate() {
            let row_num = offset + 1;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let mut savepoint = Connection::begin(&mut **tx).await?;
            let mut row = ImportStats::default();
            match self
                .import_native_row(&mut savepoint, &columns, record, &stacks, &mut row)
                .await
            {
                Ok(seen) => {
                    savepoint.commit().await?;
                    stats.absorb(row);
                    stacks
                        .entry(seen.section_id)
                        .or_default()
                        .push((seen.depth, seen.title, seen.task_id));
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    stats.record_error(format!("Row {}: {}", row_num, e));
                }
            }
        }

        Ok(stats)
    }

    async fn import_native_row<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        columns: &Columns<'_>,
        record: &csv::StringRecord,
        stacks: &HashMap<i64, SectionStack>,
        row: &mut ImportStats,
    ) -> Result<SeenRow, CoreError> {
        let title = columns.get(record, "task");
        if title.is_empty() {
            return Err(CoreError::InvalidInput("missing task title".to_string()));
        }

        let list_name = non_blank_or(columns.get(record, "list"), DEFAULT_LIST_NAME);
        let section_name = non_blank_or(columns.get(record, "section"), DEFAULT_SECTION_NAME);
        let section = Self::resolve_import_section(tx, list_name, section_name, row).await?;

        let depth = match columns.get(record, "depth") {
            "" => 0,
            raw => raw
                .parse::<i64>()
                .map_err(|_| CoreError::InvalidInput(format!("Invalid depth '{}'", raw)))?,
        };
        let parent_title = columns.get(record, "parent_task");
        let parent_id = if depth > 0 && !parent_title.is_empty() {
            stacks.get(&section.id).and_then(|stack| {
                stack
                    .iter()
                    .rev()
                    .find(|(seen_depth, seen_title, _)| {
                        *seen_depth == depth - 1 && seen_title == parent_title
                    })
                    .map(|(_, _, id)| *id)
            })
        } else {
            None
        };

        let seen = |task_id| SeenRow {
            section_id: section.id,
            depth,
            title: title.to_string(),
            task_id,
        };

        if let Some(existing) =
            Self::find_matching_task_in_transaction(tx, section.id, title, parent_id).await?
        {
            row.tasks_skipped += 1;
            return Ok(seen(existing.id));
        }

        let is_completed = matches!(
            columns.get(record, "is_completed").to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        );

        let task = self
            .create_task_in_transaction(
                tx,
                NewTaskData {
                    section_id: Some(section.id),
                    parent_id,
                    title: title.to_string(),
                    notes: columns.get(record, "notes").to_string(),
                    due_date: parse_date(columns.get(record, "due_date"))?,
                    is_completed,
                    ..Default::default()
                },
            )
            .await?;

        row.tasks_created += 1;
        if parent_id.is_some() {
            row.parents_linked += 1;
        }
        let tags = split_tags(columns.get(record, "tags"));
        row.tags_created += Self::attach_tags_in_transaction(tx, task.id, &tags).await?;

        Ok(seen(task.id))
    }
}

fn non_blank_or<'s>(value: &'s str, fallback: &'s str) -> &'s str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}
