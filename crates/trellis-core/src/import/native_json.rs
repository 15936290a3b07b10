use super::{parse_date, parse_timestamp, ImportStats};
use crate::error::CoreError;
use crate::models::{NewTaskData, TaskPriority};
use crate::recurrence::Recurrence;
use crate::repository::SqliteRepository;
use serde::Deserialize;
use serde_json::Value;
use sqlx::{Connection, Sqlite, Transaction};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ListDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    emoji: Option<String>,
    #[serde(default)]
    sections: Vec<SectionDocument>,
}

#[derive(Debug, Deserialize)]
struct SectionDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    emoji: Option<String>,
    #[serde(default)]
    tasks: Vec<TaskDocument>,
}

#[derive(Debug, Deserialize)]
struct TaskDocument {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    is_completed: Option<bool>,
    #[serde(default)]
    completed_at: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    recurrence_type: Option<String>,
    #[serde(default)]
    recurrence_rule: Option<Value>,
    #[serde(default)]
    subtasks: Vec<TaskDocument>,
}

impl SqliteRepository {
    pub(super) async fn import_native_json<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        text: &str,
    ) -> Result<ImportStats, CoreError> {
        let mut stats = ImportStats::default();

        let root: Value = match serde_json::from_str(text) {
            Ok(root) => root,
            Err(e) => {
                stats.record_error(format!("Invalid JSON: {}", e));
                return Ok(stats);
            }
        };
        let documents = match root {
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            _ => {
                stats.record_error("JSON must be a list object or array of list objects");
                return Ok(stats);
            }
        };

        for (list_index, document) in documents.into_iter().enumerate() {
            let list: ListDocument = match serde_json::from_value(document) {
                Ok(list) => list,
                Err(e) => {
                    stats.record_error(format!("List at index {}: {}", list_index, e));
                    continue;
                }
            };
            let list_name = list.name.as_deref().unwrap_or("").trim().to_string();
            if list_name.is_empty() {
                stats.record_error(format!("List at index {}: missing name", list_index));
                continue;
            }

            let (task_list, created) = Self::get_or_create_list_in_transaction(
                tx,
                &list_name,
                list.emoji.as_deref().unwrap_or(""),
            )
            .await?;
            if created {
                stats.lists_created += 1;
            }

            for (section_index, section) in list.sections.into_iter().enumerate() {
                let section_name = section.name.as_deref().unwrap_or("").trim().to_string();
                if section_name.is_empty() {
                    stats.record_error(format!(
                        "Section at index {} in list '{}': missing name",
                        section_index, list_name
                    ));
                    continue;
                }

                let (target, created) = Self::get_or_create_section_in_transaction(
                    tx,
                    task_list.id,
                    &section_name,
                    section.emoji.as_deref().unwrap_or(""),
                )
                .await?;
                if created {
                    stats.sections_created += 1;
                }

                self.import_task_documents(tx, target.id, section.tasks, &mut stats)
                    .await?;
            }
        }

        Ok(stats)
    }

    /// Walks a section's task documents depth-first in file order. A task that
    /// is rejected takes its subtasks with it.
    async fn import_task_documents<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        section_id: i64,
        tasks: Vec<TaskDocument>,
        stats: &mut ImportStats,
    ) -> Result<(), CoreError> {
        let mut pending: Vec<(TaskDocument, Option<i64>)> =
            tasks.into_iter().rev().map(|doc| (doc, None)).collect();

        while let Some((mut document, parent_id)) = pending.pop() {
            let subtasks = std::mem::take(&mut document.subtasks);
            let label = document.title.clone().unwrap_or_default();

            let mut savepoint = Connection::begin(&mut **tx).await?;
            let mut row = ImportStats::default();
            match self
                .import_task_document(&mut savepoint, section_id, parent_id, document, &mut row)
                .await
            {
                Ok(task_id) => {
                    savepoint.commit().await?;
                    stats.absorb(row);
                    pending.extend(subtasks.into_iter().rev().map(|doc| (doc, Some(task_id))));
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    stats.record_error(format!("Task '{}': {}", label, e));
                }
            }
        }
        Ok(())
    }

    /// Creates one task, or matches an existing one; returns its id.
    async fn import_task_document<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        section_id: i64,
        parent_id: Option<i64>,
        document: TaskDocument,
        row: &mut ImportStats,
    ) -> Result<i64, CoreError> {
        let title = document.title.as_deref().unwrap_or("").trim().to_string();
        if title.is_empty() {
            return Err(CoreError::InvalidInput("Task with empty title skipped".to_string()));
        }

        if let Some(existing) =
            Self::find_matching_task_in_transaction(tx, section_id, &title, parent_id).await?
        {
            debug!(task_id = existing.id, %title, "task already present");
            row.tasks_skipped += 1;
            return Ok(existing.id);
        }

        let priority = match document.priority.as_deref() {
            Some(raw) => raw
                .parse::<TaskPriority>()
                .map_err(|e| CoreError::InvalidInput(e.to_string()))?,
            None => TaskPriority::None,
        };
        let recurrence = Recurrence::from_parts(
            document.recurrence_type.as_deref().unwrap_or("none"),
            document.recurrence_rule.as_ref().unwrap_or(&Value::Null),
        )?;

        let task = self
            .create_task_in_transaction(
                tx,
                NewTaskData {
                    section_id: Some(section_id),
                    parent_id,
                    title,
                    notes: document.notes.unwrap_or_default(),
                    priority,
                    due_date: parse_date(document.due_date.as_deref().unwrap_or(""))?,
                    recurrence,
                    is_completed: document.is_completed.unwrap_or(false),
                    completed_at: parse_timestamp(document.completed_at.as_deref().unwrap_or(""))?,
                    ..Default::default()
                },
            )
            .await?;

        row.tasks_created += 1;
        if parent_id.is_some() {
            row.parents_linked += 1;
        }
        row.tags_created += Self::attach_tags_in_transaction(tx, task.id, &document.tags).await?;
        Ok(task.id)
    }
}
