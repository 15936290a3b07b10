//! Export formats: nested JSON, flat CSV and a read-only markdown outline.
//!
//! JSON and CSV are read back by [`crate::import`], and importing either into
//! the store it came from matches every task and creates nothing.

use crate::error::CoreError;
use crate::models::{Section, TaskList, TaskNode, TaskPriority};
use crate::repository::{ExportRepository, SqliteRepository};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{Sqlite, Transaction};
use tracing::info;

/// Column order of the flat CSV format.
pub const CSV_HEADER: [&str; 10] = [
    "list",
    "section",
    "task",
    "parent_task",
    "depth",
    "notes",
    "due_date",
    "tags",
    "is_completed",
    "recurrence",
];

#[derive(Debug, Serialize)]
pub struct ListExport {
    pub name: String,
    pub emoji: String,
    pub position: i64,
    pub sections: Vec<SectionExport>,
}

#[derive(Debug, Serialize)]
pub struct SectionExport {
    pub name: String,
    pub emoji: String,
    pub position: i64,
    pub tasks: Vec<TaskExport>,
}

#[derive(Debug, Serialize)]
pub struct TaskExport {
    pub title: String,
    pub notes: String,
    pub due_date: Option<NaiveDate>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub position: i64,
    pub priority: TaskPriority,
    pub tags: Vec<String>,
    pub recurrence_type: String,
    pub recurrence_rule: Value,
    pub subtasks: Vec<TaskExport>,
}

impl From<TaskNode> for TaskExport {
    fn from(node: TaskNode) -> Self {
        let task = node.task;
        TaskExport {
            recurrence_type: task.recurrence.kind().to_string(),
            recurrence_rule: task.recurrence.rule(),
            title: task.title,
            notes: task.notes,
            due_date: task.due_date,
            is_completed: task.is_completed,
            completed_at: task.completed_at,
            position: task.position,
            priority: task.priority,
            tags: node.tags,
            subtasks: node.children.into_iter().map(TaskExport::from).collect(),
        }
    }
}

#[async_trait]
impl ExportRepository for SqliteRepository {
    async fn export_json(&self, list_ids: Option<&[i64]>) -> Result<String, CoreError> {
        let mut tx = self.pool().begin().await?;
        let exports = Self::collect_exports_in_transaction(&mut tx, list_ids).await?;
        tx.commit().await?;

        info!(lists = exports.len(), "exported JSON");
        let json = match exports.as_slice() {
            [single] => serde_json::to_string_pretty(single)?,
            _ => serde_json::to_string_pretty(&exports)?,
        };
        Ok(json)
    }

    async fn export_csv(&self, list_ids: Option<&[i64]>) -> Result<String, CoreError> {
        let mut tx = self.pool().begin().await?;
        let lists = Self::lists_for_export(&mut tx, list_ids).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        let mut rows = 0usize;
        for list in &lists {
            for section in Self::sections_for_export(&mut tx, list.id).await? {
                let tree = Self::load_section_tree_in_transaction(&mut tx, section.id).await?;
                // (node, depth, parent title), popped in display order
                let mut pending: Vec<(&TaskNode, usize, &str)> =
                    tree.iter().rev().map(|node| (node, 0, "")).collect();
                while let Some((node, depth, parent_title)) = pending.pop() {
                    let task = &node.task;
                    let recurrence = if task.recurrence.is_recurring() {
                        task.recurrence.kind()
                    } else {
                        ""
                    };
                    let depth_cell = depth.to_string();
                    let due_cell = task.due_date.map(|d| d.to_string()).unwrap_or_default();
                    let tags_cell = node.tags.join(",");
                    writer.write_record([
                        list.name.as_str(),
                        section.name.as_str(),
                        task.title.as_str(),
                        parent_title,
                        depth_cell.as_str(),
                        task.notes.as_str(),
                        due_cell.as_str(),
                        tags_cell.as_str(),
                        if task.is_completed { "true" } else { "false" },
                        recurrence,
                    ])?;
                    rows += 1;
                    pending.extend(
                        node.children
                            .iter()
                            .rev()
                            .map(|child| (child, depth + 1, task.title.as_str())),
                    );
                }
            }
        }
        tx.commit().await?;

        let bytes = writer.into_inner().map_err(|e| CoreError::Io(e.into_error()))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| CoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        info!(lists = lists.len(), rows, "exported CSV");
        Ok(text)
    }

    async fn export_markdown(&self, list_ids: Option<&[i64]>) -> Result<String, CoreError> {
        let mut tx = self.pool().begin().await?;
        let exports = Self::collect_exports_in_transaction(&mut tx, list_ids).await?;
        tx.commit().await?;

        info!(lists = exports.len(), "exported markdown");
        Ok(render_markdown(&exports))
    }
}

/// One `#` heading per list and `##` per section, with tasks as nested
/// checkbox items followed by their notes, due date and tags.
pub fn render_markdown(lists: &[ListExport]) -> String {
    let mut documents = Vec::with_capacity(lists.len());
    for list in lists {
        let mut lines = vec![format!("# {}", list.name), String::new()];
        for section in &list.sections {
            lines.push(format!("## {}", section.name));
            lines.push(String::new());
            for task in &section.tasks {
                push_markdown_task(task, 0, &mut lines);
            }
            lines.push(String::new());
        }
        documents.push(lines.join("\n"));
    }
    documents.join("\n")
}

fn push_markdown_task(task: &TaskExport, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let checkbox = if task.is_completed { "[x]" } else { "[ ]" };
    lines.push(format!("{}- {} {}", indent, checkbox, task.title));

    if !task.notes.is_empty() {
        for note in task.notes.lines() {
            lines.push(format!("{}  {}", indent, note));
        }
    }
    if let Some(due) = task.due_date {
        lines.push(format!("{}  Due: {}", indent, due));
    }
    if !task.tags.is_empty() {
        lines.push(format!("{}  Tags: {}", indent, task.tags.join(", ")));
    }
    for subtask in &task.subtasks {
        push_markdown_task(subtask, depth + 1, lines);
    }
}

impl SqliteRepository {
    async fn collect_exports_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        list_ids: Option<&[i64]>,
    ) -> Result<Vec<ListExport>, CoreError> {
        let lists = Self::lists_for_export(tx, list_ids).await?;
        let mut exports = Vec::with_capacity(lists.len());
        for list in lists {
            let mut sections = Vec::new();
            for section in Self::sections_for_export(tx, list.id).await? {
                let tree = Self::load_section_tree_in_transaction(tx, section.id).await?;
                sections.push(SectionExport {
                    name: section.name,
                    emoji: section.emoji,
                    position: section.position,
                    tasks: tree.into_iter().map(TaskExport::from).collect(),
                });
            }
            exports.push(ListExport {
                name: list.name,
                emoji: list.emoji,
                position: list.position,
                sections,
            });
        }
        Ok(exports)
    }

    /// The requested lists in position order; every list when `list_ids` is `None`.
    async fn lists_for_export<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        list_ids: Option<&[i64]>,
    ) -> Result<Vec<TaskList>, CoreError> {
        let lists: Vec<TaskList> = sqlx::query_as("SELECT * FROM lists ORDER BY position, id")
            .fetch_all(&mut **tx)
            .await?;
        let Some(ids) = list_ids else {
            return Ok(lists);
        };

        if let Some(missing) = ids.iter().find(|id| !lists.iter().any(|l| l.id == **id)) {
            return Err(CoreError::list_not_found(*missing));
        }
        Ok(lists.into_iter().filter(|l| ids.contains(&l.id)).collect())
    }

    async fn sections_for_export<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        list_id: i64,
    ) -> Result<Vec<Section>, CoreError> {
        let sections = sqlx::query_as("SELECT * FROM sections WHERE list_id = $1 ORDER BY position, id")
            .bind(list_id)
            .fetch_all(&mut **tx)
            .await?;
        Ok(sections)
    }
}
