use crate::recurrence::Recurrence;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A top-level ordered container of sections.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskList {
    pub id: i64,
    pub name: String,
    pub emoji: String,
    pub position: i64,
    /// Opaque reference to an externally managed project.
    pub project_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Section {
    pub id: i64,
    pub list_id: i64,
    pub name: String,
    pub emoji: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task priority: {0}")]
pub struct ParseTaskPriorityError(String);

impl FromStr for TaskPriority {
    type Err = ParseTaskPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(TaskPriority::None),
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(ParseTaskPriorityError(s.to_string())),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskPriority::None => "none",
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: i64,
    pub section_id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
    pub notes: String,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub position: i64,
    /// Idempotency key assigned by an importer or ingestion source.
    pub external_id: Option<String>,
    pub is_pinned: bool,
    pub recurrence: Recurrence,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Recurrence is stored as a type tag plus a JSON rule and decoded into the
// typed union here, so a row with a corrupt rule fails to load.
impl<'r> FromRow<'r, SqliteRow> for Task {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let recurrence_type: String = row.try_get("recurrence_type")?;
        let recurrence_rule: String = row.try_get("recurrence_rule")?;
        let rule: serde_json::Value =
            serde_json::from_str(&recurrence_rule).map_err(|e| sqlx::Error::ColumnDecode {
                index: "recurrence_rule".to_string(),
                source: Box::new(e),
            })?;
        let recurrence = Recurrence::from_parts(&recurrence_type, &rule).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "recurrence_type".to_string(),
                source: Box::new(e),
            }
        })?;

        Ok(Task {
            id: row.try_get("id")?,
            section_id: row.try_get("section_id")?,
            parent_id: row.try_get("parent_id")?,
            title: row.try_get("title")?,
            notes: row.try_get("notes")?,
            priority: row.try_get("priority")?,
            due_date: row.try_get("due_date")?,
            due_time: row.try_get("due_time")?,
            is_completed: row.try_get("is_completed")?,
            completed_at: row.try_get("completed_at")?,
            position: row.try_get("position")?,
            external_id: row.try_get("external_id")?,
            is_pinned: row.try_get("is_pinned")?,
            recurrence,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Input for task creation.
///
/// `section_id` may be omitted when `parent_id` is given; the task then
/// lives in its parent's section.
#[derive(Debug, Clone, Default)]
pub struct NewTaskData {
    pub section_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub title: String,
    pub notes: String,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub recurrence: Recurrence,
    pub tags: Vec<String>,
    pub external_id: Option<String>,
    pub is_completed: bool,
    /// Only used when `is_completed` is set; defaults to now.
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTaskData {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub due_time: Option<Option<NaiveTime>>,
    pub recurrence: Option<Recurrence>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
}

impl UpdateTaskData {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.notes.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.due_time.is_none()
            && self.recurrence.is_none()
            && self.add_tags.is_empty()
            && self.remove_tags.is_empty()
    }
}

/// A relocation request. Fields are applied in order: list, section, parent,
/// then position.
#[derive(Debug, Clone, Default)]
pub struct MoveTaskData {
    /// Move to the first section of this list, at the top level.
    pub list_id: Option<i64>,
    pub section_id: Option<i64>,
    /// `Some(None)` detaches the task to the top level of its section.
    pub parent_id: Option<Option<i64>>,
    /// Zero-based index within the resulting sibling group.
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateListData {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub project_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSectionData {
    pub name: Option<String>,
    pub emoji: Option<String>,
}

#[derive(Debug)]
pub enum CompletionResult {
    Single(Task),
    /// The completed task and the next occurrence spawned next to it.
    Recurring { completed: Task, next: Task },
}

impl CompletionResult {
    pub fn completed(&self) -> &Task {
        match self {
            CompletionResult::Single(task) => task,
            CompletionResult::Recurring { completed, .. } => completed,
        }
    }

    pub fn next(&self) -> Option<&Task> {
        match self {
            CompletionResult::Single(_) => None,
            CompletionResult::Recurring { next, .. } => Some(next),
        }
    }
}

/// A task with its tags and ordered subtree.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub task: Task,
    pub tags: Vec<String>,
    pub children: Vec<TaskNode>,
}

impl TaskNode {
    /// Number of nodes in this subtree, including the root.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(TaskNode::subtree_size).sum::<usize>()
    }
}

/// A message-like record handed over by a polling collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalRecord {
    pub title: String,
    #[serde(default)]
    pub notes: String,
    pub external_id: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct IngestReport {
    pub created: usize,
    pub skipped: usize,
}
