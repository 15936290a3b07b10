use crate::clock::{Clock, SystemClock};
use crate::db::DbPool;
use crate::error::CoreError;
use crate::import::ImportStats;
use crate::models::{
    CompletionResult, ExternalRecord, IngestReport, MoveTaskData, NewTaskData, Section, Task,
    TaskList, TaskNode, UpdateListData, UpdateSectionData, UpdateTaskData,
};
use async_trait::async_trait;
use std::sync::Arc;

pub mod ingest;
pub mod lists;
pub mod positions;
pub mod sections;
pub mod tags;
pub mod tasks;

pub use positions::SiblingGroup;

/// Maximum number of open pinned tasks per list.
pub const MAX_PINNED_PER_LIST: i64 = 3;

#[async_trait]
pub trait ListRepository {
    async fn create_list(
        &self,
        name: String,
        emoji: String,
        project_id: Option<i64>,
    ) -> Result<TaskList, CoreError>;
    async fn find_list_by_id(&self, id: i64) -> Result<Option<TaskList>, CoreError>;
    async fn find_list_by_name(&self, name: &str) -> Result<Option<TaskList>, CoreError>;
    async fn find_lists(&self) -> Result<Vec<TaskList>, CoreError>;
    async fn update_list(&self, id: i64, data: UpdateListData) -> Result<TaskList, CoreError>;
    async fn delete_list(&self, id: i64) -> Result<(), CoreError>;
    /// Moves a list to a zero-based index and returns all lists in their new order.
    async fn move_list(&self, id: i64, index: i64) -> Result<Vec<TaskList>, CoreError>;
}

#[async_trait]
pub trait SectionRepository {
    async fn create_section(
        &self,
        list_id: i64,
        name: String,
        emoji: String,
    ) -> Result<Section, CoreError>;
    async fn find_section_by_id(&self, id: i64) -> Result<Option<Section>, CoreError>;
    async fn find_section_by_name(
        &self,
        list_id: i64,
        name: &str,
    ) -> Result<Option<Section>, CoreError>;
    async fn find_sections(&self, list_id: i64) -> Result<Vec<Section>, CoreError>;
    async fn update_section(&self, id: i64, data: UpdateSectionData) -> Result<Section, CoreError>;
    async fn delete_section(&self, id: i64) -> Result<(), CoreError>;
    /// Moves a section within its list and returns the list's sections in their new order.
    async fn move_section(&self, id: i64, index: i64) -> Result<Vec<Section>, CoreError>;
}

#[async_trait]
pub trait TaskRepository {
    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError>;
    async fn find_task_by_id(&self, id: i64) -> Result<Option<Task>, CoreError>;
    async fn find_children(&self, id: i64) -> Result<Vec<Task>, CoreError>;
    async fn find_task_tags(&self, id: i64) -> Result<Vec<String>, CoreError>;
    async fn find_section_tree(&self, section_id: i64) -> Result<Vec<TaskNode>, CoreError>;
    async fn update_task(&self, id: i64, data: UpdateTaskData) -> Result<Task, CoreError>;
    async fn move_task(&self, id: i64, data: MoveTaskData) -> Result<Task, CoreError>;
    async fn complete_task(&self, id: i64) -> Result<CompletionResult, CoreError>;
    async fn uncomplete_task(&self, id: i64) -> Result<Task, CoreError>;
    async fn delete_task(&self, id: i64) -> Result<(), CoreError>;
    async fn pin_task(&self, id: i64) -> Result<Task, CoreError>;
    async fn unpin_task(&self, id: i64) -> Result<Task, CoreError>;
    async fn open_subtask_count(&self, id: i64) -> Result<i64, CoreError>;
}

#[async_trait]
pub trait ImportRepository {
    /// Imports an uploaded file, dispatching on its extension and contents.
    async fn import_file(&self, file_name: &str, bytes: &[u8]) -> Result<ImportStats, CoreError>;
}

#[async_trait]
pub trait ExportRepository {
    /// Nested JSON for the given lists, or every list when `list_ids` is `None`.
    async fn export_json(&self, list_ids: Option<&[i64]>) -> Result<String, CoreError>;
    /// Flat native CSV for the given lists, or every list when `list_ids` is `None`.
    async fn export_csv(&self, list_ids: Option<&[i64]>) -> Result<String, CoreError>;
    /// Markdown outline of the given lists, or of every list when `list_ids` is `None`.
    async fn export_markdown(&self, list_ids: Option<&[i64]>) -> Result<String, CoreError>;
}

#[async_trait]
pub trait IngestRepository {
    /// Creates a task per record unless one with the same external id exists.
    async fn ingest_external(
        &self,
        section_id: i64,
        records: Vec<ExternalRecord>,
    ) -> Result<IngestReport, CoreError>;
}

/// Main repository trait that composes all domain traits
pub trait Repository:
    ListRepository
    + SectionRepository
    + TaskRepository
    + ImportRepository
    + ExportRepository
    + IngestRepository
{
}

/// SQLite implementation of the repository pattern
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

impl Repository for SqliteRepository {}
