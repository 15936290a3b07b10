use crate::recurrence::RecurrenceValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(#[from] RecurrenceValidationError),

    #[error("Unsupported import: {0}")]
    UnsupportedImport(String),

    #[error("Circular nesting detected: task {task_id} cannot be nested under task {parent_id}")]
    CircularNesting { task_id: i64, parent_id: i64 },

    #[error("List {list_id} already has {limit} pinned open tasks")]
    PinLimitExceeded { list_id: i64, limit: i64 },
}

/// Caller-facing classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; nothing was written.
    Validation,
    /// The request contradicts the current state of the tree; nothing was written.
    Conflict,
    /// A referenced list, section, task or tag does not exist.
    NotFound,
    /// Storage or serialization failure; the enclosing transaction was rolled back.
    Internal,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidInput(_)
            | CoreError::InvalidRecurrence(_)
            | CoreError::UnsupportedImport(_) => ErrorKind::Validation,
            CoreError::CircularNesting { .. } | CoreError::PinLimitExceeded { .. } => {
                ErrorKind::Conflict
            }
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Database(_)
            | CoreError::Migration(_)
            | CoreError::Io(_)
            | CoreError::Json(_)
            | CoreError::Csv(_) => ErrorKind::Internal,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub(crate) fn task_not_found(id: i64) -> Self {
        CoreError::NotFound(format!("Task {} not found", id))
    }

    pub(crate) fn section_not_found(id: i64) -> Self {
        CoreError::NotFound(format!("Section {} not found", id))
    }

    pub(crate) fn list_not_found(id: i64) -> Self {
        CoreError::NotFound(format!("List {} not found", id))
    }
}
