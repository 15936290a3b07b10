//! # Trellis Core Library
//!
//! An ordered task hierarchy (lists → sections → tasks → subtasks) on SQLite,
//! with drag-reorder, recurring tasks and idempotent bulk import.
//!
//! ## Core Modules
//!
//! - [`db`]: Connection pool and embedded migrations
//! - [`models`]: Lists, sections, tasks and their input types
//! - [`repository`]: Async repository traits and their SQLite implementation,
//!   including the transaction-scoped primitives the traits are built from
//! - [`position`]: Sibling-group ordering
//! - [`recurrence`]: Recurrence rules and next-occurrence computation
//! - [`import`] / [`export`]: Native JSON/CSV round-trips and external backups
//! - [`clock`]: Injectable source of "now" and "today"
//! - [`error`]: Error type and its caller-facing classification
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use trellis_core::{
//!     db,
//!     models::NewTaskData,
//!     recurrence::Recurrence,
//!     repository::{ListRepository, SectionRepository, SqliteRepository, TaskRepository},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("tasks.db").await?;
//!     let repo = SqliteRepository::new(pool);
//!
//!     let list = repo.create_list("Home".to_string(), "🏠".to_string(), None).await?;
//!     let section = repo.create_section(list.id, "Chores".to_string(), String::new()).await?;
//!
//!     let task = repo
//!         .add_task(NewTaskData {
//!             section_id: Some(section.id),
//!             title: "Water the plants".to_string(),
//!             recurrence: Recurrence::Daily,
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     let result = repo.complete_task(task.id).await?;
//!     if let Some(next) = result.next() {
//!         println!("Next occurrence due {:?}", next.due_date);
//!     }
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod position;
pub mod recurrence;
pub mod repository;
