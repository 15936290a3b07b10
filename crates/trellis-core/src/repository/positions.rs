use crate::error::CoreError;
use crate::position::{self, next_position};
use crate::repository::SqliteRepository;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

/// The rows that share one ordering: all lists, the sections of a list, or
/// the tasks with the same section and parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingGroup {
    Lists,
    Sections { list_id: i64 },
    Tasks { section_id: i64, parent_id: Option<i64> },
}

impl SiblingGroup {
    fn table(&self) -> &'static str {
        match self {
            SiblingGroup::Lists => "lists",
            SiblingGroup::Sections { .. } => "sections",
            SiblingGroup::Tasks { .. } => "tasks",
        }
    }
}

impl SqliteRepository {
    /// Position for a new row appended to the end of `group`.
    pub async fn next_position_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        group: SiblingGroup,
    ) -> Result<i64, CoreError> {
        let max: Option<i64> = match group {
            SiblingGroup::Lists => {
                sqlx::query_scalar("SELECT MAX(position) FROM lists")
                    .fetch_one(&mut **tx)
                    .await?
            }
            SiblingGroup::Sections { list_id } => {
                sqlx::query_scalar("SELECT MAX(position) FROM sections WHERE list_id = $1")
                    .bind(list_id)
                    .fetch_one(&mut **tx)
                    .await?
            }
            SiblingGroup::Tasks {
                section_id,
                parent_id,
            } => {
                sqlx::query_scalar(
                    "SELECT MAX(position) FROM tasks WHERE section_id = $1 AND parent_id IS $2",
                )
                .bind(section_id)
                .bind(parent_id)
                .fetch_one(&mut **tx)
                .await?
            }
        };
        Ok(next_position(max))
    }

    /// Ids in `group` in display order, leaving out `exclude`.
    pub async fn sibling_ids_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        group: SiblingGroup,
        exclude: i64,
    ) -> Result<Vec<i64>, CoreError> {
        let ids = match group {
            SiblingGroup::Lists => {
                sqlx::query_scalar("SELECT id FROM lists WHERE id != $1 ORDER BY position, id")
                    .bind(exclude)
                    .fetch_all(&mut **tx)
                    .await?
            }
            SiblingGroup::Sections { list_id } => {
                sqlx::query_scalar(
                    "SELECT id FROM sections WHERE list_id = $1 AND id != $2 ORDER BY position, id",
                )
                .bind(list_id)
                .bind(exclude)
                .fetch_all(&mut **tx)
                .await?
            }
            SiblingGroup::Tasks {
                section_id,
                parent_id,
            } => {
                sqlx::query_scalar(
                    r#"SELECT id FROM tasks
                    WHERE section_id = $1 AND parent_id IS $2 AND id != $3
                    ORDER BY position, id"#,
                )
                .bind(section_id)
                .bind(parent_id)
                .bind(exclude)
                .fetch_all(&mut **tx)
                .await?
            }
        };
        Ok(ids)
    }

    /// Places `moved` at `index` within `group` and renumbers the whole group.
    pub async fn reorder_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        group: SiblingGroup,
        moved: i64,
        index: i64,
    ) -> Result<(), CoreError> {
        let siblings = Self::sibling_ids_in_transaction(tx, group, moved).await?;
        let assignments = position::reorder(moved, &siblings, index);

        let sql = format!("UPDATE {} SET position = $1 WHERE id = $2", group.table());
        for (id, position) in &assignments {
            sqlx::query(&sql)
                .bind(position)
                .bind(id)
                .execute(&mut **tx)
                .await?;
        }

        debug!(?group, moved, index, size = assignments.len(), "renumbered sibling group");
        Ok(())
    }
}
