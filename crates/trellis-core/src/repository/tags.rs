use crate::error::CoreError;
use crate::models::Tag;
use crate::repository::SqliteRepository;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

impl SqliteRepository {
    /// Returns the tag called `name`, creating it if needed. The flag is true
    /// when the tag was created.
    pub async fn get_or_create_tag_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        name: &str,
    ) -> Result<(Tag, bool), CoreError> {
        let existing: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;
        if let Some(tag) = existing {
            return Ok((tag, false));
        }

        let tag: Tag = sqlx::query_as("INSERT INTO tags (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(&mut **tx)
            .await?;
        debug!(tag = %tag.name, "created tag");
        Ok((tag, true))
    }

    /// Attaches the named tags to a task, ignoring blanks and links that
    /// already exist. Returns how many tags had to be created.
    pub async fn attach_tags_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task_id: i64,
        names: &[String],
    ) -> Result<usize, CoreError> {
        let mut created = 0;
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let (tag, was_created) = Self::get_or_create_tag_in_transaction(tx, name).await?;
            if was_created {
                created += 1;
            }
            sqlx::query("INSERT OR IGNORE INTO task_tags (task_id, tag_id) VALUES ($1, $2)")
                .bind(task_id)
                .bind(tag.id)
                .execute(&mut **tx)
                .await?;
        }
        Ok(created)
    }

    pub async fn detach_tags_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task_id: i64,
        names: &[String],
    ) -> Result<(), CoreError> {
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            sqlx::query(
                r#"DELETE FROM task_tags
                WHERE task_id = $1 AND tag_id IN (SELECT id FROM tags WHERE name = $2)"#,
            )
            .bind(task_id)
            .bind(name)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Tag names of a task, alphabetically.
    pub async fn find_task_tags_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task_id: i64,
    ) -> Result<Vec<String>, CoreError> {
        let names = sqlx::query_scalar(
            r#"SELECT t.name FROM tags t
            JOIN task_tags tt ON tt.tag_id = t.id
            WHERE tt.task_id = $1
            ORDER BY t.name"#,
        )
        .bind(task_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(names)
    }
}
