use crate::error::CoreError;
use crate::models::{TaskList, UpdateListData};
use crate::repository::{SiblingGroup, SqliteRepository};
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use tracing::info;

#[async_trait]
impl super::ListRepository for SqliteRepository {
    async fn create_list(
        &self,
        name: String,
        emoji: String,
        project_id: Option<i64>,
    ) -> Result<TaskList, CoreError> {
        let mut tx = self.pool().begin().await?;
        let list = Self::create_list_in_transaction(&mut tx, &name, &emoji, project_id).await?;
        tx.commit().await?;
        Ok(list)
    }

    async fn find_list_by_id(&self, id: i64) -> Result<Option<TaskList>, CoreError> {
        let list = sqlx::query_as("SELECT * FROM lists WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(list)
    }

    async fn find_list_by_name(&self, name: &str) -> Result<Option<TaskList>, CoreError> {
        let list = sqlx::query_as("SELECT * FROM lists WHERE name = $1 ORDER BY position, id LIMIT 1")
            .bind(name.trim())
            .fetch_optional(self.pool())
            .await?;
        Ok(list)
    }

    async fn find_lists(&self) -> Result<Vec<TaskList>, CoreError> {
        let lists = sqlx::query_as("SELECT * FROM lists ORDER BY position, id")
            .fetch_all(self.pool())
            .await?;
        Ok(lists)
    }

    async fn update_list(&self, id: i64, data: UpdateListData) -> Result<TaskList, CoreError> {
        let mut tx = self.pool().begin().await?;
        let mut list = Self::fetch_list_in_transaction(&mut tx, id).await?;

        if let Some(name) = data.name {
            list.name = validate_name("List", &name)?;
        }
        if let Some(emoji) = data.emoji {
            list.emoji = emoji;
        }
        if let Some(project_id) = data.project_id {
            list.project_id = project_id;
        }

        let updated: TaskList = sqlx::query_as(
            "UPDATE lists SET name = $1, emoji = $2, project_id = $3 WHERE id = $4 RETURNING *",
        )
        .bind(&list.name)
        .bind(&list.emoji)
        .bind(list.project_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_list(&self, id: i64) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM lists WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::list_not_found(id));
        }
        info!(list_id = id, "deleted list");
        Ok(())
    }

    async fn move_list(&self, id: i64, index: i64) -> Result<Vec<TaskList>, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::fetch_list_in_transaction(&mut tx, id).await?;
        Self::reorder_in_transaction(&mut tx, SiblingGroup::Lists, id, index).await?;

        let lists = sqlx::query_as("SELECT * FROM lists ORDER BY position, id")
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(lists)
    }
}

impl SqliteRepository {
    pub async fn create_list_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        name: &str,
        emoji: &str,
        project_id: Option<i64>,
    ) -> Result<TaskList, CoreError> {
        let name = validate_name("List", name)?;
        let position = Self::next_position_in_transaction(tx, SiblingGroup::Lists).await?;

        let list: TaskList = sqlx::query_as(
            r#"INSERT INTO lists (name, emoji, position, project_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(emoji)
        .bind(position)
        .bind(project_id)
        .fetch_one(&mut **tx)
        .await?;

        info!(list_id = list.id, name = %list.name, "created list");
        Ok(list)
    }

    pub async fn fetch_list_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        id: i64,
    ) -> Result<TaskList, CoreError> {
        sqlx::query_as("SELECT * FROM lists WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| CoreError::list_not_found(id))
    }

    /// Finds a list by exact name or appends a new one. The flag is true when
    /// the list was created.
    pub async fn get_or_create_list_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        name: &str,
        emoji: &str,
    ) -> Result<(TaskList, bool), CoreError> {
        let existing: Option<TaskList> =
            sqlx::query_as("SELECT * FROM lists WHERE name = $1 ORDER BY position, id LIMIT 1")
                .bind(name)
                .fetch_optional(&mut **tx)
                .await?;
        match existing {
            Some(list) => Ok((list, false)),
            None => Ok((Self::create_list_in_transaction(tx, name, emoji, None).await?, true)),
        }
    }
}

/// Trims a list or section name, rejecting blank ones.
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<String, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::InvalidInput(format!("{} name cannot be empty", kind)));
    }
    Ok(name.to_string())
}
