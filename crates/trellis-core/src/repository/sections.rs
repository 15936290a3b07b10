use crate::error::CoreError;
use crate::models::{Section, UpdateSectionData};
use crate::repository::lists::validate_name;
use crate::repository::{SiblingGroup, SqliteRepository};
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use tracing::info;

#[async_trait]
impl super::SectionRepository for SqliteRepository {
    async fn create_section(
        &self,
        list_id: i64,
        name: String,
        emoji: String,
    ) -> Result<Section, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::fetch_list_in_transaction(&mut tx, list_id).await?;
        let section = Self::create_section_in_transaction(&mut tx, list_id, &name, &emoji).await?;
        tx.commit().await?;
        Ok(section)
    }

    async fn find_section_by_id(&self, id: i64) -> Result<Option<Section>, CoreError> {
        let section = sqlx::query_as("SELECT * FROM sections WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(section)
    }

    async fn find_section_by_name(
        &self,
        list_id: i64,
        name: &str,
    ) -> Result<Option<Section>, CoreError> {
        let section = sqlx::query_as(
            "SELECT * FROM sections WHERE list_id = $1 AND name = $2 ORDER BY position, id LIMIT 1",
        )
        .bind(list_id)
        .bind(name.trim())
        .fetch_optional(self.pool())
        .await?;
        Ok(section)
    }

    async fn find_sections(&self, list_id: i64) -> Result<Vec<Section>, CoreError> {
        let sections = sqlx::query_as("SELECT * FROM sections WHERE list_id = $1 ORDER BY position, id")
            .bind(list_id)
            .fetch_all(self.pool())
            .await?;
        Ok(sections)
    }

    async fn update_section(&self, id: i64, data: UpdateSectionData) -> Result<Section, CoreError> {
        let mut tx = self.pool().begin().await?;
        let mut section = Self::fetch_section_in_transaction(&mut tx, id).await?;

        if let Some(name) = data.name {
            section.name = validate_name("Section", &name)?;
        }
        if let Some(emoji) = data.emoji {
            section.emoji = emoji;
        }

        let updated: Section =
            sqlx::query_as("UPDATE sections SET name = $1, emoji = $2 WHERE id = $3 RETURNING *")
                .bind(&section.name)
                .bind(&section.emoji)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_section(&self, id: i64) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM sections WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::section_not_found(id));
        }
        info!(section_id = id, "deleted section");
        Ok(())
    }

    async fn move_section(&self, id: i64, index: i64) -> Result<Vec<Section>, CoreError> {
        let mut tx = self.pool().begin().await?;
        let section = Self::fetch_section_in_transaction(&mut tx, id).await?;
        let group = SiblingGroup::Sections {
            list_id: section.list_id,
        };
        Self::reorder_in_transaction(&mut tx, group, id, index).await?;

        let sections = sqlx::query_as("SELECT * FROM sections WHERE list_id = $1 ORDER BY position, id")
            .bind(section.list_id)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(sections)
    }
}

impl SqliteRepository {
    pub async fn create_section_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        list_id: i64,
        name: &str,
        emoji: &str,
    ) -> Result<Section, CoreError> {
        let name = validate_name("Section", name)?;
        let position =
            Self::next_position_in_transaction(tx, SiblingGroup::Sections { list_id }).await?;

        let section: Section = sqlx::query_as(
            r#"INSERT INTO sections (list_id, name, emoji, position)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(list_id)
        .bind(&name)
        .bind(emoji)
        .bind(position)
        .fetch_one(&mut **tx)
        .await?;

        info!(section_id = section.id, list_id, name = %section.name, "created section");
        Ok(section)
    }

    pub async fn fetch_section_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        id: i64,
    ) -> Result<Section, CoreError> {
        sqlx::query_as("SELECT * FROM sections WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| CoreError::section_not_found(id))
    }

    /// Finds a section of `list_id` by exact name or appends a new one. The
    /// flag is true when the section was created.
    pub async fn get_or_create_section_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        list_id: i64,
        name: &str,
        emoji: &str,
    ) -> Result<(Section, bool), CoreError> {
        let existing: Option<Section> = sqlx::query_as(
            "SELECT * FROM sections WHERE list_id = $1 AND name = $2 ORDER BY position, id LIMIT 1",
        )
        .bind(list_id)
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?;
        match existing {
            Some(section) => Ok((section, false)),
            None => Ok((
                Self::create_section_in_transaction(tx, list_id, name, emoji).await?,
                true,
            )),
        }
    }
}
