use anyhow::{anyhow, Result};
use trellis_core::error::CoreError;
use trellis_core::models::{Section, Task, TaskList};
use trellis_core::repository::Repository;

/// Looks a list up by numeric id first, then by exact name.
pub async fn resolve_list(repo: &impl Repository, list: &str) -> Result<TaskList> {
    if let Ok(id) = list.parse::<i64>() {
        if let Some(found) = repo.find_list_by_id(id).await? {
            return Ok(found);
        }
    }
    repo.find_list_by_name(list)
        .await?
        .ok_or_else(|| anyhow!(CoreError::NotFound(format!("No list named '{}'", list))))
}

/// Looks a section of `list` up by numeric id first, then by exact name.
pub async fn resolve_section(repo: &impl Repository, list: &TaskList, section: &str) -> Result<Section> {
    if let Ok(id) = section.parse::<i64>() {
        if let Some(found) = repo.find_section_by_id(id).await? {
            if found.list_id == list.id {
                return Ok(found);
            }
        }
    }
    repo.find_section_by_name(list.id, section)
        .await?
        .ok_or_else(|| {
            anyhow!(CoreError::NotFound(format!(
                "No section named '{}' in list '{}'",
                section, list.name
            )))
        })
}

pub async fn get_task(repo: &impl Repository, id: i64) -> Result<Task> {
    repo.find_task_by_id(id)
        .await?
        .ok_or_else(|| anyhow!(CoreError::NotFound(format!("Task {} not found", id))))
}
