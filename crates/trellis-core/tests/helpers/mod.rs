#![allow(dead_code)]

use chrono::NaiveDate;
use std::sync::Arc;
use tempfile::TempDir;
use trellis_core::clock::FixedClock;
use trellis_core::db::establish_connection;
use trellis_core::models::{NewTaskData, Section, Task, TaskList};
use trellis_core::repository::{ListRepository, SectionRepository, SqliteRepository, TaskRepository};

/// The date every test repository treats as today.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 20).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn setup_test_db() -> (SqliteRepository, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish database connection");
    let repo = SqliteRepository::with_clock(pool, Arc::new(FixedClock::at_date(today())));
    (repo, temp_dir)
}

pub async fn create_test_section(
    repo: &SqliteRepository,
    list_name: &str,
    section_name: &str,
) -> (TaskList, Section) {
    let list = match repo.find_list_by_name(list_name).await.expect("Failed to look up list") {
        Some(list) => list,
        None => repo
            .create_list(list_name.to_string(), String::new(), None)
            .await
            .expect("Failed to create list"),
    };
    let section = repo
        .create_section(list.id, section_name.to_string(), String::new())
        .await
        .expect("Failed to create section");
    (list, section)
}

pub async fn create_test_task(repo: &SqliteRepository, section_id: i64, title: &str) -> Task {
    repo.add_task(NewTaskData {
        section_id: Some(section_id),
        title: title.to_string(),
        ..Default::default()
    })
    .await
    .expect("Failed to create task")
}

pub async fn create_test_subtask(repo: &SqliteRepository, parent_id: i64, title: &str) -> Task {
    repo.add_task(NewTaskData {
        parent_id: Some(parent_id),
        title: title.to_string(),
        ..Default::default()
    })
    .await
    .expect("Failed to create subtask")
}

pub async fn get_task(repo: &SqliteRepository, id: i64) -> Task {
    repo.find_task_by_id(id)
        .await
        .expect("Failed to query task")
        .expect("Task should exist")
}

/// Titles of a sibling group in display order.
pub async fn child_titles(repo: &SqliteRepository, parent_id: i64) -> Vec<String> {
    repo.find_children(parent_id)
        .await
        .expect("Failed to load children")
        .into_iter()
        .map(|task| task.title)
        .collect()
}

pub async fn top_level_titles(repo: &SqliteRepository, section_id: i64) -> Vec<String> {
    repo.find_section_tree(section_id)
        .await
        .expect("Failed to load section tree")
        .into_iter()
        .map(|node| node.task.title)
        .collect()
}

pub async fn task_count(repo: &SqliteRepository) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
        .fetch_one(repo.pool())
        .await
        .expect("Failed to count tasks")
}
