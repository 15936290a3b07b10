use crate::error::CoreError;
use crate::models::{
    CompletionResult, MoveTaskData, NewTaskData, Task, TaskNode, UpdateTaskData,
};
use crate::recurrence::compute_next_due_date;
use crate::repository::{SiblingGroup, SqliteRepository, MAX_PINNED_PER_LIST};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use tracing::{debug, info};

/// Upper bound on the parent chain walked by the nesting check.
const MAX_NESTING_WALK: usize = 10_000;

#[async_trait]
impl super::TaskRepository for SqliteRepository {
    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;
        let task = self.create_task_in_transaction(&mut tx, data).await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn find_task_by_id(&self, id: i64) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(task)
    }

    async fn find_children(&self, id: i64) -> Result<Vec<Task>, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::fetch_task_in_transaction(&mut tx, id).await?;
        let children = sqlx::query_as("SELECT * FROM tasks WHERE parent_id = $1 ORDER BY position, id")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(children)
    }

    async fn find_task_tags(&self, id: i64) -> Result<Vec<String>, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::fetch_task_in_transaction(&mut tx, id).await?;
        let tags = Self::find_task_tags_in_transaction(&mut tx, id).await?;
        tx.commit().await?;
        Ok(tags)
    }

    async fn find_section_tree(&self, section_id: i64) -> Result<Vec<TaskNode>, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::fetch_section_in_transaction(&mut tx, section_id).await?;
        let tree = Self::load_section_tree_in_transaction(&mut tx, section_id).await?;
        tx.commit().await?;
        Ok(tree)
    }

    async fn update_task(&self, id: i64, data: UpdateTaskData) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;
        let task = self.update_task_in_transaction(&mut tx, id, data).await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn move_task(&self, id: i64, data: MoveTaskData) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;
        let task = self.move_task_in_transaction(&mut tx, id, data).await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn complete_task(&self, id: i64) -> Result<CompletionResult, CoreError> {
        let mut tx = self.pool().begin().await?;
        let result = self.complete_task_in_transaction(&mut tx, id).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn uncomplete_task(&self, id: i64) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;
        let task = self.uncomplete_task_in_transaction(&mut tx, id).await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn delete_task(&self, id: i64) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::delete_task_in_transaction(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn pin_task(&self, id: i64) -> Result<Task, CoreError> {
        let mut tx = self.pool().begin().await?;
        let task = self.pin_task_in_transaction(&mut tx, id).await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn unpin_task(&self, id: i64) -> Result<Task, CoreError> {
        let task: Task = sqlx::query_as(
            "UPDATE tasks SET is_pinned = 0, updated_at = $1 WHERE id = $2 RETURNING *",
        )
        .bind(self.clock().now())
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| CoreError::task_not_found(id))?;

        info!(task_id = id, "unpinned task");
        Ok(task)
    }

    async fn open_subtask_count(&self, id: i64) -> Result<i64, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::fetch_task_in_transaction(&mut tx, id).await?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks WHERE parent_id = $1 AND is_completed = 0",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(count)
    }
}

impl SqliteRepository {
    /// Creates a task at the end of its sibling group.
    pub async fn create_task_in_transaction<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        data: NewTaskData,
    ) -> Result<Task, CoreError> {
        let title = validate_title(&data.title)?;
        data.recurrence.validate()?;

        let section_id = match data.parent_id {
            Some(parent_id) => {
                let parent = Self::fetch_task_in_transaction(tx, parent_id).await?;
                if let Some(section_id) = data.section_id {
                    if section_id != parent.section_id {
                        return Err(CoreError::InvalidInput(format!(
                            "Parent task {} belongs to section {}, not section {}",
                            parent_id, parent.section_id, section_id
                        )));
                    }
                }
                parent.section_id
            }
            None => {
                let section_id = data.section_id.ok_or_else(|| {
                    CoreError::InvalidInput("A task needs a section or a parent task".to_string())
                })?;
                Self::fetch_section_in_transaction(tx, section_id).await?;
                section_id
            }
        };

        let group = SiblingGroup::Tasks {
            section_id,
            parent_id: data.parent_id,
        };
        let position = Self::next_position_in_transaction(tx, group).await?;
        let now = self.clock().now();
        let completed_at = if data.is_completed {
            Some(data.completed_at.unwrap_or(now))
        } else {
            None
        };

        let task: Task = sqlx::query_as(
            r#"INSERT INTO tasks (section_id, parent_id, title, notes, priority, due_date, due_time,
                is_completed, completed_at, position, external_id, recurrence_type, recurrence_rule,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(section_id)
        .bind(data.parent_id)
        .bind(&title)
        .bind(&data.notes)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.due_time)
        .bind(data.is_completed)
        .bind(completed_at)
        .bind(position)
        .bind(&data.external_id)
        .bind(data.recurrence.kind())
        .bind(data.recurrence.rule().to_string())
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

        Self::attach_tags_in_transaction(tx, task.id, &data.tags).await?;

        info!(task_id = task.id, section_id, parent_id = ?task.parent_id, "created task");
        Ok(task)
    }

    pub async fn fetch_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        id: i64,
    ) -> Result<Task, CoreError> {
        Self::find_task_by_id_in_transaction(tx, id)
            .await?
            .ok_or_else(|| CoreError::task_not_found(id))
    }

    pub async fn find_task_by_id_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        id: i64,
    ) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(task)
    }

    pub async fn find_task_by_external_id_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        external_id: &str,
    ) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(task)
    }

    /// The first task in `section_id` with this title under this parent.
    pub async fn find_matching_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        section_id: i64,
        title: &str,
        parent_id: Option<i64>,
    ) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as(
            r#"SELECT * FROM tasks
            WHERE section_id = $1 AND title = $2 AND parent_id IS $3
            ORDER BY position, id
            LIMIT 1"#,
        )
        .bind(section_id)
        .bind(title)
        .bind(parent_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(task)
    }

    pub async fn update_task_in_transaction<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        id: i64,
        data: UpdateTaskData,
    ) -> Result<Task, CoreError> {
        Self::fetch_task_in_transaction(tx, id).await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET updated_at = ");
        qb.push_bind(self.clock().now());

        if let Some(title) = &data.title {
            qb.push(", title = ");
            qb.push_bind(validate_title(title)?);
        }

        if let Some(notes) = data.notes {
            qb.push(", notes = ");
            qb.push_bind(notes);
        }

        if let Some(priority) = data.priority {
            qb.push(", priority = ");
            qb.push_bind(priority);
        }

        if let Some(due_date) = data.due_date {
            qb.push(", due_date = ");
            qb.push_bind(due_date);
        }

        if let Some(due_time) = data.due_time {
            qb.push(", due_time = ");
            qb.push_bind(due_time);
        }

        if let Some(recurrence) = &data.recurrence {
            recurrence.validate()?;
            qb.push(", recurrence_type = ");
            qb.push_bind(recurrence.kind());
            qb.push(", recurrence_rule = ");
            qb.push_bind(recurrence.rule().to_string());
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.build().execute(&mut **tx).await?;

        Self::attach_tags_in_transaction(tx, id, &data.add_tags).await?;
        Self::detach_tags_in_transaction(tx, id, &data.remove_tags).await?;

        debug!(task_id = id, "updated task");
        Self::fetch_task_in_transaction(tx, id).await
    }

    /// Relocates a task, carrying its subtree along.
    ///
    /// The list, section and parent changes are applied in that order, then
    /// the optional position. A task whose sibling group changes without an
    /// explicit position goes to the end of its new group. Changing only the
    /// section detaches the task from a parent left behind in the old section.
    pub async fn move_task_in_transaction<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        id: i64,
        data: MoveTaskData,
    ) -> Result<Task, CoreError> {
        let task = Self::fetch_task_in_transaction(tx, id).await?;
        let mut section_id = task.section_id;
        let mut parent_id = task.parent_id;

        if let Some(list_id) = data.list_id {
            Self::fetch_list_in_transaction(tx, list_id).await?;
            let first_section: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM sections WHERE list_id = $1 ORDER BY position, id LIMIT 1",
            )
            .bind(list_id)
            .fetch_optional(&mut **tx)
            .await?;
            section_id = first_section.ok_or_else(|| {
                CoreError::InvalidInput(format!("List {} has no sections", list_id))
            })?;
            parent_id = None;
        }

        if let Some(target) = data.section_id {
            Self::fetch_section_in_transaction(tx, target).await?;
            section_id = target;
        }

        match data.parent_id {
            Some(Some(new_parent_id)) => {
                let parent = Self::fetch_task_in_transaction(tx, new_parent_id).await?;
                Self::ensure_not_ancestor_in_transaction(tx, id, new_parent_id).await?;
                parent_id = Some(parent.id);
                section_id = parent.section_id;
            }
            Some(None) => parent_id = None,
            None if section_id != task.section_id => parent_id = None,
            None => {}
        }

        if section_id != task.section_id {
            let from_list = Self::list_of_section_in_transaction(tx, task.section_id).await?;
            let to_list = Self::list_of_section_in_transaction(tx, section_id).await?;
            if from_list != to_list {
                let incoming = Self::open_pinned_in_subtree_in_transaction(tx, id).await?;
                Self::ensure_pin_capacity_in_transaction(tx, to_list, incoming).await?;
            }
        }

        let group = SiblingGroup::Tasks {
            section_id,
            parent_id,
        };
        let group_changed = section_id != task.section_id || parent_id != task.parent_id;
        let position = if group_changed {
            Self::next_position_in_transaction(tx, group).await?
        } else {
            task.position
        };

        sqlx::query(
            r#"UPDATE tasks
            SET section_id = $1, parent_id = $2, position = $3, updated_at = $4
            WHERE id = $5"#,
        )
        .bind(section_id)
        .bind(parent_id)
        .bind(position)
        .bind(self.clock().now())
        .bind(id)
        .execute(&mut **tx)
        .await?;

        if section_id != task.section_id {
            let moved = sqlx::query(
                r#"WITH RECURSIVE subtree(id) AS (
                    SELECT id FROM tasks WHERE parent_id = $1
                    UNION
                    SELECT t.id FROM tasks t JOIN subtree s ON t.parent_id = s.id
                )
                UPDATE tasks SET section_id = $2 WHERE id IN (SELECT id FROM subtree)"#,
            )
            .bind(id)
            .bind(section_id)
            .execute(&mut **tx)
            .await?;
            debug!(task_id = id, descendants = moved.rows_affected(), "moved subtree to section {}", section_id);
        }

        if let Some(index) = data.position {
            Self::reorder_in_transaction(tx, group, id, index).await?;
        }

        info!(task_id = id, section_id, parent_id = ?parent_id, "moved task");
        Self::fetch_task_in_transaction(tx, id).await
    }

    /// Fails with [`CoreError::CircularNesting`] if `task_id` is `candidate_parent`
    /// or one of its ancestors.
    pub async fn ensure_not_ancestor_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task_id: i64,
        candidate_parent: i64,
    ) -> Result<(), CoreError> {
        let circular = CoreError::CircularNesting {
            task_id,
            parent_id: candidate_parent,
        };
        let mut visited = HashSet::new();
        let mut current = Some(candidate_parent);

        while let Some(id) = current {
            if id == task_id || !visited.insert(id) || visited.len() > MAX_NESTING_WALK {
                return Err(circular);
            }
            let parent: Option<Option<i64>> =
                sqlx::query_scalar("SELECT parent_id FROM tasks WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut **tx)
                    .await?;
            current = parent.flatten();
        }
        Ok(())
    }

    /// Completes a task and every open task below it. A recurring task also
    /// spawns its next occurrence as a new sibling.
    pub async fn complete_task_in_transaction<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        id: i64,
    ) -> Result<CompletionResult, CoreError> {
        let task = Self::fetch_task_in_transaction(tx, id).await?;
        if task.is_completed {
            debug!(task_id = id, "task already completed");
            return Ok(CompletionResult::Single(task));
        }

        let now = self.clock().now();
        let completed: Task = sqlx::query_as(
            r#"UPDATE tasks
            SET is_completed = 1, completed_at = $1, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        let cascaded = sqlx::query(
            r#"WITH RECURSIVE subtree(id) AS (
                SELECT id FROM tasks WHERE parent_id = $1
                UNION
                SELECT t.id FROM tasks t JOIN subtree s ON t.parent_id = s.id
            )
            UPDATE tasks
            SET is_completed = 1, completed_at = $2, updated_at = $3
            WHERE id IN (SELECT id FROM subtree) AND is_completed = 0"#,
        )
        .bind(id)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        info!(task_id = id, descendants = cascaded.rows_affected(), "completed task");

        if !completed.recurrence.is_recurring() {
            return Ok(CompletionResult::Single(completed));
        }

        let today = self.clock().today();
        let Some(next_due) = compute_next_due_date(&completed.recurrence, completed.due_date, today)
        else {
            return Ok(CompletionResult::Single(completed));
        };

        let tags = Self::find_task_tags_in_transaction(tx, id).await?;
        let next = self
            .create_task_in_transaction(
                tx,
                NewTaskData {
                    section_id: Some(completed.section_id),
                    parent_id: completed.parent_id,
                    title: completed.title.clone(),
                    notes: completed.notes.clone(),
                    priority: completed.priority,
                    due_date: Some(next_due),
                    due_time: completed.due_time,
                    recurrence: completed.recurrence.clone(),
                    tags,
                    ..Default::default()
                },
            )
            .await?;

        info!(task_id = id, next_id = next.id, %next_due, "spawned next occurrence");
        Ok(CompletionResult::Recurring { completed, next })
    }

    /// Deletes a task; its subtree and tag links go with it.
    pub async fn delete_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        id: i64,
    ) -> Result<(), CoreError> {
        let result = sqlx::query(
            r#"WITH RECURSIVE subtree(id) AS (
                SELECT $1
                UNION
                SELECT t.id FROM tasks t JOIN subtree s ON t.parent_id = s.id
            )
            DELETE FROM tasks WHERE id IN (SELECT id FROM subtree)"#,
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::task_not_found(id));
        }
        info!(task_id = id, removed = result.rows_affected(), "deleted task");
        Ok(())
    }

    pub async fn pin_task_in_transaction<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        id: i64,
    ) -> Result<Task, CoreError> {
        let task = Self::fetch_task_in_transaction(tx, id).await?;
        if task.is_pinned {
            return Ok(task);
        }

        let list_id = Self::list_of_section_in_transaction(tx, task.section_id).await?;
        if !task.is_completed {
            Self::ensure_pin_capacity_in_transaction(tx, list_id, 1).await?;
        }

        let task = sqlx::query_as(
            "UPDATE tasks SET is_pinned = 1, updated_at = $1 WHERE id = $2 RETURNING *",
        )
        .bind(self.clock().now())
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        info!(task_id = id, list_id, "pinned task");
        Ok(task)
    }

    /// Reopens a task. Descendants keep their state. A pinned task takes a pin
    /// slot again, so reopening it is refused when its list is already full.
    pub async fn uncomplete_task_in_transaction<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        id: i64,
    ) -> Result<Task, CoreError> {
        let task = Self::fetch_task_in_transaction(tx, id).await?;
        if task.is_completed && task.is_pinned {
            let list_id = Self::list_of_section_in_transaction(tx, task.section_id).await?;
            Self::ensure_pin_capacity_in_transaction(tx, list_id, 1).await?;
        }

        let task = sqlx::query_as(
            r#"UPDATE tasks
            SET is_completed = 0, completed_at = NULL, updated_at = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(self.clock().now())
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        info!(task_id = id, "reopened task");
        Ok(task)
    }

    pub async fn list_of_section_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        section_id: i64,
    ) -> Result<i64, CoreError> {
        sqlx::query_scalar("SELECT list_id FROM sections WHERE id = $1")
            .bind(section_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| CoreError::section_not_found(section_id))
    }

    /// Open pinned tasks across every section of a list.
    pub async fn open_pinned_count_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        list_id: i64,
    ) -> Result<i64, CoreError> {
        let pinned = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM tasks t
            JOIN sections s ON s.id = t.section_id
            WHERE s.list_id = $1 AND t.is_pinned = 1 AND t.is_completed = 0"#,
        )
        .bind(list_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(pinned)
    }

    /// Open pinned tasks in the subtree rooted at `id`, the root included.
    async fn open_pinned_in_subtree_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        id: i64,
    ) -> Result<i64, CoreError> {
        let pinned = sqlx::query_scalar(
            r#"WITH RECURSIVE subtree(id) AS (
                SELECT $1
                UNION
                SELECT t.id FROM tasks t JOIN subtree s ON t.parent_id = s.id
            )
            SELECT COUNT(*) FROM tasks
            WHERE id IN (SELECT id FROM subtree) AND is_pinned = 1 AND is_completed = 0"#,
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(pinned)
    }

    /// Fails with [`CoreError::PinLimitExceeded`] unless `list_id` has room for
    /// `incoming` more open pinned tasks.
    pub async fn ensure_pin_capacity_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        list_id: i64,
        incoming: i64,
    ) -> Result<(), CoreError> {
        if incoming == 0 {
            return Ok(());
        }
        let pinned = Self::open_pinned_count_in_transaction(tx, list_id).await?;
        if pinned + incoming > MAX_PINNED_PER_LIST {
            return Err(CoreError::PinLimitExceeded {
                list_id,
                limit: MAX_PINNED_PER_LIST,
            });
        }
        Ok(())
    }

    /// Top-level tasks of a section in position order, each with its subtree.
    pub async fn load_section_tree_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        section_id: i64,
    ) -> Result<Vec<TaskNode>, CoreError> {
        let tasks: Vec<Task> =
            sqlx::query_as("SELECT * FROM tasks WHERE section_id = $1 ORDER BY position, id")
                .bind(section_id)
                .fetch_all(&mut **tx)
                .await?;

        let tag_rows: Vec<(i64, String)> = sqlx::query_as(
            r#"SELECT tt.task_id, g.name FROM task_tags tt
            JOIN tags g ON g.id = tt.tag_id
            JOIN tasks t ON t.id = tt.task_id
            WHERE t.section_id = $1
            ORDER BY g.name"#,
        )
        .bind(section_id)
        .fetch_all(&mut **tx)
        .await?;

        let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
        for (task_id, name) in tag_rows {
            tags.entry(task_id).or_default().push(name);
        }

        Ok(build_forest(tasks, tags))
    }
}

fn validate_title(title: &str) -> Result<String, CoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CoreError::InvalidInput("Task title cannot be empty".to_string()));
    }
    Ok(title.to_string())
}

/// Assembles position-ordered tasks into nodes rooted at the top level.
fn build_forest(tasks: Vec<Task>, mut tags: HashMap<i64, Vec<String>>) -> Vec<TaskNode> {
    let mut by_parent: HashMap<Option<i64>, Vec<Task>> = HashMap::new();
    for task in tasks {
        by_parent.entry(task.parent_id).or_default().push(task);
    }
    attach_children(None, &mut by_parent, &mut tags)
}

// Each parent's bucket is removed as it is consumed, so malformed data
// cannot make this revisit a node.
fn attach_children(
    parent_id: Option<i64>,
    by_parent: &mut HashMap<Option<i64>, Vec<Task>>,
    tags: &mut HashMap<i64, Vec<String>>,
) -> Vec<TaskNode> {
    let siblings = by_parent.remove(&parent_id).unwrap_or_default();
    let mut nodes = Vec::with_capacity(siblings.len());
    for task in siblings {
        let children = attach_children(Some(task.id), by_parent, tags);
        nodes.push(TaskNode {
            tags: tags.remove(&task.id).unwrap_or_default(),
            task,
            children,
        });
    }
    nodes
}
