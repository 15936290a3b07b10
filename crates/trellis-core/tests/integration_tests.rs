mod helpers;

use helpers::*;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use trellis_core::error::{CoreError, ErrorKind};
use trellis_core::models::{
    ExternalRecord, MoveTaskData, NewTaskData, TaskPriority, UpdateListData, UpdateTaskData,
};
use trellis_core::recurrence::Recurrence;
use trellis_core::repository::{
    IngestRepository, ListRepository, SectionRepository, TaskRepository, MAX_PINNED_PER_LIST,
};

#[tokio::test]
async fn test_list_and_section_workflow() {
    let (repo, _temp_dir) = setup_test_db().await;

    // Create lists; each is appended after the last
    let home = repo
        .create_list("Home".to_string(), "🏠".to_string(), None)
        .await
        .expect("Failed to create list");
    let work = repo
        .create_list("Work".to_string(), String::new(), None)
        .await
        .expect("Failed to create list");
    let errands = repo
        .create_list("Errands".to_string(), String::new(), None)
        .await
        .expect("Failed to create list");
    assert_eq!((home.position, work.position, errands.position), (10, 20, 30));

    // Move the last list to the front; the group is renumbered
    let lists = repo.move_list(errands.id, 0).await.expect("Failed to move list");
    let order: Vec<(&str, i64)> = lists.iter().map(|l| (l.name.as_str(), l.position)).collect();
    assert_eq!(order, vec![("Errands", 10), ("Home", 20), ("Work", 30)]);

    // Rename and attach to a project
    let renamed = repo
        .update_list(
            work.id,
            UpdateListData {
                name: Some("  Office ".to_string()),
                project_id: Some(Some(7)),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update list");
    assert_eq!(renamed.name, "Office");
    assert_eq!(renamed.project_id, Some(7));

    // Sections are ordered within their own list
    let backlog = repo
        .create_section(home.id, "Backlog".to_string(), String::new())
        .await
        .expect("Failed to create section");
    let doing = repo
        .create_section(home.id, "Doing".to_string(), String::new())
        .await
        .expect("Failed to create section");
    let other = repo
        .create_section(work.id, "Inbox".to_string(), String::new())
        .await
        .expect("Failed to create section");
    assert_eq!((backlog.position, doing.position, other.position), (10, 20, 10));

    let sections = repo.move_section(doing.id, 0).await.expect("Failed to move section");
    let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Doing", "Backlog"]);

    // Deleting a list removes its sections and tasks
    create_test_task(&repo, backlog.id, "Fix the sink").await;
    repo.delete_list(home.id).await.expect("Failed to delete list");
    assert!(repo.find_section_by_id(backlog.id).await.unwrap().is_none());
    assert_eq!(task_count(&repo).await, 0);
    assert!(repo.find_section_by_id(other.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_blank_names_and_missing_containers_are_rejected() {
    let (repo, _temp_dir) = setup_test_db().await;

    let err = repo
        .create_list("   ".to_string(), String::new(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = repo
        .create_section(404, "Backlog".to_string(), String::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = repo.delete_list(404).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_task_creation_workflow() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, section) = create_test_section(&repo, "Home", "Chores").await;

    let first = create_test_task(&repo, section.id, "Vacuum").await;
    let second = create_test_task(&repo, section.id, "Dust").await;
    let third = create_test_task(&repo, section.id, "Mop").await;
    assert_eq!((first.position, second.position, third.position), (10, 20, 30));

    // Subtasks start their own sibling group and inherit the parent's section
    let sub = create_test_subtask(&repo, first.id, "Empty the bag").await;
    assert_eq!(sub.section_id, section.id);
    assert_eq!(sub.parent_id, Some(first.id));
    assert_eq!(sub.position, 10);

    // Titles are trimmed; blank titles are rejected
    let trimmed = create_test_task(&repo, section.id, "  Windows  ").await;
    assert_eq!(trimmed.title, "Windows");
    let err = repo
        .add_task(NewTaskData {
            section_id: Some(section.id),
            title: "   ".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // A parent in a different section than the one requested
    let (_, elsewhere) = create_test_section(&repo, "Home", "Garden").await;
    let err = repo
        .add_task(NewTaskData {
            section_id: Some(elsewhere.id),
            parent_id: Some(first.id),
            title: "Misplaced".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Missing section or parent
    let err = repo
        .add_task(NewTaskData {
            section_id: Some(404),
            title: "Orphan".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(
        top_level_titles(&repo, section.id).await,
        vec!["Vacuum", "Dust", "Mop", "Windows"]
    );
}

#[tokio::test]
async fn test_task_update_workflow() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, section) = create_test_section(&repo, "Home", "Chores").await;
    let task = repo
        .add_task(NewTaskData {
            section_id: Some(section.id),
            title: "Pay rent".to_string(),
            tags: vec!["bills".to_string(), "monthly".to_string()],
            ..Default::default()
        })
        .await
        .expect("Failed to create task");

    let updated = repo
        .update_task(
            task.id,
            UpdateTaskData {
                notes: Some("Transfer by the 1st".to_string()),
                priority: Some(TaskPriority::High),
                due_date: Some(Some(date(2026, 3, 1))),
                recurrence: Some(Recurrence::Monthly { day_of_month: 1 }),
                add_tags: vec!["home".to_string()],
                remove_tags: vec!["monthly".to_string()],
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update task");

    assert_eq!(updated.title, "Pay rent");
    assert_eq!(updated.notes, "Transfer by the 1st");
    assert_eq!(updated.priority, TaskPriority::High);
    assert_eq!(updated.due_date, Some(date(2026, 3, 1)));
    assert_eq!(updated.recurrence, Recurrence::Monthly { day_of_month: 1 });
    assert_eq!(
        repo.find_task_tags(task.id).await.unwrap(),
        vec!["bills".to_string(), "home".to_string()]
    );

    // Clearing the due date
    let cleared = repo
        .update_task(
            task.id,
            UpdateTaskData {
                due_date: Some(None),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to clear due date");
    assert_eq!(cleared.due_date, None);

    // An invalid rule is rejected and nothing changes
    let err = repo
        .update_task(
            task.id,
            UpdateTaskData {
                title: Some("Renamed".to_string()),
                recurrence: Some(Recurrence::Weekly {
                    days: BTreeSet::new(),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidRecurrence(_)));
    let unchanged = get_task(&repo, task.id).await;
    assert_eq!(unchanged.title, "Pay rent");
    assert_eq!(unchanged.recurrence, Recurrence::Monthly { day_of_month: 1 });
}

#[tokio::test]
async fn test_reorder_within_sibling_group() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, section) = create_test_section(&repo, "Home", "Chores").await;
    let a = create_test_task(&repo, section.id, "A").await;
    let b = create_test_task(&repo, section.id, "B").await;
    let c = create_test_task(&repo, section.id, "C").await;

    repo.move_task(
        c.id,
        MoveTaskData {
            position: Some(0),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to reorder task");
    assert_eq!(top_level_titles(&repo, section.id).await, vec!["C", "A", "B"]);

    // Past-the-end indices clamp to the back
    repo.move_task(
        c.id,
        MoveTaskData {
            position: Some(99),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to reorder task");
    assert_eq!(top_level_titles(&repo, section.id).await, vec!["A", "B", "C"]);

    let positions: Vec<i64> = vec![
        get_task(&repo, a.id).await.position,
        get_task(&repo, b.id).await.position,
        get_task(&repo, c.id).await.position,
    ];
    assert_eq!(positions, vec![10, 20, 30]);
}

#[tokio::test]
async fn test_move_subtree_between_sections() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, backlog) = create_test_section(&repo, "Home", "Backlog").await;
    let (_, doing) = create_test_section(&repo, "Home", "Doing").await;

    let existing = create_test_task(&repo, doing.id, "Already here").await;
    let parent = create_test_task(&repo, backlog.id, "Paint the fence").await;
    let child = create_test_subtask(&repo, parent.id, "Buy paint").await;
    let grandchild = create_test_subtask(&repo, child.id, "Pick a colour").await;

    let moved = repo
        .move_task(
            parent.id,
            MoveTaskData {
                section_id: Some(doing.id),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to move task");

    // Appended at the end of the new group; the subtree follows
    assert_eq!(moved.section_id, doing.id);
    assert!(moved.position > existing.position);
    assert_eq!(get_task(&repo, child.id).await.section_id, doing.id);
    assert_eq!(get_task(&repo, grandchild.id).await.section_id, doing.id);
    assert_eq!(get_task(&repo, grandchild.id).await.parent_id, Some(child.id));
    assert!(repo.find_section_tree(backlog.id).await.unwrap().is_empty());

    // Nesting under a task in another section moves the subtree too
    let host = create_test_task(&repo, backlog.id, "Weekend").await;
    repo.move_task(
        parent.id,
        MoveTaskData {
            parent_id: Some(Some(host.id)),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to nest task");
    for id in [parent.id, child.id, grandchild.id] {
        assert_eq!(get_task(&repo, id).await.section_id, backlog.id);
    }
    let tree = repo.find_section_tree(backlog.id).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].subtree_size(), 4);

    // Detaching to the top level appends after the existing top-level tasks
    let detached = repo
        .move_task(
            child.id,
            MoveTaskData {
                parent_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to detach task");
    assert_eq!(detached.parent_id, None);
    assert_eq!(top_level_titles(&repo, backlog.id).await, vec!["Weekend", "Buy paint"]);
}

#[tokio::test]
async fn test_move_to_list_uses_first_section() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, inbox) = create_test_section(&repo, "Home", "Inbox").await;
    let (work, first) = create_test_section(&repo, "Work", "Today").await;
    create_test_section(&repo, "Work", "Later").await;
    let empty = repo
        .create_list("Empty".to_string(), String::new(), None)
        .await
        .expect("Failed to create list");

    let parent = create_test_task(&repo, inbox.id, "Parent").await;
    let task = create_test_subtask(&repo, parent.id, "Send invoice").await;

    let moved = repo
        .move_task(
            task.id,
            MoveTaskData {
                list_id: Some(work.id),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to move task to list");
    assert_eq!(moved.section_id, first.id);
    assert_eq!(moved.parent_id, None);

    let err = repo
        .move_task(
            task.id,
            MoveTaskData {
                list_id: Some(empty.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(get_task(&repo, task.id).await.section_id, first.id);
}

#[tokio::test]
async fn test_circular_nesting_is_rejected() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, section) = create_test_section(&repo, "Home", "Chores").await;
    let root = create_test_task(&repo, section.id, "Root").await;
    let child = create_test_subtask(&repo, root.id, "Child").await;
    let grandchild = create_test_subtask(&repo, child.id, "Grandchild").await;

    for target in [root.id, child.id, grandchild.id] {
        let err = repo
            .move_task(
                root.id,
                MoveTaskData {
                    parent_id: Some(Some(target)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, CoreError::CircularNesting { task_id, parent_id } if task_id == root.id && parent_id == target)
        );
        assert!(err.is_conflict());
    }

    // Nothing moved
    let root_after = get_task(&repo, root.id).await;
    assert_eq!(root_after.parent_id, None);
    assert_eq!(root_after.position, root.position);
    assert_eq!(get_task(&repo, grandchild.id).await.parent_id, Some(child.id));

    // Moving a task under a sibling's subtree is fine
    let sibling = create_test_task(&repo, section.id, "Sibling").await;
    repo.move_task(
        sibling.id,
        MoveTaskData {
            parent_id: Some(Some(grandchild.id)),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to nest sibling");
    assert_eq!(child_titles(&repo, grandchild.id).await, vec!["Sibling"]);
}

#[tokio::test]
async fn test_completion_cascades_to_open_descendants() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, section) = create_test_section(&repo, "Home", "Chores").await;
    let parent = create_test_task(&repo, section.id, "Spring clean").await;
    let child = create_test_subtask(&repo, parent.id, "Kitchen").await;
    let done_earlier = chrono::DateTime::parse_from_rfc3339("2026-01-05T08:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let grandchild = repo
        .add_task(NewTaskData {
            parent_id: Some(child.id),
            title: "Oven".to_string(),
            is_completed: true,
            completed_at: Some(done_earlier),
            ..Default::default()
        })
        .await
        .expect("Failed to create completed subtask");
    create_test_subtask(&repo, child.id, "Fridge").await;

    assert_eq!(repo.open_subtask_count(child.id).await.unwrap(), 1);

    let result = repo.complete_task(parent.id).await.expect("Failed to complete task");
    assert!(result.next().is_none());
    let completed = result.completed();
    assert!(completed.is_completed);
    let stamp = completed.completed_at.expect("completion time");

    let child_after = get_task(&repo, child.id).await;
    assert!(child_after.is_completed);
    assert_eq!(child_after.completed_at, Some(stamp));

    // Already-completed descendants keep their original timestamp
    let grandchild_after = get_task(&repo, grandchild.id).await;
    assert_eq!(grandchild_after.completed_at, Some(done_earlier));
    assert_eq!(repo.open_subtask_count(child.id).await.unwrap(), 0);

    // Reopening does not cascade
    let reopened = repo.uncomplete_task(parent.id).await.expect("Failed to reopen task");
    assert!(!reopened.is_completed);
    assert_eq!(reopened.completed_at, None);
    assert!(get_task(&repo, child.id).await.is_completed);
}

#[tokio::test]
async fn test_recurring_completion_spawns_next_occurrence() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, section) = create_test_section(&repo, "Home", "Chores").await;
    let daily = repo
        .add_task(NewTaskData {
            section_id: Some(section.id),
            title: "Water plants".to_string(),
            notes: "Balcony too".to_string(),
            priority: TaskPriority::Low,
            due_date: Some(today()),
            recurrence: Recurrence::Daily,
            tags: vec!["garden".to_string()],
            ..Default::default()
        })
        .await
        .expect("Failed to create recurring task");
    let later = create_test_task(&repo, section.id, "Later").await;

    let result = repo.complete_task(daily.id).await.expect("Failed to complete task");
    let next = result.next().expect("next occurrence");
    assert_eq!(next.due_date, Some(date(2026, 2, 21)));
    assert_eq!(next.title, "Water plants");
    assert_eq!(next.notes, "Balcony too");
    assert_eq!(next.priority, TaskPriority::Low);
    assert_eq!(next.recurrence, Recurrence::Daily);
    assert_eq!(next.section_id, section.id);
    assert_eq!(next.parent_id, None);
    assert!(!next.is_completed);
    assert!(next.position > later.position);
    assert_eq!(repo.find_task_tags(next.id).await.unwrap(), vec!["garden".to_string()]);

    // Completing the same task again is a no-op
    let again = repo.complete_task(daily.id).await.expect("Failed to recomplete task");
    assert!(again.next().is_none());
    assert_eq!(task_count(&repo).await, 3);
}

#[tokio::test]
async fn test_monthly_recurrence_clamps_to_month_end() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, section) = create_test_section(&repo, "Home", "Bills").await;
    let rent = repo
        .add_task(NewTaskData {
            section_id: Some(section.id),
            title: "Rent".to_string(),
            due_date: Some(date(2026, 1, 31)),
            recurrence: Recurrence::Monthly { day_of_month: 31 },
            ..Default::default()
        })
        .await
        .expect("Failed to create recurring task");

    let result = repo.complete_task(rent.id).await.expect("Failed to complete task");
    assert_eq!(result.next().and_then(|t| t.due_date), Some(date(2026, 2, 28)));
}

#[tokio::test]
async fn test_recurring_subtask_stays_under_parent() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, section) = create_test_section(&repo, "Home", "Chores").await;
    let parent = create_test_task(&repo, section.id, "Routine").await;
    let weekly = repo
        .add_task(NewTaskData {
            parent_id: Some(parent.id),
            title: "Laundry".to_string(),
            due_date: Some(today()),
            recurrence: Recurrence::Weekly {
                days: [0, 3].into_iter().collect(),
            },
            ..Default::default()
        })
        .await
        .expect("Failed to create recurring subtask");

    let result = repo.complete_task(weekly.id).await.expect("Failed to complete task");
    // 2026-02-20 is a Friday; the next Monday is the 23rd
    let next = result.next().expect("next occurrence");
    assert_eq!(next.due_date, Some(date(2026, 2, 23)));
    assert_eq!(next.parent_id, Some(parent.id));
    assert_eq!(child_titles(&repo, parent.id).await, vec!["Laundry", "Laundry"]);
}

#[tokio::test]
async fn test_pin_limit_per_list() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (list, today_section) = create_test_section(&repo, "Work", "Today").await;
    let (_, later_section) = create_test_section(&repo, "Work", "Later").await;
    let (_, other_section) = create_test_section(&repo, "Home", "Chores").await;

    let mut tasks = Vec::new();
    for (section_id, title) in [
        (today_section.id, "One"),
        (today_section.id, "Two"),
        (later_section.id, "Three"),
        (later_section.id, "Four"),
    ] {
        tasks.push(create_test_task(&repo, section_id, title).await);
    }

    for task in &tasks[..MAX_PINNED_PER_LIST as usize] {
        let pinned = repo.pin_task(task.id).await.expect("Failed to pin task");
        assert!(pinned.is_pinned);
    }

    let err = repo.pin_task(tasks[3].id).await.unwrap_err();
    assert!(matches!(err, CoreError::PinLimitExceeded { list_id, limit: 3 } if list_id == list.id));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // The limit is per list
    let elsewhere = create_test_task(&repo, other_section.id, "Elsewhere").await;
    repo.pin_task(elsewhere.id).await.expect("Failed to pin in another list");

    // Re-pinning is a no-op even at the limit
    repo.pin_task(tasks[0].id).await.expect("Re-pin should succeed");

    // Unpinning frees a slot
    repo.unpin_task(tasks[0].id).await.expect("Failed to unpin task");
    repo.pin_task(tasks[3].id).await.expect("Failed to pin after unpin");

    // Completed pinned tasks do not count
    repo.complete_task(tasks[1].id).await.expect("Failed to complete task");
    repo.pin_task(tasks[0].id).await.expect("Failed to pin after completion");
}

#[tokio::test]
async fn test_moves_into_a_full_list_respect_pin_limit() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (work, today_section) = create_test_section(&repo, "Work", "Today").await;
    let (_, chores) = create_test_section(&repo, "Home", "Chores").await;
    let (_, garden) = create_test_section(&repo, "Home", "Garden").await;

    for title in ["A", "B", "C"] {
        let task = create_test_task(&repo, today_section.id, title).await;
        repo.pin_task(task.id).await.expect("Failed to pin task");
    }
    let stray = create_test_task(&repo, chores.id, "X").await;
    repo.pin_task(stray.id).await.expect("Failed to pin task");

    let to_section = MoveTaskData {
        section_id: Some(today_section.id),
        ..Default::default()
    };
    let err = repo.move_task(stray.id, to_section.clone()).await.unwrap_err();
    assert!(matches!(err, CoreError::PinLimitExceeded { list_id, .. } if list_id == work.id));

    let to_list = MoveTaskData {
        list_id: Some(work.id),
        ..Default::default()
    };
    let err = repo.move_task(stray.id, to_list).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(get_task(&repo, stray.id).await.section_id, chores.id);

    // Pinned descendants travel with their subtree
    let parent = create_test_task(&repo, chores.id, "Parent").await;
    let child = create_test_subtask(&repo, parent.id, "Pinned child").await;
    repo.pin_task(child.id).await.expect("Failed to pin subtask");
    let err = repo.move_task(parent.id, to_section.clone()).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(get_task(&repo, child.id).await.section_id, chores.id);

    // Moving within the same list never counts against it
    repo.move_task(
        stray.id,
        MoveTaskData {
            section_id: Some(garden.id),
            ..Default::default()
        },
    )
    .await
    .expect("Move within a list should succeed");

    // A completed pinned task takes no slot
    repo.complete_task(stray.id).await.expect("Failed to complete task");
    let moved = repo
        .move_task(stray.id, to_section)
        .await
        .expect("Completed pinned task should move");
    assert_eq!(moved.section_id, today_section.id);
}

#[tokio::test]
async fn test_reopening_pinned_task_respects_pin_limit() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, section) = create_test_section(&repo, "Work", "Today").await;

    let mut tasks = Vec::new();
    for title in ["One", "Two", "Three", "Four"] {
        tasks.push(create_test_task(&repo, section.id, title).await);
    }
    for task in &tasks[..3] {
        repo.pin_task(task.id).await.expect("Failed to pin task");
    }

    repo.complete_task(tasks[2].id).await.expect("Failed to complete task");
    repo.pin_task(tasks[3].id).await.expect("Freed slot should be usable");

    let err = repo.uncomplete_task(tasks[2].id).await.unwrap_err();
    assert!(matches!(err, CoreError::PinLimitExceeded { limit: 3, .. }));
    assert!(get_task(&repo, tasks[2].id).await.is_completed);

    repo.unpin_task(tasks[3].id).await.expect("Failed to unpin task");
    let reopened = repo.uncomplete_task(tasks[2].id).await.expect("Failed to reopen task");
    assert!(!reopened.is_completed);
    assert!(reopened.is_pinned);

    // Reopening an unpinned task is never limited
    repo.complete_task(tasks[3].id).await.expect("Failed to complete task");
    repo.uncomplete_task(tasks[3].id).await.expect("Unpinned task should reopen");
}

#[tokio::test]
async fn test_delete_removes_subtree() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, section) = create_test_section(&repo, "Home", "Chores").await;
    let keep = create_test_task(&repo, section.id, "Keep").await;
    let doomed = repo
        .add_task(NewTaskData {
            section_id: Some(section.id),
            title: "Doomed".to_string(),
            tags: vec!["temp".to_string()],
            ..Default::default()
        })
        .await
        .expect("Failed to create task");
    let child = create_test_subtask(&repo, doomed.id, "Child").await;
    create_test_subtask(&repo, child.id, "Grandchild").await;
    let last = create_test_task(&repo, section.id, "Last").await;

    repo.delete_task(doomed.id).await.expect("Failed to delete task");

    assert_eq!(task_count(&repo).await, 2);
    assert!(repo.find_task_by_id(child.id).await.unwrap().is_none());
    // Remaining siblings keep their positions
    assert_eq!(get_task(&repo, keep.id).await.position, keep.position);
    assert_eq!(get_task(&repo, last.id).await.position, last.position);

    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM task_tags")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(links, 0);

    let err = repo.delete_task(doomed.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_ingest_is_idempotent() {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, inbox) = create_test_section(&repo, "Inbox", "Mail").await;
    let records = vec![
        ExternalRecord {
            title: "Invoice #42".to_string(),
            notes: "From accounting".to_string(),
            external_id: "msg-1".to_string(),
        },
        ExternalRecord {
            title: "   ".to_string(),
            notes: String::new(),
            external_id: "msg-2".to_string(),
        },
        ExternalRecord {
            title: "No id".to_string(),
            notes: String::new(),
            external_id: String::new(),
        },
    ];

    let first = repo
        .ingest_external(inbox.id, records.clone())
        .await
        .expect("Failed to ingest");
    assert_eq!((first.created, first.skipped), (2, 1));

    let second = repo.ingest_external(inbox.id, records).await.expect("Failed to ingest");
    assert_eq!((second.created, second.skipped), (0, 3));

    assert_eq!(
        top_level_titles(&repo, inbox.id).await,
        vec!["Invoice #42", "(no subject)"]
    );
}

/// Builds a random forest in one section and applies random nest requests,
/// checking each outcome against an in-memory model of the parent links.
async fn run_nesting_scenario(parents: Vec<Option<usize>>, moves: Vec<(usize, usize)>) {
    let (repo, _temp_dir) = setup_test_db().await;
    let (_, section) = create_test_section(&repo, "Fuzz", "Tree").await;

    let mut ids = Vec::with_capacity(parents.len());
    let mut model: HashMap<i64, Option<i64>> = HashMap::new();
    for (index, parent) in parents.iter().enumerate() {
        let parent_id = parent.map(|p| ids[p % ids.len()]);
        let task = repo
            .add_task(NewTaskData {
                section_id: Some(section.id),
                parent_id,
                title: format!("task {}", index),
                ..Default::default()
            })
            .await
            .expect("Failed to create task");
        model.insert(task.id, parent_id);
        ids.push(task.id);
    }

    for (from, to) in moves {
        let task_id = ids[from % ids.len()];
        let target = ids[to % ids.len()];

        // Legal iff task_id is not on the target's ancestor chain
        let mut cursor = Some(target);
        let mut legal = true;
        while let Some(id) = cursor {
            if id == task_id {
                legal = false;
                break;
            }
            cursor = model[&id];
        }

        let result = repo
            .move_task(
                task_id,
                MoveTaskData {
                    parent_id: Some(Some(target)),
                    ..Default::default()
                },
            )
            .await;
        if legal {
            result.expect("legal move failed");
            model.insert(task_id, Some(target));
        } else {
            assert!(matches!(result, Err(CoreError::CircularNesting { .. })));
        }

        for id in &ids {
            assert_eq!(get_task(&repo, *id).await.parent_id, model[id]);
        }
    }

    let tree = repo.find_section_tree(section.id).await.unwrap();
    let reachable: usize = tree.iter().map(|node| node.subtree_size()).sum();
    assert_eq!(reachable, ids.len());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_nesting_never_creates_cycles(
        parents in prop::collection::vec(prop::option::of(0usize..8), 1..8),
        moves in prop::collection::vec((0usize..8, 0usize..8), 1..12),
    ) {
        // The first task has nothing to attach to
        let mut parents = parents;
        parents[0] = None;
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(run_nesting_scenario(parents, moves));
    }
}
