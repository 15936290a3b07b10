use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};
use owo_colors::{OwoColorize, Style};
use trellis_core::error::CoreError;
use trellis_core::models::{
    CompletionResult, MoveTaskData, NewTaskData, Task, TaskList, UpdateTaskData,
};
use trellis_core::recurrence::Recurrence;
use trellis_core::repository::Repository;

use crate::cli::{
    AddTaskCommand, EditTaskCommand, MoveTaskCommand, ShowTasksCommand, TaskCommand,
    TaskSubcommand,
};
use crate::commands::confirm;
use crate::parser::{parse_due_date, parse_recurrence, parse_time_string};
use crate::util::{get_task, resolve_list, resolve_section};
use crate::views::tree::display_section_tree;

pub async fn task_command(repo: &impl Repository, command: TaskCommand) -> Result<()> {
    match command.command {
        TaskSubcommand::Add(cmd) => add_task(repo, cmd).await,
        TaskSubcommand::Show(cmd) => show_tasks(repo, cmd).await,
        TaskSubcommand::Edit(cmd) => edit_task(repo, cmd).await,
        TaskSubcommand::Move(cmd) => move_task(repo, cmd).await,
        TaskSubcommand::Done(cmd) => complete_task(repo, cmd.id).await,
        TaskSubcommand::Undo(cmd) => {
            let task = repo.uncomplete_task(cmd.id).await?;
            println!("Reopened task: '{}'", task.title);
            Ok(())
        }
        TaskSubcommand::Pin(cmd) => {
            let task = repo.pin_task(cmd.id).await?;
            println!("{} Pinned task: '{}'", "📌".yellow(), task.title);
            Ok(())
        }
        TaskSubcommand::Unpin(cmd) => {
            let task = repo.unpin_task(cmd.id).await?;
            println!("Unpinned task: '{}'", task.title);
            Ok(())
        }
        TaskSubcommand::Delete(cmd) => {
            let task = get_task(repo, cmd.id).await?;
            let open = repo.open_subtask_count(task.id).await?;
            let prompt = if open > 0 {
                format!(
                    "Delete task '{}' and its subtasks ({} still open)?",
                    task.title, open
                )
            } else {
                format!("Delete task '{}'?", task.title)
            };
            if confirm(cmd.force, prompt) {
                repo.delete_task(task.id).await?;
                println!("Deleted task: '{}'", task.title);
            }
            Ok(())
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn add_task(repo: &impl Repository, command: AddTaskCommand) -> Result<()> {
    let section_id = match &command.list {
        Some(list) => {
            let list = resolve_list(repo, list).await?;
            let section = match &command.section {
                Some(section) => resolve_section(repo, &list, section).await?,
                None => repo
                    .find_sections(list.id)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        anyhow!(CoreError::InvalidInput(format!(
                            "List '{}' has no sections; add one with `trellis section add`",
                            list.name
                        )))
                    })?,
            };
            Some(section.id)
        }
        None => None,
    };

    let due_date = command.due.as_deref().map(parse_due_date).transpose()?;
    let due_time = command.at.as_deref().map(parse_time_string).transpose()?;
    let recurrence = parse_recurrence(&command.repeat, due_date.unwrap_or_else(today))?
        .unwrap_or_default();

    let task = repo
        .add_task(NewTaskData {
            section_id,
            parent_id: command.parent,
            title: command.title,
            notes: command.notes,
            priority: command.priority.unwrap_or_default(),
            due_date,
            due_time,
            recurrence,
            tags: command.tag,
            ..Default::default()
        })
        .await?;

    print_created(&task);
    Ok(())
}

fn print_created(task: &Task) {
    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();

    let label = if task.recurrence.is_recurring() {
        "Created recurring task:"
    } else {
        "Created task:"
    };
    println!(
        "{} {} {}",
        "✓".style(success_style),
        label,
        task.title.bright_white().bold()
    );
    println!("  {} Task ID: {}", "→".style(info_style), task.id.yellow());
    if let Some(due) = task.due_date {
        let time = task
            .due_time
            .map(|t| format!(" {}", t.format("%H:%M")))
            .unwrap_or_default();
        println!("  {} Due: {}{}", "→".style(info_style), due.cyan(), time.cyan());
    }
    if task.recurrence.is_recurring() {
        println!("  {} Repeats {}", "→".style(info_style), task.recurrence);
    }
}

async fn show_tasks(repo: &impl Repository, command: ShowTasksCommand) -> Result<()> {
    let list = resolve_list(repo, &command.list).await?;
    let sections = match &command.section {
        Some(section) => vec![resolve_section(repo, &list, section).await?],
        None => repo.find_sections(list.id).await?,
    };

    if sections.is_empty() {
        println!("List '{}' has no sections.", list.name);
        return Ok(());
    }

    for section in &sections {
        let tree = repo.find_section_tree(section.id).await?;
        display_section_tree(section, &tree, command.open);
    }
    Ok(())
}

async fn edit_task(repo: &impl Repository, command: EditTaskCommand) -> Result<()> {
    let task = get_task(repo, command.id).await?;

    let due_date = if command.due_clear {
        Some(None)
    } else {
        command
            .due
            .as_deref()
            .map(parse_due_date)
            .transpose()?
            .map(Some)
    };
    let due_time = if command.at_clear {
        Some(None)
    } else {
        command
            .at
            .as_deref()
            .map(parse_time_string)
            .transpose()?
            .map(Some)
    };

    let recurrence = if command.repeat_clear {
        Some(Recurrence::None)
    } else {
        let anchor = due_date.flatten().or(task.due_date).unwrap_or_else(today);
        parse_recurrence(&command.repeat, anchor)?
    };

    let data = UpdateTaskData {
        title: command.title,
        notes: command.notes,
        priority: command.priority,
        due_date,
        due_time,
        recurrence,
        add_tags: command.add_tag,
        remove_tags: command.remove_tag,
    };
    if data.is_empty() {
        return Err(anyhow!("Nothing to change. Pass at least one field to edit."));
    }

    let updated = repo.update_task(task.id, data).await?;
    println!("{} Updated task: '{}'", "✓".green().bold(), updated.title);
    Ok(())
}

async fn move_task(repo: &impl Repository, command: MoveTaskCommand) -> Result<()> {
    let task = get_task(repo, command.id).await?;

    let target_list = match &command.list {
        Some(list) => Some(resolve_list(repo, list).await?),
        None => None,
    };
    let section_id = match &command.section {
        Some(section) => {
            let list = match &target_list {
                Some(list) => list.clone(),
                None => current_list(repo, &task).await?,
            };
            Some(resolve_section(repo, &list, section).await?.id)
        }
        None => None,
    };
    // A named section already pins the list
    let list_id = match section_id {
        Some(_) => None,
        None => target_list.map(|list| list.id),
    };

    let parent_id = if command.top_level {
        Some(None)
    } else {
        command.parent.map(Some)
    };

    let moved = repo
        .move_task(
            task.id,
            MoveTaskData {
                list_id,
                section_id,
                parent_id,
                position: command.position,
            },
        )
        .await?;

    let placement = match moved.parent_id {
        Some(parent) => format!("under task {}", parent),
        None => format!("to the top level of section {}", moved.section_id),
    };
    println!(
        "{} Moved task '{}' {} (position {})",
        "✓".green().bold(),
        moved.title,
        placement,
        moved.position
    );
    Ok(())
}

async fn current_list(repo: &impl Repository, task: &Task) -> Result<TaskList> {
    let section = repo
        .find_section_by_id(task.section_id)
        .await?
        .ok_or_else(|| anyhow!(CoreError::NotFound(format!("Section {} not found", task.section_id))))?;
    repo.find_list_by_id(section.list_id)
        .await?
        .ok_or_else(|| anyhow!(CoreError::NotFound(format!("List {} not found", section.list_id))))
}

async fn complete_task(repo: &impl Repository, id: i64) -> Result<()> {
    match repo.complete_task(id).await? {
        CompletionResult::Single(task) => {
            println!("{} Completed task: '{}'", "✓".green().bold(), task.title);
        }
        CompletionResult::Recurring { completed, next } => {
            println!("{} Completed task: '{}'", "✓".green().bold(), completed.title);
            match next.due_date {
                Some(due) => println!(
                    "  {} Next occurrence (ID {}) due {}",
                    "↻".blue(),
                    next.id.yellow(),
                    due.cyan()
                ),
                None => println!("  {} Next occurrence (ID {})", "↻".blue(), next.id.yellow()),
            }
        }
    }
    Ok(())
}
