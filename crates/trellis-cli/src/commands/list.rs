use anyhow::Result;
use owo_colors::OwoColorize;
use trellis_core::models::UpdateListData;
use trellis_core::repository::Repository;

use crate::cli::{ListCommand, ListSubcommand};
use crate::commands::confirm;
use crate::util::resolve_list;
use crate::views::table::display_lists;

pub async fn list_command(repo: &impl Repository, command: ListCommand) -> Result<()> {
    match command.command {
        ListSubcommand::Add(cmd) => {
            let list = repo.create_list(cmd.name, cmd.emoji, None).await?;
            println!(
                "{} Created list: {} (ID {})",
                "✓".green().bold(),
                list.name.bright_white().bold(),
                list.id.yellow()
            );
        }
        ListSubcommand::Ls => {
            let lists = repo.find_lists().await?;
            display_lists(&lists);
        }
        ListSubcommand::Edit(cmd) => {
            let list = resolve_list(repo, &cmd.list).await?;
            let updated = repo
                .update_list(
                    list.id,
                    UpdateListData {
                        name: cmd.name,
                        emoji: cmd.emoji,
                        project_id: None,
                    },
                )
                .await?;
            println!("{} Updated list: {}", "✓".green().bold(), updated.name);
        }
        ListSubcommand::Move(cmd) => {
            let list = resolve_list(repo, &cmd.list).await?;
            let lists = repo.move_list(list.id, cmd.index).await?;
            display_lists(&lists);
        }
        ListSubcommand::Delete(cmd) => {
            let list = resolve_list(repo, &cmd.list).await?;
            let prompt = format!(
                "Delete list '{}' with all of its sections and tasks?",
                list.name
            );
            if confirm(cmd.force, prompt) {
                repo.delete_list(list.id).await?;
                println!("Deleted list: {}", list.name);
            }
        }
    }
    Ok(())
}
