use anyhow::Result;
use owo_colors::OwoColorize;
use trellis_core::models::UpdateSectionData;
use trellis_core::repository::Repository;

use crate::cli::{SectionCommand, SectionSubcommand};
use crate::commands::confirm;
use crate::util::{resolve_list, resolve_section};
use crate::views::table::display_sections;

pub async fn section_command(repo: &impl Repository, command: SectionCommand) -> Result<()> {
    match command.command {
        SectionSubcommand::Add(cmd) => {
            let list = resolve_list(repo, &cmd.list).await?;
            let section = repo.create_section(list.id, cmd.name, cmd.emoji).await?;
            println!(
                "{} Created section: {} in {} (ID {})",
                "✓".green().bold(),
                section.name.bright_white().bold(),
                list.name,
                section.id.yellow()
            );
        }
        SectionSubcommand::Ls(cmd) => {
            let list = resolve_list(repo, &cmd.list).await?;
            let sections = repo.find_sections(list.id).await?;
            display_sections(&sections);
        }
        SectionSubcommand::Edit(cmd) => {
            let list = resolve_list(repo, &cmd.list).await?;
            let section = resolve_section(repo, &list, &cmd.section).await?;
            let updated = repo
                .update_section(
                    section.id,
                    UpdateSectionData {
                        name: cmd.name,
                        emoji: cmd.emoji,
                    },
                )
                .await?;
            println!("{} Updated section: {}", "✓".green().bold(), updated.name);
        }
        SectionSubcommand::Move(cmd) => {
            let list = resolve_list(repo, &cmd.list).await?;
            let section = resolve_section(repo, &list, &cmd.section).await?;
            let sections = repo.move_section(section.id, cmd.index).await?;
            display_sections(&sections);
        }
        SectionSubcommand::Delete(cmd) => {
            let list = resolve_list(repo, &cmd.list).await?;
            let section = resolve_section(repo, &list, &cmd.section).await?;
            let prompt = format!("Delete section '{}' with all of its tasks?", section.name);
            if confirm(cmd.force, prompt) {
                repo.delete_section(section.id).await?;
                println!("Deleted section: {}", section.name);
            }
        }
    }
    Ok(())
}
