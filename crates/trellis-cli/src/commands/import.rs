use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use trellis_core::repository::Repository;

use crate::cli::ImportCommand;
use crate::views::table::display_import_stats;

pub async fn import_file(repo: &impl Repository, command: ImportCommand) -> Result<()> {
    let bytes = std::fs::read(&command.file)
        .with_context(|| format!("Failed to read {}", command.file.display()))?;
    let file_name = command
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stats = repo.import_file(&file_name, &bytes).await?;

    let marker = if stats.errors == 0 {
        "✓".green().bold().to_string()
    } else {
        "!".yellow().bold().to_string()
    };
    println!("{} Imported {}", marker, command.file.display());
    display_import_stats(&stats);
    Ok(())
}
