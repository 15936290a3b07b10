use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tracing::debug;
use trellis_core::models::{ExternalRecord, Section};
use trellis_core::repository::Repository;

use crate::cli::IngestCommand;
use crate::config::Config;

/// Finds the target section by name, creating the list and section on first use.
async fn ensure_section(repo: &impl Repository, list_name: &str, section_name: &str) -> Result<Section> {
    let list = match repo.find_list_by_name(list_name).await? {
        Some(list) => list,
        None => {
            debug!(list = list_name, "creating ingest list");
            repo.create_list(list_name.to_string(), String::new(), None).await?
        }
    };
    let section = match repo.find_section_by_name(list.id, section_name).await? {
        Some(section) => section,
        None => {
            debug!(section = section_name, "creating ingest section");
            repo.create_section(list.id, section_name.to_string(), String::new())
                .await?
        }
    };
    Ok(section)
}

pub async fn ingest_records(repo: &impl Repository, command: IngestCommand, config: &Config) -> Result<()> {
    let raw = std::fs::read_to_string(&command.file)
        .with_context(|| format!("Failed to read {}", command.file.display()))?;
    let records: Vec<ExternalRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of records", command.file.display()))?;

    let list_name = command.list.as_deref().unwrap_or(&config.inbox_list);
    let section_name = command.section.as_deref().unwrap_or(&config.inbox_section);
    let section = ensure_section(repo, list_name, section_name).await?;

    let report = repo.ingest_external(section.id, records).await?;
    println!(
        "{} Ingested into {} / {}: {} created, {} already present",
        "✓".green().bold(),
        list_name,
        section_name,
        report.created.yellow(),
        report.skipped
    );
    Ok(())
}
