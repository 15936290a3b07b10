use anyhow::{Context, Result};
use trellis_core::repository::Repository;

use crate::cli::{ExportCommand, ExportFormat};
use crate::util::resolve_list;

pub async fn export_lists(repo: &impl Repository, command: ExportCommand) -> Result<()> {
    let mut list_ids = Vec::with_capacity(command.list.len());
    for list in &command.list {
        list_ids.push(resolve_list(repo, list).await?.id);
    }
    let filter = if list_ids.is_empty() {
        None
    } else {
        Some(list_ids.as_slice())
    };

    let output = match command.format {
        ExportFormat::Json => repo.export_json(filter).await?,
        ExportFormat::Csv => repo.export_csv(filter).await?,
        ExportFormat::Md => repo.export_markdown(filter).await?,
    };

    match &command.output {
        Some(path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported to {}", path.display());
        }
        None => print!("{}", output),
    }
    Ok(())
}
