use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;
use trellis_core::db;
use trellis_core::error::{CoreError, ErrorKind};
use trellis_core::repository::SqliteRepository;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

use cli::{Cli, Commands};
use config::Config;

fn setup_logging(level: tracing::Level) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::new().unwrap_or_else(|e| {
        eprintln!("{} ignoring invalid configuration: {}", "Warning:".yellow().bold(), e);
        Config::default()
    });

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        config.log_level()
    };
    setup_logging(level);

    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let repository = SqliteRepository::new(db_pool);

    let result = match cli.command {
        Commands::List(command) => commands::list::list_command(&repository, command).await,
        Commands::Section(command) => {
            commands::section::section_command(&repository, command).await
        }
        Commands::Task(command) => commands::task::task_command(&repository, command).await,
        Commands::Import(command) => commands::import::import_file(&repository, command).await,
        Commands::Export(command) => commands::export::export_lists(&repository, command).await,
        Commands::Ingest(command) => {
            commands::ingest::ingest_records(&repository, command, &config).await
        }
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    let Some(core_error) = err.downcast_ref::<CoreError>() else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
        return;
    };

    match core_error {
        CoreError::CircularNesting { task_id, parent_id } => {
            eprintln!(
                "{} Circular nesting detected: task {} cannot be nested under task {}",
                "Error:".style(error_style),
                task_id.yellow(),
                parent_id.yellow()
            );
        }
        CoreError::PinLimitExceeded { limit, .. } => {
            eprintln!(
                "{} This list already has {} pinned open tasks. Unpin one first.",
                "Error:".style(error_style),
                limit
            );
        }
        CoreError::InvalidInput(s) => {
            eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
        }
        other => match other.kind() {
            ErrorKind::Internal => {
                eprintln!("{} {:#}", "Error:".style(error_style), err);
            }
            ErrorKind::Validation | ErrorKind::Conflict | ErrorKind::NotFound => {
                eprintln!("{} {}", "Error:".style(error_style), other);
            }
        },
    }
}
