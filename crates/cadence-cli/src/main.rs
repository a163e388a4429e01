use std::sync::Arc;

use cadence_core::clock::Clock;
use cadence_core::db;
use cadence_core::error::CoreError;
use cadence_core::repository::SqliteRepository;
use cadence_core::scheduler::RecurrenceScheduler;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Error:".red().bold(), e);
            std::process::exit(2);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli, config).await {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli, config: config::Config) -> anyhow::Result<()> {
    let clock = Arc::new(config.clock()?);
    let today = clock.today();
    tracing::debug!(timezone = %clock.timezone(), %today, "clock ready");

    let db_pool = db::establish_connection(&config.database_path).await?;
    let repository = Arc::new(SqliteRepository::new(db_pool));
    let scheduler = RecurrenceScheduler::new(repository.clone(), clock);
    let repo = repository.as_ref();

    match cli.command {
        cli::Commands::Add(command) => commands::add::add_task(&scheduler, command, today).await,
        cli::Commands::List(command) => commands::list::list_tasks(repo, command, today).await,
        cli::Commands::Start(command) => commands::start::start_task(repo, command).await,
        cli::Commands::Do(command) => commands::r#do::do_task(&scheduler, command).await,
        cli::Commands::Archive(command) => commands::archive::archive_task(repo, command).await,
        cli::Commands::Delete(command) => commands::delete::delete_task(repo, command).await,
        cli::Commands::Edit(command) => commands::edit::edit_task(repo, command, today).await,
        cli::Commands::Project(command) => commands::project::project_command(repo, command).await,
        cli::Commands::Section(command) => commands::section::section_command(repo, command).await,
        cli::Commands::Recur(command) => {
            commands::recurrence::recurrence_command(&scheduler, command, today, config.preview_count)
                .await
        }
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} Not found: {}", "Error:".style(error_style), s);
            }
            CoreError::AmbiguousId(tasks) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, title) in tasks {
                    eprintln!("  {} ({})", id.yellow(), title);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::Validation(s) => {
                eprintln!("{} Invalid recurrence: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidState(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidTimezone(tz) => {
                eprintln!(
                    "{} Invalid timezone '{}'. Use IANA names like 'America/New_York'.",
                    "Error:".style(error_style),
                    tz
                );
            }
            e if e.is_retryable() => {
                tracing::error!(error = %e, "storage failure");
                eprintln!(
                    "{} Could not complete task. Please try again.",
                    "Error:".style(error_style)
                );
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
