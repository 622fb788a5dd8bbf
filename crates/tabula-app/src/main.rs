//! Tabula application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open durable storage (SQLite) and session storage (in memory)
//! 3. Build the query orchestrator over the HTTP query service
//! 4. Run one command, or the interactive prompt

mod cli;
mod display;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use tabula_core::config::{ServiceConfig, TabulaConfig};
use tabula_core::types::Dataset;
use tabula_query::{
    DatasetResolver, HistoryStore, HttpQueryService, QueryOrchestrator, SubmitOutcome,
};
use tabula_storage::{MemoryStorage, SqliteStorage};

use cli::{CliArgs, Command};
use display::Display;

const REPL_HELP: &str = "\
Type a question and press Enter. Commands:
  :history      list past queries
  :repeat <id>  run a past query again
  :logs         show the processing log of the last query
  :data         describe the active dataset
  :quit         exit";

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

fn load_dataset(path: &Path) -> Result<Dataset, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let dataset: Dataset = serde_json::from_str(&content)?;
    Ok(dataset)
}

/// Service settings from the config file, with the endpoint override applied.
fn service_config(args: &CliArgs, config: &TabulaConfig) -> ServiceConfig {
    ServiceConfig {
        endpoint: args.resolve_endpoint(&config.service.endpoint),
        ..config.service.clone()
    }
}

struct App {
    orchestrator: QueryOrchestrator,
    display: Display,
    json: bool,
}

impl App {
    /// Submit a query and print its outcome. Returns whether the answer was
    /// an error.
    async fn ask(&self, query: &str) -> Result<bool, Box<dyn std::error::Error>> {
        let outcome = tokio::select! {
            outcome = self.orchestrator.submit(query) => outcome,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Query cancelled");
                eprintln!("Cancelled.");
                return Ok(true);
            }
        };
        self.print_outcome(&outcome)
    }

    async fn repeat(&self, id: i64) -> Result<bool, Box<dyn std::error::Error>> {
        let outcome = self.orchestrator.repeat(id).await?;
        self.print_outcome(&outcome)
    }

    fn print_outcome(&self, outcome: &SubmitOutcome) -> Result<bool, Box<dyn std::error::Error>> {
        let Some(result) = outcome.result() else {
            return Ok(false);
        };
        if self.json {
            println!("{}", serde_json::to_string_pretty(result)?);
        } else {
            println!("{}", self.display.result(result));
            if result.is_error() {
                eprintln!("\n{}", self.display.logs(result.logs()));
            }
        }
        Ok(result.is_error())
    }

    fn print_history(&self) -> Result<(), Box<dyn std::error::Error>> {
        let items = self.orchestrator.history();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&items)?);
        } else {
            println!("{}", self.display.history(&items));
        }
        Ok(())
    }

    fn print_dataset(&self) -> Result<(), Box<dyn std::error::Error>> {
        let summary = self.orchestrator.dataset_summary();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("{}", self.display.summary(&summary));
        }
        Ok(())
    }

    async fn repl(&self) -> Result<(), Box<dyn std::error::Error>> {
        println!("Tabula v{}. :help for commands.", env!("CARGO_PKG_VERSION"));
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("tabula> ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };

            let input = line.trim();
            match input {
                "" => continue,
                ":quit" | ":q" | ":exit" => break,
                ":help" => println!("{}", REPL_HELP),
                ":history" => self.print_history()?,
                ":data" => self.print_dataset()?,
                ":logs" => println!("{}", self.display.logs(&self.orchestrator.view().logs)),
                _ if input.starts_with(":repeat") => {
                    match input[":repeat".len()..].trim().parse::<i64>() {
                        Ok(id) => {
                            if let Err(e) = self.repeat(id).await {
                                eprintln!("{}", e);
                            }
                        }
                        Err(_) => eprintln!("Usage: :repeat <id>"),
                    }
                }
                _ if input.starts_with(':') => eprintln!("Unknown command. :help for commands."),
                query => {
                    self.ask(query).await?;
                }
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = TabulaConfig::load_or_default(&config_file);

    // Tracing. Logs go to stderr so answers stay pipeable.
    let filter = match args.resolve_log_level() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Tabula v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = resolve_data_dir(&args.resolve_data_dir(&config.general.data_dir));
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join("tabula.db");
    let durable = Arc::new(SqliteStorage::open(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    let session = Arc::new(MemoryStorage::new());

    // Query pipeline.
    let service_config = service_config(&args, &config);
    let service = HttpQueryService::from_config(&service_config)?;
    tracing::info!(
        endpoint = %service.endpoint(),
        timeout_secs = service_config.timeout_secs,
        "Query service configured"
    );

    let orchestrator = QueryOrchestrator::new(
        Arc::new(service),
        DatasetResolver::new(session),
        HistoryStore::open(durable, config.history.max_entries),
    );

    let app = App {
        orchestrator,
        display: Display::new(args.resolve_color(config.general.color)),
        json: args.json,
    };

    if let Some(path) = &args.data {
        let dataset = load_dataset(path)?;
        let summary = app.orchestrator.set_dataset(dataset)?;
        if !args.json {
            eprintln!("{}", app.display.summary(&summary));
        }
    }

    match args.command() {
        Command::Ask { query } => {
            if app.ask(&query.join(" ")).await? {
                std::process::exit(1);
            }
        }
        Command::Repeat { id } => {
            if app.repeat(id).await? {
                std::process::exit(1);
            }
        }
        Command::History => app.print_history()?,
        Command::Repl => app.repl().await?,
    }

    Ok(())
}
