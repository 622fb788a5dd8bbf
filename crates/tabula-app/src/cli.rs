//! CLI argument definitions for the Tabula application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tabula - ask questions about tabular data in plain language.
#[derive(Parser, Debug)]
#[command(name = "tabula", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for the history database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Query service endpoint URL.
    #[arg(short = 'e', long = "endpoint", global = true)]
    pub endpoint: Option<String>,

    /// JSON file with the dataset to query (array of records, or
    /// `{"rows": [...], "columns": [...]}`).
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Print results as JSON instead of formatted text.
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Disable ANSI colors.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask one question and print the answer.
    Ask {
        /// The question; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// List past queries, newest first.
    History,
    /// Run a past query again by its history id.
    Repeat { id: i64 },
    /// Interactive prompt (the default).
    Repl,
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Repl)
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > TABULA_CONFIG env var > ~/.tabula/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TABULA_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the service endpoint.
    ///
    /// Priority: --endpoint flag > TABULA_ENDPOINT env var > config file value.
    pub fn resolve_endpoint(&self, config_endpoint: &str) -> String {
        pick(
            self.endpoint.clone(),
            std::env::var("TABULA_ENDPOINT").ok(),
            config_endpoint,
        )
    }

    /// Resolve the data directory. Priority: --data-dir flag > config file value.
    pub fn resolve_data_dir(&self, config_data_dir: &str) -> String {
        pick(
            self.data_dir
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            None,
            config_data_dir,
        )
    }

    /// Resolve the log level. Returns `None` if not overridden on the
    /// command line.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }

    pub fn resolve_color(&self, config_color: bool) -> bool {
        !self.no_color && !self.json && config_color
    }
}

fn pick(flag: Option<String>, env: Option<String>, config: &str) -> String {
    flag.filter(|v| !v.is_empty())
        .or_else(|| env.filter(|v| !v.is_empty()))
        .unwrap_or_else(|| config.to_string())
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".tabula").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".tabula").join("config.toml");
    }
    PathBuf::from("config.toml")
}
