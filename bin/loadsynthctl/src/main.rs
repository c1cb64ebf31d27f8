//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Operator CLI for appliance load synthesis."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use loadsynth_common::{init_tracing, AppConfig, LogFormat};
use tracing::debug;

mod generate;
mod inspect;
mod scenario;

const CONFIG_CANDIDATES: [&str; 2] = ["loadsynth.toml", "config/loadsynth.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Synthesise appliance load curves from recorded activation templates",
    long_about = None
)]
struct Cli {
    /// Configuration file (overrides LOADSYNTH_CONFIG and the default candidates).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Console log format.
    #[arg(long = "log-format", global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Synthesise one appliance and place it over a calendar window.
    Generate(generate::GenerateCommand),
    /// Generate every appliance listed in a scenario file.
    Scenario(scenario::ScenarioCommand),
    /// Summarise the templates found in a pattern directory.
    Inspect(inspect::InspectCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Json,
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Json => LogFormat::StructuredJson,
            LogFormatArg::Pretty => LogFormat::Pretty,
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match explicit {
        Some(path) => AppConfig::from_path(path)
            .with_context(|| format!("unable to load configuration {}", path.display())),
        None => {
            let loaded = AppConfig::load_with_source(&CONFIG_CANDIDATES)?;
            debug!(source = ?loaded.source, "configuration resolved");
            Ok(loaded.config)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    init_tracing("loadsynthctl", &config.logging)?;

    match cli.command {
        Commands::Generate(cmd) => cmd.execute(&config),
        Commands::Scenario(cmd) => cmd.execute(&config),
        Commands::Inspect(cmd) => cmd.execute(&config),
    }
}
