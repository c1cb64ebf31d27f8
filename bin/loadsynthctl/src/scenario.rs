//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Operator CLI for appliance load synthesis."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use loadsynth_common::AppConfig;
use loadsynth_core::{run_scenario, ScenarioConfig, ScenarioReport};

#[derive(Debug, Args)]
pub struct ScenarioCommand {
    /// Scenario TOML file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Overrides paths.patterns_base_dir.
    #[arg(long = "patterns-base-dir", value_name = "DIR")]
    pub patterns_base_dir: Option<PathBuf>,

    /// Overrides paths.output_dir.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Exit with an error when any appliance fails.
    #[arg(long)]
    pub strict: bool,
}

impl ScenarioCommand {
    pub fn execute(&self, config: &AppConfig) -> Result<()> {
        let scenario = ScenarioConfig::from_path(&self.file)
            .with_context(|| format!("unable to load scenario {}", self.file.display()))?;
        let patterns = self
            .patterns_base_dir
            .clone()
            .unwrap_or_else(|| config.paths.patterns_base_dir.clone());
        let output = self
            .output_dir
            .clone()
            .unwrap_or_else(|| config.paths.output_dir.clone());

        let report = run_scenario(&scenario, &patterns, &output)
            .with_context(|| format!("scenario run into {} failed", output.display()))?;
        print_report(&report);
        self.check(&report)
    }

    fn check(&self, report: &ScenarioReport) -> Result<()> {
        if self.strict && !report.is_complete() {
            let names: Vec<&str> = report.failures.iter().map(|(name, _)| name.as_str()).collect();
            return Err(anyhow!("appliances failed: {}", names.join(", ")));
        }
        Ok(())
    }
}

fn print_report(report: &ScenarioReport) {
    for path in &report.generated {
        println!("generated {}", path.display());
    }
    for (name, error) in &report.failures {
        eprintln!("failed {}: {}", name, error);
    }
}
