//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Multi-appliance scenario files and the batch runner behind them.
//!
//! A scenario names a calendar window and an ordered set of appliances. Each
//! appliance is synthesised and placed independently and written to
//! `<name>_consumption.csv`; one appliance failing does not stop the others.
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use loadsynth_common::parse_timestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{Result, SynthError};
use crate::export::{export_csv, CsvLayout};
use crate::placement::PlacementMode;
use crate::schedule::ScheduleConfig;
use crate::series::CalendarWindow;
use crate::synth::{GenerationMethod, GenerationParams, Strategy};
use crate::template::TemplateStore;
use crate::{generate_timeseries, DEFAULT_NATIVE_TIMESTEP_SECS, DEFAULT_OUTPUT_TIMESTEP_SECS};

fn default_nominal_power() -> f64 {
    2000.0
}

fn default_duration_min() -> f64 {
    90.0
}

fn default_activations_per_day() -> u32 {
    1
}

fn default_timestep_native() -> u32 {
    DEFAULT_NATIVE_TIMESTEP_SECS
}

fn default_output_timestep() -> u32 {
    DEFAULT_OUTPUT_TIMESTEP_SECS
}

fn default_seed() -> Option<u64> {
    Some(42)
}

/// Per-appliance generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceConfig {
    #[serde(default = "default_nominal_power")]
    pub nominal_power: f64,
    #[serde(default = "default_duration_min")]
    pub duration_min: f64,
    /// Ignored when `schedule` is present.
    #[serde(default = "default_activations_per_day")]
    pub activations_per_day: u32,
    #[serde(default)]
    pub generation_method: GenerationMethod,
    #[serde(default)]
    pub baseline: f64,
    #[serde(default = "default_timestep_native")]
    pub timestep_native: u32,
    #[serde(default = "default_output_timestep")]
    pub output_timestep: u32,
    #[serde(default)]
    pub ref_index: usize,
    #[serde(default = "default_seed")]
    pub seed: Option<u64>,
    /// Directory below the patterns base dir; defaults to `<name>_patterns`.
    #[serde(default)]
    pub pattern_dir: Option<PathBuf>,
    #[serde(default)]
    pub pattern_file: Option<String>,
    #[serde(default)]
    pub schedule: Option<ScheduleConfig>,
}

impl Default for ApplianceConfig {
    fn default() -> Self {
        Self {
            nominal_power: default_nominal_power(),
            duration_min: default_duration_min(),
            activations_per_day: default_activations_per_day(),
            generation_method: GenerationMethod::default(),
            baseline: 0.0,
            timestep_native: default_timestep_native(),
            output_timestep: default_output_timestep(),
            ref_index: 0,
            seed: default_seed(),
            pattern_dir: None,
            pattern_file: None,
            schedule: None,
        }
    }
}

impl ApplianceConfig {
    pub fn pattern_dir(&self, name: &str) -> PathBuf {
        self.pattern_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_patterns", name)))
    }

    /// Directories tried in order below the patterns base dir: the configured
    /// one, the bare appliance name, then lowercased and underscored spellings
    /// of the configured one.
    pub fn pattern_dir_candidates(&self, name: &str) -> Vec<PathBuf> {
        let primary = self.pattern_dir(name);
        let mut spellings = vec![primary.clone(), PathBuf::from(name)];
        if let Some(raw) = primary.to_str() {
            spellings.push(PathBuf::from(raw.to_lowercase()));
            spellings.push(PathBuf::from(raw.replace(' ', "_")));
        }
        let mut candidates: Vec<PathBuf> = Vec::with_capacity(spellings.len());
        for spelling in spellings {
            if !candidates.contains(&spelling) {
                candidates.push(spelling);
            }
        }
        candidates
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams::new(
            self.nominal_power,
            self.duration_min,
            Strategy::from_method(self.generation_method, self.ref_index),
        )
        .with_baseline(self.baseline)
        .with_timesteps(self.timestep_native, self.output_timestep)
    }

    pub fn placement_mode(&self) -> PlacementMode {
        match &self.schedule {
            Some(schedule) => PlacementMode::Weekly(schedule.clone()),
            None => PlacementMode::UniformDaily {
                activations_per_day: self.activations_per_day,
            },
        }
    }
}

/// A calendar window plus the appliances to generate for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub output_format: CsvLayout,
    #[serde(default)]
    pub appliances: IndexMap<String, ApplianceConfig>,
}

impl ScenarioConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        contents.parse()
    }

    pub fn start(&self) -> Result<NaiveDateTime> {
        Ok(parse_timestamp(&self.start)?)
    }

    pub fn end(&self) -> Result<NaiveDateTime> {
        Ok(parse_timestamp(&self.end)?)
    }

    pub fn validate(&self) -> Result<()> {
        let (start, end) = (self.start()?, self.end()?);
        if end < start {
            return Err(SynthError::invalid(format!(
                "scenario end {} precedes start {}",
                self.end, self.start
            )));
        }
        Ok(())
    }
}

impl FromStr for ScenarioConfig {
    type Err = SynthError;

    fn from_str(content: &str) -> Result<Self> {
        let config: ScenarioConfig = toml::from_str(content)
            .map_err(|err| SynthError::invalid(format!("failed to parse scenario: {}", err)))?;
        config.validate()?;
        Ok(config)
    }
}

/// Outcome of a scenario run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioReport {
    /// Written CSV files in appliance order.
    pub generated: Vec<PathBuf>,
    /// Appliance name and error message for every appliance that failed.
    pub failures: Vec<(String, String)>,
}

impl ScenarioReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Generate every appliance of `scenario` into `output_dir`.
pub fn run_scenario(
    scenario: &ScenarioConfig,
    patterns_base_dir: &Path,
    output_dir: &Path,
) -> Result<ScenarioReport> {
    let (start, end) = (scenario.start()?, scenario.end()?);
    fs::create_dir_all(output_dir)?;
    let mut report = ScenarioReport::default();
    for (name, appliance) in &scenario.appliances {
        match generate_appliance(
            name,
            appliance,
            start,
            end,
            patterns_base_dir,
            output_dir,
            scenario.output_format,
        ) {
            Ok(path) => report.generated.push(path),
            Err(err) => {
                warn!(appliance = %name, error = %err, "appliance generation failed");
                report.failures.push((name.clone(), err.to_string()));
            }
        }
    }
    info!(
        generated = report.generated.len(),
        failed = report.failures.len(),
        output_dir = %output_dir.display(),
        "scenario run finished"
    );
    Ok(report)
}

fn generate_appliance(
    name: &str,
    appliance: &ApplianceConfig,
    start: NaiveDateTime,
    end: NaiveDateTime,
    patterns_base_dir: &Path,
    output_dir: &Path,
    layout: CsvLayout,
) -> Result<PathBuf> {
    let directory = resolve_pattern_dir(patterns_base_dir, name, appliance)?;
    let store = TemplateStore::open_with(
        &directory,
        appliance.pattern_file.as_deref(),
        appliance.timestep_native,
    )?;
    let window = CalendarWindow::new(start, end, appliance.output_timestep)?;
    let series = generate_timeseries(
        store.templates(),
        &appliance.generation_params(),
        &window,
        &appliance.placement_mode(),
        appliance.seed,
    )?;
    let path = output_dir.join(format!("{}_consumption.csv", name));
    export_csv(&series, &path, layout)?;
    Ok(path)
}

/// First existing candidate directory, or `NotFound` naming the configured one.
fn resolve_pattern_dir(base: &Path, name: &str, appliance: &ApplianceConfig) -> Result<PathBuf> {
    let primary = base.join(appliance.pattern_dir(name));
    for candidate in appliance.pattern_dir_candidates(name) {
        let directory = base.join(candidate);
        if directory.is_dir() {
            if directory != primary {
                debug!(
                    appliance = %name,
                    directory = %directory.display(),
                    "using fallback pattern directory"
                );
            }
            return Ok(directory);
        }
    }
    Err(SynthError::NotFound(primary))
}
