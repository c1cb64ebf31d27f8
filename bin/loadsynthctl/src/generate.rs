//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Operator CLI for appliance load synthesis."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Args, ValueEnum};
use loadsynth_common::{parse_timestamp, AppConfig};
use loadsynth_core::{
    export_csv, generate_timeseries, write_csv, CalendarWindow, CsvLayout, GenerationMethod,
    GenerationParams, InterpolationKind, PlacementMode, ScheduleConfig, Strategy, TemplateStore,
    TimeSeries,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum InterpolationArg {
    Linear,
    Cubic,
}

impl From<InterpolationArg> for InterpolationKind {
    fn from(value: InterpolationArg) -> Self {
        match value {
            InterpolationArg::Linear => InterpolationKind::Linear,
            InterpolationArg::Cubic => InterpolationKind::Cubic,
        }
    }
}

pub(crate) fn parse_datetime(raw: &str) -> std::result::Result<NaiveDateTime, String> {
    parse_timestamp(raw).map_err(|err| format!("expected 'YYYY-MM-DD HH:MM:SS': {}", err))
}

#[derive(Debug, Args)]
pub struct GenerateCommand {
    /// Template directory; relative paths are looked up under paths.patterns_base_dir
    /// when they do not exist as given.
    #[arg(long, value_name = "DIR")]
    pub patterns: PathBuf,

    /// Explicit pattern file name inside the template directory.
    #[arg(long = "pattern-file", value_name = "NAME")]
    pub pattern_file: Option<String>,

    /// Peak power of the synthesised cycle in watts.
    #[arg(long, default_value_t = 2000.0)]
    pub nominal: f64,

    /// Cycle duration in minutes.
    #[arg(long = "duration", value_name = "MINUTES", default_value_t = 90.0)]
    pub duration_min: f64,

    /// Synthesis method: weighted, interpolate, scaling or dtw.
    #[arg(long, default_value_t = GenerationMethod::Scaling)]
    pub method: GenerationMethod,

    /// Power floor in watts.
    #[arg(long, default_value_t = 0.0)]
    pub baseline: f64,

    /// Template sampling interval in seconds.
    #[arg(long = "native-timestep", default_value_t = 7)]
    pub native_timestep: u32,

    /// Output sampling interval in seconds.
    #[arg(long = "output-timestep", default_value_t = 60)]
    pub output_timestep: u32,

    /// Template used by the scaling and dtw methods.
    #[arg(long = "ref-index", default_value_t = 0)]
    pub ref_index: usize,

    #[arg(long, value_enum, default_value_t = InterpolationArg::Cubic)]
    pub interpolation: InterpolationArg,

    /// Window start, e.g. "2024-01-01 00:00:00".
    #[arg(long, value_parser = parse_datetime)]
    pub start: NaiveDateTime,

    /// Window end (inclusive).
    #[arg(long, value_parser = parse_datetime)]
    pub end: NaiveDateTime,

    /// Activations per day for uniform placement.
    #[arg(long = "activations-per-day", default_value_t = 1, conflicts_with = "schedule")]
    pub activations_per_day: u32,

    /// Weekly schedule JSON; switches to probabilistic weekly placement.
    #[arg(long, value_name = "FILE")]
    pub schedule: Option<PathBuf>,

    /// Placement seed; omit for a random run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output CSV path, '-' for stdout. Defaults to
    /// `<output_dir>/<appliance>_consumption.csv`.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Prepend a `timestamp,power` header row.
    #[arg(long = "with-header")]
    pub with_header: bool,
}

impl GenerateCommand {
    pub fn execute(&self, config: &AppConfig) -> Result<()> {
        let directory = resolve_patterns_dir(&config.paths.patterns_base_dir, &self.patterns);
        let store = TemplateStore::open_with(
            &directory,
            self.pattern_file.as_deref(),
            self.native_timestep,
        )
        .with_context(|| format!("unable to load templates from {}", directory.display()))?;

        let series = self.build_series(&store)?;
        let layout = if self.with_header {
            CsvLayout::Tabular
        } else {
            CsvLayout::Player
        };

        match &self.output {
            Some(path) if path.as_os_str() == "-" => {
                write_csv(&series, io::stdout().lock(), layout)?;
            }
            output => {
                let path = output
                    .clone()
                    .unwrap_or_else(|| default_output_path(&config.paths.output_dir, &directory));
                export_csv(&series, &path, layout)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                let summary = series.summary();
                println!(
                    "{}: {} samples, {} activations, peak {:.1} W, {:.1} Wh",
                    path.display(),
                    summary.samples,
                    summary.activations,
                    summary.peak_w,
                    summary.energy_wh
                );
            }
        }
        Ok(())
    }

    fn build_series(&self, store: &TemplateStore) -> Result<TimeSeries> {
        let params = GenerationParams::new(
            self.nominal,
            self.duration_min,
            Strategy::from_method(self.method, self.ref_index),
        )
        .with_baseline(self.baseline)
        .with_timesteps(self.native_timestep, self.output_timestep)
        .with_interpolation(self.interpolation.into());
        let window = CalendarWindow::new(self.start, self.end, self.output_timestep)?;
        let placement = self.placement()?;
        let series = generate_timeseries(store.templates(), &params, &window, &placement, self.seed)?;
        Ok(series)
    }

    fn placement(&self) -> Result<PlacementMode> {
        match &self.schedule {
            Some(path) => {
                let schedule = ScheduleConfig::from_path(path)
                    .with_context(|| format!("invalid schedule file {}", path.display()))?;
                Ok(PlacementMode::Weekly(schedule))
            }
            None => Ok(PlacementMode::UniformDaily {
                activations_per_day: self.activations_per_day,
            }),
        }
    }
}

pub(crate) fn resolve_patterns_dir(base: &Path, requested: &Path) -> PathBuf {
    if requested.is_absolute() || requested.exists() {
        requested.to_path_buf()
    } else {
        base.join(requested)
    }
}

/// `<output_dir>/<appliance>_consumption.csv`, naming the appliance after the
/// template directory without its `_patterns` suffix.
fn default_output_path(output_dir: &Path, patterns_dir: &Path) -> PathBuf {
    let dir_name = patterns_dir
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("appliance");
    let appliance = dir_name.strip_suffix("_patterns").unwrap_or(dir_name);
    output_dir.join(format!("{}_consumption.csv", appliance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_templates(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("kettle_time_warping_patterns.json"),
            r#"{"time_warping_patterns": [
                {"power_sequence": [0.0, 1800.0, 2200.0, 2150.0, 300.0]},
                {"power_sequence": [0.0, 2000.0, 2400.0, 100.0]}
            ]}"#,
        )
        .unwrap();
    }

    fn base_command(patterns: PathBuf, output: PathBuf) -> GenerateCommand {
        GenerateCommand {
            patterns,
            pattern_file: None,
            nominal: 2000.0,
            duration_min: 5.0,
            method: GenerationMethod::Weighted,
            baseline: 0.0,
            native_timestep: 7,
            output_timestep: 60,
            ref_index: 0,
            interpolation: InterpolationArg::Cubic,
            start: parse_datetime("2024-01-01 00:00:00").unwrap(),
            end: parse_datetime("2024-01-02 23:59:00").unwrap(),
            activations_per_day: 2,
            schedule: None,
            seed: Some(42),
            output: Some(output),
            with_header: true,
        }
    }

    #[test]
    fn default_output_uses_appliance_name() {
        let path = default_output_path(Path::new("out"), Path::new("data/kettle_patterns"));
        assert_eq!(path, PathBuf::from("out/kettle_consumption.csv"));
    }

    #[test]
    fn relative_patterns_resolve_against_base() {
        let resolved = resolve_patterns_dir(Path::new("/srv/patterns"), Path::new("no_such_dir"));
        assert_eq!(resolved, PathBuf::from("/srv/patterns/no_such_dir"));
    }

    #[test]
    fn rejects_malformed_timestamps() {
        assert!(parse_datetime("01/02/2024").is_err());
    }

    #[test]
    fn generates_csv_with_header() {
        let dir = tempdir().unwrap();
        let patterns = dir.path().join("kettle_patterns");
        write_templates(&patterns);
        let output = dir.path().join("kettle.csv");
        base_command(patterns, output.clone())
            .execute(&AppConfig::default())
            .unwrap();

        let text = fs::read_to_string(&output).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("timestamp,power"));
        assert_eq!(lines.count(), 2 * 1440);
    }

    #[test]
    fn schedule_file_selects_weekly_mode() {
        let dir = tempdir().unwrap();
        let schedule = dir.path().join("schedule.json");
        fs::write(
            &schedule,
            r#"{"activations_per_week": 3, "weekday": {"hour_probabilities": {"7-9": 1.0}}}"#,
        )
        .unwrap();
        let mut cmd = base_command(dir.path().to_path_buf(), dir.path().join("x.csv"));
        cmd.schedule = Some(schedule);
        match cmd.placement().unwrap() {
            PlacementMode::Weekly(config) => assert_eq!(config.activations_per_week, 3),
            other => panic!("unexpected placement {:?}", other),
        }
    }

    #[test]
    fn missing_templates_report_the_directory() {
        let dir = tempdir().unwrap();
        let err = base_command(dir.path().join("absent"), dir.path().join("x.csv"))
            .execute(&AppConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("unable to load templates"));
    }
}
