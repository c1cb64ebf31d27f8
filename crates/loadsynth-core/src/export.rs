//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! CSV export of placed series in the simulator player layout.
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use loadsynth_common::{format_timestamp, parse_timestamp};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{Result, SynthError};
use crate::series::{SeriesPoint, TimeSeries};

const HEADER: [&str; 2] = ["timestamp", "power"];

/// Row layout of an exported series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvLayout {
    /// Bare `timestamp,power` rows as consumed by grid-simulator players.
    #[default]
    Player,
    /// Same rows preceded by a `timestamp,power` header.
    Tabular,
}

impl CsvLayout {
    fn has_header(self) -> bool {
        matches!(self, CsvLayout::Tabular)
    }
}

/// Write `series` to `path`, creating parent directories as needed.
pub fn export_csv(series: &TimeSeries, path: &Path, layout: CsvLayout) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_csv(series, file, layout)?;
    let summary = series.summary();
    info!(
        path = %path.display(),
        rows = summary.samples,
        activations = summary.activations,
        energy_wh = summary.energy_wh,
        "exported time series"
    );
    Ok(())
}

/// Write `series` rows to any sink, e.g. stdout.
pub fn write_csv<W: Write>(series: &TimeSeries, sink: W, layout: CsvLayout) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(sink);
    if layout.has_header() {
        writer.write_record(HEADER)?;
    }
    for point in series.points() {
        writer.write_record([
            format_timestamp(&point.timestamp),
            format!("{:.1}", point.power),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read rows written by [`export_csv`] back into points.
pub fn read_csv(path: &Path, layout: CsvLayout) -> Result<Vec<SeriesPoint>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(layout.has_header())
        .trim(csv::Trim::All)
        .from_reader(file);
    let mut points = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let (Some(raw_ts), Some(raw_power)) = (record.get(0), record.get(1)) else {
            return Err(SynthError::invalid(format!(
                "row {} of {} must have timestamp and power",
                line + 1,
                path.display()
            )));
        };
        let power = raw_power.parse::<f64>().map_err(|err| {
            SynthError::invalid(format!(
                "row {} of {}: bad power '{}': {}",
                line + 1,
                path.display(),
                raw_power,
                err
            ))
        })?;
        points.push(SeriesPoint {
            timestamp: parse_timestamp(raw_ts)?,
            power,
        });
    }
    Ok(points)
}
