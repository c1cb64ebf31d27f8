//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Operator CLI for appliance load synthesis."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use loadsynth_common::AppConfig;
use loadsynth_core::{TemplatePattern, TemplateStore};
use serde::Serialize;

use crate::generate::resolve_patterns_dir;

#[derive(Debug, Args)]
pub struct InspectCommand {
    /// Template directory, resolved like `generate --patterns`.
    #[arg(long, value_name = "DIR")]
    pub patterns: PathBuf,

    #[arg(long = "pattern-file", value_name = "NAME")]
    pub pattern_file: Option<String>,

    /// Template sampling interval in seconds.
    #[arg(long = "native-timestep", default_value_t = 7)]
    pub native_timestep: u32,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct TemplateRow {
    index: usize,
    samples: usize,
    max_power: f64,
    duration_min: f64,
}

impl TemplateRow {
    fn new(index: usize, template: &TemplatePattern) -> Self {
        Self {
            index,
            samples: template.len(),
            max_power: template.max_power,
            duration_min: template.duration_min(),
        }
    }
}

impl InspectCommand {
    pub fn execute(&self, config: &AppConfig) -> Result<()> {
        let directory = resolve_patterns_dir(&config.paths.patterns_base_dir, &self.patterns);
        let store = TemplateStore::open_with(
            &directory,
            self.pattern_file.as_deref(),
            self.native_timestep,
        )
        .with_context(|| format!("unable to load templates from {}", directory.display()))?;
        let rows = rows(store.templates());
        let mut stdout = io::stdout().lock();
        if self.json {
            serde_json::to_writer_pretty(&mut stdout, &rows)?;
            stdout.write_all(b"\n")?;
        } else {
            writeln!(stdout, "{} ({} templates)", store.source().display(), rows.len())?;
            render_table(&mut stdout, &rows)?;
        }
        Ok(())
    }
}

fn rows(templates: &[TemplatePattern]) -> Vec<TemplateRow> {
    templates
        .iter()
        .enumerate()
        .map(|(index, template)| TemplateRow::new(index, template))
        .collect()
}

fn render_table<W: Write>(out: &mut W, rows: &[TemplateRow]) -> io::Result<()> {
    writeln!(out, "{:>5} {:>8} {:>12} {:>10}", "index", "samples", "max_power_w", "minutes")?;
    for row in rows {
        writeln!(
            out,
            "{:>5} {:>8} {:>12.1} {:>10.2}",
            row.index, row.samples, row.max_power, row.duration_min
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_describe_each_template() {
        let templates = vec![
            TemplatePattern::from_samples(vec![0.0, 900.0, 1200.0, 0.0], 7),
            TemplatePattern::from_samples(vec![5.0; 60], 7),
        ];
        let rows = rows(&templates);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].samples, 4);
        assert_eq!(rows[0].max_power, 1200.0);
        assert!((rows[1].duration_min - 7.0).abs() < 1e-12);
    }

    #[test]
    fn table_has_header_and_one_line_per_template() {
        let rows = rows(&[TemplatePattern::from_samples(vec![1.0, 2.0], 7)]);
        let mut buffer = Vec::new();
        render_table(&mut buffer, &rows).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("max_power_w"));
        assert!(lines[1].trim_start().starts_with('0'));
    }
}
