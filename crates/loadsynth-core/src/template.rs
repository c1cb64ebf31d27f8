//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Recorded activation templates and the on-disk pattern library.
//!
//! A pattern directory holds one JSON document with a `time_warping_patterns`
//! array. Each entry carries the raw `power_sequence` sampled at the native
//! timestep plus derived statistics; missing statistics are recomputed.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::errors::{Result, SynthError};
use crate::DEFAULT_NATIVE_TIMESTEP_SECS;

const PREFERRED_SUFFIX: &str = "_time_warping_patterns.json";
const FALLBACK_SUFFIX: &str = "_patterns.json";

/// An immutable recorded appliance activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatePattern {
    pub power_sequence: Vec<f64>,
    pub max_power: f64,
    pub total_duration_seconds: f64,
}

impl TemplatePattern {
    /// Build a template from raw samples, deriving its statistics.
    pub fn from_samples(power_sequence: Vec<f64>, native_timestep_secs: u32) -> Self {
        let max_power = power_sequence
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let total_duration_seconds = power_sequence.len() as f64 * f64::from(native_timestep_secs);
        Self {
            power_sequence,
            max_power,
            total_duration_seconds,
        }
    }

    pub fn len(&self) -> usize {
        self.power_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power_sequence.is_empty()
    }

    pub fn duration_min(&self) -> f64 {
        self.total_duration_seconds / 60.0
    }
}

#[derive(Debug, Deserialize)]
struct PatternDocument {
    time_warping_patterns: Vec<RawTemplate>,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    power_sequence: Vec<f64>,
    #[serde(default)]
    statistical_features: Option<StatisticalFeatures>,
    #[serde(default)]
    total_duration_seconds: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct StatisticalFeatures {
    #[serde(default)]
    max_power: Option<f64>,
}

impl RawTemplate {
    fn into_pattern(self, native_timestep_secs: u32) -> TemplatePattern {
        let max_power = self.statistical_features.and_then(|features| features.max_power);
        let total_duration_seconds = self.total_duration_seconds;
        let mut pattern = TemplatePattern::from_samples(self.power_sequence, native_timestep_secs);
        if let Some(max_power) = max_power {
            pattern.max_power = max_power;
        }
        if let Some(duration) = total_duration_seconds {
            pattern.total_duration_seconds = duration;
        }
        pattern
    }
}

/// Templates loaded from a single pattern file, owned for one synthesis call.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    source: PathBuf,
    templates: Vec<TemplatePattern>,
}

impl TemplateStore {
    /// Discover and load the pattern file inside `directory`.
    pub fn open(directory: &Path) -> Result<Self> {
        Self::open_with(directory, None, DEFAULT_NATIVE_TIMESTEP_SECS)
    }

    /// Load from `directory`, optionally naming the pattern file explicitly.
    pub fn open_with(
        directory: &Path,
        pattern_file: Option<&str>,
        native_timestep_secs: u32,
    ) -> Result<Self> {
        let source = locate_pattern_file(directory, pattern_file)?;
        let templates = read_pattern_file(&source, native_timestep_secs)?;
        info!(
            source = %source.display(),
            templates = templates.len(),
            "loaded activation templates"
        );
        Ok(Self { source, templates })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn templates(&self) -> &[TemplatePattern] {
        &self.templates
    }

    pub fn into_templates(self) -> Vec<TemplatePattern> {
        self.templates
    }
}

/// Load every template from the pattern file found in `directory`.
pub fn load_templates(directory: impl AsRef<Path>) -> Result<Vec<TemplatePattern>> {
    Ok(TemplateStore::open(directory.as_ref())?.into_templates())
}

fn locate_pattern_file(directory: &Path, pattern_file: Option<&str>) -> Result<PathBuf> {
    if !directory.is_dir() {
        return Err(SynthError::NotFound(directory.to_path_buf()));
    }
    if let Some(name) = pattern_file {
        let candidate = directory.join(name);
        return if candidate.is_file() {
            Ok(candidate)
        } else {
            Err(SynthError::NotFound(candidate))
        };
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            names.push(entry.path().to_path_buf());
        }
    }

    let with_suffix = |suffix: &str| {
        names
            .iter()
            .find(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(suffix))
            })
            .cloned()
    };

    let found = with_suffix(PREFERRED_SUFFIX).or_else(|| with_suffix(FALLBACK_SUFFIX));
    debug!(directory = %directory.display(), candidates = names.len(), found = ?found, "pattern file discovery");
    found.ok_or_else(|| SynthError::NotFound(directory.to_path_buf()))
}

fn read_pattern_file(path: &Path, native_timestep_secs: u32) -> Result<Vec<TemplatePattern>> {
    let contents = fs::read_to_string(path)?;
    let document: PatternDocument = serde_json::from_str(&contents)?;
    if document.time_warping_patterns.is_empty() {
        return Err(SynthError::EmptyTemplates(path.to_path_buf()));
    }
    document
        .time_warping_patterns
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            if raw.power_sequence.is_empty() {
                return Err(SynthError::invalid(format!(
                    "template {} in {} has an empty power_sequence",
                    index,
                    path.display()
                )));
            }
            Ok(raw.into_pattern(native_timestep_secs))
        })
        .collect()
}
