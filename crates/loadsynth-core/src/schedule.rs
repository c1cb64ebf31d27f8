//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Hour-of-day activation probabilities for weekly placement.
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SynthError};

fn default_activations_per_week() -> u32 {
    7
}

/// Probabilistic weekly schedule as found in appliance configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_activations_per_week")]
    pub activations_per_week: u32,
    #[serde(default)]
    pub weekday: DayTypeSchedule,
    #[serde(default)]
    pub weekend: DayTypeSchedule,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            activations_per_week: default_activations_per_week(),
            weekday: DayTypeSchedule::default(),
            weekend: DayTypeSchedule::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayTypeSchedule {
    /// `"H1-H2"` half-open hour ranges mapped to a probability in `[0, 1]`.
    #[serde(default)]
    pub hour_probabilities: IndexMap<String, f64>,
}

impl ScheduleConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: ScheduleConfig = serde_json::from_str(raw)?;
        config.profile()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Resolve the hour-range maps into per-hour probabilities.
    pub fn profile(&self) -> Result<WeeklyProfile> {
        Ok(WeeklyProfile {
            weekday: HourProfile::from_ranges(&self.weekday.hour_probabilities)?,
            weekend: HourProfile::from_ranges(&self.weekend.hour_probabilities)?,
        })
    }
}

/// A half-open `[start, end)` range of hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourRange {
    pub start: u32,
    pub end: u32,
}

impl HourRange {
    pub fn hours(&self) -> std::ops::Range<u32> {
        self.start..self.end
    }
}

impl FromStr for HourRange {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || {
            SynthError::invalid(format!(
                "invalid hour range '{}', expected format like '6-9'",
                s
            ))
        };
        let (start, end) = s.split_once('-').ok_or_else(malformed)?;
        let start: u32 = start.trim().parse().map_err(|_| malformed())?;
        let end: u32 = end.trim().parse().map_err(|_| malformed())?;
        if start > 24 || end > 24 {
            return Err(SynthError::invalid(format!(
                "hour range '{}' must stay within 0-24",
                s
            )));
        }
        Ok(Self { start, end })
    }
}

/// Probability for each of the 24 hours of a day.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HourProfile([f64; 24]);

impl HourProfile {
    /// Overlapping ranges keep the highest probability for each hour.
    pub fn from_ranges(ranges: &IndexMap<String, f64>) -> Result<Self> {
        let mut hours = [0.0_f64; 24];
        for (raw, &probability) in ranges {
            let range: HourRange = raw.parse()?;
            if !(0.0..=1.0).contains(&probability) {
                return Err(SynthError::invalid(format!(
                    "probability {} for hour range '{}' must lie in [0, 1]",
                    probability, raw
                )));
            }
            for hour in range.hours() {
                let slot = &mut hours[hour as usize];
                *slot = slot.max(probability);
            }
        }
        Ok(Self(hours))
    }

    pub fn probability(&self, hour: u32) -> f64 {
        self.0.get(hour as usize).copied().unwrap_or(0.0)
    }

    pub fn hours(&self) -> &[f64; 24] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeeklyProfile {
    pub weekday: HourProfile,
    pub weekend: HourProfile,
}

impl WeeklyProfile {
    pub fn probability_at(&self, ts: &NaiveDateTime) -> f64 {
        let profile = if is_weekend(ts) {
            &self.weekend
        } else {
            &self.weekday
        };
        profile.probability(ts.hour())
    }
}

pub fn is_weekend(ts: &NaiveDateTime) -> bool {
    matches!(ts.weekday(), Weekday::Sat | Weekday::Sun)
}
