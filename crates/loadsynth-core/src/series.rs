//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SynthError};

/// Inclusive `[start, end]` calendar window sampled every `step_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
    step_secs: u32,
}

impl CalendarWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, step_secs: u32) -> Result<Self> {
        if step_secs == 0 {
            return Err(SynthError::invalid("output timestep must be positive"));
        }
        if end < start {
            return Err(SynthError::invalid(format!(
                "window end {} precedes start {}",
                end, start
            )));
        }
        Ok(Self {
            start,
            end,
            step_secs,
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn step_secs(&self) -> u32 {
        self.step_secs
    }

    /// Number of grid points, both ends included.
    pub fn len(&self) -> usize {
        let span = (self.end - self.start).num_seconds();
        (span / i64::from(self.step_secs)) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        let step = i64::from(self.step_secs);
        (0..self.len()).map(move |i| self.start + Duration::seconds(i as i64 * step))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub power: f64,
}

/// Power samples on a fixed grid plus the grid indices where activations start.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
    step_secs: u32,
    activation_starts: Vec<usize>,
}

impl TimeSeries {
    /// All-zero series covering `window`.
    pub fn zeros(window: &CalendarWindow) -> Self {
        Self {
            points: window
                .timestamps()
                .map(|timestamp| SeriesPoint {
                    timestamp,
                    power: 0.0,
                })
                .collect(),
            step_secs: window.step_secs(),
            activation_starts: Vec::new(),
        }
    }

    pub fn from_points(points: Vec<SeriesPoint>, step_secs: u32) -> Self {
        Self {
            points,
            step_secs,
            activation_starts: Vec::new(),
        }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn step_secs(&self) -> u32 {
        self.step_secs
    }

    /// Start indices of overlaid activations in ascending order.
    pub fn activation_starts(&self) -> &[usize] {
        &self.activation_starts
    }

    pub fn powers(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|point| point.power)
    }

    /// Merge `curve` in at `start`, keeping the larger value at every sample.
    ///
    /// Samples that would fall past the end of the grid are dropped.
    pub fn overlay_max(&mut self, start: usize, curve: &[f64]) {
        if start >= self.points.len() {
            return;
        }
        for (point, &value) in self.points[start..].iter_mut().zip(curve) {
            point.power = point.power.max(value);
        }
        if let Err(pos) = self.activation_starts.binary_search(&start) {
            self.activation_starts.insert(pos, start);
        }
    }

    pub fn summary(&self) -> SeriesSummary {
        let peak_w = self.powers().fold(0.0, f64::max);
        let energy_wh = self.powers().sum::<f64>() * f64::from(self.step_secs) / 3600.0;
        SeriesSummary {
            samples: self.len(),
            activations: self.activation_starts.len(),
            peak_w,
            energy_wh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub samples: usize,
    pub activations: usize,
    pub peak_w: f64,
    pub energy_wh: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn window_includes_both_ends() {
        let window = CalendarWindow::new(at(1, 0, 0), at(1, 1, 0), 60).unwrap();
        assert_eq!(window.len(), 61);
        let stamps: Vec<_> = window.timestamps().collect();
        assert_eq!(stamps.first(), Some(&at(1, 0, 0)));
        assert_eq!(stamps.last(), Some(&at(1, 1, 0)));
    }

    #[test]
    fn window_rejects_reversed_bounds() {
        assert!(CalendarWindow::new(at(2, 0, 0), at(1, 0, 0), 60).is_err());
        assert!(CalendarWindow::new(at(1, 0, 0), at(2, 0, 0), 0).is_err());
    }

    #[test]
    fn overlay_takes_pointwise_maximum() {
        let window = CalendarWindow::new(at(1, 0, 0), at(1, 0, 5), 60).unwrap();
        let mut series = TimeSeries::zeros(&window);
        series.overlay_max(1, &[5.0, 10.0, 5.0]);
        series.overlay_max(2, &[7.0, 2.0, 1.0]);
        let powers: Vec<f64> = series.powers().collect();
        assert_eq!(powers, vec![0.0, 5.0, 10.0, 5.0, 1.0, 0.0]);
        assert_eq!(series.activation_starts(), &[1, 2]);
    }

    #[test]
    fn overlay_truncates_at_grid_end() {
        let window = CalendarWindow::new(at(1, 0, 0), at(1, 0, 2), 60).unwrap();
        let mut series = TimeSeries::zeros(&window);
        series.overlay_max(2, &[3.0, 3.0, 3.0]);
        assert_eq!(series.powers().collect::<Vec<_>>(), vec![0.0, 0.0, 3.0]);
    }

    #[test]
    fn summary_reports_energy() {
        let window = CalendarWindow::new(at(1, 0, 0), at(1, 0, 59), 60).unwrap();
        let mut series = TimeSeries::zeros(&window);
        series.overlay_max(0, &[1200.0; 30]);
        let summary = series.summary();
        assert_eq!(summary.samples, 60);
        assert_eq!(summary.activations, 1);
        assert_eq!(summary.peak_w, 1200.0);
        assert!((summary.energy_wh - 600.0).abs() < 1e-9);
    }
}
