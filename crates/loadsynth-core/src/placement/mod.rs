//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Placement of a synthesised activation onto a calendar grid.
//!
//! Both placers write into an owned [`TimeSeries`] with the pointwise-maximum
//! merge, so overlapping activations of one appliance never add up. All
//! randomness comes from the caller-provided generator.
use std::ops::Range;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::errors::Result;
use crate::schedule::ScheduleConfig;
use crate::series::{CalendarWindow, SeriesPoint, TimeSeries};
use crate::synth::ActivationCurve;

mod uniform;
mod weekly;

pub use uniform::place_uniform_daily;
pub use weekly::place_weekly;

/// How activations are distributed over the calendar.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementMode {
    /// A fixed number of random, possibly overlapping, activations per day.
    UniformDaily { activations_per_day: u32 },
    /// Hour-of-day weighted, non-overlapping activations per ISO week.
    Weekly(ScheduleConfig),
}

impl PlacementMode {
    /// Build the zeroed grid for `window` and overlay `curve` onto it.
    pub fn place<R: Rng + ?Sized>(
        &self,
        curve: &ActivationCurve,
        window: &CalendarWindow,
        rng: &mut R,
    ) -> Result<TimeSeries> {
        if curve.timestep_secs() != window.step_secs() {
            warn!(
                curve_step = curve.timestep_secs(),
                grid_step = window.step_secs(),
                "activation curve and calendar grid use different timesteps"
            );
        }
        let mut series = TimeSeries::zeros(window);
        match self {
            PlacementMode::UniformDaily {
                activations_per_day,
            } => place_uniform_daily(
                &mut series,
                curve.samples(),
                *activations_per_day as usize,
                rng,
            ),
            PlacementMode::Weekly(schedule) => {
                place_weekly(&mut series, curve.samples(), schedule, rng)?
            }
        }
        let summary = series.summary();
        info!(
            mode = self.label(),
            samples = summary.samples,
            activations = summary.activations,
            energy_wh = summary.energy_wh,
            "placed activations"
        );
        Ok(series)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlacementMode::UniformDaily { .. } => "uniform-daily",
            PlacementMode::Weekly(_) => "probabilistic-weekly",
        }
    }
}

/// Call-scoped generator; `None` draws a seed from the OS.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn place_uniform_random(
    curve: &ActivationCurve,
    start: NaiveDateTime,
    end: NaiveDateTime,
    activations_per_day: u32,
    output_timestep_secs: u32,
    seed: Option<u64>,
) -> Result<TimeSeries> {
    let window = CalendarWindow::new(start, end, output_timestep_secs)?;
    PlacementMode::UniformDaily {
        activations_per_day,
    }
    .place(curve, &window, &mut seeded_rng(seed))
}

pub fn place_probabilistic_weekly(
    curve: &ActivationCurve,
    start: NaiveDateTime,
    end: NaiveDateTime,
    schedule: &ScheduleConfig,
    output_timestep_secs: u32,
    seed: Option<u64>,
) -> Result<TimeSeries> {
    let window = CalendarWindow::new(start, end, output_timestep_secs)?;
    PlacementMode::Weekly(schedule.clone()).place(curve, &window, &mut seeded_rng(seed))
}

/// Split the grid into maximal runs of consecutive points sharing `key`.
pub(crate) fn runs_by<K, F>(points: &[SeriesPoint], key: F) -> Vec<Range<usize>>
where
    K: PartialEq,
    F: Fn(&NaiveDateTime) -> K,
{
    let mut runs = Vec::new();
    let mut begin = 0;
    for i in 1..=points.len() {
        if i == points.len() || key(&points[i].timestamp) != key(&points[begin].timestamp) {
            if begin < i {
                runs.push(begin..i);
            }
            begin = i;
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn runs_split_on_calendar_days() {
        let window = CalendarWindow::new(ts(1, 22), ts(3, 1), 3600).unwrap();
        let series = TimeSeries::zeros(&window);
        let runs = runs_by(series.points(), |t| t.date());
        assert_eq!(runs, vec![0..2, 2..26, 26..28]);
    }

    #[test]
    fn same_seed_reproduces_placement() {
        let curve = ActivationCurve::new(vec![500.0; 45], 60);
        let a = place_uniform_random(&curve, ts(1, 0), ts(4, 23), 2, 60, Some(7)).unwrap();
        let b = place_uniform_random(&curve, ts(1, 0), ts(4, 23), 2, 60, Some(7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.activation_starts().len(), 8);
    }

    #[test]
    fn weekly_entry_point_validates_schedule() {
        let curve = ActivationCurve::new(vec![500.0; 10], 60);
        let mut schedule = ScheduleConfig::default();
        schedule
            .weekday
            .hour_probabilities
            .insert("evening".into(), 1.0);
        let result = place_probabilistic_weekly(&curve, ts(4, 0), ts(10, 23), &schedule, 60, Some(1));
        assert!(result.is_err());
    }
}
