//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use chrono::{Datelike, Duration, NaiveDate};
use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::WeightedIndex;
use tracing::debug;

use super::runs_by;
use crate::errors::{Result, SynthError};
use crate::schedule::{ScheduleConfig, WeeklyProfile};
use crate::series::TimeSeries;

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Overlay non-overlapping activations following the hour-of-day schedule.
///
/// Each ISO week intersecting the grid gets `activations_per_week` scaled by the
/// number of its days inside the window. Positions are drawn by weighted
/// sampling with rejection of overlaps, then topped up deterministically by
/// descending probability. A week may still end up short when no
/// non-overlapping position is left.
pub fn place_weekly<R: Rng + ?Sized>(
    series: &mut TimeSeries,
    curve: &[f64],
    schedule: &ScheduleConfig,
    rng: &mut R,
) -> Result<()> {
    let profile = schedule.profile()?;
    if curve.is_empty() {
        debug!("nothing to place");
        return Ok(());
    }
    let weeks = runs_by(series.points(), |ts| week_start(ts.date()));
    for week in weeks {
        let days = runs_by(&series.points()[week.clone()], |ts| ts.date()).len();
        let target = (f64::from(schedule.activations_per_week) * days as f64 / 7.0).round() as usize;
        let starts = select_week(series, week.clone(), curve.len(), target, &profile, rng)?;
        for &start in &starts {
            series.overlay_max(start, curve);
        }
    }
    Ok(())
}

fn select_week<R: Rng + ?Sized>(
    series: &TimeSeries,
    week: std::ops::Range<usize>,
    span: usize,
    target: usize,
    profile: &WeeklyProfile,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let week_label = series.points()[week.start].timestamp.date();
    let total = series.len();
    let eligible: Vec<usize> = week.filter(|&idx| idx + span <= total).collect();
    if eligible.is_empty() || target == 0 {
        debug!(week = %week_label, eligible = eligible.len(), target, "week skipped");
        return Ok(Vec::new());
    }

    let raw: Vec<f64> = eligible
        .iter()
        .map(|&idx| profile.probability_at(&series.points()[idx].timestamp))
        .collect();
    let mass: f64 = raw.iter().sum();
    let probabilities: Vec<f64> = if mass > 0.0 {
        raw.iter().map(|p| p / mass).collect()
    } else {
        vec![1.0 / eligible.len() as f64; eligible.len()]
    };

    let overlaps = |accepted: &[usize], candidate: usize| {
        accepted.iter().any(|&existing| existing.abs_diff(candidate) < span)
    };

    let sampler = WeightedIndex::new(&probabilities)
        .map_err(|err| SynthError::invalid(format!("schedule weights: {}", err)))?;
    let mut accepted: Vec<usize> = Vec::with_capacity(target);
    let max_attempts = eligible.len() * 2;
    let mut attempts = 0;
    while accepted.len() < target && attempts < max_attempts {
        attempts += 1;
        let candidate = eligible[sampler.sample(rng)];
        if !overlaps(&accepted, candidate) {
            accepted.push(candidate);
        }
    }
    let sampled = accepted.len();

    if accepted.len() < target {
        let mut order: Vec<usize> = (0..eligible.len()).collect();
        order.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));
        for slot in order {
            if accepted.len() >= target {
                break;
            }
            let candidate = eligible[slot];
            if !overlaps(&accepted, candidate) {
                accepted.push(candidate);
            }
        }
    }

    debug!(
        week = %week_label,
        target,
        sampled,
        filled = accepted.len() - sampled,
        attempts,
        "weekly activations selected"
    );
    if accepted.len() < target {
        debug!(week = %week_label, target, placed = accepted.len(), "weekly quota under-filled");
    }
    Ok(accepted)
}
