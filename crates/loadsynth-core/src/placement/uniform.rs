//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use rand::seq::index;
use rand::Rng;
use tracing::debug;

use super::runs_by;
use crate::series::TimeSeries;

/// Overlay up to `activations_per_day` copies of `curve` on every calendar day.
///
/// Start offsets are drawn without replacement from the positions where the
/// whole curve fits inside the day. Days too short to hold one activation are
/// skipped.
pub fn place_uniform_daily<R: Rng + ?Sized>(
    series: &mut TimeSeries,
    curve: &[f64],
    activations_per_day: usize,
    rng: &mut R,
) {
    if curve.is_empty() || activations_per_day == 0 {
        debug!("nothing to place");
        return;
    }
    let days = runs_by(series.points(), |ts| ts.date());
    for day in days {
        let max_start = day.len().saturating_sub(curve.len());
        if max_start == 0 {
            debug!(
                day = %series.points()[day.start].timestamp.date(),
                samples = day.len(),
                "day too short for an activation"
            );
            continue;
        }
        let amount = activations_per_day.min(max_start);
        let offsets = index::sample(rng, max_start, amount);
        for offset in offsets.iter() {
            series.overlay_max(day.start + offset, curve);
        }
        debug!(
            day = %series.points()[day.start].timestamp.date(),
            placed = amount,
            "placed daily activations"
        );
    }
}
