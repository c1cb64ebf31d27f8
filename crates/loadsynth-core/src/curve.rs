//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Unit-range normalisation and affine scaling of power curves.

/// Min-max normalise `seq` into `[0, 1]`.
///
/// A constant sequence has no range to normalise against and maps to `0.5`
/// everywhere.
pub fn normalize(seq: &[f64]) -> Vec<f64> {
    let (min, max) = seq
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if max == min {
        return vec![0.5; seq.len()];
    }
    let span = max - min;
    seq.iter().map(|v| (v - min) / span).collect()
}

/// Map a normalised curve onto `[baseline, nominal]`.
pub fn scale(normalized: &[f64], nominal: f64, baseline: f64) -> Vec<f64> {
    let span = nominal - baseline;
    normalized.iter().map(|v| v * span + baseline).collect()
}

/// Clamp negative samples to zero in place.
pub fn clamp_non_negative(curve: &mut [f64]) {
    for sample in curve.iter_mut() {
        if *sample < 0.0 {
            *sample = 0.0;
        }
    }
}

pub(crate) fn peak(curve: &[f64]) -> f64 {
    curve.iter().copied().fold(0.0, f64::max)
}
