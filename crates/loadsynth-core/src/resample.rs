//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Sample-count changes between timesteps.
//!
//! [`resample`] stretches a curve onto the number of native samples a target
//! duration needs, interpolating over a normalised `[0, 1]` index axis.
//! [`resample_timestep`] moves a native-rate curve onto the coarser output
//! grid by linear interpolation over elapsed seconds.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationKind {
    Linear,
    #[default]
    Cubic,
}

/// Number of samples covering `duration_min` at `timestep_secs`.
pub fn step_count(duration_min: f64, timestep_secs: f64) -> usize {
    let steps = (duration_min * 60.0 / timestep_secs).floor();
    if steps.is_finite() && steps > 0.0 {
        steps as usize
    } else {
        0
    }
}

/// Resample `curve` to exactly `step_count(duration_min, timestep_secs)` samples.
pub fn resample(
    curve: &[f64],
    duration_min: f64,
    timestep_secs: f64,
    kind: InterpolationKind,
) -> Vec<f64> {
    resample_to_len(curve, step_count(duration_min, timestep_secs), kind)
}

/// Resample `curve` to `steps` samples; returned unchanged when already that long.
pub fn resample_to_len(curve: &[f64], steps: usize, kind: InterpolationKind) -> Vec<f64> {
    if curve.len() == steps {
        return curve.to_vec();
    }
    match curve.len() {
        0 => return vec![0.0; steps],
        1 => return vec![curve[0]; steps],
        _ => {}
    }
    let xs = linspace(curve.len());
    let targets = linspace(steps);
    match kind {
        InterpolationKind::Linear => targets
            .iter()
            .map(|&x| linear_at(&xs, curve, x))
            .collect(),
        InterpolationKind::Cubic => {
            let spline = CubicSpline::fit(&xs, curve);
            targets.iter().map(|&x| spline.eval(x)).collect()
        }
    }
}

/// Move a curve sampled every `native_secs` onto a grid every `output_secs`.
///
/// The output has `step_count(duration_min, output_secs)` samples; positions past
/// the last native sample hold its value.
pub fn resample_timestep(
    curve: &[f64],
    duration_min: f64,
    native_secs: f64,
    output_secs: f64,
) -> Vec<f64> {
    let steps = step_count(duration_min, output_secs);
    if curve.is_empty() {
        return vec![0.0; steps];
    }
    let xs: Vec<f64> = (0..curve.len()).map(|i| i as f64 * native_secs).collect();
    (0..steps)
        .map(|i| clamped_linear_at(&xs, curve, i as f64 * output_secs))
        .collect()
}

fn linspace(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let denom = (n - 1) as f64;
            (0..n).map(|i| i as f64 / denom).collect()
        }
    }
}

/// Index of the segment `[xs[i], xs[i + 1]]` used for `x`; edges extend outward.
fn segment(xs: &[f64], x: f64) -> usize {
    let last = xs.len() - 2;
    match xs.partition_point(|&knot| knot <= x) {
        0 => 0,
        p => (p - 1).min(last),
    }
}

fn linear_at(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let i = segment(xs, x);
    let t = (x - xs[i]) / (xs[i + 1] - xs[i]);
    ys[i] + t * (ys[i + 1] - ys[i])
}

fn clamped_linear_at(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if ys.len() == 1 || x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    linear_at(xs, ys, x)
}

/// Not-a-knot cubic spline, evaluated piecewise with boundary extrapolation.
///
/// Three knots degrade to the interpolating parabola and two to a line.
#[derive(Debug)]
struct CubicSpline<'a> {
    xs: &'a [f64],
    ys: &'a [f64],
    /// Second derivative at every knot.
    m: Vec<f64>,
}

impl<'a> CubicSpline<'a> {
    fn fit(xs: &'a [f64], ys: &'a [f64]) -> Self {
        let n = xs.len();
        let m = match n {
            0..=2 => vec![0.0; n],
            3 => {
                let h0 = xs[1] - xs[0];
                let h1 = xs[2] - xs[1];
                let curvature =
                    2.0 * ((ys[2] - ys[1]) / h1 - (ys[1] - ys[0]) / h0) / (h0 + h1);
                vec![curvature; 3]
            }
            _ => not_a_knot_moments(xs, ys),
        };
        Self { xs, ys, m }
    }

    fn eval(&self, x: f64) -> f64 {
        let i = segment(self.xs, x);
        let h = self.xs[i + 1] - self.xs[i];
        let a = self.xs[i + 1] - x;
        let b = x - self.xs[i];
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

/// Solve for knot second derivatives with third-derivative continuity at the
/// first and last interior knots. Requires at least four knots.
fn not_a_knot_moments(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let slope: Vec<f64> = (0..n - 1).map(|i| (ys[i + 1] - ys[i]) / h[i]).collect();

    // Unknowns are m[1..n-1]; rows follow the standard continuity equations
    // with m[0] and m[n-1] eliminated through the not-a-knot conditions.
    let k = n - 2;
    let mut sub = vec![0.0; k];
    let mut diag = vec![0.0; k];
    let mut sup = vec![0.0; k];
    let mut rhs = vec![0.0; k];
    for r in 0..k {
        let i = r + 1;
        sub[r] = h[i - 1];
        diag[r] = 2.0 * (h[i - 1] + h[i]);
        sup[r] = h[i];
        rhs[r] = 6.0 * (slope[i] - slope[i - 1]);
    }
    // m0 = (1 + h0/h1) m1 - (h0/h1) m2
    let ratio_first = h[0] / h[1];
    diag[0] += h[0] * (1.0 + ratio_first);
    sup[0] -= h[0] * ratio_first;
    // m[n-1] = (1 + h[n-2]/h[n-3]) m[n-2] - (h[n-2]/h[n-3]) m[n-3]
    let ratio_last = h[n - 2] / h[n - 3];
    diag[k - 1] += h[n - 2] * (1.0 + ratio_last);
    sub[k - 1] -= h[n - 2] * ratio_last;

    let interior = solve_tridiagonal(&sub, &diag, &sup, &rhs);
    let mut m = vec![0.0; n];
    m[1..n - 1].copy_from_slice(&interior);
    m[0] = (1.0 + ratio_first) * m[1] - ratio_first * m[2];
    m[n - 1] = (1.0 + ratio_last) * m[n - 2] - ratio_last * m[n - 3];
    m
}

/// Thomas algorithm; `sub[0]` and `sup[k-1]` are ignored.
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Vec<f64> {
    let k = diag.len();
    let mut c = vec![0.0; k];
    let mut d = vec![0.0; k];
    c[0] = sup[0] / diag[0];
    d[0] = rhs[0] / diag[0];
    for i in 1..k {
        let denom = diag[i] - sub[i] * c[i - 1];
        c[i] = if i + 1 < k { sup[i] / denom } else { 0.0 };
        d[i] = (rhs[i] - sub[i] * d[i - 1]) / denom;
    }
    let mut out = vec![0.0; k];
    out[k - 1] = d[k - 1];
    for i in (0..k - 1).rev() {
        out[i] = d[i] - c[i] * out[i + 1];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{a} != {b} (tol {tol})");
    }

    #[test]
    fn output_length_matches_duration() {
        let curve: Vec<f64> = (0..37).map(|i| (i as f64).sin()).collect();
        for duration in [0.5, 1.0, 7.3, 90.0] {
            let expected = (duration * 60.0 / 7.0_f64).floor() as usize;
            assert_eq!(resample(&curve, duration, 7.0, InterpolationKind::Cubic).len(), expected);
            assert_eq!(resample(&curve, duration, 7.0, InterpolationKind::Linear).len(), expected);
        }
    }

    #[test]
    fn matching_length_is_passthrough() {
        let curve = vec![1.0, 5.0, 2.0, 8.0, 3.0, 9.0, 4.0, 0.0];
        assert_eq!(resample(&curve, 1.0, 7.0, InterpolationKind::Cubic), curve);
    }

    #[test]
    fn cubic_reproduces_cubic_polynomials() {
        let xs = linspace(6);
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x * x * x - x + 0.5).collect();
        let out = resample_to_len(&ys, 11, InterpolationKind::Cubic);
        for (i, value) in out.iter().enumerate() {
            let x = i as f64 / 10.0;
            assert_close(*value, 2.0 * x * x * x - x + 0.5, 1e-9);
        }
    }

    #[test]
    fn cubic_keeps_endpoints() {
        let ys = vec![0.0, 1000.0, 2000.0, 1000.0, 0.0];
        let out = resample_to_len(&ys, 8, InterpolationKind::Cubic);
        assert_close(out[0], 0.0, 1e-9);
        assert_close(out[7], 0.0, 1e-9);
    }

    #[test]
    fn three_knots_follow_the_parabola() {
        let out = resample_to_len(&[0.0, 1.0, 0.0], 5, InterpolationKind::Cubic);
        // y = 4x(1 - x)
        assert_close(out[1], 0.75, 1e-9);
        assert_close(out[2], 1.0, 1e-9);
    }

    #[test]
    fn linear_interpolates_between_knots() {
        let out = resample_to_len(&[0.0, 10.0], 5, InterpolationKind::Linear);
        assert_eq!(out, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn timestep_resample_uses_elapsed_seconds() {
        // 10 native samples at 6 s, output at 12 s over one minute.
        let curve: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let out = resample_timestep(&curve, 1.0, 6.0, 12.0);
        assert_eq!(out, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn timestep_resample_holds_last_value() {
        let out = resample_timestep(&[1.0, 3.0], 1.0, 7.0, 20.0);
        assert_eq!(out, vec![1.0, 3.0, 3.0]);
    }
}
