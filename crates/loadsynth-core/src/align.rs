//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Dynamic-time-warping re-indexing of a curve onto a reference.

/// Optimal warping path between `a` and `b` under absolute-difference cost.
///
/// Pairs run from `(0, 0)` to `(a.len() - 1, b.len() - 1)`; an empty input yields
/// an empty path.
pub fn dtw_path(a: &[f64], b: &[f64]) -> Vec<(usize, usize)> {
    let n = a.len();
    let m = b.len();
    if n == 0 || m == 0 {
        return Vec::new();
    }
    let width = m + 1;
    let mut dp = vec![f64::INFINITY; (n + 1) * width];
    dp[0] = 0.0;
    for i in 1..=n {
        for j in 1..=m {
            let cost = (a[i - 1] - b[j - 1]).abs();
            let best = dp[(i - 1) * width + j - 1]
                .min(dp[(i - 1) * width + j])
                .min(dp[i * width + j - 1]);
            dp[i * width + j] = cost + best;
        }
    }

    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        path.push((i - 1, j - 1));
        let diagonal = dp[(i - 1) * width + j - 1];
        let up = dp[(i - 1) * width + j];
        let left = dp[i * width + j - 1];
        // Ties favour the diagonal step.
        if diagonal <= up && diagonal <= left {
            i -= 1;
            j -= 1;
        } else if up <= left {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    path.reverse();
    path
}

/// Project `template` onto the index space of `reference`.
///
/// Every path pair adds the template sample to the reference slot it maps to;
/// the result is the per-slot mean and always has `reference.len()` samples.
pub fn align(template: &[f64], reference: &[f64]) -> Vec<f64> {
    let mut aligned = vec![0.0; reference.len()];
    let mut counts = vec![0usize; reference.len()];
    for (i_t, i_r) in dtw_path(template, reference) {
        aligned[i_r] += template[i_t];
        counts[i_r] += 1;
    }
    for (value, count) in aligned.iter_mut().zip(counts) {
        *value /= count.max(1) as f64;
    }
    aligned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_curves_follow_the_diagonal() {
        let curve = [0.0, 3.0, 5.0, 1.0];
        assert_eq!(dtw_path(&curve, &curve), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
        assert_eq!(align(&curve, &curve), curve.to_vec());
    }

    #[test]
    fn path_is_monotone_and_anchored() {
        let a = [0.0, 1.0, 4.0, 4.0, 2.0, 0.0];
        let b = [0.0, 4.0, 2.0, 0.0];
        let path = dtw_path(&a, &b);
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(5, 3)));
        for pair in path.windows(2) {
            let (di, dj) = (pair[1].0 - pair[0].0, pair[1].1 - pair[0].1);
            assert!(di <= 1 && dj <= 1 && di + dj >= 1);
        }
    }

    #[test]
    fn aligned_length_matches_reference() {
        let template: Vec<f64> = (0..23).map(|i| (i as f64 * 0.4).sin().abs()).collect();
        let reference: Vec<f64> = (0..9).map(|i| (i as f64 * 0.9).sin().abs()).collect();
        assert_eq!(align(&template, &reference).len(), reference.len());
        assert_eq!(align(&reference, &template).len(), template.len());
    }

    #[test]
    fn stretched_template_collapses_onto_reference() {
        let reference = [0.0, 10.0, 0.0];
        let template = [0.0, 10.0, 10.0, 10.0, 0.0];
        assert_eq!(align(&template, &reference), vec![0.0, 10.0, 0.0]);
    }

    #[test]
    fn empty_template_leaves_zeros() {
        assert_eq!(align(&[], &[1.0, 2.0]), vec![0.0, 0.0]);
    }
}
