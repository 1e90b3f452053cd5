//! Percentile and moment helpers.
//!
//! The percentile method is part of the Stats format: values are sorted by
//! `f64::total_cmp` and interpolated linearly between closest ranks, so any
//! re-implementation fed the same Train values reproduces the same bounds.

/// Identifier recorded in every Stats document.
pub const PERCENTILE_METHOD: &str = "linear-v1";

/// Finite values sorted ascending.
pub fn sorted_finite<I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Percentile of already-sorted values, `p` in `[0, 1]`.
///
/// Rank `h = (n - 1) * p`; the result interpolates between `x[floor(h)]` and
/// the next value. Returns `None` for an empty slice. The result is finite
/// whenever the input values are.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let p = p.clamp(0.0, 1.0);
    let h = last as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(last);
    let frac = h - lo as f64;
    if frac == 0.0 {
        return Some(sorted[lo]);
    }
    let span = sorted[hi] - sorted[lo];
    if span.is_finite() {
        Some(sorted[lo] + frac * span)
    } else {
        // Neighbours near opposite ends of the f64 range.
        Some(sorted[lo] * (1.0 - frac) + sorted[hi] * frac)
    }
}

pub fn median_sorted(sorted: &[f64]) -> Option<f64> {
    percentile_sorted(sorted, 0.5)
}

/// Mean and population standard deviation of finite values.
///
/// Both results stay finite for any finite input: when the direct sums
/// overflow, the moments are recomputed on values scaled by `max |x|`.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let (mean, std) = moments(values, 1.0);
    if mean.is_finite() && std.is_finite() {
        return Some((mean, std));
    }

    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return Some((0.0, 0.0));
    }
    let (mean, std) = moments(values, scale);
    Some((mean * scale, std * scale))
}

fn moments(values: &[f64], scale: f64) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().map(|v| v / scale).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|v| (v / scale - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_of_two() {
        let sorted = sorted_finite([1303.01, 809.98]);
        assert_eq!(median_sorted(&sorted), Some(1056.495));
    }

    #[test]
    fn test_linear_interpolation() {
        let sorted = sorted_finite((1..=5).map(f64::from));
        assert_eq!(percentile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile_sorted(&sorted, 0.25), Some(2.0));
        assert_eq!(percentile_sorted(&sorted, 1.0), Some(5.0));
        assert_eq!(percentile_sorted(&sorted, 0.1), Some(1.4));
    }

    #[test]
    fn test_edge_cases() {
        assert_eq!(percentile_sorted(&[], 0.5), None);
        assert_eq!(percentile_sorted(&[7.0], 0.99), Some(7.0));
        assert_eq!(sorted_finite([f64::NAN, 2.0, f64::INFINITY, 1.0]), vec![1.0, 2.0]);
    }

    #[test]
    fn test_population_std() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
        assert!(mean_std(&[]).is_none());
    }

    #[test]
    fn test_moments_of_huge_values_stay_finite() {
        let (mean, std) = mean_std(&[1e200, 1.0]).unwrap();
        assert_eq!(mean, 5e199);
        assert!((std - 5e199).abs() / 5e199 < 1e-12, "std = {std}");

        let (mean, std) = mean_std(&[f64::MAX, f64::MAX]).unwrap();
        assert_eq!(mean, f64::MAX);
        assert_eq!(std, 0.0);
    }

    #[test]
    fn test_interpolation_across_opposite_extremes() {
        let sorted = [-1.7e308, 1.7e308];
        assert_eq!(median_sorted(&sorted), Some(0.0));
        let p99 = percentile_sorted(&sorted, 0.99).unwrap();
        assert!(p99.is_finite() && p99 > 1.6e308);
    }
}
