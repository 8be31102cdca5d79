//! Order statistics over score and density samples.

/// Percentile of the non-NaN values with linear interpolation between ranks.
///
/// Matches the default ("linear") method of numpy's `nanpercentile`.
/// Returns `None` when no value is left after dropping NaN.
///
/// # Example
/// ```
/// use gw_tiler::algorithms::statistics::nan_percentile;
///
/// assert_eq!(nan_percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), Some(2.5));
/// assert_eq!(nan_percentile(&[f64::NAN, 7.0], 95.0), Some(7.0));
/// assert_eq!(nan_percentile(&[f64::NAN], 95.0), None);
/// ```
pub fn nan_percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 100.0);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    if lo == hi || frac == 0.0 {
        return Some(sorted[lo]);
    }
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_percentile_extremes() {
        let values = [5.0, 1.0, 3.0];
        assert_eq!(nan_percentile(&values, 0.0), Some(1.0));
        assert_eq!(nan_percentile(&values, 100.0), Some(5.0));
    }

    #[test]
    fn test_percentile_interpolates() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        // numpy.percentile(range(1, 11), 95) == 9.55
        assert_abs_diff_eq!(nan_percentile(&values, 95.0).unwrap(), 9.55, epsilon = 1e-12);
        // numpy.percentile(range(1, 11), 98) == 9.82
        assert_abs_diff_eq!(nan_percentile(&values, 98.0).unwrap(), 9.82, epsilon = 1e-12);
    }

    #[test]
    fn test_percentile_single_value() {
        assert_eq!(nan_percentile(&[1001.0], 98.0), Some(1001.0));
    }

    #[test]
    fn test_percentile_ignores_nan() {
        let values = [f64::NAN, 1.0, f64::NAN, 3.0];
        assert_eq!(nan_percentile(&values, 50.0), Some(2.0));
    }

    #[test]
    fn test_percentile_empty() {
        assert_eq!(nan_percentile(&[], 50.0), None);
    }
}
