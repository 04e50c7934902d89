//! Robust statistics helpers shared by the scoring components
//!
//! All helpers tolerate empty input and return 0.0 rather than NaN so the
//! callers never have to guard against non-finite values.

/// Arithmetic mean. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation. Returns 0.0 for empty input.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Median of the values. Returns 0.0 for empty input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median absolute deviation around the median.
pub fn mad(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    median(&deviations)
}

/// Percentile with linear interpolation, `p` in 0..=100.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Clip values to the 5th/95th percentile band before aggregation.
///
/// Only applied with 5 or more samples; smaller sets are returned unchanged
/// since clipping them would erase most of the signal.
pub fn winsorize(values: &[f64]) -> Vec<f64> {
    winsorize_at(values, 0.05, 0.95)
}

pub fn winsorize_at(values: &[f64], lower_pct: f64, upper_pct: f64) -> Vec<f64> {
    if values.len() < 5 {
        return values.to_vec();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let lower_index = (sorted.len() as f64 * lower_pct).floor() as usize;
    let upper_index = ((sorted.len() as f64 * upper_pct).ceil() as usize).saturating_sub(1);
    let lower = sorted[lower_index.min(sorted.len() - 1)];
    let upper = sorted[upper_index.min(sorted.len() - 1)];
    values.iter().map(|v| v.clamp(lower, upper)).collect()
}

/// Robust z-score from median/MAD. The 0.6745 factor rescales MAD to be
/// comparable with a standard deviation. Falls back to a median ratio when
/// MAD is zero (constant-amount history).
pub fn robust_z(amount: f64, median: f64, mad: f64) -> f64 {
    if mad > 0.0 {
        (0.6745 * (amount - median) / mad).abs()
    } else if median > 0.0 {
        // Ratio fallback: express distance from median in median units
        (amount - median).abs() / median
    } else {
        0.0
    }
}

/// Heuristic [0.3, 1.0] score from sample count and observed time span.
///
/// `count_scale` is the sample count at which the count term saturates
/// (12 for forecasting, 20 for goal prediction).
pub fn data_quality_score(count: usize, count_scale: f64, span_days: f64) -> f64 {
    let count_term = (count as f64 / count_scale).min(1.0) * 0.4;
    let span_term = (span_days / 90.0).min(1.0) * 0.3;
    (0.3 + count_term + span_term).clamp(0.3, 1.0)
}

/// Observed time span in days across a set of dates, at least 1.
pub fn span_days(dates: &[chrono::NaiveDate]) -> f64 {
    match (dates.iter().min(), dates.iter().max()) {
        (Some(min), Some(max)) => ((*max - *min).num_days() as f64).max(1.0),
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_mad_constant_series() {
        assert_eq!(mad(&[5.0, 5.0, 5.0]), 0.0);
        assert_eq!(mad(&[1.0, 2.0, 3.0]), 1.0);
    }

    #[test]
    fn test_percentile_bounds() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&values, 0.0), 10.0);
        assert_eq!(percentile(&values, 100.0), 50.0);
        assert_eq!(percentile(&values, 50.0), 30.0);
    }

    #[test]
    fn test_winsorize_small_sets_untouched() {
        let values = [1.0, 1000.0];
        assert_eq!(winsorize(&values), values.to_vec());
    }

    #[test]
    fn test_winsorize_clips_outliers() {
        let mut values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        values.push(1_000_000.0);
        let clipped = winsorize(&values);
        let max = clipped.iter().cloned().fold(f64::MIN, f64::max);
        assert!(max < 1_000_000.0);
        // Bulk of the distribution is untouched
        assert!(clipped.contains(&50.0));
    }

    #[test]
    fn test_robust_z_mad_fallback() {
        // MAD = 0 uses the ratio fallback
        let z = robust_z(300.0, 100.0, 0.0);
        assert!((z - 2.0).abs() < 1e-9);
        // Both median and MAD zero means no signal
        assert_eq!(robust_z(300.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_data_quality_score_range() {
        assert!((data_quality_score(0, 12.0, 0.0) - 0.3).abs() < 1e-9);
        assert!((data_quality_score(100, 12.0, 365.0) - 1.0).abs() < 1e-9);
        let mid = data_quality_score(6, 12.0, 45.0);
        assert!(mid > 0.3 && mid < 1.0);
    }

    #[test]
    fn test_span_days() {
        let dates = [
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        ];
        assert_eq!(span_days(&dates), 30.0);
        assert_eq!(span_days(&[]), 1.0);
    }
}
