//! Periodicity detection over inter-arrival interval series.
//!
//! # Statistical Methodology
//!
//! The test statistic is the coefficient of variation, CV = σ / μ over
//! the interval series. A low CV means the endpoint talks on a stable
//! period, the timing signature of automated check-ins. CV alone can be
//! fooled by a few extreme outliers balancing each other out, so a second
//! test requires at least half of the intervals to sit inside
//! `mean ± tolerance·mean`. Both tests must pass.

use statrs::statistics::{Data, Distribution};

use crate::model::PeriodicityVerdict;

/// Default tolerance fraction for the CV and in-range tests.
pub const DEFAULT_TOLERANCE: f64 = 0.30;

/// Minimum interval count required to judge periodicity at all.
pub const MIN_INTERVALS: usize = 5;

/// Minimum fraction of intervals that must lie within the tolerance band.
const MIN_IN_RANGE_RATIO: f64 = 0.5;

/// Decides whether an interval series exhibits a stable period.
///
/// Fewer than [`MIN_INTERVALS`] intervals, or a mean below one second
/// (too fast to be a meaningful beacon period at this resolution),
/// short-circuit to a zeroed non-periodic verdict. Otherwise the verdict
/// carries the estimated period (the mean) and the CV even when the
/// series fails the periodicity tests.
pub fn detect(intervals: &[f64], tolerance: f64) -> PeriodicityVerdict {
    if intervals.len() < MIN_INTERVALS {
        return PeriodicityVerdict::not_periodic();
    }

    let (mean, stdev) = mean_stdev(intervals);
    if mean < 1.0 {
        return PeriodicityVerdict::not_periodic();
    }

    let cv = stdev / mean;

    let band = tolerance * mean;
    let in_range = intervals
        .iter()
        .filter(|&&interval| (interval - mean).abs() <= band)
        .count();
    let in_range_ratio = in_range as f64 / intervals.len() as f64;

    PeriodicityVerdict {
        is_periodic: cv < tolerance && in_range_ratio >= MIN_IN_RANGE_RATIO,
        period_seconds: mean,
        coefficient_of_variation: cv,
    }
}

/// Arithmetic mean and sample standard deviation (0 for fewer than 2
/// samples).
pub(crate) fn mean_stdev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let data = Data::new(values.to_vec());
    let mean = data.mean().unwrap_or(0.0);
    let stdev = if values.len() > 1 {
        data.std_dev().unwrap_or(0.0)
    } else {
        0.0
    };
    (mean, stdev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_interval_floor_never_periodic() {
        // Four perfectly regular intervals are still below the floor.
        let verdict = detect(&[60.0, 60.0, 60.0, 60.0], DEFAULT_TOLERANCE);
        assert!(!verdict.is_periodic);
        assert_eq!(verdict.period_seconds, 0.0);
        assert_eq!(verdict.coefficient_of_variation, 0.0);
    }

    #[test]
    fn test_five_regular_intervals_are_periodic() {
        let verdict = detect(&[60.0, 60.0, 60.0, 60.0, 60.0], DEFAULT_TOLERANCE);
        assert!(verdict.is_periodic);
        assert!((verdict.period_seconds - 60.0).abs() < 1e-9);
        assert!(verdict.coefficient_of_variation < 1e-9);
    }

    #[test]
    fn test_subsecond_mean_not_periodic() {
        let verdict = detect(&[0.5, 0.5, 0.5, 0.5, 0.5, 0.5], DEFAULT_TOLERANCE);
        assert!(!verdict.is_periodic);
        assert_eq!(verdict.period_seconds, 0.0);
    }

    #[test]
    fn test_jittered_beacon_within_tolerance() {
        // 60s beacon with ±5% deterministic jitter.
        let intervals: Vec<f64> = (0..20)
            .map(|i| 60.0 + ((i % 5) as f64 - 2.0) * 0.02 * 60.0)
            .collect();
        let verdict = detect(&intervals, DEFAULT_TOLERANCE);
        assert!(verdict.is_periodic);
        assert!((verdict.period_seconds - 60.0).abs() < 1.0);
    }

    #[test]
    fn test_stochastic_intervals_not_periodic() {
        let verdict = detect(
            &[2.0, 300.0, 15.0, 900.0, 5.0, 120.0, 45.0],
            DEFAULT_TOLERANCE,
        );
        assert!(!verdict.is_periodic);
        assert!(verdict.coefficient_of_variation > 1.0);
        // Mean and CV are still reported for non-periodic series.
        assert!(verdict.period_seconds > 0.0);
    }

    #[test]
    fn test_in_range_guard_rejects_bimodal_series() {
        // Six of ten intervals sit 35% off the mean: CV ≈ 0.286 passes
        // the primary test, but only 40% are inside the ±30% band.
        let intervals = [13.5, 6.5, 13.5, 6.5, 13.5, 6.5, 10.0, 10.0, 10.0, 10.0];
        let verdict = detect(&intervals, DEFAULT_TOLERANCE);
        assert!(verdict.coefficient_of_variation < DEFAULT_TOLERANCE);
        assert!(!verdict.is_periodic);
    }

    #[test]
    fn test_deterministic_for_fixed_input() {
        let intervals = [61.0, 59.5, 60.2, 60.0, 59.3, 60.8];
        let first = detect(&intervals, DEFAULT_TOLERANCE);
        for _ in 0..10 {
            assert_eq!(detect(&intervals, DEFAULT_TOLERANCE), first);
        }
    }

    #[test]
    fn test_cv_monotonic_under_dispersion_increase() {
        // Same mean (10.0), strictly wider spread.
        let tight = [9.0, 10.0, 11.0, 10.0, 10.0];
        let wide = [7.0, 10.0, 13.0, 10.0, 10.0];
        let cv_tight = detect(&tight, DEFAULT_TOLERANCE).coefficient_of_variation;
        let cv_wide = detect(&wide, DEFAULT_TOLERANCE).coefficient_of_variation;
        assert!((detect(&tight, DEFAULT_TOLERANCE).period_seconds - 10.0).abs() < 1e-9);
        assert!((detect(&wide, DEFAULT_TOLERANCE).period_seconds - 10.0).abs() < 1e-9);
        assert!(cv_wide > cv_tight);
    }

    #[test]
    fn test_mean_stdev_small_samples() {
        assert_eq!(mean_stdev(&[]), (0.0, 0.0));
        assert_eq!(mean_stdev(&[5.0]), (5.0, 0.0));
        let (mean, stdev) = mean_stdev(&[2.0, 4.0]);
        assert!((mean - 3.0).abs() < 1e-9);
        // Sample standard deviation, n-1 denominator.
        assert!((stdev - std::f64::consts::SQRT_2).abs() < 1e-9);
    }
}
