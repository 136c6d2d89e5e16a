//! Throughput Summary
//!
//! Central tendency (mean, median, stddev, margin) comes from the cleaned
//! samples; min/max/p95 come from every sample.

use crate::NANOS_PER_SEC;
use crate::margin::relative_margin_of_error;
use crate::outliers::{OutlierMethod, detect_outliers};
use crate::percentiles::compute_percentile;

/// Summary of one candidate's per-iteration timings (nanoseconds).
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputSummary {
    /// Mean ns per iteration (cleaned)
    pub mean_ns: f64,
    /// Median ns per iteration (cleaned)
    pub median_ns: f64,
    /// Sample standard deviation (cleaned)
    pub std_dev_ns: f64,
    /// Fastest sample
    pub min_ns: f64,
    /// Slowest sample
    pub max_ns: f64,
    /// 95th percentile
    pub p95_ns: f64,
    /// Operations per second derived from the mean
    pub ops_per_sec: f64,
    /// Relative margin of error, percent
    pub margin_pct: f64,
    /// Samples seen
    pub sample_count: usize,
    /// Samples fenced out as outliers
    pub outlier_count: usize,
}

/// Summarize timing samples. Returns `None` when there is nothing to
/// summarize (no samples, or only zero-length ones).
pub fn compute_summary(samples: &[f64], method: OutlierMethod) -> Option<ThroughputSummary> {
    if samples.is_empty() {
        return None;
    }

    let analysis = detect_outliers(samples, method);
    let cleaned: &[f64] = if analysis.cleaned_samples.is_empty() {
        samples
    } else {
        &analysis.cleaned_samples
    };

    let mean_ns = cleaned.iter().sum::<f64>() / cleaned.len() as f64;
    if mean_ns <= 0.0 || !mean_ns.is_finite() {
        return None;
    }

    let std_dev_ns = if cleaned.len() < 2 {
        0.0
    } else {
        let variance = cleaned.iter().map(|x| (x - mean_ns).powi(2)).sum::<f64>()
            / (cleaned.len() - 1) as f64;
        variance.sqrt()
    };

    let min_ns = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max_ns = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(ThroughputSummary {
        mean_ns,
        median_ns: compute_percentile(cleaned, 50.0),
        std_dev_ns,
        min_ns,
        max_ns,
        p95_ns: compute_percentile(samples, 95.0),
        ops_per_sec: NANOS_PER_SEC / mean_ns,
        margin_pct: relative_margin_of_error(cleaned),
        sample_count: samples.len(),
        outlier_count: analysis.outlier_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ops_from_mean() {
        let samples = vec![2_000.0; 10];
        let summary = compute_summary(&samples, OutlierMethod::TUKEY).unwrap();

        assert!((summary.ops_per_sec - 500_000.0).abs() < 1e-6);
        assert_eq!(summary.margin_pct, 0.0);
        assert_eq!(summary.sample_count, 10);
    }

    #[test]
    fn test_outlier_excluded_from_mean_not_max() {
        let samples = vec![100.0, 101.0, 99.0, 100.0, 102.0, 98.0, 5_000.0];
        let summary = compute_summary(&samples, OutlierMethod::TUKEY).unwrap();

        assert!(summary.mean_ns < 110.0);
        assert_eq!(summary.max_ns, 5_000.0);
        assert_eq!(summary.outlier_count, 1);
    }

    #[test]
    fn test_empty_and_zero_samples() {
        assert!(compute_summary(&[], OutlierMethod::TUKEY).is_none());
        assert!(compute_summary(&[0.0, 0.0], OutlierMethod::None).is_none());
    }
}
