//! Statistics Computation
//!
//! Per-candidate summary statistics. Throughput is `1e9 / mean` over the
//! Tukey-fenced samples; the margin is the relative margin of error of that
//! mean at 95% confidence.

use fastpick_core::BenchmarkResult;
use fastpick_report::CandidateResult;
use fastpick_stats::{OutlierMethod, ThroughputSummary, compute_summary};

/// Summarize one candidate's measurement.
///
/// # Returns
/// `None` when the measurement has no usable samples.
pub fn compute_statistics(result: &BenchmarkResult) -> Option<ThroughputSummary> {
    compute_summary(&result.sample_nanos(), OutlierMethod::TUKEY)
}

/// Comparison entry for a candidate.
///
/// Falls back to whole-run throughput with a zero margin when the samples
/// could not be summarized.
pub fn to_candidate_result(
    name: &str,
    result: &BenchmarkResult,
    summary: Option<&ThroughputSummary>,
) -> CandidateResult {
    match summary {
        Some(s) => CandidateResult::new(name, s.ops_per_sec, s.margin_pct),
        None => CandidateResult::new(name, result.raw_ops_per_sec(), 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastpick_core::Sample;

    fn result(nanos: &[u64]) -> BenchmarkResult {
        BenchmarkResult {
            samples: nanos
                .iter()
                .map(|&n| Sample {
                    duration_nanos: n,
                    iterations: 1,
                })
                .collect(),
            iterations: nanos.len() as u64,
            total_time_ns: nanos.iter().sum(),
        }
    }

    #[test]
    fn test_ops_from_mean() {
        let r = result(&[2000, 2000, 2000, 2000]);
        let summary = compute_statistics(&r).unwrap();
        let entry = to_candidate_result("A", &r, Some(&summary));
        assert!((entry.ops - 500_000.0).abs() < 1e-6);
        assert_eq!(entry.margin, Some(0.0));
    }

    #[test]
    fn test_fallback_without_summary() {
        let r = BenchmarkResult {
            samples: Vec::new(),
            iterations: 10,
            total_time_ns: 1_000_000,
        };
        assert!(compute_statistics(&r).is_none());
        let entry = to_candidate_result("A", &r, None);
        assert!((entry.ops - 10_000.0).abs() < 1e-6);
    }
}
