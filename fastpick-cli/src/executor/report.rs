//! Report Building
//!
//! Turns a finished [`SuiteReport`] into the serializable [`Report`].
//! Candidates keep run order; metrics come from the statistics computed
//! while the suite ran, so nothing is recomputed here.

use super::execution::{ExecutionConfig, SuiteReport};
use chrono::Utc;
use fastpick_core::{CaseError, SandboxError};
use fastpick_report::{
    CandidateMetrics, CandidateReport, CandidateStatus, FailureInfo, Report, ReportConfig,
    ReportMeta, ReportSummary, SCHEMA_VERSION,
};

/// Build a complete Report from a finished run
///
/// # Arguments
/// * `suite` - Outcomes and statistics from the orchestrator
/// * `config` - Execution configuration captured in the metadata
/// * `module` - Path of the module description, if it came from a file
/// * `entry_point` - Entry point name declared by the module
pub fn build_report(
    suite: &SuiteReport,
    config: &ExecutionConfig,
    module: Option<String>,
    entry_point: Option<String>,
) -> Report {
    let candidates: Vec<CandidateReport> = suite
        .candidates
        .iter()
        .zip(&suite.outcomes)
        .map(|(candidate, outcome)| {
            let mut entry = CandidateReport {
                name: candidate.raw_name.clone(),
                binding: candidate.name.clone(),
                isolation: candidate.isolation.strategy.to_string(),
                status: CandidateStatus::Passed,
                metrics: None,
                failure: None,
            };

            match &outcome.result {
                Ok(result) => {
                    entry.metrics = suite.summaries.get(&candidate.raw_name).map(|s| CandidateMetrics {
                        samples: s.sample_count,
                        iterations: result.iterations,
                        outliers: s.outlier_count,
                        mean_ns: s.mean_ns,
                        median_ns: s.median_ns,
                        std_dev_ns: s.std_dev_ns,
                        min_ns: s.min_ns,
                        max_ns: s.max_ns,
                        p95_ns: s.p95_ns,
                        ops_per_sec: s.ops_per_sec,
                        margin_pct: s.margin_pct,
                    });
                }
                Err(error) => {
                    entry.status = CandidateStatus::Failed;
                    entry.failure = Some(FailureInfo {
                        kind: failure_kind(error).to_string(),
                        message: error.to_string(),
                    });
                }
            }
            entry
        })
        .collect();

    let total_duration_ms = suite.duration.as_secs_f64() * 1000.0;
    let summary = ReportSummary::from_candidates(&candidates, total_duration_ms);

    Report {
        meta: ReportMeta {
            schema_version: SCHEMA_VERSION,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            module,
            entry_point,
            config: ReportConfig {
                warmup_time_ns: config.warmup_time_ns,
                measurement_time_ns: config.measurement_time_ns,
                min_iterations: config.min_iterations,
                max_iterations: config.max_iterations,
                target_samples: config.target_samples,
                eval_timeout_ms: config.sandbox.eval_timeout.as_millis() as u64,
                call_timeout_ms: config.sandbox.call_timeout.as_millis() as u64,
            },
        },
        candidates,
        comparison: suite.comparison.clone(),
        summary,
    }
}

/// Short machine-readable tag for a case failure
pub fn failure_kind(error: &CaseError) -> &'static str {
    match error {
        CaseError::Sandbox(e) => match e {
            SandboxError::Setup(_) => "setup",
            SandboxError::Evaluation(_) => "evaluation",
            SandboxError::Timeout { .. } => "timeout",
            SandboxError::MissingEntry(_) => "missing-entry",
            SandboxError::NotCallable { .. } => "not-callable",
            SandboxError::Arguments(_) => "arguments",
            SandboxError::Invocation(_) => "invocation",
        },
        CaseError::NoMeasurements => "no-measurements",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Orchestrator;
    use fastpick_core::{BenchmarkModule, Phase};
    use fastpick_report::MemorySink;
    use serde_json::json;
    use std::time::Duration;

    fn run(implementations: serde_json::Value) -> (SuiteReport, ExecutionConfig) {
        let module = BenchmarkModule::from_value(
            json!({"implementations": implementations, "testData": {"n": 5}, "entryPointName": "work"}),
            &Default::default(),
        )
        .unwrap();
        let config = ExecutionConfig::fixed(10);
        let suite = Orchestrator::new(config.clone())
            .run(&module, &mut MemorySink::new())
            .unwrap();
        (suite, config)
    }

    #[test]
    fn test_build_report_statuses() {
        let (suite, config) = run(json!({
            "good one": "function work(o) { return o.n * 2; }",
            "bad": "function work() { throw new TypeError('bad input'); }"
        }));
        let report = build_report(&suite, &config, Some("mod.json".into()), Some("work".into()));

        assert_eq!(report.candidates.len(), 2);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.meta.entry_point.as_deref(), Some("work"));
        assert_eq!(report.meta.config.min_iterations, Some(10));

        let good = &report.candidates[0];
        assert_eq!(good.name, "good one");
        assert_eq!(good.binding, "goodone");
        assert_eq!(good.status, CandidateStatus::Passed);
        assert_eq!(good.isolation, "function declaration");
        let metrics = good.metrics.as_ref().unwrap();
        assert_eq!(metrics.iterations, 10);
        assert!(metrics.ops_per_sec > 0.0);

        let bad = &report.candidates[1];
        assert_eq!(bad.status, CandidateStatus::Failed);
        let failure = bad.failure.as_ref().unwrap();
        assert_eq!(failure.kind, "invocation");
        assert_eq!(failure.message, "bad input");

        assert_eq!(report.comparison.fastest, "good one");
    }

    #[test]
    fn test_failure_kinds() {
        let timeout = CaseError::Sandbox(SandboxError::Timeout {
            phase: Phase::Invocation,
            budget: Duration::from_millis(5),
        });
        assert_eq!(failure_kind(&timeout), "timeout");
        assert_eq!(
            failure_kind(&CaseError::Sandbox(SandboxError::MissingEntry("x".into()))),
            "missing-entry"
        );
        assert_eq!(failure_kind(&CaseError::NoMeasurements), "no-measurements");
    }
}
