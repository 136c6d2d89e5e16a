//! Report Data Structures

use crate::comparison::BenchmarkComparison;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Complete record of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub candidates: Vec<CandidateReport>,
    pub comparison: BenchmarkComparison,
    pub summary: ReportSummary,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub module: Option<String>,
    pub entry_point: Option<String>,
    pub config: ReportConfig,
}

/// Execution configuration captured in report metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub warmup_time_ns: u64,
    pub measurement_time_ns: u64,
    pub min_iterations: Option<u64>,
    pub max_iterations: Option<u64>,
    pub target_samples: usize,
    pub eval_timeout_ms: u64,
    pub call_timeout_ms: u64,
}

/// One candidate's entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    /// Name as given in the module description
    pub name: String,
    /// Identifier the entry point was bound to in the sandbox
    pub binding: String,
    pub isolation: String,
    pub status: CandidateStatus,
    pub metrics: Option<CandidateMetrics>,
    pub failure: Option<FailureInfo>,
}

/// Candidate execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Passed,
    Failed,
}

/// Timing metrics for a successful candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetrics {
    pub samples: usize,
    pub iterations: u64,
    pub outliers: usize,
    pub mean_ns: f64,
    pub median_ns: f64,
    pub std_dev_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
    pub p95_ns: f64,
    pub ops_per_sec: f64,
    pub margin_pct: f64,
}

/// Failure information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: String,
    pub message: String,
}

/// Report summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_candidates: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_duration_ms: f64,
}

impl ReportSummary {
    /// Tally candidate statuses.
    pub fn from_candidates(candidates: &[CandidateReport], total_duration_ms: f64) -> Self {
        let passed = candidates
            .iter()
            .filter(|c| c.status == CandidateStatus::Passed)
            .count();
        Self {
            total_candidates: candidates.len(),
            passed,
            failed: candidates.len() - passed,
            total_duration_ms,
        }
    }
}
