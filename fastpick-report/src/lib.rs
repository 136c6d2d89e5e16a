#![warn(missing_docs)]
//! fastpick Report - Output and Parsing
//!
//! Everything that leaves or re-enters a run as text:
//! - `BenchmarkComparison`, the normalized ranking
//! - The line protocol (`RESULTS_JSON:`, `cycle:`, `complete:`, error markers)
//!   and the sinks that write it
//! - `parse_output`, which recovers a comparison from captured output
//! - The JSON report

mod comparison;
mod json;
mod parser;
mod protocol;
#[allow(missing_docs)]
mod report;

pub use comparison::{BenchmarkComparison, CandidateResult, UNKNOWN_FASTEST, fastest_of};
pub use json::generate_json_report;
pub use parser::{ParseError, parse_output};
pub use protocol::{
    COMPLETE_MARKER, CYCLE_MARKER, ERROR_MARKER, EXECUTION_ERROR_MARKER, MemorySink, ProtocolLine,
    ProtocolSink, RESULTS_MARKER, Stream, StreamSink, format_ops,
};
pub use report::{
    CandidateMetrics, CandidateReport, CandidateStatus, FailureInfo, Report, ReportConfig,
    ReportMeta, ReportSummary, SCHEMA_VERSION,
};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Protocol lines only
    #[default]
    Protocol,
    /// Human-readable terminal output
    Human,
    /// JSON report
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "protocol" | "lines" => Ok(OutputFormat::Protocol),
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
