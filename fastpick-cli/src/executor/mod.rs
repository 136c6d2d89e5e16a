//! Benchmark Executor
//!
//! Drives a validated module through the suite and turns the outcome into
//! output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! BenchmarkModule
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Prepare candidates, run the suite, emit protocol lines
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ statistics  │  Throughput and margin per successful candidate
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Build the JSON-serializable Report
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```

mod execution;
mod formatting;
mod report;
mod statistics;

pub use execution::{ExecutionConfig, Orchestrator, OrchestratorError, ProtocolObserver, SuiteReport};
pub use formatting::{format_comparison_human, format_human_output};
pub use report::{build_report, failure_kind};
pub use statistics::{compute_statistics, to_candidate_result};
