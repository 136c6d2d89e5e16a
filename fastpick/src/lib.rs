#![warn(missing_docs)]
//! # fastpick
//!
//! Benchmark competing JavaScript implementations of one function and pick
//! the fastest.
//!
//! - **Isolation**: every candidate is renamed so it cannot collide with the
//!   others, then evaluated in its own QuickJS runtime with wall-clock budgets
//! - **Fault containment**: a candidate that throws, hangs, or never defines
//!   its entry point is reported and skipped; the rest of the run goes on
//! - **Line protocol**: `cycle:`, `RESULTS_JSON:`, and `complete:` lines on
//!   stdout, error markers on stderr, and a parser that recovers a ranking
//!   from whatever a run printed
//! - **Subprocess harness**: run a module in a child process under an outer
//!   timeout
//!
//! ## Quick Start
//!
//! ```ignore
//! use fastpick::prelude::*;
//!
//! let module = BenchmarkModule::load(Some(Path::new("sort.json")), &LoadRequirements::default())?;
//! let report = Orchestrator::new(ExecutionConfig::default()).run(&module, &mut StreamSink::stdio())?;
//! println!("fastest: {}", report.comparison.fastest);
//! ```

// Re-export core types
pub use fastpick_core::{
    BenchCase, Bencher, BenchmarkModule, BenchmarkResult, Candidate, CaseError, CaseOutcome,
    Isolation, IsolationStrategy, LoadRequirements, ModuleError, Sandbox, SandboxConfig,
    SandboxError, Suite, SuiteError, SuiteObserver, TimingConfig, isolate, prepare_candidates,
    shape_arguments,
};

// Re-export report types
pub use fastpick_report::{
    BenchmarkComparison, CandidateResult, MemorySink, ParseError, ProtocolLine, ProtocolSink,
    Report, Stream, StreamSink, parse_output,
};

// Re-export stats
pub use fastpick_stats::{ThroughputSummary, compute_summary};

// Re-export orchestration
pub use fastpick_cli::{
    ExecutionConfig, Harness, HarnessError, Orchestrator, OrchestratorError, SuiteReport,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BenchmarkComparison, BenchmarkModule, ExecutionConfig, Harness, LoadRequirements,
        MemorySink, Orchestrator, ProtocolSink, StreamSink, parse_output,
    };
}

/// Run the fastpick CLI.
///
/// ```ignore
/// fn main() {
///     fastpick::run().unwrap();
/// }
/// ```
pub use fastpick_cli::run;
