//! Benchmark Execution
//!
//! The orchestrator behind `fastpick run`:
//!
//! ```text
//! BenchmarkModule
//!        │  prepare_candidates + shape_arguments
//!        ▼
//!   Suite (one SandboxCase per candidate, strictly sequential)
//!        │  cycle / execution-error lines as each case finishes
//!        ▼
//!   BenchmarkComparison → RESULTS_JSON + complete lines
//! ```
//!
//! A failing candidate is reported and skipped; only a suite setup failure
//! or an unwritable output stream stops the run.

use super::statistics::{compute_statistics, to_candidate_result};
use fastpick_core::{
    BenchmarkModule, BenchmarkResult, Candidate, CaseError, CaseOutcome, SandboxCase,
    SandboxConfig, Suite, SuiteError, SuiteObserver, TimingConfig, DEFAULT_SAMPLE_COUNT,
    prepare_candidates, shape_arguments,
};
use fastpick_report::{BenchmarkComparison, CandidateResult, ProtocolLine, ProtocolSink};
use fastpick_stats::ThroughputSummary;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Configuration for benchmark execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Warmup time in nanoseconds
    pub warmup_time_ns: u64,
    /// Measurement time in nanoseconds
    pub measurement_time_ns: u64,
    /// Minimum iterations
    pub min_iterations: Option<u64>,
    /// Maximum iterations
    pub max_iterations: Option<u64>,
    /// Samples to aim for per candidate
    pub target_samples: usize,
    /// Per-candidate sandbox limits
    pub sandbox: SandboxConfig,
}

impl ExecutionConfig {
    /// Fixed-count mode: no warmup, exactly `n` iterations per candidate.
    pub fn fixed(n: u64) -> Self {
        Self {
            warmup_time_ns: 0,
            measurement_time_ns: 0,
            min_iterations: Some(n),
            max_iterations: Some(n),
            ..Self::default()
        }
    }

    /// Timing parameters handed to the suite
    pub fn timing(&self) -> TimingConfig {
        TimingConfig {
            warmup_time_ns: self.warmup_time_ns,
            measurement_time_ns: self.measurement_time_ns,
            min_iterations: self.min_iterations,
            max_iterations: self.max_iterations,
            target_samples: self.target_samples,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            warmup_time_ns: 250_000_000,        // 250ms
            measurement_time_ns: 1_000_000_000, // 1 second
            min_iterations: None,
            max_iterations: None,
            target_samples: DEFAULT_SAMPLE_COUNT,
            sandbox: SandboxConfig::default(),
        }
    }
}

/// Fatal orchestration errors
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The suite could not be set up or run
    #[error("benchmark setup failed: {0}")]
    Setup(#[from] SuiteError),

    /// Protocol output could not be written
    #[error("failed to write benchmark output: {0}")]
    Output(#[from] io::Error),
}

/// Everything a completed run produced
#[derive(Debug)]
pub struct SuiteReport {
    /// Candidates in run order
    pub candidates: Vec<Candidate>,
    /// One outcome per candidate, same order
    pub outcomes: Vec<CaseOutcome>,
    /// Statistics for each successful candidate, by the name the module gave them
    pub summaries: HashMap<String, ThroughputSummary>,
    /// Final ranking
    pub comparison: BenchmarkComparison,
    /// Wall-clock time of the whole run
    pub duration: Duration,
}

impl SuiteReport {
    /// Number of candidates that produced a result
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}

/// Runs a module's candidates and reports through a [`ProtocolSink`].
pub struct Orchestrator {
    config: ExecutionConfig,
    show_progress: bool,
}

impl Orchestrator {
    /// Orchestrator with the given configuration; progress bar off
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr while cases run
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Configuration in effect
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Benchmark every implementation in `module`.
    pub fn run(
        &self,
        module: &BenchmarkModule,
        sink: &mut dyn ProtocolSink,
    ) -> Result<SuiteReport, OrchestratorError> {
        let start = Instant::now();

        let mut suite = Suite::new(self.config.timing())?;
        let candidates = prepare_candidates(module);
        let arguments: Arc<[Value]> = shape_arguments(&module.test_data).into();
        tracing::debug!(
            candidates = candidates.len(),
            arguments = arguments.len(),
            "prepared candidates"
        );

        for candidate in &candidates {
            suite.register(SandboxCase::new(
                candidate,
                Arc::clone(&arguments),
                self.config.sandbox.clone(),
            ))?;
        }

        let mut observer = ProtocolObserver::new(sink, self.show_progress);
        let outcomes = suite.run(&mut observer)?;
        let (results, summaries, write_error) = observer.finish();
        if let Some(e) = write_error {
            return Err(OrchestratorError::Output(e));
        }

        let comparison = BenchmarkComparison::from_results(results);
        sink.emit(&ProtocolLine::Results(comparison.clone()))?;
        sink.emit(&ProtocolLine::Complete {
            fastest: comparison.fastest.clone(),
        })?;

        tracing::debug!(fastest = %comparison.fastest, "run complete");
        Ok(SuiteReport {
            candidates,
            outcomes,
            summaries,
            comparison,
            duration: start.elapsed(),
        })
    }
}

/// Suite observer that computes statistics and emits protocol lines as
/// each case finishes.
pub struct ProtocolObserver<'a> {
    sink: &'a mut dyn ProtocolSink,
    progress: Option<ProgressBar>,
    show_progress: bool,
    results: Vec<CandidateResult>,
    summaries: HashMap<String, ThroughputSummary>,
    write_error: Option<io::Error>,
}

impl<'a> ProtocolObserver<'a> {
    /// Observer writing to `sink`
    pub fn new(sink: &'a mut dyn ProtocolSink, show_progress: bool) -> Self {
        Self {
            sink,
            progress: None,
            show_progress,
            results: Vec::new(),
            summaries: HashMap::new(),
            write_error: None,
        }
    }

    /// Results, statistics, and the first write failure, if any
    pub fn finish(
        self,
    ) -> (
        Vec<CandidateResult>,
        HashMap<String, ThroughputSummary>,
        Option<io::Error>,
    ) {
        (self.results, self.summaries, self.write_error)
    }

    fn emit(&mut self, line: ProtocolLine) {
        if self.write_error.is_some() {
            return;
        }
        if let Err(e) = self.sink.emit(&line) {
            self.write_error = Some(e);
        }
    }

    fn advance(&mut self) {
        if let Some(pb) = &self.progress {
            pb.inc(1);
        }
    }
}

impl SuiteObserver for ProtocolObserver<'_> {
    fn on_start(&mut self, total: usize) {
        if !self.show_progress {
            return;
        }
        let pb = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.progress = Some(pb);
    }

    fn on_cycle(&mut self, name: &str, result: &BenchmarkResult) {
        let summary = compute_statistics(result);
        let entry = to_candidate_result(name, result, summary.as_ref());
        tracing::debug!(
            case = name,
            ops = entry.ops,
            margin = entry.margin.unwrap_or(0.0),
            "cycle"
        );

        self.emit(ProtocolLine::Cycle {
            name: name.to_string(),
            ops: entry.ops,
        });
        if let Some(summary) = summary {
            self.summaries.insert(name.to_string(), summary);
        }
        self.results.push(entry);

        if let Some(pb) = &self.progress {
            pb.set_message(name.to_string());
        }
        self.advance();
    }

    fn on_error(&mut self, name: &str, error: &CaseError) {
        tracing::warn!(case = name, %error, "candidate failed");
        self.emit(ProtocolLine::ExecutionError {
            name: name.to_string(),
            message: error.to_string(),
        });
        self.advance();
    }

    fn on_complete(&mut self, _outcomes: &[CaseOutcome]) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }
}
