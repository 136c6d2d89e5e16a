//! Suite - Benchmark Orchestration State Machine
//!
//! `Setup → Register* → Run → Cycle* → Complete`
//!
//! - Construction validates the timing configuration; a bad configuration
//!   is a setup error and nothing runs.
//! - Cases run strictly in registration order, one at a time.
//! - A failing case is recorded as an `Err` outcome and the suite moves on.

use crate::bencher::{BenchmarkResult, TimingConfig};
use crate::sandbox::SandboxError;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failure of a single case. Never fatal for the suite.
#[derive(Debug, Error)]
pub enum CaseError {
    /// The sandbox could not evaluate or invoke the candidate
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// The case ran but produced no usable measurement
    #[error("no measurements recorded")]
    NoMeasurements,
}

/// Fatal orchestration errors
#[derive(Debug, Error)]
pub enum SuiteError {
    /// Timing configuration rejected at construction
    #[error("invalid timing configuration: {0}")]
    InvalidTiming(String),

    /// `run` was called on a suite that already ran
    #[error("suite has already been run")]
    AlreadyRun,

    /// `register` was called after `run`
    #[error("cannot register '{0}' after the suite has run")]
    RegisterAfterRun(String),
}

/// Lifecycle of a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteState {
    /// Created, nothing registered yet
    Setup,
    /// At least one case registered
    Registered,
    /// `run` in progress
    Running,
    /// All cases finished
    Complete,
}

/// A named unit of work the suite can time.
pub trait BenchCase {
    /// Name reported in cycle and error lines
    fn name(&self) -> &str;

    /// Run the timed loop for this case
    fn run(&mut self, timing: &TimingConfig) -> Result<BenchmarkResult, CaseError>;
}

/// Event hooks fired while the suite runs.
pub trait SuiteObserver {
    /// Before the first case starts
    fn on_start(&mut self, _total: usize) {}

    /// A case finished successfully
    fn on_cycle(&mut self, _name: &str, _result: &BenchmarkResult) {}

    /// A case failed
    fn on_error(&mut self, _name: &str, _error: &CaseError) {}

    /// Every case has run
    fn on_complete(&mut self, _outcomes: &[CaseOutcome]) {}
}

/// Observer that ignores every event
pub struct NoopObserver;

impl SuiteObserver for NoopObserver {}

/// Per-case result, success or failure
#[derive(Debug)]
pub struct CaseOutcome {
    /// Case name
    pub name: String,
    /// Measurement or the reason there is none
    pub result: Result<BenchmarkResult, CaseError>,
    /// Wall-clock time spent in the case, warmup included
    pub duration: Duration,
}

impl CaseOutcome {
    /// Whether the case produced a measurement
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// An ordered collection of cases sharing one timing configuration.
pub struct Suite {
    timing: TimingConfig,
    cases: Vec<Box<dyn BenchCase>>,
    state: SuiteState,
}

impl Suite {
    /// Create a suite, validating the timing configuration.
    pub fn new(timing: TimingConfig) -> Result<Self, SuiteError> {
        validate_timing(&timing)?;
        Ok(Self {
            timing,
            cases: Vec::new(),
            state: SuiteState::Setup,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> SuiteState {
        self.state
    }

    /// Timing configuration in effect
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Number of registered cases
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether no case has been registered
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Add a case. Cases run in registration order.
    pub fn register<C: BenchCase + 'static>(&mut self, case: C) -> Result<(), SuiteError> {
        match self.state {
            SuiteState::Setup | SuiteState::Registered => {
                tracing::debug!(case = case.name(), "registered");
                self.cases.push(Box::new(case));
                self.state = SuiteState::Registered;
                Ok(())
            }
            SuiteState::Running | SuiteState::Complete => {
                Err(SuiteError::RegisterAfterRun(case.name().to_string()))
            }
        }
    }

    /// Run every case once, in order. Can only be called once.
    pub fn run(&mut self, observer: &mut dyn SuiteObserver) -> Result<Vec<CaseOutcome>, SuiteError> {
        if matches!(self.state, SuiteState::Running | SuiteState::Complete) {
            return Err(SuiteError::AlreadyRun);
        }
        self.state = SuiteState::Running;
        observer.on_start(self.cases.len());

        let mut outcomes = Vec::with_capacity(self.cases.len());
        for case in self.cases.iter_mut() {
            let name = case.name().to_string();
            tracing::debug!(case = %name, "running");

            let start = Instant::now();
            let result = case.run(&self.timing).and_then(|result| {
                if result.iterations == 0 || result.total_time_ns == 0 {
                    Err(CaseError::NoMeasurements)
                } else {
                    Ok(result)
                }
            });
            let duration = start.elapsed();

            match &result {
                Ok(measurement) => observer.on_cycle(&name, measurement),
                Err(error) => {
                    tracing::debug!(case = %name, %error, "case failed");
                    observer.on_error(&name, error);
                }
            }

            outcomes.push(CaseOutcome {
                name,
                result,
                duration,
            });
        }

        self.state = SuiteState::Complete;
        observer.on_complete(&outcomes);
        Ok(outcomes)
    }
}

fn validate_timing(timing: &TimingConfig) -> Result<(), SuiteError> {
    if timing.target_samples == 0 {
        return Err(SuiteError::InvalidTiming(
            "target sample count must be at least 1".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (timing.min_iterations, timing.max_iterations) {
        if min > max {
            return Err(SuiteError::InvalidTiming(format!(
                "min_iterations ({min}) exceeds max_iterations ({max})"
            )));
        }
    }
    if timing.max_iterations == Some(0) {
        return Err(SuiteError::InvalidTiming(
            "max_iterations must be at least 1".to_string(),
        ));
    }
    Ok(())
}
