//! The suite case that times one candidate inside its own sandbox.

use crate::bencher::{Bencher, BenchmarkResult, TimingConfig, run_benchmark_loop};
use crate::candidate::Candidate;
use crate::sandbox::{Sandbox, SandboxConfig};
use crate::suite::{BenchCase, CaseError};
use serde_json::Value;
use std::sync::Arc;

/// Evaluates a candidate in a fresh sandbox and times its entry point.
pub struct SandboxCase {
    /// Name the module gave the candidate, used when reporting
    label: String,
    /// Identifier the isolated source binds the entry point to
    binding: String,
    code: String,
    arguments: Arc<[Value]>,
    config: SandboxConfig,
}

impl SandboxCase {
    /// Case for `candidate`, called with `arguments` on every iteration.
    pub fn new(candidate: &Candidate, arguments: Arc<[Value]>, config: SandboxConfig) -> Self {
        Self {
            label: candidate.raw_name.clone(),
            binding: candidate.name.clone(),
            code: candidate.isolation.code.clone(),
            arguments,
            config,
        }
    }
}

impl BenchCase for SandboxCase {
    fn name(&self) -> &str {
        &self.label
    }

    fn run(&mut self, timing: &TimingConfig) -> Result<BenchmarkResult, CaseError> {
        // Dropped at the end of the case, so nothing survives into the next one
        let sandbox = Sandbox::new(&self.config)?;
        sandbox.evaluate(&self.code)?;

        let result = sandbox.with_entry(&self.binding, &self.arguments, |invoke| {
            let bencher = Bencher::with_target_samples(timing.target_samples);
            run_benchmark_loop(bencher, |b| b.iter(|| invoke()), timing)
        })?;

        tracing::debug!(
            case = %self.label,
            iterations = result.iterations,
            samples = result.samples.len(),
            "measured"
        );
        Ok(result)
    }
}
