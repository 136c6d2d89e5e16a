//! Bencher - The Timed-Repetition Facility
//!
//! Drives a fallible closure through a warmup phase and a measurement phase.
//! Uses batched sampling: iterations are grouped into samples, each sample
//! being the average of `iters_per_sample` iterations, so that cheap
//! candidates are not dominated by timer resolution.

use std::time::Instant;

/// Default number of samples to collect per candidate
pub const DEFAULT_SAMPLE_COUNT: usize = 50;

/// Minimum samples required for a meaningful margin of error
pub const MIN_SAMPLE_COUNT: usize = 5;

/// One measured sample: the mean duration of a batch of iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Average nanoseconds per iteration within this batch
    pub duration_nanos: u64,
    /// Number of iterations averaged into this sample
    pub iterations: u64,
}

/// Timing parameters for one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingConfig {
    /// Warmup duration in nanoseconds
    pub warmup_time_ns: u64,
    /// Measurement duration in nanoseconds
    pub measurement_time_ns: u64,
    /// Minimum measured iterations (at least one is always measured)
    pub min_iterations: Option<u64>,
    /// Maximum measured iterations
    pub max_iterations: Option<u64>,
    /// Number of samples to aim for
    pub target_samples: usize,
}

impl TimingConfig {
    /// Fixed-count mode: no warmup, exactly `n` measured iterations.
    pub fn fixed(n: u64) -> Self {
        Self {
            warmup_time_ns: 0,
            measurement_time_ns: 0,
            min_iterations: Some(n),
            max_iterations: Some(n),
            target_samples: DEFAULT_SAMPLE_COUNT,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            warmup_time_ns: 250_000_000,      // 250ms
            measurement_time_ns: 1_000_000_000, // 1s
            min_iterations: None,
            max_iterations: None,
            target_samples: DEFAULT_SAMPLE_COUNT,
        }
    }
}

/// Result of a completed timing loop
#[derive(Debug, Clone, Default)]
pub struct BenchmarkResult {
    /// Collected samples
    pub samples: Vec<Sample>,
    /// Measured iterations (warmup excluded)
    pub iterations: u64,
    /// Time spent in measured iterations
    pub total_time_ns: u64,
}

impl BenchmarkResult {
    /// Per-iteration sample durations as f64, for statistics.
    pub fn sample_nanos(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.duration_nanos as f64).collect()
    }

    /// Throughput over the whole measurement, without outlier handling.
    pub fn raw_ops_per_sec(&self) -> f64 {
        if self.total_time_ns == 0 {
            return 0.0;
        }
        self.iterations as f64 * 1e9 / self.total_time_ns as f64
    }
}

/// Iteration control for one case.
pub struct Bencher {
    current_sample_time_ns: u64,
    current_sample_iters: u64,
    samples: Vec<Sample>,

    target_samples: usize,
    iters_per_sample: u64,

    measured_iterations: u64,
    measured_time_ns: u64,
    total_iterations: u64,
    is_warmup: bool,
    warmup_times: Vec<u64>,
}

impl Bencher {
    /// Create a Bencher with the default sample target
    pub fn new() -> Self {
        Self::with_target_samples(DEFAULT_SAMPLE_COUNT)
    }

    /// Create a Bencher aiming for `target_samples` samples
    pub fn with_target_samples(target_samples: usize) -> Self {
        let target_samples = target_samples.max(MIN_SAMPLE_COUNT);
        Self {
            current_sample_time_ns: 0,
            current_sample_iters: 0,
            samples: Vec::with_capacity(target_samples),
            target_samples,
            iters_per_sample: 1,
            measured_iterations: 0,
            measured_time_ns: 0,
            total_iterations: 0,
            is_warmup: true,
            warmup_times: Vec::new(),
        }
    }

    /// Override iterations per sample (normally derived from warmup)
    pub fn set_iters_per_sample(&mut self, iters: u64) {
        self.iters_per_sample = iters.max(1);
    }

    /// Mean warmup iteration time, if any warmup ran
    pub fn estimated_iter_time_ns(&self) -> Option<u64> {
        if self.warmup_times.is_empty() {
            return None;
        }
        let sum: u64 = self.warmup_times.iter().sum();
        Some(sum / self.warmup_times.len() as u64)
    }

    /// Leave warmup and size the sample batches for `measurement_time_ns`.
    pub fn start_measurement(&mut self, measurement_time_ns: u64) {
        self.is_warmup = false;

        self.iters_per_sample = match self.estimated_iter_time_ns() {
            Some(iter_time) if iter_time > 0 => {
                let time_per_sample = measurement_time_ns / self.target_samples as u64;
                (time_per_sample / iter_time).max(1)
            }
            _ => 1,
        };

        self.warmup_times.clear();
        self.warmup_times.shrink_to_fit();
        self.current_sample_time_ns = 0;
        self.current_sample_iters = 0;
    }

    /// Time one call of `f`. An `Err` from `f` is returned unchanged and the
    /// iteration is not recorded.
    #[inline]
    pub fn iter<E, F>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut() -> Result<(), E>,
    {
        let start = Instant::now();
        let outcome = std::hint::black_box(f());
        let duration_nanos = start.elapsed().as_nanos() as u64;
        outcome?;
        self.accumulate(duration_nanos);
        Ok(())
    }

    fn accumulate(&mut self, duration_nanos: u64) {
        self.total_iterations += 1;

        if self.is_warmup {
            self.warmup_times.push(duration_nanos);
            return;
        }

        self.measured_iterations += 1;
        self.measured_time_ns += duration_nanos;
        self.current_sample_time_ns += duration_nanos;
        self.current_sample_iters += 1;

        if self.current_sample_iters >= self.iters_per_sample {
            self.flush_sample();
        }
    }

    fn flush_sample(&mut self) {
        if self.current_sample_iters == 0 {
            return;
        }

        // Past the target we keep counting iterations but stop storing
        // samples; the oldest samples are as good as the newest.
        if self.samples.len() < self.target_samples {
            self.samples.push(Sample {
                duration_nanos: self.current_sample_time_ns / self.current_sample_iters,
                iterations: self.current_sample_iters,
            });
        }

        self.current_sample_time_ns = 0;
        self.current_sample_iters = 0;
    }

    /// Whether the sample target has been reached
    pub fn has_enough_samples(&self) -> bool {
        self.samples.len() >= self.target_samples
    }

    /// Samples collected so far
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Iterations run so far, warmup included
    pub fn iteration_count(&self) -> u64 {
        self.total_iterations
    }

    /// Finalize and return the measurement
    pub fn finish(mut self) -> BenchmarkResult {
        self.flush_sample();
        BenchmarkResult {
            samples: self.samples,
            iterations: self.measured_iterations,
            total_time_ns: self.measured_time_ns,
        }
    }
}

impl Default for Bencher {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the full loop: warmup → measurement → finish.
///
/// Stops measuring when the maximum iteration count is reached, or when the
/// sample target or the measurement time has been met and the minimum
/// iteration count is satisfied. The first error from `runner_fn` aborts the
/// loop and is returned.
pub fn run_benchmark_loop<E, F>(
    mut bencher: Bencher,
    mut runner_fn: F,
    timing: &TimingConfig,
) -> Result<BenchmarkResult, E>
where
    F: FnMut(&mut Bencher) -> Result<(), E>,
{
    let warmup_start = Instant::now();
    while warmup_start.elapsed().as_nanos() < timing.warmup_time_ns as u128 {
        runner_fn(&mut bencher)?;
    }

    bencher.start_measurement(timing.measurement_time_ns);

    let measure_start = Instant::now();
    let measurement_start_iterations = bencher.iteration_count();
    let min_iterations = timing.min_iterations.unwrap_or(1).max(1);
    let max_iterations = timing
        .max_iterations
        .unwrap_or(u64::MAX)
        .max(min_iterations);

    loop {
        let measured = bencher
            .iteration_count()
            .saturating_sub(measurement_start_iterations);
        let min_met = measured >= min_iterations;
        let time_up =
            measure_start.elapsed().as_nanos() >= timing.measurement_time_ns as u128;

        if measured >= max_iterations {
            break;
        }
        if (bencher.has_enough_samples() || time_up) && min_met {
            break;
        }

        runner_fn(&mut bencher)?;
    }

    Ok(bencher.finish())
}
