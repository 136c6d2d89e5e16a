#![warn(missing_docs)]
//! fastpick Core - Candidate Runtime
//!
//! This crate turns a benchmark module into timed, isolated executions:
//! - `BenchmarkModule` loading and validation
//! - Argument shaping and code isolation for each candidate
//! - `Sandbox`: one QuickJS runtime per candidate, with time budgets
//! - `Bencher`/`run_benchmark_loop` for warmup and sampled measurement
//! - `Suite`: the sequential, fault-containing orchestration state machine

mod bencher;
mod candidate;
mod case;
mod isolate;
mod module;
mod sandbox;
mod shape;
mod suite;

pub use bencher::{
    Bencher, BenchmarkResult, DEFAULT_SAMPLE_COUNT, MIN_SAMPLE_COUNT, Sample, TimingConfig,
    run_benchmark_loop,
};
pub use candidate::{Candidate, prepare_candidates, sanitize_name};
pub use case::SandboxCase;
pub use isolate::{
    Isolation, IsolationError, IsolationStrategy, is_valid_identifier, isolate, stub_source,
    try_isolate,
};
pub use module::{BenchmarkModule, LoadRequirements, ModuleError, json_type_name};
pub use sandbox::{Phase, Sandbox, SandboxConfig, SandboxError};
pub use shape::{INDEX_MAPPING_KEY, RESOLUTION_INFO_KEY, shape_arguments};
pub use suite::{
    BenchCase, CaseError, CaseOutcome, NoopObserver, Suite, SuiteError, SuiteObserver, SuiteState,
};
