#![warn(missing_docs)]
//! fastpick CLI Library
//!
//! Command-line front end for the benchmark engine. `fastpick::run()` (or
//! `fastpick_cli::run()`) parses the arguments, layers `fastpick.toml` under
//! them, and dispatches to a subcommand:
//!
//! ```text
//! fastpick [OPTIONS] [MODULE] [COMMAND]
//!
//!   run       benchmark the module (default)
//!   check     validate and list candidates without executing them
//!   parse     recover a comparison from captured output
//!   isolated  run the benchmark in a child process with an outer timeout
//!   init      write a commented default fastpick.toml
//! ```
//!
//! Stdout carries only protocol lines (or the chosen report); logging and
//! progress go to stderr.

mod config;
mod executor;
mod supervisor;

pub use config::*;
pub use executor::{
    ExecutionConfig, Orchestrator, OrchestratorError, ProtocolObserver, SuiteReport, build_report,
    compute_statistics, failure_kind, format_comparison_human, format_human_output,
    to_candidate_result,
};
pub use supervisor::*;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fastpick_core::{BenchmarkModule, LoadRequirements, SandboxConfig, prepare_candidates, shape_arguments};
use fastpick_report::{
    BenchmarkComparison, OutputFormat, ProtocolLine, ProtocolSink, StreamSink,
    generate_json_report, parse_output,
};
use regex::Regex;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// fastpick CLI arguments
#[derive(Parser, Debug)]
#[command(name = "fastpick")]
#[command(
    author,
    version,
    about = "fastpick - benchmark competing JavaScript implementations of one function"
)]
pub struct Cli {
    /// Optional subcommand (Run, Check, Parse, Isolated, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Module description (JSON, or a JS module exporting one)
    pub module: Option<PathBuf>,

    /// Configuration file (defaults to the nearest fastpick.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only benchmark implementations whose name matches this regex
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// Output format: protocol, human, json
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Warmup time in milliseconds
    #[arg(long, global = true)]
    pub warmup_ms: Option<u64>,

    /// Measurement time in milliseconds
    #[arg(long, global = true)]
    pub measurement_ms: Option<u64>,

    /// Fixed sample count mode: skip warmup, run exactly N iterations
    /// Overrides warmup/measurement/min/max.
    #[arg(long, short = 'n', global = true)]
    pub samples: Option<u64>,

    /// Minimum number of iterations
    #[arg(long, global = true)]
    pub min_iterations: Option<u64>,

    /// Maximum number of iterations
    #[arg(long, global = true)]
    pub max_iterations: Option<u64>,

    /// Number of samples to aim for per candidate
    #[arg(long, global = true)]
    pub target_samples: Option<usize>,

    /// Budget for evaluating each candidate's source, in milliseconds
    #[arg(long, global = true)]
    pub eval_timeout_ms: Option<u64>,

    /// Budget for each call of the entry point, in milliseconds
    #[arg(long, global = true)]
    pub call_timeout_ms: Option<u64>,

    /// Heap limit per candidate runtime, in MiB
    #[arg(long, global = true)]
    pub memory_limit_mb: Option<u64>,

    /// Stack limit per candidate runtime, in KiB
    #[arg(long, global = true)]
    pub max_stack_kb: Option<u64>,

    /// Outer timeout for `isolated`, in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Fail when the module has no entryPointName
    #[arg(long, global = true)]
    pub require_entry_point: bool,

    /// Fail when the module has no testData
    #[arg(long, global = true)]
    pub require_test_data: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark the module (default)
    Run {
        /// Module description
        module: Option<PathBuf>,
    },
    /// Validate the module and list candidates without executing them
    Check {
        /// Module description
        module: Option<PathBuf>,
    },
    /// Parse captured benchmark output into a comparison
    Parse {
        /// Captured output; stdin when absent or "-"
        file: Option<PathBuf>,
    },
    /// Run the benchmark in a child process with an outer timeout
    Isolated {
        /// Module description
        module: Option<PathBuf>,
    },
    /// Write a default configuration file
    Init {
        /// Destination (defaults to ./fastpick.toml)
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the fastpick CLI with the process arguments.
///
/// # Returns
/// `Err` on any fatal load, validation, or setup failure. Candidate
/// failures are reported in the output and do not make the run fail.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the fastpick CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => FastpickConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => FastpickConfig::discover().unwrap_or_default(),
    };

    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    match &cli.command {
        Some(Commands::Run { module }) => {
            let path = module.as_deref().or(cli.module.as_deref());
            run_benchmarks(&cli, &config, format, path)
        }
        Some(Commands::Check { module }) => {
            let path = module.as_deref().or(cli.module.as_deref());
            check_module(&cli, &config, path)
        }
        Some(Commands::Parse { file }) => parse_captured(&cli, format, file.as_deref()),
        Some(Commands::Isolated { module }) => {
            let path = module.as_deref().or(cli.module.as_deref());
            run_isolated(&cli, &config, format, path)
        }
        Some(Commands::Init { path, force }) => {
            let path = path.as_deref().unwrap_or(Path::new(CONFIG_FILE_NAME));
            init_config(path, *force)
        }
        None => run_benchmarks(&cli, &config, format, cli.module.as_deref()),
    }
}

/// Logging always goes to stderr; stdout is reserved for protocol output.
fn init_tracing(verbose: bool) {
    let default = if verbose { "fastpick=debug" } else { "fastpick=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Build an ExecutionConfig by layering: defaults → fastpick.toml → CLI overrides.
fn build_execution_config(cli: &Cli, config: &FastpickConfig) -> anyhow::Result<ExecutionConfig> {
    let runner = &config.runner;
    let sandbox = &config.sandbox;

    let eval_timeout = match cli.eval_timeout_ms {
        Some(ms) => Duration::from_millis(ms),
        None => Duration::from_nanos(
            FastpickConfig::parse_duration(&sandbox.eval_timeout).context("sandbox.eval_timeout")?,
        ),
    };
    let call_timeout = match cli.call_timeout_ms {
        Some(ms) => Duration::from_millis(ms),
        None => Duration::from_nanos(
            FastpickConfig::parse_duration(&sandbox.call_timeout).context("sandbox.call_timeout")?,
        ),
    };
    let memory_limit_mb = cli.memory_limit_mb.or(sandbox.memory_limit_mb);
    let max_stack_kb = cli.max_stack_kb.or(sandbox.max_stack_kb);
    let sandbox = SandboxConfig {
        eval_timeout,
        call_timeout,
        memory_limit: memory_limit_mb.map(|mb| to_usize(mb.saturating_mul(MIB))),
        max_stack_size: max_stack_kb.map(|kb| to_usize(kb.saturating_mul(KIB))),
    };
    let target_samples = cli.target_samples.unwrap_or(runner.target_samples);

    // --samples N: fixed-count mode. CLI wins, then fastpick.toml
    if let Some(n) = cli.samples.or(runner.samples) {
        return Ok(ExecutionConfig {
            target_samples,
            sandbox,
            ..ExecutionConfig::fixed(n)
        });
    }

    let warmup_time_ns = match cli.warmup_ms {
        Some(ms) => ms.saturating_mul(NANOS_PER_MILLI),
        None => FastpickConfig::parse_duration(&runner.warmup_time).context("runner.warmup_time")?,
    };
    let measurement_time_ns = match cli.measurement_ms {
        Some(ms) => ms.saturating_mul(NANOS_PER_MILLI),
        None => FastpickConfig::parse_duration(&runner.measurement_time)
            .context("runner.measurement_time")?,
    };

    Ok(ExecutionConfig {
        warmup_time_ns,
        measurement_time_ns,
        min_iterations: cli.min_iterations.or(runner.min_iterations),
        max_iterations: cli.max_iterations.or(runner.max_iterations),
        target_samples,
        sandbox,
    })
}

const NANOS_PER_MILLI: u64 = 1_000_000;
const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

fn to_usize(bytes: u64) -> usize {
    usize::try_from(bytes).unwrap_or(usize::MAX)
}

fn harness_timeout(cli: &Cli, config: &FastpickConfig) -> anyhow::Result<Duration> {
    match cli.timeout {
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(Duration::from_nanos(
            FastpickConfig::parse_duration(&config.harness.timeout).context("harness.timeout")?,
        )),
    }
}

/// Load, validate, and filter the module.
fn load_module(
    cli: &Cli,
    config: &FastpickConfig,
    path: Option<&Path>,
) -> anyhow::Result<BenchmarkModule> {
    let requirements = LoadRequirements {
        require_entry_point: cli.require_entry_point || config.module.require_entry_point,
        require_test_data: cli.require_test_data || config.module.require_test_data,
    };
    let mut module = BenchmarkModule::load(path, &requirements)?;

    if let Some(pattern) = &cli.filter {
        let filter_re =
            Regex::new(pattern).with_context(|| format!("invalid filter regex '{}'", pattern))?;
        module.retain_implementations(|name| filter_re.is_match(name))?;
    }

    tracing::debug!(
        implementations = module.len(),
        entry_point = module.entry_point.as_deref().unwrap_or("-"),
        "module loaded"
    );
    Ok(module)
}

fn run_benchmarks(
    cli: &Cli,
    config: &FastpickConfig,
    format: OutputFormat,
    path: Option<&Path>,
) -> anyhow::Result<()> {
    let module = load_module(cli, config, path)?;
    let exec_config = build_execution_config(cli, config)?;

    let show_progress = format == OutputFormat::Human && io::stderr().is_terminal();
    let orchestrator = Orchestrator::new(exec_config.clone()).with_progress(show_progress);

    if format == OutputFormat::Protocol {
        match &cli.output {
            Some(out_path) => {
                let file = std::fs::File::create(out_path)
                    .with_context(|| format!("failed to create {}", out_path.display()))?;
                let mut sink = StreamSink::new(io::BufWriter::new(file), io::stderr());
                orchestrator.run(&module, &mut sink)?;
            }
            None => {
                orchestrator.run(&module, &mut StreamSink::stdio())?;
            }
        }
        return Ok(());
    }

    // Execution errors still stream to stderr; the report replaces stdout
    let mut sink = StreamSink::new(io::sink(), io::stderr());
    let suite = orchestrator.run(&module, &mut sink)?;
    let report = build_report(
        &suite,
        &exec_config,
        path.map(|p| p.display().to_string()),
        module.entry_point.clone(),
    );

    let output = match format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Human | OutputFormat::Protocol => format_human_output(&report),
    };
    write_output(cli.output.as_deref(), &output)
}

fn check_module(cli: &Cli, config: &FastpickConfig, path: Option<&Path>) -> anyhow::Result<()> {
    let module = load_module(cli, config, path)?;
    let candidates = prepare_candidates(&module);
    let arguments = shape_arguments(&module.test_data);

    let mut output = String::new();
    output.push_str("fastpick Plan:\n");
    output.push_str(&format!(
        "├── entry point: {}\n",
        module.entry_point.as_deref().unwrap_or("(first definition)")
    ));
    output.push_str(&format!("├── arguments: {}\n", arguments.len()));
    for candidate in &candidates {
        let binding = if candidate.raw_name == candidate.name {
            String::new()
        } else {
            format!(" (bound as {})", candidate.name)
        };
        output.push_str(&format!(
            "│   ├── {}{} [{}]\n",
            candidate.raw_name, binding, candidate.isolation.strategy
        ));
    }
    output.push_str(&format!("{} candidates found.\n", candidates.len()));

    write_output(cli.output.as_deref(), &output)
}

fn parse_captured(cli: &Cli, format: OutputFormat, file: Option<&Path>) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let comparison = parse_output(&raw)?;
    let output = render_comparison(&comparison, format)?;
    write_output(cli.output.as_deref(), &output)
}

fn run_isolated(
    cli: &Cli,
    config: &FastpickConfig,
    format: OutputFormat,
    path: Option<&Path>,
) -> anyhow::Result<()> {
    let module = load_module(cli, config, path)?;
    let exec_config = build_execution_config(cli, config)?;
    let timeout = harness_timeout(cli, config)?;

    let harness =
        Harness::new(timeout)?.child_args(child_args(&exec_config, cli.config.as_deref()));
    tracing::debug!(timeout = ?harness.timeout(), "running isolated");
    let comparison = harness.run(&module)?;

    let output = render_comparison(&comparison, format)?;
    write_output(cli.output.as_deref(), &output)
}

/// Flags that reproduce `config` in a child process. An explicit config
/// file is forwarded too, so the child layers its flags over the same file.
fn child_args(config: &ExecutionConfig, config_path: Option<&Path>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(path) = config_path {
        args.extend(["--config".to_string(), path.display().to_string()]);
    }
    args.extend([
        "--format".to_string(),
        "protocol".to_string(),
        "--warmup-ms".to_string(),
        (config.warmup_time_ns / NANOS_PER_MILLI).to_string(),
        "--measurement-ms".to_string(),
        (config.measurement_time_ns / NANOS_PER_MILLI).to_string(),
        "--eval-timeout-ms".to_string(),
        config.sandbox.eval_timeout.as_millis().to_string(),
        "--call-timeout-ms".to_string(),
        config.sandbox.call_timeout.as_millis().to_string(),
        "--target-samples".to_string(),
        config.target_samples.to_string(),
    ]);
    if let Some(n) = config.min_iterations {
        args.extend(["--min-iterations".to_string(), n.to_string()]);
    }
    if let Some(n) = config.max_iterations {
        args.extend(["--max-iterations".to_string(), n.to_string()]);
    }
    if let Some(bytes) = config.sandbox.memory_limit {
        args.extend(["--memory-limit-mb".to_string(), (bytes as u64 / MIB).to_string()]);
    }
    if let Some(bytes) = config.sandbox.max_stack_size {
        args.extend(["--max-stack-kb".to_string(), (bytes as u64 / KIB).to_string()]);
    }
    args
}

/// Write the default configuration to `path`.
fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(path, FastpickConfig::default_toml())
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "configuration written");
    Ok(())
}

fn render_comparison(
    comparison: &BenchmarkComparison,
    format: OutputFormat,
) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(comparison)? + "\n",
        OutputFormat::Human => format_comparison_human(comparison),
        OutputFormat::Protocol => {
            let mut buf = Vec::new();
            let mut sink = StreamSink::new(&mut buf, io::sink());
            sink.emit(&ProtocolLine::Results(comparison.clone()))?;
            sink.emit(&ProtocolLine::Complete {
                fastest: comparison.fastest.clone(),
            })?;
            String::from_utf8_lossy(&buf).into_owned()
        }
    })
}

fn write_output(path: Option<&Path>, output: &str) -> anyhow::Result<()> {
    if let Some(path) = path {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        file.write_all(output.as_bytes())?;
        tracing::info!(path = %path.display(), "output written");
    } else {
        print!("{}", output);
        io::stdout().flush()?;
    }
    Ok(())
}
