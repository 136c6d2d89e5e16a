//! Subprocess Harness
//!
//! Runs a benchmark in a child `fastpick` process so that a runaway or
//! crashing candidate cannot take the caller down:
//! - the module is materialized to a temporary JSON file
//! - the child is spawned with piped stdout/stderr, each drained on its own
//!   thread so a chatty child cannot block on a full pipe
//! - an outer timeout sends SIGTERM, waits 500ms, then kills
//! - the captured output goes through the result parser

use fastpick_core::BenchmarkModule;
use fastpick_report::{BenchmarkComparison, ParseError, parse_output};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Default outer timeout for a child run
pub const DEFAULT_HARNESS_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Harness failures
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The module could not be written out
    #[error("failed to write module to a temporary file: {0}")]
    Materialize(#[source] io::Error),

    /// The child process could not be started or waited on
    #[error("failed to spawn benchmark process: {0}")]
    Spawn(#[source] io::Error),

    /// The child outlived the outer timeout and was terminated
    #[error("benchmark process timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The child exited unsuccessfully without reporting why
    #[error("benchmark process failed ({}): {message}", describe_exit(.code))]
    Failed {
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Last line of stderr, if any
        message: String,
    },

    /// The child reported a fatal benchmark error
    #[error(transparent)]
    Benchmark(#[from] ParseError),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Captured result of one child run
#[derive(Debug, Clone)]
pub struct HarnessOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Everything the child wrote to stdout
    pub stdout: String,
    /// Everything the child wrote to stderr
    pub stderr: String,
}

impl HarnessOutput {
    /// Whether the child exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr, as one text
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.stderr);
        text
    }

    /// Parse the captured output into a comparison.
    pub fn into_comparison(self) -> Result<BenchmarkComparison, HarnessError> {
        let comparison = parse_output(&self.combined())?;
        if !self.success() && comparison.is_unknown() {
            let message = self
                .stderr
                .lines()
                .rev()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("no output")
                .to_string();
            return Err(HarnessError::Failed {
                code: self.code,
                message,
            });
        }
        Ok(comparison)
    }
}

/// Runs `fastpick run <module>` in a child process.
#[derive(Debug, Clone)]
pub struct Harness {
    program: PathBuf,
    leading_args: Vec<String>,
    child_args: Vec<String>,
    timeout: Duration,
}

impl Harness {
    /// Harness re-invoking the current executable
    pub fn new(timeout: Duration) -> Result<Self, HarnessError> {
        let program = std::env::current_exe().map_err(HarnessError::Spawn)?;
        Ok(Self::with_program(program, timeout))
    }

    /// Harness invoking `program` instead of the current executable
    pub fn with_program(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            child_args: Vec::new(),
            timeout,
        }
    }

    /// Arguments placed before `run <module>`
    pub fn leading_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments placed after `run <module>`
    pub fn child_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.child_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Outer timeout in effect
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Materialize `module`, run it in a child, and parse the output.
    pub fn run(&self, module: &BenchmarkModule) -> Result<BenchmarkComparison, HarnessError> {
        // Removed when dropped, after the child has finished with it
        let file = materialize(module)?;
        self.run_path(file.path())?.into_comparison()
    }

    /// Run the child against an existing module file and capture its output.
    pub fn run_path(&self, path: &Path) -> Result<HarnessOutput, HarnessError> {
        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .arg("run")
            .arg(path)
            .args(&self.child_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(HarnessError::Spawn)?;
        tracing::debug!(pid = child.id(), module = %path.display(), "spawned benchmark process");

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        // A timeout too large to represent never expires
        let deadline = Instant::now().checked_add(self.timeout);
        let status = loop {
            match child.try_wait().map_err(HarnessError::Spawn)? {
                Some(status) => break status,
                None if deadline.is_some_and(|d| Instant::now() >= d) => {
                    tracing::warn!(pid = child.id(), timeout = ?self.timeout, "benchmark process timed out");
                    terminate(&mut child);
                    // Reader threads finish on their own once the pipes close
                    return Err(HarnessError::Timeout(self.timeout));
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        Ok(HarnessOutput {
            code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }
}

/// Write `module` to a fresh temporary JSON file.
pub fn materialize(module: &BenchmarkModule) -> Result<NamedTempFile, HarnessError> {
    let mut file = tempfile::Builder::new()
        .prefix("fastpick-module-")
        .suffix(".json")
        .tempfile()
        .map_err(HarnessError::Materialize)?;
    serde_json::to_writer(&mut file, &module.to_json())
        .map_err(|e| HarnessError::Materialize(e.into()))?;
    file.flush().map_err(HarnessError::Materialize)?;
    Ok(file)
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// SIGTERM, a grace period, then SIGKILL.
fn terminate(child: &mut Child) {
    let _ = send_sigterm(child.id());

    let grace_deadline = Instant::now() + TERM_GRACE;
    while Instant::now() < grace_deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }

    let _ = child.kill();
    let _ = child.wait();
}

/// Send SIGTERM to a process. Returns `Err` if the signal could not be delivered.
#[cfg(unix)]
fn send_sigterm(pid: u32) -> Result<(), io::Error> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) -> Result<(), io::Error> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "SIGTERM is unix-only"))
}
