//! Output Line Protocol
//!
//! The line-oriented contract between a benchmark run and whoever reads its
//! output:
//!
//! ```text
//! cycle: Name: <name>, Ops: <number>                 (stdout)
//! BENCHMARK_EXECUTION_ERROR [<name>]: <message>      (stderr)
//! RESULTS_JSON: {"results":[...],"fastest":"<name>"} (stdout)
//! complete: Fastest is <name>                        (stdout)
//! BENCHMARK_ERROR: <message>                         (stderr)
//! ```
//!
//! Lines are produced through a [`ProtocolSink`] so the run can be pointed
//! at real streams or captured in memory.

use crate::comparison::BenchmarkComparison;
use std::fmt;
use std::io::{self, Write};

/// Prefix of the machine-readable results line
pub const RESULTS_MARKER: &str = "RESULTS_JSON:";
/// Prefix of a fatal error line
pub const ERROR_MARKER: &str = "BENCHMARK_ERROR:";
/// Prefix of a per-candidate failure line
pub const EXECUTION_ERROR_MARKER: &str = "BENCHMARK_EXECUTION_ERROR";
/// Prefix of a per-candidate trace line
pub const CYCLE_MARKER: &str = "cycle:";
/// Prefix of the completion line
pub const COMPLETE_MARKER: &str = "complete: Fastest is";

/// Which stream a line belongs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Standard output
    Out,
    /// Standard error
    Err,
}

/// One line of run output
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolLine {
    /// A candidate finished
    Cycle {
        /// Candidate name
        name: String,
        /// Operations per second
        ops: f64,
    },
    /// A candidate failed
    ExecutionError {
        /// Candidate name
        name: String,
        /// Failure message
        message: String,
    },
    /// Final comparison
    Results(BenchmarkComparison),
    /// Winner announcement
    Complete {
        /// Winning candidate name
        fastest: String,
    },
    /// The run could not proceed at all
    Fatal(String),
}

impl ProtocolLine {
    /// Stream this line is written to
    pub fn stream(&self) -> Stream {
        match self {
            ProtocolLine::ExecutionError { .. } | ProtocolLine::Fatal(_) => Stream::Err,
            _ => Stream::Out,
        }
    }
}

impl fmt::Display for ProtocolLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolLine::Cycle { name, ops } => {
                write!(f, "{CYCLE_MARKER} Name: {name}, Ops: {}", format_ops(*ops))
            }
            ProtocolLine::ExecutionError { name, message } => write!(
                f,
                "{EXECUTION_ERROR_MARKER} [{name}]: {}",
                single_line(message)
            ),
            ProtocolLine::Results(comparison) => {
                let json = serde_json::to_string(comparison).map_err(|_| fmt::Error)?;
                write!(f, "{RESULTS_MARKER} {json}")
            }
            ProtocolLine::Complete { fastest } => write!(f, "{COMPLETE_MARKER} {fastest}"),
            ProtocolLine::Fatal(message) => write!(f, "{ERROR_MARKER} {}", single_line(message)),
        }
    }
}

/// Format ops/sec for trace lines: whole numbers from 100 up, two decimals below.
pub fn format_ops(ops: f64) -> String {
    if ops >= 100.0 {
        format!("{ops:.0}")
    } else {
        format!("{ops:.2}")
    }
}

fn single_line(message: &str) -> String {
    message.lines().map(str::trim_end).collect::<Vec<_>>().join(" | ")
}

/// Destination for protocol lines
pub trait ProtocolSink {
    /// Write one line
    fn emit(&mut self, line: &ProtocolLine) -> io::Result<()>;
}

/// Sink writing to a pair of streams, flushing after every line.
pub struct StreamSink<O: Write, E: Write> {
    out: O,
    err: E,
}

impl StreamSink<io::Stdout, io::Stderr> {
    /// Sink over the process's stdout and stderr
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> StreamSink<O, E> {
    /// Sink over arbitrary writers
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    /// Recover the writers
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O: Write, E: Write> ProtocolSink for StreamSink<O, E> {
    fn emit(&mut self, line: &ProtocolLine) -> io::Result<()> {
        let target: &mut dyn Write = match line.stream() {
            Stream::Out => &mut self.out,
            Stream::Err => &mut self.err,
        };
        writeln!(target, "{line}")?;
        target.flush()
    }
}

/// Sink that keeps every line, for tests and in-process callers.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Lines in emission order
    pub lines: Vec<ProtocolLine>,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of every line bound for `stream`
    pub fn text(&self, stream: Stream) -> String {
        self.lines
            .iter()
            .filter(|line| line.stream() == stream)
            .map(|line| format!("{line}\n"))
            .collect()
    }

    /// Text of every line, both streams interleaved in emission order
    pub fn combined(&self) -> String {
        self.lines.iter().map(|line| format!("{line}\n")).collect()
    }
}

impl ProtocolSink for MemorySink {
    fn emit(&mut self, line: &ProtocolLine) -> io::Result<()> {
        self.lines.push(line.clone());
        Ok(())
    }
}
