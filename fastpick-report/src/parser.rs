//! Result Parser
//!
//! Recovers a [`BenchmarkComparison`] from raw run output. In order:
//! 1. a fatal error line fails the parse
//! 2. the first well-formed `RESULTS_JSON:` line is taken as-is
//! 3. otherwise trace lines (`cycle:`/`complete:` and the older
//!    `name x 1,234 ops/sec ±1.2% (N runs sampled)` prose) are collected
//! 4. with nothing recognizable, the comparison is `Unknown` with no results

use crate::comparison::{BenchmarkComparison, CandidateResult, fastest_of};
use crate::protocol::{ERROR_MARKER, RESULTS_MARKER};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

/// Parse failures. Only an explicit error marker is an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The run reported a fatal error
    #[error("benchmark failed: {0}")]
    Benchmark(String),
}

static CYCLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^cycle:\s*Name:\s*(.+?),\s*Ops:\s*([0-9][0-9,]*(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?)\s*$")
        .expect("valid regex")
});

static COMPLETE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^complete:\s*Fastest is\s+(.+?)\s*$").expect("valid regex"));

static PROSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(.+?)\s+x\s+([0-9][0-9,]*(?:\.[0-9]+)?)\s+ops/sec(?:\s+(?:±|\+/-|\+-)\s*([0-9]+(?:\.[0-9]+)?)%)?(?:\s+\((\d+)\s+runs?\s+sampled\))?\s*$",
    )
    .expect("valid regex")
});

/// Parse raw output (stdout and stderr, in any interleaving).
pub fn parse_output(raw: &str) -> Result<BenchmarkComparison, ParseError> {
    let lines: Vec<&str> = raw.lines().map(|line| line.trim()).collect();

    if let Some(message) = lines
        .iter()
        .find_map(|line| line.strip_prefix(ERROR_MARKER))
    {
        return Err(ParseError::Benchmark(message.trim().to_string()));
    }

    for payload in lines.iter().filter_map(|line| line.strip_prefix(RESULTS_MARKER)) {
        match parse_results_payload(payload.trim()) {
            Some(comparison) => return Ok(comparison),
            None => tracing::debug!(payload, "ignoring malformed results line"),
        }
    }

    Ok(parse_trace_lines(&lines))
}

fn parse_results_payload(payload: &str) -> Option<BenchmarkComparison> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let object = value.as_object()?;
    if !object.get("results")?.is_array() || !object.get("fastest")?.is_string() {
        return None;
    }
    serde_json::from_value(value).ok()
}

fn parse_trace_lines(lines: &[&str]) -> BenchmarkComparison {
    let mut results: Vec<CandidateResult> = Vec::new();
    let mut announced: Option<String> = None;

    let mut record = |result: CandidateResult| {
        match results.iter_mut().find(|r| r.name == result.name) {
            Some(existing) => *existing = result,
            None => results.push(result),
        }
    };

    for line in lines {
        if let Some(caps) = CYCLE_RE.captures(line) {
            if let Some(ops) = parse_number(&caps[2]) {
                record(CandidateResult::new(caps[1].trim(), ops, 0.0));
            }
        } else if let Some(caps) = COMPLETE_RE.captures(line) {
            announced = Some(caps[1].to_string());
        } else if let Some(caps) = PROSE_RE.captures(line) {
            if let Some(ops) = parse_number(&caps[2]) {
                let margin = caps.get(3).and_then(|m| parse_number(m.as_str())).unwrap_or(0.0);
                record(CandidateResult::new(caps[1].trim(), ops, margin));
            }
        }
    }

    if results.is_empty() {
        return BenchmarkComparison::unknown();
    }

    let fastest = match announced {
        Some(name) if results.iter().any(|r| r.name == name) => name,
        _ => fastest_of(&results)
            .map(|r| r.name.clone())
            .unwrap_or_default(),
    };
    BenchmarkComparison { results, fastest }
}

fn parse_number(text: &str) -> Option<f64> {
    let value: f64 = text.replace(',', "").parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_marker_is_error() {
        let err = parse_output("BENCHMARK_ERROR: no implementations found\n").unwrap_err();
        assert_eq!(err, ParseError::Benchmark("no implementations found".into()));
    }

    #[test]
    fn test_fatal_marker_wins_over_results() {
        let raw = "RESULTS_JSON: {\"results\":[],\"fastest\":\"Unknown\"}\n  BENCHMARK_ERROR: late\r\n";
        assert!(parse_output(raw).is_err());
    }

    #[test]
    fn test_results_json_wins_over_trace() {
        let raw = "\
cycle: Name: Original, Ops: 100
BENCHMARK_EXECUTION_ERROR [Alt1]: boom
RESULTS_JSON: {\"results\":[{\"name\":\"Original\",\"ops\":123.5,\"margin\":1.2}],\"fastest\":\"Original\"}
complete: Fastest is Original
";
        let cmp = parse_output(raw).unwrap();
        assert_eq!(cmp.fastest, "Original");
        assert_eq!(cmp.results, vec![CandidateResult::new("Original", 123.5, 1.2)]);
    }

    #[test]
    fn test_malformed_results_line_skipped() {
        let raw = "\
RESULTS_JSON: {not json
RESULTS_JSON: {\"results\":{},\"fastest\":\"A\"}
RESULTS_JSON: {\"results\":[{\"name\":\"B\",\"ops\":2}],\"fastest\":\"B\"}
";
        let cmp = parse_output(raw).unwrap();
        assert_eq!(cmp.fastest, "B");
        assert_eq!(cmp.results[0].margin, None);
    }

    #[test]
    fn test_trace_only_output() {
        let raw = "cycle: Name: Original, Ops: 500000\ncomplete: Fastest is Original\n";
        let cmp = parse_output(raw).unwrap();
        assert_eq!(
            cmp,
            BenchmarkComparison {
                fastest: "Original".into(),
                results: vec![CandidateResult::new("Original", 500000.0, 0.0)],
            }
        );
    }

    #[test]
    fn test_completion_winner_must_be_known() {
        let raw = "\
cycle: Name: A, Ops: 10
cycle: Name: B, Ops: 30
complete: Fastest is Ghost
";
        assert_eq!(parse_output(raw).unwrap().fastest, "B");
    }

    #[test]
    fn test_later_line_replaces_earlier() {
        let raw = "\
   cycle: Name: A, Ops: 10\r
cycle: Name: B, Ops: 20
cycle: Name: A, Ops: 1,000.5
";
        let cmp = parse_output(raw).unwrap();
        assert_eq!(cmp.results.len(), 2);
        assert_eq!(cmp.results[0], CandidateResult::new("A", 1000.5, 0.0));
        assert_eq!(cmp.fastest, "A");
    }

    #[test]
    fn test_prose_format() {
        let raw = "\
Original x 1,234,567 ops/sec ±1.23% (90 runs sampled)
Alt1 x 2,000,000 ops/sec ±0.50% (88 runs sampled)
Fastest is Alt1
";
        let cmp = parse_output(raw).unwrap();
        assert_eq!(cmp.fastest, "Alt1");
        assert_eq!(cmp.results[0], CandidateResult::new("Original", 1234567.0, 1.23));
        assert_eq!(cmp.results[1].margin, Some(0.5));
    }

    #[test]
    fn test_nothing_recognizable() {
        assert_eq!(parse_output("").unwrap(), BenchmarkComparison::unknown());
        assert_eq!(
            parse_output("complete: Fastest is A\nrandom noise\n").unwrap(),
            BenchmarkComparison::unknown()
        );
    }
}
