//! Comparison Data Model

use serde::{Deserialize, Serialize};

/// Winner reported when no candidate produced a result
pub const UNKNOWN_FASTEST: &str = "Unknown";

/// Throughput of one successful candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// Candidate name
    pub name: String,
    /// Operations per second
    pub ops: f64,
    /// Relative margin of error (±%), when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
}

impl CandidateResult {
    /// Result with a known margin
    pub fn new(name: impl Into<String>, ops: f64, margin: f64) -> Self {
        Self {
            name: name.into(),
            ops,
            margin: Some(margin),
        }
    }
}

/// Normalized outcome of a run: every successful candidate and the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    /// Successful candidates in run order
    pub results: Vec<CandidateResult>,
    /// Name of the fastest candidate, or `"Unknown"`
    pub fastest: String,
}

impl BenchmarkComparison {
    /// Comparison with no results
    pub fn unknown() -> Self {
        Self {
            fastest: UNKNOWN_FASTEST.to_string(),
            results: Vec::new(),
        }
    }

    /// Build a comparison, picking the winner by highest ops.
    pub fn from_results(results: Vec<CandidateResult>) -> Self {
        let fastest = fastest_of(&results)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| UNKNOWN_FASTEST.to_string());
        Self { fastest, results }
    }

    /// Whether no candidate produced a result
    pub fn is_unknown(&self) -> bool {
        self.results.is_empty()
    }

    /// Result for `name`, if present
    pub fn get(&self, name: &str) -> Option<&CandidateResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// How many times faster the winner is than `name`.
    pub fn speedup_over(&self, name: &str) -> Option<f64> {
        let winner = self.get(&self.fastest)?;
        let other = self.get(name)?;
        if other.ops > 0.0 {
            Some(winner.ops / other.ops)
        } else {
            None
        }
    }
}

/// Highest-ops result; the earliest wins a tie.
pub fn fastest_of(results: &[CandidateResult]) -> Option<&CandidateResult> {
    results.iter().fold(None, |best, r| match best {
        Some(b) if b.ops >= r.ops => Some(b),
        _ => Some(r),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fastest_is_argmax() {
        let cmp = BenchmarkComparison::from_results(vec![
            CandidateResult::new("Original", 1000.0, 1.0),
            CandidateResult::new("Alt1", 3000.0, 2.0),
            CandidateResult::new("Alt2", 2000.0, 0.5),
        ]);
        assert_eq!(cmp.fastest, "Alt1");
        assert_eq!(cmp.speedup_over("Original"), Some(3.0));
    }

    #[test]
    fn test_empty_is_unknown() {
        let cmp = BenchmarkComparison::from_results(Vec::new());
        assert_eq!(cmp, BenchmarkComparison::unknown());
        assert!(cmp.is_unknown());
    }

    #[test]
    fn test_tie_keeps_first() {
        let results = vec![
            CandidateResult::new("A", 10.0, 0.0),
            CandidateResult::new("B", 10.0, 0.0),
        ];
        assert_eq!(fastest_of(&results).map(|r| r.name.as_str()), Some("A"));
    }

    #[test]
    fn test_margin_omitted_when_unknown() {
        let result = CandidateResult {
            name: "A".into(),
            ops: 5.0,
            margin: None,
        };
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"name":"A","ops":5.0}"#
        );
    }
}
