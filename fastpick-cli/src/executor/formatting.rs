//! Output Formatting
//!
//! Human-readable output for benchmark runs:
//! - Per-candidate status icons (✓/✗) with timing metrics
//! - A ranking table with speedups relative to the slowest candidate

use fastpick_report::{BenchmarkComparison, CandidateStatus, Report, format_ops};

/// Format a report for human-readable terminal display
///
/// # Arguments
/// * `report` - Complete benchmark report
///
/// # Returns
/// Formatted string suitable for terminal output
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("fastpick Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    if let Some(module) = &report.meta.module {
        output.push_str(&format!("Module: {}\n", module));
    }
    if let Some(entry) = &report.meta.entry_point {
        output.push_str(&format!("Entry point: {}\n", entry));
    }
    output.push_str(&"-".repeat(60));
    output.push('\n');

    for candidate in &report.candidates {
        let status_icon = match candidate.status {
            CandidateStatus::Passed => "✓",
            CandidateStatus::Failed => "✗",
        };

        if candidate.name == candidate.binding {
            output.push_str(&format!("  {} {}\n", status_icon, candidate.name));
        } else {
            output.push_str(&format!(
                "  {} {} (bound as {})\n",
                status_icon, candidate.name, candidate.binding
            ));
        }
        output.push_str(&format!("      isolation: {}\n", candidate.isolation));

        if let Some(metrics) = &candidate.metrics {
            output.push_str(&format!(
                "      {} ops/sec ±{:.2}%\n",
                format_ops(metrics.ops_per_sec),
                metrics.margin_pct
            ));
            output.push_str(&format!(
                "      mean: {:.2} ns  median: {:.2} ns  stddev: {:.2} ns\n",
                metrics.mean_ns, metrics.median_ns, metrics.std_dev_ns
            ));
            output.push_str(&format!(
                "      min: {:.2} ns  max: {:.2} ns  p95: {:.2} ns\n",
                metrics.min_ns, metrics.max_ns, metrics.p95_ns
            ));
            output.push_str(&format!(
                "      samples: {}  iterations: {}  outliers: {}\n",
                metrics.samples, metrics.iterations, metrics.outliers
            ));
        }

        if let Some(failure) = &candidate.failure {
            output.push_str(&format!("      error ({}): {}\n", failure.kind, failure.message));
        }

        output.push('\n');
    }

    output.push_str(&format_comparison_human(&report.comparison));

    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "Summary: {} candidates, {} passed, {} failed ({:.0}ms)\n",
        report.summary.total_candidates,
        report.summary.passed,
        report.summary.failed,
        report.summary.total_duration_ms
    ));

    output
}

/// Ranking table for a comparison, fastest first.
pub fn format_comparison_human(comparison: &BenchmarkComparison) -> String {
    let mut output = String::new();

    output.push_str("Ranking\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');

    if comparison.is_unknown() {
        output.push_str("  No candidate produced a result\n\n");
        return output;
    }

    let max_name_len = comparison
        .results
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(20)
        .max("Candidate".len());

    output.push_str(&format!(
        "  {:<width$}  {:>14}  {:>9}  {:>8}\n",
        "Candidate",
        "ops/sec",
        "margin",
        "speedup",
        width = max_name_len
    ));
    output.push_str(&format!("  {}\n", "-".repeat(max_name_len + 37)));

    let mut sorted: Vec<_> = comparison.results.iter().collect();
    sorted.sort_by(|a, b| b.ops.partial_cmp(&a.ops).unwrap_or(std::cmp::Ordering::Equal));

    // Speedups are relative to the slowest entry
    let slowest = sorted.last().map(|r| r.ops).unwrap_or(0.0);

    for entry in &sorted {
        let margin = entry
            .margin
            .map(|m| format!("±{:.2}%", m))
            .unwrap_or_else(|| "-".to_string());
        let speedup = if slowest > 0.0 {
            format!("{:.2}x", entry.ops / slowest)
        } else {
            "-".to_string()
        };
        let marker = if entry.name == comparison.fastest {
            " (fastest)"
        } else {
            ""
        };

        output.push_str(&format!(
            "  {:<width$}  {:>14}  {:>9}  {:>8}{}\n",
            entry.name,
            format_ops(entry.ops),
            margin,
            speedup,
            marker,
            width = max_name_len
        ));
    }

    if let (Some(fastest), Some(runner_up)) = (sorted.first(), sorted.get(1)) {
        if runner_up.ops > 0.0 {
            output.push_str(&format!(
                "\n  {} is {:.2}x faster than {}\n",
                fastest.name,
                fastest.ops / runner_up.ops,
                runner_up.name
            ));
        }
    }
    output.push('\n');

    output
}
