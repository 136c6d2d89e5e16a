#![warn(missing_docs)]
//! fastpick Statistics
//!
//! Turns the per-iteration timing samples collected for one candidate into
//! the numbers the comparison is built from:
//! - Outlier detection via the IQR fence
//! - Percentiles over the raw samples
//! - Mean/median/stddev over the cleaned samples
//! - Throughput (operations per second) and its relative margin of error

mod margin;
mod outliers;
mod percentiles;
mod summary;

pub use margin::{relative_margin_of_error, standard_error, t_critical_95};
pub use outliers::{OutlierAnalysis, OutlierMethod, detect_outliers};
pub use percentiles::compute_percentile;
pub use summary::{ThroughputSummary, compute_summary};

/// Nanoseconds per second, used for ops/sec conversion.
pub const NANOS_PER_SEC: f64 = 1_000_000_000.0;
