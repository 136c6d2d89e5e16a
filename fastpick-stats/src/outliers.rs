//! Outlier Detection
//!
//! A JS candidate's timing samples regularly contain GC pauses and JIT-less
//! interpreter hiccups. Those samples are fenced out of the mean (so they do
//! not distort throughput) but are kept for min/max/percentiles.

use crate::percentiles::compute_percentile;

/// Method for outlier detection
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutlierMethod {
    /// Tukey fence: outliers fall outside [Q1 - k*IQR, Q3 + k*IQR]
    Iqr {
        /// Fence multiplier
        k: f64,
    },
    /// Keep every sample
    #[default]
    None,
}

impl OutlierMethod {
    /// Standard Tukey fence (k = 1.5)
    pub const TUKEY: OutlierMethod = OutlierMethod::Iqr { k: 1.5 };
}

/// Result of outlier analysis
#[derive(Debug, Clone)]
pub struct OutlierAnalysis {
    /// Samples with outliers removed
    pub cleaned_samples: Vec<f64>,
    /// Number of samples below the lower fence
    pub low_outliers: usize,
    /// Number of samples above the upper fence
    pub high_outliers: usize,
}

impl OutlierAnalysis {
    /// Total number of fenced samples
    pub fn outlier_count(&self) -> usize {
        self.low_outliers + self.high_outliers
    }
}

/// Detect outliers in `samples` using `method`.
pub fn detect_outliers(samples: &[f64], method: OutlierMethod) -> OutlierAnalysis {
    let k = match method {
        OutlierMethod::Iqr { k } if samples.len() >= 4 => k,
        _ => {
            return OutlierAnalysis {
                cleaned_samples: samples.to_vec(),
                low_outliers: 0,
                high_outliers: 0,
            };
        }
    };

    let q1 = compute_percentile(samples, 25.0);
    let q3 = compute_percentile(samples, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - k * iqr;
    let upper = q3 + k * iqr;

    let mut analysis = OutlierAnalysis {
        cleaned_samples: Vec::with_capacity(samples.len()),
        low_outliers: 0,
        high_outliers: 0,
    };
    for &sample in samples {
        if sample < lower {
            analysis.low_outliers += 1;
        } else if sample > upper {
            analysis.high_outliers += 1;
        } else {
            analysis.cleaned_samples.push(sample);
        }
    }
    analysis
}
