//! Margin of Error
//!
//! Relative margin of error of the mean at 95% confidence, using a two-tailed
//! Student-t critical value for small sample counts.

/// Two-tailed t critical values at 95% for degrees of freedom 1..=30.
const T_TABLE_95: [f64; 30] = [
    12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.16,
    2.145, 2.131, 2.12, 2.11, 2.101, 2.093, 2.086, 2.08, 2.074, 2.069, 2.064, 2.06, 2.056, 2.052,
    2.048, 2.045, 2.042,
];

/// Normal approximation used once df exceeds the table.
const Z_95: f64 = 1.96;

/// Critical value for `df` degrees of freedom (0 yields 0.0).
pub fn t_critical_95(df: usize) -> f64 {
    match df {
        0 => 0.0,
        d if d <= T_TABLE_95.len() => T_TABLE_95[d - 1],
        _ => Z_95,
    }
}

/// Standard error of the mean. Needs at least two samples, else 0.0.
pub fn standard_error(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt() / (n as f64).sqrt()
}

/// Relative margin of error in percent (the `±x%` next to a throughput).
pub fn relative_margin_of_error(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let moe = standard_error(samples) * t_critical_95(n - 1);
    (moe / mean) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t_table_lookup() {
        assert_eq!(t_critical_95(0), 0.0);
        assert_eq!(t_critical_95(1), 12.706);
        assert_eq!(t_critical_95(30), 2.042);
        assert_eq!(t_critical_95(500), Z_95);
    }

    #[test]
    fn test_constant_samples_have_no_margin() {
        assert_eq!(relative_margin_of_error(&[100.0; 8]), 0.0);
    }

    #[test]
    fn test_margin_grows_with_spread() {
        let tight = [100.0, 101.0, 99.0, 100.5, 99.5];
        let loose = [100.0, 130.0, 70.0, 120.0, 80.0];
        assert!(relative_margin_of_error(&loose) > relative_margin_of_error(&tight));
    }

    #[test]
    fn test_single_sample() {
        assert_eq!(relative_margin_of_error(&[5.0]), 0.0);
        assert_eq!(standard_error(&[5.0]), 0.0);
    }
}
