//! Small numeric helpers shared by the analysis stages.

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Linear-interpolated quantile over an ascending-sorted slice.
///
/// `q` is in `[0, 1]`. Matches the order-statistic interpolation convention
/// used across the dataframe ecosystem, so Q1/Q3 line up with the usual
/// boxplot bounds. Returns 0.0 for empty input.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Z-score standardization of a column-major matrix, one column per feature.
///
/// A zero-variance column standardizes to all zeros rather than dividing by
/// zero, so constant features simply stop contributing to distances.
pub fn standardize_columns(columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    columns
        .iter()
        .map(|column| {
            let m = mean(column);
            let sd = stddev(column, m);
            if sd == 0.0 {
                vec![0.0; column.len()]
            } else {
                column.iter().map(|v| (v - m) / sd).collect()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_mean_normal_values() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_stddev_constant_series() {
        assert_eq!(stddev(&[5.0, 5.0, 5.0], 5.0), 0.0);
    }

    #[test]
    fn test_stddev_population() {
        // Population stddev of {2, 4}: sqrt(((2-3)^2 + (4-3)^2) / 2) = 1
        assert_eq!(stddev(&[2.0, 4.0], 3.0), 1.0);
    }

    #[test]
    fn test_quantile_endpoints() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.0), 1.0);
        assert_eq!(quantile(&v, 1.0), 4.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        // position 0.25 * 3 = 0.75 -> 1 + 0.75 * (2 - 1)
        assert_eq!(quantile(&v, 0.25), 1.75);
        assert_eq!(quantile(&v, 0.5), 2.5);
        assert_eq!(quantile(&v, 0.75), 3.25);
    }

    #[test]
    fn test_quantile_single_value() {
        assert_eq!(quantile(&[7.0], 0.25), 7.0);
        assert_eq!(quantile(&[7.0], 0.75), 7.0);
    }

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let standardized = standardize_columns(&[vec![1.0, 2.0, 3.0]]);
        let column = &standardized[0];
        assert!(mean(column).abs() < 1e-12);
        assert!((stddev(column, 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_standardize_constant_column_is_zeros() {
        let standardized = standardize_columns(&[vec![4.0, 4.0, 4.0]]);
        assert_eq!(standardized[0], vec![0.0, 0.0, 0.0]);
    }
}
