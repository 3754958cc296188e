//! Summary statistics shared by the ECF routines and the p-value estimator.
//!
//! These follow the conventions of the trajectory tooling this crate is
//! paired with: the spread used to size frequency grids is the *population*
//! standard deviation (divisor `n`), while the p-value uses the *unbiased*
//! variance (divisor `n - 1`).

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divisor `n`).
///
/// A constant sample yields exactly `0.0` regardless of rounding in the
/// mean, which the frequency-grid fallback relies on.
pub fn population_std(data: &[f64]) -> f64 {
    let Some(&first) = data.first() else {
        return f64::NAN;
    };
    if data.iter().all(|&x| x == first) {
        return 0.0;
    }
    let m = mean(data);
    let ss = data.iter().map(|&x| (x - m) * (x - m)).sum::<f64>();
    (ss / data.len() as f64).sqrt()
}

/// Unbiased sample variance (divisor `n - 1`) via Welford's algorithm.
///
/// Returns `0.0` for fewer than two values.
pub fn sample_variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    if data.iter().all(|&x| x == data[0]) {
        return 0.0;
    }

    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, &value) in data.iter().enumerate() {
        let count = (i + 1) as f64;
        let delta = value - mean;
        mean += delta / count;
        m2 += delta * (value - mean);
    }

    m2 / (data.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_constant_sample_has_exact_zero_spread() {
        let data = vec![3.7; 101];
        assert_eq!(population_std(&data), 0.0);
        assert_eq!(sample_variance(&data), 0.0);
    }

    #[test]
    fn test_population_vs_sample_divisor() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        // population variance 1.25, sample variance 5/3
        assert_approx_eq!(population_std(&data), 1.25f64.sqrt(), 1e-12);
        assert_approx_eq!(sample_variance(&data), 5.0 / 3.0, 1e-12);
        assert_approx_eq!(mean(&data), 2.5, 1e-15);
    }

    #[test]
    fn test_short_inputs() {
        assert!(mean(&[]).is_nan());
        assert!(population_std(&[]).is_nan());
        assert_eq!(sample_variance(&[42.0]), 0.0);
    }
}
