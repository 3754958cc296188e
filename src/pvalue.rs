//! P-value of an observed cross-sample error against a reproducibility
//! error distribution.
//!
//! The estimate only uses the mean and unbiased variance of the distribution:
//! with `q² = (n+1)/n · s²` and `λ² = (e − ē)² / q²`, the tail probability of
//! an error at least as large as `e` is bounded by
//!
//! ```text
//! p = ⌊(n+1)/n · ((n−1)/λ² + 1)⌋ / (n+1)
//! ```
//!
//! clamped to `[0, 1]`. Errors at or below the mean always score `1.0`.

use crate::errors::{validate_all_finite, validate_count, validate_data_length, ReproError, ReproResult};
use crate::math_utils::{mean, sample_variance};

/// P-value of `observed` given the error distribution `err_dist` of a sample
/// of `sample_size` realizations.
///
/// # Errors
///
/// - fewer than two values in `err_dist`, or `sample_size < 2`
/// - non-finite values
/// - `observed` strictly above the mean of a zero-variance distribution
///
/// # Examples
///
/// ```
/// use ecf_repro::pvalue::pval;
///
/// let dist = [0.10, 0.12, 0.11, 0.09, 0.13];
/// assert_eq!(pval(&dist, 0.05, 100).unwrap(), 1.0);
///
/// let p = pval(&dist, 0.30, 100).unwrap();
/// assert!(p > 0.0 && p < 0.1);
/// ```
pub fn pval(err_dist: &[f64], observed: f64, sample_size: usize) -> ReproResult<f64> {
    validate_data_length(err_dist, 2)?;
    validate_count(sample_size, 2, "sample_size")?;
    validate_all_finite(err_dist, "err_dist")?;
    if !observed.is_finite() {
        return Err(ReproError::NumericalError {
            reason: format!("observed error is {}", observed),
        });
    }

    let avg = mean(err_dist);
    if observed <= avg {
        return Ok(1.0);
    }

    let variance = sample_variance(err_dist);
    if variance <= 0.0 {
        return Err(ReproError::NumericalError {
            reason: format!(
                "observed error {} lies above a zero-variance distribution at {}",
                observed, avg
            ),
        });
    }

    let n = sample_size as f64;
    let scale = (n + 1.0) / n;
    let q2 = scale * variance;
    let diff = observed - avg;
    let lam2 = diff * diff / q2;
    if lam2 == 0.0 {
        return Ok(1.0);
    }

    let p = (scale * ((n - 1.0) / lam2 + 1.0)).floor() / (n + 1.0);
    Ok(p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_rng::SecureRng;
    use assert_approx_eq::assert_approx_eq;

    fn spread_dist() -> Vec<f64> {
        vec![0.8, 0.9, 1.0, 1.1, 1.2]
    }

    #[test]
    fn test_below_mean_is_one() {
        let dist = spread_dist();
        assert_eq!(pval(&dist, 1.0 - 1e-9, 10).unwrap(), 1.0);
        assert_eq!(pval(&dist, 0.0, 10).unwrap(), 1.0);
        assert_eq!(pval(&dist, 1.0, 10).unwrap(), 1.0);
    }

    #[test]
    fn test_constant_distribution_at_mean() {
        assert_eq!(pval(&[1.0; 5], 1.0, 5).unwrap(), 1.0);
    }

    #[test]
    fn test_zero_variance_above_mean_fails() {
        assert!(matches!(
            pval(&[1.0; 5], 1.5, 5),
            Err(ReproError::NumericalError { .. })
        ));
    }

    #[test]
    fn test_known_value() {
        // mean 1, s² = 0.025, n = 4: q² = 0.03125, λ² = 0.25 / 0.03125 = 8
        // p = floor(1.25 · (3/8 + 1)) / 5 = floor(1.71875) / 5 = 0.2
        let p = pval(&spread_dist(), 1.5, 4).unwrap();
        assert_approx_eq!(p, 0.2, 1e-12);
    }

    #[test]
    fn test_decreases_with_distance() {
        let dist = spread_dist();
        let mut last = 1.0;
        for k in 1..20 {
            let p = pval(&dist, 1.0 + 0.1 * k as f64, 50).unwrap();
            assert!(p <= last);
            last = p;
        }
        assert!(last < 0.1);
    }

    #[test]
    fn test_always_in_unit_interval() {
        let mut rng = SecureRng::with_seed(17);
        for _ in 0..200 {
            let dist: Vec<f64> = (0..8).map(|_| rng.f64()).collect();
            let observed = rng.f64() * 3.0;
            let n = 2 + (rng.f64() * 500.0) as usize;
            let p = pval(&dist, observed, n).unwrap();
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_input_guards() {
        let dist = spread_dist();
        assert!(matches!(
            pval(&dist, 2.0, 1),
            Err(ReproError::InvalidParameter { .. })
        ));
        assert!(matches!(
            pval(&[1.0], 2.0, 10),
            Err(ReproError::InsufficientData { .. })
        ));
        assert!(pval(&dist, f64::NAN, 10).is_err());
        assert!(pval(&[1.0, f64::INFINITY], 2.0, 10).is_err());
    }
}
