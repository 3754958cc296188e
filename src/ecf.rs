//! Empirical characteristic functions and the half-split error metric.
//!
//! The ECF of a sample `x_1..x_n` at transform variable `t` is
//!
//! ```text
//! φ̂(t) = (1/n) Σ cos(t·x_j) + i (1/n) Σ sin(t·x_j)
//! ```
//!
//! Frequency grids are sized from the sample's spread: a grid of
//! `num_steps + 1` evenly spaced points covering `num_periods` periods of a
//! characteristic function whose scale matches the population standard
//! deviation. Two ECFs evaluated on the same grid are compared by their
//! worst-case pointwise Euclidean distance in the complex plane.

use crate::errors::{validate_count, validate_data_length, ReproError, ReproResult};
use crate::math_utils::population_std;
use crate::trajectories::TrajectorySet;
use num_complex::Complex64;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// ECF evaluations aligned with a frequency grid.
pub type EcfCurve = Vec<Complex64>;

/// `num_steps + 1` points `0, increment, 2·increment, …`.
pub fn eval_points(num_steps: usize, increment: f64) -> Vec<f64> {
    (0..=num_steps).map(|i| i as f64 * increment).collect()
}

/// `num_steps + 1` evenly spaced points from 0 to `eval_fin` inclusive.
pub fn eval_info_times(num_steps: usize, eval_fin: f64) -> Vec<f64> {
    eval_points(num_steps, eval_fin / num_steps as f64)
}

/// Grid increment for a sample.
///
/// Zero spread falls back to `1 / num_steps`; otherwise the grid spans
/// `2·num_periods·π / σ`.
pub fn increment_for(sample: &[f64], num_steps: usize, num_periods: usize) -> f64 {
    let stdev = population_std(sample);
    if stdev == 0.0 {
        1.0 / num_steps as f64
    } else {
        2.0 * num_periods as f64 * PI / (stdev * num_steps as f64)
    }
}

/// Final transform-variable value used when building full ECF curves.
///
/// Zero spread falls back to `1.0`.
pub fn final_frequency(sample: &[f64], num_periods: usize) -> f64 {
    let stdev = population_std(sample);
    if stdev == 0.0 {
        1.0
    } else {
        2.0 * num_periods as f64 * PI / stdev
    }
}

/// Empirical characteristic function of `values` at each of `freqs`.
///
/// An empty sample yields NaN components.
pub fn ecf(values: &[f64], freqs: &[f64]) -> EcfCurve {
    let n = values.len() as f64;
    freqs
        .iter()
        .map(|&t| {
            let (mut re, mut im) = (0.0, 0.0);
            for &v in values {
                let (s, c) = (t * v).sin_cos();
                re += c;
                im += s;
            }
            Complex64::new(re / n, im / n)
        })
        .collect()
}

/// Worst-case distance between two ECFs evaluated on the same grid.
pub fn ecf_compare(a: &[Complex64], b: &[Complex64]) -> ReproResult<f64> {
    if a.len() != b.len() {
        return Err(ReproError::ShapeMismatch {
            name: "ecf curve".to_string(),
            expected: (a.len(), 2),
            actual: (b.len(), 2),
        });
    }
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).norm_sqr().sqrt())
        .fold(0.0, f64::max))
}

/// Half-split ECF error of one sample, returning `(increment, error)`.
///
/// The halves are `[0, n/2)` and `[n/2, n)`, so for odd `n` the second half
/// holds the extra value. A zero-spread sample returns `(1 / num_steps, 0.0)`
/// without evaluating anything. Fewer than two values cannot be split.
pub fn ecf_err(sample: &[f64], num_steps: usize, num_periods: usize) -> ReproResult<(f64, f64)> {
    validate_count(num_steps, 1, "num_steps")?;
    validate_data_length(sample, 2)?;

    let increment = increment_for(sample, num_steps, num_periods);
    if population_std(sample) == 0.0 {
        return Ok((increment, 0.0));
    }

    let grid = eval_points(num_steps, increment);
    let half = sample.len() / 2;
    let first = ecf(&sample[..half], &grid);
    let second = ecf(&sample[half..], &grid);
    Ok((increment, ecf_compare(&first, &second)?))
}

/// Half-split error of one variable at one time index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleError {
    /// Worst-case ECF discrepancy between the two halves
    pub error: f64,
    /// Final transform-variable value of the grid (`increment · num_steps`)
    pub eval_fin: f64,
}

/// Half-split error for every variable of `set` at time index `time`.
pub fn err_sample(
    set: &TrajectorySet,
    time: usize,
    num_steps: usize,
    num_periods: usize,
) -> ReproResult<BTreeMap<String, SampleError>> {
    if time >= set.times() {
        return Err(ReproError::InvalidParameter {
            parameter: "time".to_string(),
            value: time as f64,
            constraint: format!("must be less than {}", set.times()),
        });
    }

    let mut column = Vec::with_capacity(set.realizations());
    let mut out = BTreeMap::new();
    for (name, traj) in set.iter() {
        traj.column_into(time, &mut column);
        let (increment, error) = ecf_err(&column, num_steps, num_periods)?;
        out.insert(
            name.to_string(),
            SampleError {
                error,
                eval_fin: increment * num_steps as f64,
            },
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_rng::SecureRng;
    use crate::trajectories::Trajectories;
    use assert_approx_eq::assert_approx_eq;

    fn noisy(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = SecureRng::with_seed(seed);
        (0..n).map(|_| rng.f64() * 4.0 - 2.0).collect()
    }

    #[test]
    fn test_eval_points() {
        let pts = eval_points(4, 0.5);
        assert_eq!(pts, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert!(pts.windows(2).all(|w| w[1] > w[0]));

        let pts = eval_info_times(10, 3.0);
        assert_eq!(pts.len(), 11);
        assert_eq!(pts[0], 0.0);
        assert_approx_eq!(pts[10], 3.0, 1e-12);
    }

    #[test]
    fn test_increment_for() {
        // population std of [-1, 1] is exactly 1
        let inc = increment_for(&[-1.0, 1.0], 50, 2);
        assert_approx_eq!(inc, 4.0 * PI / 50.0, 1e-15);
        assert_eq!(increment_for(&[2.5; 8], 50, 2), 1.0 / 50.0);
    }

    #[test]
    fn test_ecf_known_values() {
        let curve = ecf(&[0.0, 0.0, 0.0], &[0.0, 1.0, 7.0]);
        for v in &curve {
            assert_eq!(v.re, 1.0);
            assert_eq!(v.im, 0.0);
        }

        // symmetric sample has zero imaginary part
        let curve = ecf(&[-1.0, 1.0], &[0.3, 1.2]);
        assert_approx_eq!(curve[0].re, 0.3f64.cos(), 1e-15);
        assert_approx_eq!(curve[0].im, 0.0, 1e-15);
        assert_approx_eq!(curve[1].re, 1.2f64.cos(), 1e-15);
    }

    #[test]
    fn test_ecf_of_empty_sample_is_nan() {
        let curve = ecf(&[], &[0.0, 1.0]);
        assert_eq!(curve.len(), 2);
        assert!(curve.iter().all(|v| v.re.is_nan() && v.im.is_nan()));
        assert!(ecf(&[1.0], &[]).is_empty());
    }

    #[test]
    fn test_ecf_at_origin_is_one() {
        let curve = ecf(&noisy(37, 1), &[0.0]);
        assert_eq!(curve[0], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_compare_identical_is_zero() {
        let data = noisy(64, 3);
        let grid = eval_points(20, increment_for(&data, 20, 1));
        let curve = ecf(&data, &grid);
        assert_eq!(ecf_compare(&curve, &curve).unwrap(), 0.0);
    }

    #[test]
    fn test_compare_worst_case_distance() {
        let a = vec![Complex64::new(1.0, 0.0), Complex64::new(0.5, 0.5)];
        let b = vec![Complex64::new(1.0, 0.0), Complex64::new(0.2, 0.1)];
        assert_approx_eq!(ecf_compare(&a, &b).unwrap(), 0.5, 1e-15);
        assert_approx_eq!(ecf_compare(&b, &a).unwrap(), 0.5, 1e-15);
    }

    #[test]
    fn test_compare_length_mismatch() {
        let a = vec![Complex64::new(1.0, 0.0); 3];
        let b = vec![Complex64::new(1.0, 0.0); 2];
        assert!(matches!(
            ecf_compare(&a, &b),
            Err(ReproError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_ecf_err_constant_sample() {
        for n in [1, 5, 100] {
            for k in [1, 3] {
                let (inc, err) = ecf_err(&[4.2; 31], n, k).unwrap();
                assert_eq!(inc, 1.0 / n as f64);
                assert_eq!(err, 0.0);
            }
        }
    }

    #[test]
    fn test_ecf_err_symmetric_under_half_swap() {
        let data = noisy(200, 11);
        let (inc, err) = ecf_err(&data, 40, 1).unwrap();

        let mut swapped = data[100..].to_vec();
        swapped.extend_from_slice(&data[..100]);
        let (inc_s, err_s) = ecf_err(&swapped, 40, 1).unwrap();

        assert!(err >= 0.0);
        assert_eq!(inc, inc_s);
        assert_approx_eq!(err, err_s, 1e-12);
    }

    #[test]
    fn test_ecf_err_odd_sample_keeps_remainder_in_second_half() {
        let data = noisy(41, 5);
        let (inc, odd_err) = ecf_err(&data, 30, 1).unwrap();

        let grid = eval_points(30, inc);
        let expected = ecf_compare(&ecf(&data[..20], &grid), &ecf(&data[20..], &grid)).unwrap();
        assert_eq!(odd_err, expected);

        let dropped = ecf_compare(&ecf(&data[..20], &grid), &ecf(&data[20..40], &grid)).unwrap();
        assert_ne!(odd_err, dropped);
    }

    #[test]
    fn test_ecf_err_rejects_bad_input() {
        assert!(matches!(
            ecf_err(&[], 10, 1),
            Err(ReproError::InsufficientData { .. })
        ));
        assert!(matches!(
            ecf_err(&[3.0], 10, 1),
            Err(ReproError::InsufficientData {
                required: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            ecf_err(&[1.0, 2.0], 0, 1),
            Err(ReproError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_err_sample_per_variable() {
        let mut set = TrajectorySet::new();
        let x = Trajectories::from_flat(noisy(60, 2), 30, 2).unwrap();
        let c = Trajectories::from_flat(vec![1.0; 60], 30, 2).unwrap();
        set.insert("x", x).unwrap();
        set.insert("c", c).unwrap();

        let errs = err_sample(&set, 1, 25, 1).unwrap();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs["c"].error, 0.0);
        assert_approx_eq!(errs["c"].eval_fin, 1.0, 1e-12);
        assert!(errs["x"].error > 0.0);
        assert!(errs["x"].eval_fin > 0.0);

        assert!(err_sample(&set, 2, 25, 1).is_err());
    }
}
