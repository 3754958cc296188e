//! Trajectory storage.
//!
//! A [`Trajectories`] is one variable's realizations × time matrix stored as a
//! single contiguous row-major buffer. A [`TrajectorySet`] groups named
//! variables that share one shape.

use crate::errors::{validate_all_finite, ReproError, ReproResult};
use std::collections::BTreeMap;

/// Minimum realizations needed to split a sample into two non-empty halves.
pub const MIN_REALIZATIONS: usize = 2;

/// Flattened realizations × time matrix for one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectories {
    data: Vec<f64>,
    realizations: usize,
    times: usize,
}

impl Trajectories {
    /// Wrap a row-major buffer (`data[r * times + t]`).
    pub fn from_flat(data: Vec<f64>, realizations: usize, times: usize) -> ReproResult<Self> {
        let expected = realizations
            .checked_mul(times)
            .ok_or_else(|| ReproError::InvalidParameter {
                parameter: "matrix_size".to_string(),
                value: f64::INFINITY,
                constraint: "realizations * times overflows".to_string(),
            })?;
        if data.len() != expected {
            return Err(ReproError::ShapeMismatch {
                name: "flat buffer".to_string(),
                expected: (realizations, times),
                actual: (data.len() / times.max(1), times),
            });
        }
        Ok(Self {
            data,
            realizations,
            times,
        })
    }

    /// Build from one row per realization.
    pub fn from_rows(rows: &[Vec<f64>]) -> ReproResult<Self> {
        let times = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * times);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != times {
                return Err(ReproError::ShapeMismatch {
                    name: format!("row {}", r),
                    expected: (1, times),
                    actual: (1, row.len()),
                });
            }
            data.extend_from_slice(row);
        }
        Self::from_flat(data, rows.len(), times)
    }

    /// Number of realizations (rows).
    #[inline]
    pub fn realizations(&self) -> usize {
        self.realizations
    }

    /// Number of time steps (columns).
    #[inline]
    pub fn times(&self) -> usize {
        self.times
    }

    /// `(realizations, times)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.realizations, self.times)
    }

    /// Element at (realization, time).
    #[inline]
    pub fn get(&self, realization: usize, time: usize) -> f64 {
        debug_assert!(realization < self.realizations && time < self.times);
        self.data[realization * self.times + time]
    }

    /// Row-major backing buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copy the column at `time` into `out`, in realization order.
    pub fn column_into(&self, time: usize, out: &mut Vec<f64>) {
        out.clear();
        out.extend((0..self.realizations).map(|r| self.get(r, time)));
    }

    /// Copy the column at `time` into `out`, reordered by `order`.
    ///
    /// `order` must be a permutation of `0..realizations`.
    pub fn permuted_column_into(&self, time: usize, order: &[usize], out: &mut Vec<f64>) {
        debug_assert_eq!(order.len(), self.realizations);
        out.clear();
        out.extend(order.iter().map(|&r| self.get(r, time)));
    }
}

/// Named trajectories sharing one realizations × time shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectorySet {
    variables: BTreeMap<String, Trajectories>,
}

impl TrajectorySet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, trajectories)` pairs, checking every shape.
    pub fn from_variables<I, S>(variables: I) -> ReproResult<Self>
    where
        I: IntoIterator<Item = (S, Trajectories)>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for (name, traj) in variables {
            set.insert(name, traj)?;
        }
        Ok(set)
    }

    /// Add a variable, checking it against the shape of those already present.
    pub fn insert(&mut self, name: impl Into<String>, traj: Trajectories) -> ReproResult<()> {
        let name = name.into();
        validate_all_finite(traj.as_slice(), &name)?;
        if let Some(shape) = self.shape() {
            if traj.shape() != shape {
                return Err(ReproError::ShapeMismatch {
                    name,
                    expected: shape,
                    actual: traj.shape(),
                });
            }
        }
        self.variables.insert(name, traj);
        Ok(())
    }

    /// Shared `(realizations, times)`, or `None` when empty.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.variables.values().next().map(Trajectories::shape)
    }

    /// Number of realizations shared by every variable (0 when empty).
    pub fn realizations(&self) -> usize {
        self.shape().map_or(0, |(r, _)| r)
    }

    /// Number of time steps shared by every variable (0 when empty).
    pub fn times(&self) -> usize {
        self.shape().map_or(0, |(_, t)| t)
    }

    /// Look up one variable.
    pub fn get(&self, name: &str) -> ReproResult<&Trajectories> {
        self.variables
            .get(name)
            .ok_or_else(|| ReproError::VariableNotFound {
                name: name.to_string(),
            })
    }

    /// Variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Trajectories)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Variable names in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the set holds no variables.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Check the set is usable for resampling: non-empty, at least two
    /// realizations, at least one time step.
    pub fn validate(&self) -> ReproResult<()> {
        let (realizations, times) = self.shape().ok_or(ReproError::InsufficientData {
            required: 1,
            actual: 0,
        })?;
        if realizations < MIN_REALIZATIONS {
            return Err(ReproError::InsufficientData {
                required: MIN_REALIZATIONS,
                actual: realizations,
            });
        }
        if times == 0 {
            return Err(ReproError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(realizations: usize, times: usize) -> Trajectories {
        let data = (0..realizations * times).map(|i| i as f64).collect();
        Trajectories::from_flat(data, realizations, times).unwrap()
    }

    #[test]
    fn test_row_major_layout() {
        let traj = Trajectories::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(traj.shape(), (2, 3));
        assert_eq!(traj.get(1, 0), 4.0);

        let mut col = Vec::new();
        traj.column_into(2, &mut col);
        assert_eq!(col, vec![3.0, 6.0]);

        traj.permuted_column_into(0, &[1, 0], &mut col);
        assert_eq!(col, vec![4.0, 1.0]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Trajectories::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(ReproError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_flat_length_checked() {
        let result = Trajectories::from_flat(vec![0.0; 5], 2, 3);
        assert!(matches!(result, Err(ReproError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_set_rejects_mismatched_shapes() {
        let mut set = TrajectorySet::new();
        set.insert("x", ramp(10, 4)).unwrap();

        match set.insert("y", ramp(10, 3)) {
            Err(ReproError::ShapeMismatch {
                name,
                expected,
                actual,
            }) => {
                assert_eq!(name, "y");
                assert_eq!(expected, (10, 4));
                assert_eq!(actual, (10, 3));
            }
            other => panic!("Expected ShapeMismatch, got {:?}", other),
        }
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_set_rejects_non_finite() {
        let mut set = TrajectorySet::new();
        let traj = Trajectories::from_flat(vec![0.0, f64::NAN, 1.0, 2.0], 2, 2).unwrap();
        assert!(matches!(
            set.insert("x", traj),
            Err(ReproError::NumericalError { .. })
        ));
    }

    #[test]
    fn test_validate() {
        assert!(TrajectorySet::new().validate().is_err());

        let mut set = TrajectorySet::new();
        set.insert("x", ramp(1, 5)).unwrap();
        assert!(matches!(
            set.validate(),
            Err(ReproError::InsufficientData { required: 2, actual: 1 })
        ));

        let set = TrajectorySet::from_variables([("a", ramp(4, 2)), ("b", ramp(4, 2))]).unwrap();
        assert!(set.validate().is_ok());
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(set.realizations(), 4);
        assert_eq!(set.times(), 2);
    }
}
