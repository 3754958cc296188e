//! Error types and validation functions for reproducibility testing.
//!
//! Every fallible operation in the crate returns [`ReproResult`]. Configuration
//! problems (bad shapes, bad schedules, too little data) surface immediately;
//! degenerate but valid inputs such as zero-variance samples are handled
//! locally by the numeric routines and never reach this module.

use thiserror::Error;

/// Error types for ECF reproducibility operations.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ReproError {
    /// Insufficient data for the requested operation.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Invalid parameter value.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Two inputs that must agree in shape do not.
    #[error("Shape mismatch for {name}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Name of the offending input
        name: String,
        /// Expected (rows, cols)
        expected: (usize, usize),
        /// Actual (rows, cols)
        actual: (usize, usize),
    },

    /// The job partition does not cover the requested replicates.
    #[error("Scheduled {scheduled} jobs, though {requested} jobs were requested")]
    ScheduleMismatch {
        /// Replicates assigned across all jobs
        scheduled: usize,
        /// Replicates requested
        requested: usize,
    },

    /// Numerical computation error.
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for numerical failure
        reason: String,
    },

    /// Variable name not present in a trajectory set.
    #[error("Variable not found: {name}")]
    VariableNotFound {
        /// Name of the variable that was not found
        name: String,
    },

    /// Worker pool could not be built or accessed.
    #[error("Concurrent access failed: {resource}")]
    ConcurrencyError {
        /// Resource that couldn't be accessed
        resource: String,
    },

    /// A shared buffer could not be released.
    #[error("Failed to release {resource}: {reason}")]
    ResourceRelease {
        /// Buffer that failed to release
        resource: String,
        /// Reason for the failure
        reason: String,
    },
}

/// Result type for reproducibility operations.
pub type ReproResult<T> = Result<T, ReproError>;

/// Validates that data has sufficient length.
///
/// # Example
/// ```rust
/// use ecf_repro::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2).is_ok());
/// assert!(validate_data_length(&data, 5).is_err());
/// ```
pub fn validate_data_length(data: &[f64], min_required: usize) -> ReproResult<()> {
    if data.len() < min_required {
        Err(ReproError::InsufficientData {
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates that a parameter is within `[min, max]`.
///
/// # Example
/// ```rust
/// use ecf_repro::errors::validate_parameter;
///
/// assert!(validate_parameter(1e-4, 0.0, 1.0, "err_thresh").is_ok());
/// assert!(validate_parameter(-1.0, 0.0, 1.0, "err_thresh").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> ReproResult<()> {
    if value.is_nan() {
        return Err(ReproError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if min.is_nan() || max.is_nan() || min > max {
        return Err(ReproError::NumericalError {
            reason: format!(
                "Invalid bounds for parameter {}: min={}, max={}",
                name, min, max
            ),
        });
    }

    if value < min || value > max {
        Err(ReproError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that a count is at least `min`.
pub fn validate_count(value: usize, min: usize, name: &str) -> ReproResult<()> {
    if value < min {
        Err(ReproError::InvalidParameter {
            parameter: name.to_string(),
            value: value as f64,
            constraint: format!("must be at least {}", min),
        })
    } else {
        Ok(())
    }
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first non-finite value.
///
/// # Example
/// ```rust
/// use ecf_repro::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0], "x").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN], "x").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> ReproResult<()> {
    if let Some((i, value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(ReproError::NumericalError {
            reason: format!(
                "{} contains non-finite value at index {}: {}",
                name, i, value
            ),
        });
    }

    Ok(())
}
