//! # Sampling Configuration
//!
//! Numeric knobs for the reproducibility test: frequency-grid resolution,
//! batch size, stopping rule, worker count and transport selection.

use crate::errors::{validate_count, validate_parameter, ReproError, ReproResult};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of transform-variable evaluations per ECF.
pub const DEF_EVAL_NUM: usize = 100;
/// Default number of characteristic-function periods resolved per sample spread.
pub const DEF_NUM_VAR_PERS: usize = 1;
/// Default number of replicates per batch.
pub const DEF_INCR_SAMPLING: usize = 100;
/// Default convergence threshold on the relative change of the running average.
pub const DEF_ERR_THRESH: f64 = 1e-4;

/// How trajectory data reaches the workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Transport {
    /// Inputs copied once into a shared arena; workers write results in place.
    Shared,
    /// Each job receives its own copy and returns its results by value.
    #[default]
    Copy,
}

/// Configuration for a reproducibility test run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SamplingConfig {
    /// Number of transform-variable evaluations
    pub num_steps: usize,
    /// Number of parameterization periods of the ECF
    pub num_var_periods: usize,
    /// Replicates drawn per batch
    pub incr_sampling: usize,
    /// Convergence criterion on the relative change of the running average
    pub err_thresh: f64,
    /// Maximum error-sample size; `None` samples until convergence
    pub max_sampling: Option<usize>,
    /// Worker count; `None` uses the available parallelism
    pub num_workers: Option<usize>,
    /// Data transport between controller and workers
    pub transport: Transport,
    /// Base seed for reproducible runs; `None` seeds every job from OS entropy
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            num_steps: DEF_EVAL_NUM,
            num_var_periods: DEF_NUM_VAR_PERS,
            incr_sampling: DEF_INCR_SAMPLING,
            err_thresh: DEF_ERR_THRESH,
            max_sampling: None,
            num_workers: None,
            transport: Transport::Copy,
            seed: None,
        }
    }
}

impl SamplingConfig {
    /// Configuration using the shared-arena transport.
    pub fn shared() -> Self {
        Self {
            transport: Transport::Shared,
            ..Self::default()
        }
    }

    /// Fixed seed, for reproducible runs and tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Resolved worker count.
    pub fn workers(&self) -> usize {
        self.num_workers.unwrap_or_else(default_num_workers)
    }

    /// Check every field for a usable value.
    pub fn validate(&self) -> ReproResult<()> {
        validate_count(self.num_steps, 1, "num_steps")?;
        validate_count(self.num_var_periods, 1, "num_var_periods")?;
        validate_count(self.incr_sampling, 1, "incr_sampling")?;
        validate_stopping_rule(self.err_thresh, self.max_sampling)?;
        if let Some(workers) = self.num_workers {
            validate_count(workers, 1, "num_workers")?;
        }
        Ok(())
    }
}

/// Check that a run with these settings terminates.
///
/// A zero threshold can never be met, so it needs a `max_sampling` cap.
pub fn validate_stopping_rule(err_thresh: f64, max_sampling: Option<usize>) -> ReproResult<()> {
    validate_parameter(err_thresh, 0.0, f64::MAX, "err_thresh")?;
    if err_thresh == 0.0 && max_sampling.is_none() {
        return Err(ReproError::InvalidParameter {
            parameter: "err_thresh".to_string(),
            value: err_thresh,
            constraint: "must be > 0 when max_sampling is unset".to_string(),
        });
    }
    if let Some(max) = max_sampling {
        validate_count(max, 1, "max_sampling")?;
    }
    Ok(())
}

/// Number of workers used when none is configured.
pub fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
