//! Adaptive convergence loop.
//!
//! The controller is a four-state machine:
//!
//! ```text
//! Init ──first batch──▶ Sampling ──relative change < err_thresh──▶ Converged
//!   │                     │  ▲
//!   │ zero average        │  └── otherwise, below max_sampling
//!   ▼                     └── max_sampling reached ──▶ Capped
//! Converged
//! ```
//!
//! Every batch is a barrier: the controller dispatches it, waits for all jobs,
//! and only then appends to the error sample. The source is released on every
//! exit path; a failed release after a successful run is logged and the
//! outcome still returned.

use crate::config::{validate_stopping_rule, SamplingConfig, Transport};
use crate::errors::{validate_count, ReproError, ReproResult};
use crate::math_utils::mean;
use crate::pool::WorkerPool;
use crate::scheduler::{CopyTransport, JobPlan, ReplicateSource, SharedTransport};
use crate::trajectories::TrajectorySet;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConvergenceState {
    /// No batch drawn yet
    Init,
    /// Drawing batches until a stopping rule fires
    Sampling,
    /// Relative change fell below the threshold (or the average is zero)
    Converged,
    /// `max_sampling` reached before convergence
    Capped,
}

impl ConvergenceState {
    /// Whether the loop has stopped.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Capped)
    }
}

/// Result of a convergence run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConvergenceOutcome {
    /// Every iteration error drawn, in batch order
    pub errors: Vec<f64>,
    /// Batches drawn after the initial one
    pub iterations: usize,
    /// Last relative change of the running average
    pub relative_error: f64,
    /// Terminal state
    pub state: ConvergenceState,
}

impl ConvergenceOutcome {
    /// Whether the threshold was met.
    pub fn converged(&self) -> bool {
        self.state == ConvergenceState::Converged
    }

    /// Mean of the error sample.
    pub fn mean_error(&self) -> f64 {
        mean(&self.errors)
    }
}

/// Drives batches through a [`ReplicateSource`] until a stopping rule fires.
#[derive(Debug, Clone)]
pub struct ConvergenceController {
    incr_sampling: usize,
    err_thresh: f64,
    max_sampling: Option<usize>,
    workers: usize,
}

struct RunState {
    errors: Vec<f64>,
    average: f64,
    iterations: usize,
    relative_error: f64,
    batch: usize,
}

impl ConvergenceController {
    /// Controller drawing `incr_sampling` replicates per batch over `workers` jobs.
    pub fn new(
        incr_sampling: usize,
        err_thresh: f64,
        max_sampling: Option<usize>,
        workers: usize,
    ) -> ReproResult<Self> {
        validate_count(incr_sampling, 1, "incr_sampling")?;
        validate_count(workers, 1, "num_workers")?;
        validate_stopping_rule(err_thresh, max_sampling)?;
        Ok(Self {
            incr_sampling,
            err_thresh,
            max_sampling,
            workers,
        })
    }

    /// Controller from a validated configuration.
    pub fn from_config(config: &SamplingConfig) -> ReproResult<Self> {
        config.validate()?;
        Self::new(
            config.incr_sampling,
            config.err_thresh,
            config.max_sampling,
            config.workers(),
        )
    }

    /// Run to a terminal state, then release `source`.
    pub fn run<S: ReplicateSource + ?Sized>(&self, source: &mut S) -> ReproResult<ConvergenceOutcome> {
        let outcome = self.drive(source);
        if let Err(e) = source.release() {
            log::error!("Failed to release replicate source: {}", e);
        }
        outcome
    }

    fn drive<S: ReplicateSource + ?Sized>(&self, source: &mut S) -> ReproResult<ConvergenceOutcome> {
        let plan = JobPlan::partition(self.incr_sampling, self.workers)?;
        log::debug!(
            "Sampling in batches of {} over {} jobs",
            plan.total(),
            plan.workers()
        );

        let mut run = RunState {
            errors: Vec::new(),
            average: 0.0,
            iterations: 0,
            relative_error: f64::INFINITY,
            batch: 0,
        };
        let mut state = ConvergenceState::Init;
        while !state.is_terminal() {
            state = self.step(state, source, &plan, &mut run)?;
        }

        match state {
            ConvergenceState::Converged => log::info!(
                "Converged after {} iterations: {} samples, relative change {:.3e}",
                run.iterations,
                run.errors.len(),
                run.relative_error
            ),
            _ => log::warn!(
                "Stopped at max_sampling ({} samples) without convergence: relative change {:.3e} >= {:.3e}",
                run.errors.len(),
                run.relative_error,
                self.err_thresh
            ),
        }

        Ok(ConvergenceOutcome {
            errors: run.errors,
            iterations: run.iterations,
            relative_error: run.relative_error,
            state,
        })
    }

    fn draw<S: ReplicateSource + ?Sized>(
        &self,
        source: &mut S,
        plan: &JobPlan,
        run: &mut RunState,
    ) -> ReproResult<f64> {
        let batch = source.run_batch(plan, run.batch)?;
        if batch.len() != plan.total() {
            return Err(ReproError::ScheduleMismatch {
                scheduled: batch.len(),
                requested: plan.total(),
            });
        }
        run.batch += 1;
        run.errors.extend(batch);
        Ok(mean(&run.errors))
    }

    fn step<S: ReplicateSource + ?Sized>(
        &self,
        state: ConvergenceState,
        source: &mut S,
        plan: &JobPlan,
        run: &mut RunState,
    ) -> ReproResult<ConvergenceState> {
        match state {
            ConvergenceState::Init => {
                run.average = self.draw(source, plan, run)?;
                if run.average == 0.0 {
                    run.relative_error = 0.0;
                    return Ok(ConvergenceState::Converged);
                }
                Ok(ConvergenceState::Sampling)
            }
            ConvergenceState::Sampling => {
                let next = self.draw(source, plan, run)?;
                run.iterations += 1;
                if next == 0.0 {
                    run.average = next;
                    run.relative_error = 0.0;
                    return Ok(ConvergenceState::Converged);
                }

                let relative = (next - run.average).abs() / run.average;
                if !relative.is_finite() {
                    return Err(ReproError::NumericalError {
                        reason: format!(
                            "relative change of running average is {} (average {} -> {})",
                            relative, run.average, next
                        ),
                    });
                }
                run.relative_error = relative;
                run.average = next;
                log::debug!(
                    "Batch {}: {} samples, average {:.6e}, relative change {:.3e}",
                    run.batch,
                    run.errors.len(),
                    next,
                    relative
                );

                if relative < self.err_thresh {
                    Ok(ConvergenceState::Converged)
                } else if self
                    .max_sampling
                    .map_or(false, |max| run.errors.len() >= max)
                {
                    Ok(ConvergenceState::Capped)
                } else {
                    Ok(ConvergenceState::Sampling)
                }
            }
            terminal => Ok(terminal),
        }
    }
}

/// Test a trajectory sample for reproducibility.
///
/// Draws resampling replicates in batches of `config.incr_sampling` over the
/// transport selected by `config.transport` until the running average of the
/// iteration errors settles or `config.max_sampling` is reached.
pub fn test_reproducibility(
    set: &TrajectorySet,
    config: &SamplingConfig,
) -> ReproResult<ConvergenceOutcome> {
    set.validate()?;
    let controller = ConvergenceController::from_config(config)?;
    let pool = WorkerPool::new(config.workers())?;

    log::info!(
        "Testing reproducibility of {} variables ({:?}) with {:?} transport",
        set.len(),
        set.shape(),
        config.transport
    );

    match config.transport {
        Transport::Shared => {
            let mut transport = SharedTransport::new(
                set,
                config.incr_sampling,
                pool,
                config.num_steps,
                config.num_var_periods,
                config.seed,
            )?;
            controller.run(&mut transport)
        }
        Transport::Copy => {
            let mut transport = CopyTransport::new(
                set.clone(),
                pool,
                config.num_steps,
                config.num_var_periods,
                config.seed,
            );
            controller.run(&mut transport)
        }
    }
}
