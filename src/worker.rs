//! Resampling worker.
//!
//! A worker draws replicates from a read-only trajectory block. Each
//! replicate shuffles the realization order, applies that order to every
//! variable so the two halves stay paired across variables, and records the
//! largest half-split ECF error over all variables and time indices.

use crate::ecf::ecf_err;
use crate::errors::ReproResult;
use crate::secure_rng::SecureRng;
use crate::trajectories::TrajectorySet;

/// Replicate generator over one trajectory block.
#[derive(Debug)]
pub struct ResamplingWorker<'a> {
    set: &'a TrajectorySet,
    num_steps: usize,
    num_periods: usize,
    order: Vec<usize>,
    column: Vec<f64>,
}

impl<'a> ResamplingWorker<'a> {
    /// Worker reading from `set`, starting from the identity order.
    pub fn new(set: &'a TrajectorySet, num_steps: usize, num_periods: usize) -> Self {
        let realizations = set.realizations();
        Self {
            set,
            num_steps,
            num_periods,
            order: (0..realizations).collect(),
            column: Vec::with_capacity(realizations),
        }
    }

    /// Current realization order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Worst-case half-split error over every variable and time index under
    /// the current realization order.
    pub fn iteration_error(&mut self) -> ReproResult<f64> {
        let mut worst = 0.0f64;
        for (_, traj) in self.set.iter() {
            for time in 0..traj.times() {
                traj.permuted_column_into(time, &self.order, &mut self.column);
                let (_, err) = ecf_err(&self.column, self.num_steps, self.num_periods)?;
                worst = worst.max(err);
            }
        }
        Ok(worst)
    }

    /// Fill `out` with one iteration error per replicate, in order.
    pub fn run(&mut self, rng: &mut SecureRng, out: &mut [f64]) -> ReproResult<()> {
        for slot in out.iter_mut() {
            rng.shuffle(&mut self.order);
            *slot = self.iteration_error()?;
        }
        Ok(())
    }
}
