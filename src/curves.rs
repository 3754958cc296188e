//! Full ECF curves over time.
//!
//! Each time index is an independent job: the job takes the realization
//! column of every variable at that index, sizes the frequency range from the
//! column's own spread and evaluates the ECF on it. Batching all variables
//! into one job per time index keeps dispatch overhead proportional to the
//! number of time steps rather than variables × time steps.

use crate::config::{default_num_workers, DEF_EVAL_NUM, DEF_NUM_VAR_PERS};
use crate::ecf::{ecf, eval_info_times, final_frequency, EcfCurve};
use crate::errors::{validate_count, ReproResult};
use crate::pool::WorkerPool;
use crate::trajectories::TrajectorySet;
use std::collections::BTreeMap;

/// ECF curves and final transform-variable values by variable and time index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EcfCurves {
    /// One curve per time index, by variable name
    pub curves: BTreeMap<String, Vec<EcfCurve>>,
    /// Final transform-variable value per time index, by variable name
    pub eval_fin: BTreeMap<String, Vec<f64>>,
}

impl EcfCurves {
    /// Curve of `name` at time index `time`.
    pub fn curve(&self, name: &str, time: usize) -> Option<&EcfCurve> {
        self.curves.get(name).and_then(|c| c.get(time))
    }

    /// Frequency grid on which `curve(name, time)` was evaluated.
    pub fn grid(&self, name: &str, time: usize, num_steps: usize) -> Option<Vec<f64>> {
        self.eval_fin
            .get(name)
            .and_then(|f| f.get(time))
            .map(|&fin| eval_info_times(num_steps, fin))
    }
}

struct TimeSliceResult {
    time: usize,
    per_variable: Vec<(String, EcfCurve, f64)>,
}

fn ecfs_at_time(
    set: &TrajectorySet,
    time: usize,
    num_steps: usize,
    num_periods: usize,
) -> TimeSliceResult {
    let mut column = Vec::with_capacity(set.realizations());
    let per_variable = set
        .iter()
        .map(|(name, traj)| {
            traj.column_into(time, &mut column);
            let fin = final_frequency(&column, num_periods);
            let curve = ecf(&column, &eval_info_times(num_steps, fin));
            (name.to_string(), curve, fin)
        })
        .collect();
    TimeSliceResult { time, per_variable }
}

/// Empirical characteristic functions of every variable at every time index.
///
/// `None` arguments fall back to [`DEF_EVAL_NUM`], [`DEF_NUM_VAR_PERS`] and
/// the available parallelism.
pub fn find_ecfs(
    set: &TrajectorySet,
    num_steps: Option<usize>,
    num_periods: Option<usize>,
    num_workers: Option<usize>,
) -> ReproResult<EcfCurves> {
    set.validate()?;
    let num_steps = num_steps.unwrap_or(DEF_EVAL_NUM);
    let num_periods = num_periods.unwrap_or(DEF_NUM_VAR_PERS);
    validate_count(num_steps, 1, "num_steps")?;
    validate_count(num_periods, 1, "num_var_periods")?;

    let times = set.times();
    let pool = WorkerPool::new(num_workers.unwrap_or_else(default_num_workers))?;
    log::debug!(
        "Computing ECF curves for {} variables over {} time steps on {} workers",
        set.len(),
        times,
        pool.workers()
    );

    let slices = pool.map((0..times).collect(), |time: usize| {
        ecfs_at_time(set, time, num_steps, num_periods)
    });

    let mut result = EcfCurves::default();
    for name in set.names() {
        result
            .curves
            .insert(name.to_string(), vec![EcfCurve::new(); times]);
        result.eval_fin.insert(name.to_string(), vec![0.0; times]);
    }
    for slice in slices {
        for (name, curve, fin) in slice.per_variable {
            if let Some(curves) = result.curves.get_mut(&name) {
                curves[slice.time] = curve;
            }
            if let Some(fins) = result.eval_fin.get_mut(&name) {
                fins[slice.time] = fin;
            }
        }
    }

    Ok(result)
}
