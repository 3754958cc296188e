//! Single-owner arena backing the shared transport.
//!
//! Lifecycle:
//!
//! 1. [`SharedArena::create`] copies every input variable into the arena once
//!    and allocates one output segment of `segment_len` slots.
//! 2. For each batch, [`SharedArena::carve`] hands out read-only inputs plus
//!    one disjoint `&mut` output slice per job. Disjointness is enforced by
//!    `split_at_mut`, so two jobs can never alias the same slot.
//! 3. After the batch barrier the owner reads [`SharedArena::output`].
//! 4. [`SharedArena::release`] frees inputs and output exactly once. If the
//!    owner exits early without releasing, `Drop` releases and logs it.

use crate::errors::{ReproError, ReproResult};
use crate::scheduler::{Job, JobPlan};
use crate::trajectories::TrajectorySet;

/// Input block and output segment shared by every job of a run.
#[derive(Debug)]
pub struct SharedArena {
    inputs: Option<TrajectorySet>,
    output: Option<Vec<f64>>,
    segment_len: usize,
}

impl SharedArena {
    /// Copy `set` into a new arena with an output segment of `segment_len`.
    pub fn create(set: &TrajectorySet, segment_len: usize) -> ReproResult<Self> {
        if segment_len == 0 {
            return Err(ReproError::InvalidParameter {
                parameter: "segment_len".to_string(),
                value: 0.0,
                constraint: "must be > 0".to_string(),
            });
        }
        log::debug!(
            "Creating shared arena: {} variables of {:?}, output segment of {}",
            set.len(),
            set.shape(),
            segment_len
        );
        Ok(Self {
            inputs: Some(set.clone()),
            output: Some(vec![0.0; segment_len]),
            segment_len,
        })
    }

    /// Output segment length.
    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Whether [`release`](Self::release) has run.
    pub fn is_released(&self) -> bool {
        self.inputs.is_none() && self.output.is_none()
    }

    fn released_error(what: &str) -> ReproError {
        ReproError::ResourceRelease {
            resource: "shared arena".to_string(),
            reason: format!("{} accessed after release", what),
        }
    }

    /// Read-only inputs.
    pub fn inputs(&self) -> ReproResult<&TrajectorySet> {
        self.inputs
            .as_ref()
            .ok_or_else(|| Self::released_error("inputs"))
    }

    /// Split the output segment into one slice per job of `plan`.
    ///
    /// Slices are handed out in job order and cover the whole segment.
    pub fn carve(&mut self, plan: &JobPlan) -> ReproResult<(&TrajectorySet, Vec<(Job, &mut [f64])>)> {
        if plan.total() != self.segment_len {
            return Err(ReproError::ScheduleMismatch {
                scheduled: plan.total(),
                requested: self.segment_len,
            });
        }
        let inputs = self
            .inputs
            .as_ref()
            .ok_or_else(|| Self::released_error("inputs"))?;
        let mut rest: &mut [f64] = self
            .output
            .as_mut()
            .ok_or_else(|| Self::released_error("output"))?;

        let mut slices = Vec::with_capacity(plan.jobs().len());
        for job in plan.jobs() {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(job.replicates);
            slices.push((*job, head));
            rest = tail;
        }
        debug_assert!(rest.is_empty());
        Ok((inputs, slices))
    }

    /// Output segment as written by the last batch.
    pub fn output(&self) -> ReproResult<&[f64]> {
        self.output
            .as_deref()
            .ok_or_else(|| Self::released_error("output"))
    }

    /// Free inputs and output. Fails if already released.
    pub fn release(&mut self) -> ReproResult<()> {
        if self.is_released() {
            return Err(ReproError::ResourceRelease {
                resource: "shared arena".to_string(),
                reason: "already released".to_string(),
            });
        }
        self.inputs = None;
        self.output = None;
        log::debug!("Released shared arena ({} output slots)", self.segment_len);
        Ok(())
    }
}

impl Drop for SharedArena {
    fn drop(&mut self) {
        if !self.is_released() {
            log::warn!("Shared arena dropped without explicit release, releasing now");
            self.inputs = None;
            self.output = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectories::Trajectories;

    fn small_set() -> TrajectorySet {
        let mut set = TrajectorySet::new();
        set.insert(
            "x",
            Trajectories::from_flat((0..20).map(|i| i as f64).collect(), 10, 2).unwrap(),
        )
        .unwrap();
        set
    }

    #[test]
    fn test_carve_disjoint_slices() {
        let set = small_set();
        let mut arena = SharedArena::create(&set, 7).unwrap();
        let plan = JobPlan::partition(7, 3).unwrap();

        {
            let (inputs, slices) = arena.carve(&plan).unwrap();
            assert_eq!(inputs, &set);
            let lens: Vec<usize> = slices.iter().map(|(_, s)| s.len()).collect();
            assert_eq!(lens, vec![3, 2, 2]);
            for (job, slice) in slices {
                slice.fill(job.index as f64);
            }
        }

        assert_eq!(
            arena.output().unwrap(),
            &[0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0]
        );
    }

    #[test]
    fn test_carve_rejects_wrong_plan() {
        let mut arena = SharedArena::create(&small_set(), 5).unwrap();
        let plan = JobPlan::partition(4, 2).unwrap();
        assert!(matches!(
            arena.carve(&plan),
            Err(ReproError::ScheduleMismatch {
                scheduled: 4,
                requested: 5
            })
        ));
    }

    #[test]
    fn test_release_exactly_once() {
        let mut arena = SharedArena::create(&small_set(), 3).unwrap();
        assert!(!arena.is_released());
        arena.release().unwrap();
        assert!(arena.is_released());
        assert!(matches!(
            arena.release(),
            Err(ReproError::ResourceRelease { .. })
        ));
        assert!(arena.output().is_err());
        assert!(arena.inputs().is_err());
    }

    #[test]
    fn test_zero_segment_rejected() {
        assert!(SharedArena::create(&small_set(), 0).is_err());
    }
}
