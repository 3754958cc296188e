//! Job partitioning and the two replicate transports.
//!
//! A batch of `N` replicates is split across `W` workers round-robin, one
//! replicate at a time, so job sizes differ by at most one. Each job runs a
//! [`ResamplingWorker`] with its own generator. Both transports share the
//! partition and the per-job seed derivation, so for a fixed base seed they
//! produce bit-identical error samples; the choice only affects how data
//! moves:
//!
//! - [`SharedTransport`] copies the trajectories into a [`SharedArena`] once
//!   per run and lets each job write straight into its own slice of the
//!   arena's output segment.
//! - [`CopyTransport`] hands every job its own copy of the trajectories and
//!   concatenates the returned batches in job order.

use crate::errors::{ReproError, ReproResult};
use crate::pool::WorkerPool;
use crate::secure_rng::{job_seed, SecureRng};
use crate::shared_arena::SharedArena;
use crate::trajectories::TrajectorySet;
use crate::worker::ResamplingWorker;

/// One unit of work: `replicates` draws written at `offset` of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    /// Position in the plan, also used to derive the job's seed
    pub index: usize,
    /// Number of replicates to draw
    pub replicates: usize,
    /// First output slot of this job within the batch
    pub offset: usize,
}

/// Balanced, gap-free split of one batch across workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    jobs: Vec<Job>,
    requested: usize,
}

impl JobPlan {
    /// Partition `replicates` across at most `workers` jobs.
    ///
    /// Fails on zero input, or if the assigned counts do not add up to
    /// `replicates`.
    pub fn partition(replicates: usize, workers: usize) -> ReproResult<Self> {
        if replicates == 0 {
            return Err(ReproError::InvalidParameter {
                parameter: "incr_sampling".to_string(),
                value: 0.0,
                constraint: "must be at least 1".to_string(),
            });
        }
        if workers == 0 {
            return Err(ReproError::InvalidParameter {
                parameter: "num_workers".to_string(),
                value: 0.0,
                constraint: "must be at least 1".to_string(),
            });
        }

        let slots = workers.min(replicates);
        let mut counts = vec![0usize; slots];
        let mut left = replicates;
        while left > 0 {
            for count in counts.iter_mut() {
                if left == 0 {
                    break;
                }
                *count += 1;
                left -= 1;
            }
        }

        let mut offset = 0;
        let jobs: Vec<Job> = counts
            .into_iter()
            .filter(|&n| n > 0)
            .enumerate()
            .map(|(index, replicates)| {
                let job = Job {
                    index,
                    replicates,
                    offset,
                };
                offset += replicates;
                job
            })
            .collect();

        let plan = Self {
            jobs,
            requested: replicates,
        };
        plan.verify()?;
        Ok(plan)
    }

    fn verify(&self) -> ReproResult<()> {
        let scheduled = self.total();
        if scheduled != self.requested {
            return Err(ReproError::ScheduleMismatch {
                scheduled,
                requested: self.requested,
            });
        }
        Ok(())
    }

    /// Jobs in dispatch order.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Effective worker count (non-empty jobs).
    pub fn workers(&self) -> usize {
        self.jobs.len()
    }

    /// Replicates covered by the plan.
    pub fn total(&self) -> usize {
        self.jobs.iter().map(|j| j.replicates).sum()
    }
}

/// Anything that can produce one batch of iteration errors for a plan.
///
/// `batch` numbers successive calls within a run and feeds seed derivation.
pub trait ReplicateSource {
    /// Draw `plan.total()` replicates, returned in job order.
    fn run_batch(&mut self, plan: &JobPlan, batch: usize) -> ReproResult<Vec<f64>>;

    /// Free any resources held for the run.
    fn release(&mut self) -> ReproResult<()> {
        Ok(())
    }
}

/// Parameters every job needs besides its data.
#[derive(Debug, Clone, Copy)]
struct JobSettings {
    num_steps: usize,
    num_periods: usize,
    seed: Option<u64>,
}

impl JobSettings {
    fn run(&self, data: &TrajectorySet, job: &Job, batch: usize, out: &mut [f64]) -> ReproResult<()> {
        debug_assert_eq!(out.len(), job.replicates);
        let mut rng = SecureRng::from_optional_seed(job_seed(self.seed, batch, job.index));
        ResamplingWorker::new(data, self.num_steps, self.num_periods).run(&mut rng, out)
    }
}

/// Transport that shares one arena across every batch of a run.
#[derive(Debug)]
pub struct SharedTransport {
    arena: SharedArena,
    pool: WorkerPool,
    settings: JobSettings,
}

impl SharedTransport {
    /// Copy `set` into an arena with an output segment of `batch_len` slots.
    pub fn new(
        set: &TrajectorySet,
        batch_len: usize,
        pool: WorkerPool,
        num_steps: usize,
        num_periods: usize,
        seed: Option<u64>,
    ) -> ReproResult<Self> {
        Ok(Self {
            arena: SharedArena::create(set, batch_len)?,
            pool,
            settings: JobSettings {
                num_steps,
                num_periods,
                seed,
            },
        })
    }

    /// Whether the arena has been released.
    pub fn is_released(&self) -> bool {
        self.arena.is_released()
    }
}

impl ReplicateSource for SharedTransport {
    fn run_batch(&mut self, plan: &JobPlan, batch: usize) -> ReproResult<Vec<f64>> {
        plan.verify()?;
        let settings = self.settings;
        let (inputs, slices) = self.arena.carve(plan)?;

        self.pool
            .map(slices, |(job, out)| settings.run(inputs, &job, batch, out))
            .into_iter()
            .collect::<ReproResult<Vec<()>>>()?;

        Ok(self.arena.output()?.to_vec())
    }

    fn release(&mut self) -> ReproResult<()> {
        self.arena.release()
    }
}

/// Transport that gives each job its own copy of the trajectories.
#[derive(Debug)]
pub struct CopyTransport {
    set: TrajectorySet,
    pool: WorkerPool,
    settings: JobSettings,
}

impl CopyTransport {
    /// Transport over `set`.
    pub fn new(
        set: TrajectorySet,
        pool: WorkerPool,
        num_steps: usize,
        num_periods: usize,
        seed: Option<u64>,
    ) -> Self {
        Self {
            set,
            pool,
            settings: JobSettings {
                num_steps,
                num_periods,
                seed,
            },
        }
    }
}

impl ReplicateSource for CopyTransport {
    fn run_batch(&mut self, plan: &JobPlan, batch: usize) -> ReproResult<Vec<f64>> {
        plan.verify()?;
        let settings = self.settings;
        let tasks: Vec<(Job, TrajectorySet)> = plan
            .jobs()
            .iter()
            .map(|job| (*job, self.set.clone()))
            .collect();

        let batches = self.pool.map(tasks, |(job, data)| {
            let mut out = vec![0.0; job.replicates];
            settings.run(&data, &job, batch, &mut out)?;
            Ok(out)
        });

        let mut merged = Vec::with_capacity(plan.total());
        for result in batches {
            merged.extend(result?);
        }
        Ok(merged)
    }
}
