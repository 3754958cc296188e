//! Worker pool used for every fan-out in the crate.
//!
//! With the `parallel` feature (default) jobs run on a `rayon` thread pool:
//! either one registered process-wide with [`register_pool`], or a fresh pool
//! sized to the requested worker count. Without it jobs run sequentially on
//! the calling thread. Job results are always returned in submission order,
//! so the two modes produce identical numbers for identical seeds.

use crate::errors::{validate_count, ReproResult};

#[cfg(feature = "parallel")]
use crate::errors::ReproError;
#[cfg(feature = "parallel")]
use once_cell::sync::Lazy;
#[cfg(feature = "parallel")]
use std::sync::{Arc, RwLock};

/// Pool registered for reuse across calls (None means build one per call)
#[cfg(feature = "parallel")]
static REGISTERED_POOL: Lazy<RwLock<Option<Arc<rayon::ThreadPool>>>> =
    Lazy::new(|| RwLock::new(None));

/// Register a pool that every subsequent fan-out will run on.
#[cfg(feature = "parallel")]
pub fn register_pool(pool: Arc<rayon::ThreadPool>) {
    match REGISTERED_POOL.write() {
        Ok(mut slot) => *slot = Some(pool),
        Err(poisoned) => {
            log::warn!("Registered pool lock was poisoned, overwriting");
            *poisoned.into_inner() = Some(pool);
        }
    }
}

/// Drop the registered pool; later fan-outs build their own.
#[cfg(feature = "parallel")]
pub fn clear_registered_pool() {
    if let Ok(mut slot) = REGISTERED_POOL.write() {
        *slot = None;
    }
}

#[cfg(feature = "parallel")]
fn registered_pool() -> Option<Arc<rayon::ThreadPool>> {
    REGISTERED_POOL.read().ok().and_then(|slot| slot.clone())
}

/// Fixed-size set of workers executing one batch at a time.
pub struct WorkerPool {
    #[cfg(feature = "parallel")]
    pool: Arc<rayon::ThreadPool>,
    workers: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

impl WorkerPool {
    /// Pool for `num_workers` concurrent jobs.
    pub fn new(num_workers: usize) -> ReproResult<Self> {
        validate_count(num_workers, 1, "num_workers")?;

        #[cfg(feature = "parallel")]
        {
            let pool = match registered_pool() {
                Some(pool) => {
                    log::debug!(
                        "Using registered pool with {} threads",
                        pool.current_num_threads()
                    );
                    pool
                }
                None => Arc::new(
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(num_workers)
                        .thread_name(|i| format!("ecf-worker-{}", i))
                        .build()
                        .map_err(|e| ReproError::ConcurrencyError {
                            resource: format!("worker pool ({})", e),
                        })?,
                ),
            };
            Ok(Self {
                pool,
                workers: num_workers,
            })
        }

        #[cfg(not(feature = "parallel"))]
        {
            Ok(Self {
                workers: num_workers,
            })
        }
    }

    /// Requested worker count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f` on every item and return the results in item order.
    ///
    /// Blocks until every job has finished.
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.pool.install(|| items.into_par_iter().map(f).collect())
        }

        #[cfg(not(feature = "parallel"))]
        {
            items.into_iter().map(f).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_preserves_order() {
        let pool = WorkerPool::new(4).unwrap();
        let out = pool.map((0..100).collect(), |i: usize| i * i);
        assert_eq!(out, (0..100).map(|i| i * i).collect::<Vec<_>>());
        assert_eq!(pool.workers(), 4);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_registered_pool_is_used() {
        let shared = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(2)
                .build()
                .unwrap(),
        );
        register_pool(Arc::clone(&shared));
        let pool = WorkerPool::new(8).unwrap();
        assert!(Arc::ptr_eq(&pool.pool, &shared));
        assert_eq!(pool.map(vec![1, 2, 3], |i: i32| i + 1), vec![2, 3, 4]);
        clear_registered_pool();
        assert!(registered_pool().is_none());
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(WorkerPool::new(0).is_err());
    }

    #[test]
    fn test_mutable_slices_fan_out() {
        let pool = WorkerPool::new(2).unwrap();
        let mut buf = vec![0.0; 6];
        let (a, b) = buf.split_at_mut(3);
        pool.map(vec![(a, 1.0), (b, 2.0)], |(slice, v): (&mut [f64], f64)| {
            slice.fill(v)
        });
        assert_eq!(buf, vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
    }
}
