//! # ECF Reproducibility
//!
//! Statistical reproducibility testing for sampled stochastic simulation
//! trajectories.
//!
//! A sample of `R` realizations observed at `T` time indices is judged
//! reproducible when splitting it into two halves yields empirical
//! characteristic functions (ECFs) that agree. The crate measures that
//! agreement repeatedly under random reshuffles of the realizations until the
//! distribution of the error settles, and scores errors against another
//! sample as p-values.
//!
//! ## Key Features
//!
//! - **ECF evaluation**: variance-scaled frequency grids and sup-norm curve distance
//! - **Resampling**: paired shuffles across variables, one worst-case error per replicate
//! - **Adaptive convergence**: batches drawn until the running mean changes by less than a threshold
//! - **Two transports**: a shared arena with disjoint output slices, or per-job copies, with bit-identical results for a fixed seed
//! - **P-values**: moment-based tail bound for an observed error
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ecf_repro::{pval, test_reproducibility, SamplingConfig, Trajectories, TrajectorySet};
//! use rand::prelude::*;
//! use rand_distr::StandardNormal;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut rng = thread_rng();
//!     let mut set = TrajectorySet::new();
//!     for name in ["S1", "S2"] {
//!         let data = (0..200 * 10).map(|_| rng.sample(StandardNormal)).collect();
//!         set.insert(name, Trajectories::from_flat(data, 200, 10)?)?;
//!     }
//!
//!     let config = SamplingConfig {
//!         incr_sampling: 50,
//!         err_thresh: 1e-3,
//!         max_sampling: Some(1000),
//!         ..SamplingConfig::default()
//!     };
//!     let outcome = test_reproducibility(&set, &config)?;
//!     println!(
//!         "{:?} after {} iterations, mean error {:.4}",
//!         outcome.state,
//!         outcome.iterations,
//!         outcome.mean_error()
//!     );
//!
//!     let p = pval(&outcome.errors, 0.2, set.realizations())?;
//!     println!("p = {:.3}", p);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! [`test_reproducibility`] drives a [`ConvergenceController`] over one of the
//! [`ReplicateSource`] transports. Each batch is partitioned by [`JobPlan`]
//! and fanned out to a [`WorkerPool`]; every job runs a
//! [`ResamplingWorker`] with its own ChaCha20 generator. [`find_ecfs`]
//! computes full ECF curves on the same pool for inspection.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod math_utils;
pub mod pool;
pub mod secure_rng;
pub mod trajectories;

// ECF evaluation and sampling
pub mod convergence;
pub mod curves;
pub mod ecf;
pub mod pvalue;
pub mod scheduler;
pub mod shared_arena;
pub mod worker;

pub use config::{SamplingConfig, Transport, DEF_EVAL_NUM, DEF_NUM_VAR_PERS};
pub use errors::{ReproError, ReproResult};
pub use trajectories::{Trajectories, TrajectorySet};

pub use convergence::{
    test_reproducibility, ConvergenceController, ConvergenceOutcome, ConvergenceState,
};
pub use curves::{find_ecfs, EcfCurves};
pub use ecf::{
    ecf, ecf_compare, ecf_err, err_sample, eval_info_times, eval_points, EcfCurve, SampleError,
};
pub use pool::WorkerPool;
#[cfg(feature = "parallel")]
pub use pool::{clear_registered_pool, register_pool};
pub use pvalue::pval;
pub use scheduler::{CopyTransport, Job, JobPlan, ReplicateSource, SharedTransport};
pub use shared_arena::SharedArena;
pub use worker::ResamplingWorker;
