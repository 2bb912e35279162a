//! Independent trajectories on a rayon pool
//!
//! Each trajectory is built, run to the horizon and reduced to its agents'
//! stats inside a single rayon task; only the stats cross threads. Outcomes
//! are indexed by trajectory id, so a builder that derives its seeds from the
//! id gives the same outcomes on any number of threads.
//!
//! ```rust
//! use des::parallel::ParallelRunner;
//! # use des::{Agent, EventLoop};
//! # struct Idle(usize);
//! # impl Agent<u8, usize> for Idle {
//! #     fn stats(&self) -> usize { self.0 }
//! # }
//!
//! let outcomes = ParallelRunner::new(8).num_threads(2).run(365, |trajectory_id| {
//!     let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(Idle(trajectory_id))];
//!     EventLoop::new(vec![(0, 1)], agents)
//! });
//!
//! assert_eq!(outcomes.len(), 8);
//! assert_eq!(outcomes[3], Ok(vec![3]));
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::EventLoop;

/// A trajectory that panicked before reaching the horizon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aborted {
    pub trajectory_id: usize,
    pub message: String,
}

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trajectory {} aborted: {}", self.trajectory_id, self.message)
    }
}

impl std::error::Error for Aborted {}

/// Final agent stats of one trajectory
pub type Outcome<S> = Result<Vec<S>, Aborted>;

type Progress = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Runs a batch of trajectories to a common horizon
pub struct ParallelRunner {
    trajectories: usize,
    threads: Option<usize>,
    progress: Option<Progress>,
}

impl ParallelRunner {
    pub fn new(trajectories: usize) -> Self {
        ParallelRunner {
            trajectories,
            threads: None,
            progress: None,
        }
    }

    /// Run on a dedicated pool of `n` threads rather than rayon's global one
    pub fn num_threads(mut self, n: usize) -> Self {
        self.threads = Some(n);
        self
    }

    /// `report(completed, total)` after every finished trajectory
    pub fn progress<P>(mut self, report: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(report));
        self
    }

    /// Build trajectory `0..n` with `build`, run each up to `until_day`
    ///
    /// A panic inside one trajectory becomes that trajectory's `Aborted`.
    pub fn run<T, S, F>(&self, until_day: usize, build: F) -> Vec<Outcome<S>>
    where
        F: Fn(usize) -> EventLoop<T, S> + Sync,
        S: Send,
    {
        let completed = AtomicUsize::new(0);
        let task = |trajectory_id: usize| {
            let outcome = run_one(trajectory_id, until_day, &build);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(report) = &self.progress {
                report(done, self.trajectories);
            }
            outcome
        };
        let batch = || -> Vec<Outcome<S>> {
            (0..self.trajectories).into_par_iter().map(task).collect()
        };

        // an unbuildable pool falls back to the global one
        match self.threads.and_then(dedicated_pool) {
            Some(pool) => pool.install(batch),
            None => batch(),
        }
    }
}

fn run_one<T, S, F>(trajectory_id: usize, until_day: usize, build: &F) -> Outcome<S>
where
    F: Fn(usize) -> EventLoop<T, S>,
{
    panic::catch_unwind(AssertUnwindSafe(|| {
        let mut event_loop = build(trajectory_id);
        event_loop.run(until_day);
        event_loop.stats()
    }))
    .map_err(|payload| Aborted {
        trajectory_id,
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

fn dedicated_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

/// Prints every `interval` finished trajectories and once at the end
pub fn simple_progress_reporter(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed == total || completed % interval == 0 {
            println!("  {completed}/{total} trajectories done");
        }
    }
}
