//! Execution of independent per-time-step work
//!
//! Time steps never share state, so the pipeline hands the list of steps and a
//! pure per-step function to a [`StepExecutor`]. The executor is supplied by the
//! caller; the pipeline never creates or looks up a worker pool itself.

use crate::field::TimeStep;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::Arc;

/// Runs a function over every time step and returns the results in step order
pub trait StepExecutor: Send + Sync {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    fn execute<T, F>(&self, steps: &[TimeStep], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&TimeStep) -> T + Send + Sync;
}

/// Processes time steps one after another on the calling thread
#[derive(Copy, Clone, Debug, Default)]
pub struct SequentialExecutor;

impl StepExecutor for SequentialExecutor {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn execute<T, F>(&self, steps: &[TimeStep], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&TimeStep) -> T + Send + Sync,
    {
        steps.iter().map(f).collect()
    }
}

/// Processes time steps in parallel with rayon
///
/// Without a pool the global rayon pool is used. A caller-owned pool can be
/// shared between several executors.
#[derive(Clone, Debug, Default)]
pub struct RayonExecutor {
    pool: Option<Arc<ThreadPool>>,
}

impl RayonExecutor {
    /// Use the global rayon pool
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Use a caller-owned pool
    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        Self { pool: Some(pool) }
    }
}

impl StepExecutor for RayonExecutor {
    fn name(&self) -> &'static str {
        "rayon"
    }

    fn execute<T, F>(&self, steps: &[TimeStep], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&TimeStep) -> T + Send + Sync,
    {
        match &self.pool {
            Some(pool) => pool.install(|| steps.par_iter().map(&f).collect()),
            None => steps.par_iter().map(&f).collect(),
        }
    }
}
