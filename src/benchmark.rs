//! Single-worker versus multi-worker comparison on one environment.
//!
//! Both runs share the generated environment and the configured seed. Only the worker
//! count differs, so the elapsed times give the speedup of the island model.

use crate::bootstrap::Configuration;
use crate::services::optimization::{RunOutcome, ServiceBuilder};
use anyhow::Context;
use serde::Serialize;
use tracing::instrument;

/// Outcomes of the same search run with one worker and with `workers` workers.
#[derive(Debug, Serialize)]
pub struct WorkerComparison {
    pub(crate) workers: usize,
    pub(crate) single: RunOutcome,
    pub(crate) parallel: RunOutcome,
    pub(crate) speedup: f64,
    pub(crate) efficiency: f64,
}

impl WorkerComparison {
    fn new(workers: usize, single: RunOutcome, parallel: RunOutcome) -> Self {
        let parallel_secs = parallel.elapsed().as_secs_f64();
        let speedup = if parallel_secs > 0.0 {
            single.elapsed().as_secs_f64() / parallel_secs
        } else {
            1.0
        };

        Self {
            workers,
            single,
            parallel,
            speedup,
            efficiency: speedup / workers as f64,
        }
    }

    /// Workers used by the parallel run.
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn single(&self) -> &RunOutcome {
        &self.single
    }

    pub fn parallel(&self) -> &RunOutcome {
        &self.parallel
    }

    /// Single-worker time divided by parallel time.
    pub fn speedup(&self) -> f64 {
        self.speedup
    }

    /// Speedup per worker, `1.0` being perfect scaling.
    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }
}

/// Runs `config` once with a single worker and once with its configured worker count.
#[instrument(level = "info", skip(config), fields(seed = ?config.seed))]
pub fn compare_workers(config: &Configuration) -> anyhow::Result<WorkerComparison> {
    let environment = config
        .environment()
        .context("Could not generate the environment")?;

    let single_config = Configuration {
        workers: 1,
        ..config.clone()
    };
    let single_request = single_config
        .request()
        .context("Invalid run configuration")?;
    let parallel_request = config.request().context("Invalid run configuration")?;
    let workers = parallel_request.workers();

    tracing::info!(workers = 1, "Starting single-worker run");
    let single = ServiceBuilder::new(single_request, environment.clone())
        .build()?
        .run()?;

    tracing::info!(workers, "Starting parallel run");
    let parallel = ServiceBuilder::new(parallel_request, environment)
        .build()?
        .run()?;

    let comparison = WorkerComparison::new(workers, single, parallel);
    tracing::info!(
        workers,
        speedup = comparison.speedup,
        efficiency = comparison.efficiency,
        "Worker comparison complete"
    );

    Ok(comparison)
}
