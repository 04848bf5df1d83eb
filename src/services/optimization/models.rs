use crate::models::{Conclusion, Distribution, FitnessModel, Path, RunRequest};
use crate::services::lock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// Read-only context of a run, shared by the controller and every worker.
#[derive(Debug)]
pub(crate) struct RunContext {
    pub(crate) request: RunRequest,
    pub(crate) model: FitnessModel,
    pub(crate) distribution: Distribution,
}

/// Process-wide state of a run. Only ever touched through [`lock::Service`].
#[derive(Debug)]
pub(crate) struct RunState {
    /// Completed barrier rounds.
    pub(crate) generation: u32,
    /// Workers that reached the barrier of the current round.
    pub(crate) workers_done: usize,
    pub(crate) workers: usize,
    /// Set once; the first reason to stop wins.
    pub(crate) stop: Option<Conclusion>,
    pub(crate) best: Option<Path>,
}

/// What a worker learns when it reaches the barrier.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Arrival {
    /// This worker completed the round and advanced the generation.
    Last,
    /// Other workers are still evolving; wait until `round` is over.
    Waiting { round: u32 },
}

impl RunState {
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            generation: 0,
            workers_done: 0,
            workers,
            stop: None,
            best: None,
        }
    }

    pub(crate) fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().map(Path::fitness)
    }

    /// Replaces the shared best with a copy of `candidate` if it is feasible and strictly
    /// fitter. Returns whether it was published.
    pub(crate) fn publish(&mut self, candidate: &Path) -> bool {
        if !candidate.is_feasible() {
            return false;
        }
        if self
            .best_fitness()
            .is_some_and(|best| candidate.fitness() <= best)
        {
            return false;
        }

        self.best = Some(candidate.clone());
        true
    }

    /// Records the reason to stop unless one is already set. Returns whether `conclusion`
    /// was recorded.
    pub(crate) fn request_stop(&mut self, conclusion: Conclusion) -> bool {
        if self.stop.is_some() {
            return false;
        }

        self.stop = Some(conclusion);
        true
    }

    /// Registers a worker at the barrier of the current round.
    pub(crate) fn arrive(&mut self) -> Arrival {
        self.workers_done += 1;
        if self.workers_done >= self.workers {
            self.workers_done = 0;
            self.generation += 1;
            return Arrival::Last;
        }

        Arrival::Waiting {
            round: self.generation,
        }
    }

    /// Whether a worker waiting on `round` may leave the barrier.
    pub(crate) fn is_released(&self, round: u32) -> bool {
        self.generation != round || self.stop.is_some()
    }
}

/// Lifecycle of a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerPhase {
    Initializing,
    Evolving,
    Syncing,
    Terminated,
}

/// Summary a worker returns when it terminates.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub(crate) worker_id: usize,
    pub(crate) local_generations: u64,
    pub(crate) best: Option<Path>,
}

impl WorkerReport {
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn local_generations(&self) -> u64 {
        self.local_generations
    }

    /// Best path of the worker's island over its whole lifetime.
    pub fn best(&self) -> Option<&Path> {
        self.best.as_ref()
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub(crate) run_id: Uuid,
    pub(crate) best: Option<Path>,
    pub(crate) generation: u32,
    pub(crate) conclusion: Conclusion,
    pub(crate) elapsed: Duration,
    pub(crate) workers: Vec<WorkerReport>,
    pub(crate) failed_workers: usize,
}

impl RunOutcome {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn best(&self) -> Option<&Path> {
        self.best.as_ref()
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().map(Path::fitness)
    }

    /// Completed barrier rounds.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn conclusion(&self) -> Conclusion {
        self.conclusion
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Reports of the workers that terminated cleanly, ordered by worker id.
    pub fn workers(&self) -> &[WorkerReport] {
        &self.workers
    }

    /// Workers that ended with an error or a panic.
    pub fn failed_workers(&self) -> usize {
        self.failed_workers
    }
}

/// Cooperatively stops a run from any thread.
#[derive(Debug, Clone)]
pub struct Interrupt {
    state: Arc<lock::Service<RunState>>,
}

impl Interrupt {
    pub(crate) fn new(state: Arc<lock::Service<RunState>>) -> Self {
        Self { state }
    }

    /// Requests the run to stop with [`Conclusion::Interrupted`]. Returns `false` if the
    /// run was already stopping for another reason.
    #[instrument(level = "info", skip(self))]
    pub fn interrupt(&self) -> Result<bool, lock::Error> {
        let recorded = self
            .state
            .lock_while(|state| state.request_stop(Conclusion::Interrupted))?;
        self.state.notify_all();

        Ok(recorded)
    }
}
