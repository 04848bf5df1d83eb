use super::Error;
use super::models::{Interrupt, RunContext, RunOutcome, RunState, WorkerReport};
use super::worker::Worker;
use crate::models::{
    Conclusion, Environment, FitnessModel, IslandSnapshot, Population, RunRequest,
    ScheduleDecision, Snapshot, SnapshotSink, StagnationTracker,
};
use crate::services::lock;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::instrument;

type WorkerHandle = JoinHandle<Result<WorkerReport, Error>>;

/// Generations between two progress lines at info level.
const PROGRESS_LOG_INTERVAL: u32 = 10;

// optimization service
pub struct Service {
    pub(super) context: Arc<RunContext>,
    pub(super) state: Arc<lock::Service<RunState>>,
    pub(super) snapshots: Option<Box<dyn SnapshotSink>>,
    pub(super) snapshot_sequence: u32,
}

impl Service {
    pub fn request(&self) -> &RunRequest {
        &self.context.request
    }

    pub fn environment(&self) -> &Environment {
        self.context.model.environment()
    }

    /// The fitness model of this run. Cheap to clone; the environment is shared.
    pub fn fitness_model(&self) -> FitnessModel {
        self.context.model.clone()
    }

    /// Handle that stops the run from another thread.
    pub fn interrupt_handle(&self) -> Interrupt {
        Interrupt::new(self.state.clone())
    }

    fn stop(&self, conclusion: Conclusion) -> Result<(), lock::Error> {
        if self.state.lock_while(|s| s.request_stop(conclusion))? {
            tracing::info!(conclusion = ?conclusion, "Stopping run");
        }
        self.state.notify_all();
        Ok(())
    }

    /// Captures a snapshot under the lock and hands it to the sink, if one is attached.
    fn snapshot(&mut self) -> Result<(), lock::Error> {
        let Some(sink) = self.snapshots.as_mut() else {
            return Ok(());
        };

        let run_id = self.context.request.id;
        let environment = self.context.model.environment();
        let snapshot = self.state.lock_while(|s| {
            Snapshot::capture(run_id, s.generation, environment, s.best.as_ref())
        })?;

        if let Err(err) = sink.write(self.snapshot_sequence, &snapshot) {
            tracing::warn!(
                message = "Failed to write snapshot",
                sequence = self.snapshot_sequence,
                err = ?err
            );
        }
        self.snapshot_sequence += 1;
        Ok(())
    }

    /// Hands the final best of every joined island to the sink, if one is attached.
    fn island_snapshots(&mut self, reports: &[WorkerReport]) {
        let Some(sink) = self.snapshots.as_mut() else {
            return;
        };

        let run_id = self.context.request.id;
        let environment = self.context.model.environment();
        let generation = self.state.recover(|s| s.generation);

        for report in reports {
            let island = IslandSnapshot::capture(
                run_id,
                generation,
                environment,
                report.worker_id(),
                report.local_generations(),
                report.best(),
            );
            if let Err(err) = sink.write_island(&island) {
                tracing::warn!(
                    message = "Failed to write island snapshot",
                    worker_id = report.worker_id(),
                    err = ?err
                );
            }
        }
    }

    #[instrument(level = "debug", skip(self))]
    fn spawn_workers(&self) -> Result<Vec<WorkerHandle>, Error> {
        let request = &self.context.request;
        let island_size = request.island_size();
        let mut handles = Vec::with_capacity(request.workers);

        for worker_id in 0..request.workers {
            let worker = Worker::new(
                worker_id,
                island_size,
                self.context.clone(),
                self.state.clone(),
            );
            let spawned = thread::Builder::new()
                .name(format!("rescue-worker-{worker_id}"))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // Release the workers already running before giving up
                    self.stop(Conclusion::WorkerFailure)?;
                    Self::join(handles);
                    return Err(Error::Spawn { worker_id, source });
                }
            }
        }

        Ok(handles)
    }

    /// Watches the shared state until the run has to stop, and records why.
    fn monitor(&mut self, started: Instant, handles: &[WorkerHandle]) -> Result<(), lock::Error> {
        let run_id = self.context.request.id;
        let schedule = self.context.request.schedule.clone();
        let poll_interval = self.context.request.coordination.poll_interval;
        let snapshot_interval = self.context.request.coordination.snapshot_interval;

        let mut tracker = StagnationTracker::default();
        let mut last_generation = 0u32;

        loop {
            // Sampled before the state so that a regular exit is always visible below
            let finished_early = handles.iter().any(JoinHandle::is_finished);

            let (generation, best_fitness, stop) = self
                .state
                .lock_while(|s| (s.generation, s.best_fitness(), s.stop))?;

            if stop.is_some() {
                return Ok(());
            }

            if generation != last_generation {
                last_generation = generation;

                if generation % PROGRESS_LOG_INTERVAL == 0 {
                    tracing::info!(generation, best_fitness = ?best_fitness, "Run progress");
                } else {
                    tracing::debug!(generation, best_fitness = ?best_fitness, "Generation advanced");
                }

                let population = Population {
                    run_id,
                    current_generation: generation,
                    best_fitness,
                    elapsed: started.elapsed(),
                };
                if let ScheduleDecision::Terminate(conclusion) =
                    schedule.on_generation(&population, &mut tracker)
                {
                    return self.stop(conclusion);
                }

                if snapshot_interval > 0 && generation % snapshot_interval == 0 {
                    self.snapshot()?;
                }
            }

            if schedule.is_exhausted(generation) {
                return self.stop(Conclusion::GenerationLimit);
            }

            if finished_early {
                tracing::warn!(generation, "A worker exited before the run concluded");
                return self.stop(Conclusion::WorkerFailure);
            }

            self.state.wait_while(poll_interval, |s| {
                s.generation == last_generation && s.stop.is_none()
            })?;
        }
    }

    fn join(handles: Vec<WorkerHandle>) -> (Vec<WorkerReport>, usize) {
        let mut reports = Vec::with_capacity(handles.len());
        let mut failed = 0;

        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(err)) => {
                    failed += 1;
                    tracing::warn!(message = "Worker failed", worker_id, err = %err);
                }
                Err(_) => {
                    failed += 1;
                    let err = Error::WorkerPanicked { worker_id };
                    tracing::warn!(message = "Worker failed", worker_id, err = %err);
                }
            }
        }

        (reports, failed)
    }

    /// Runs the island model to completion.
    ///
    /// Spawns one OS thread per worker, supervises the shared state until a stop
    /// condition is met, then joins every worker and reports the best path found. The
    /// last known best is reported even when workers failed or the lock was poisoned.
    #[instrument(level = "info", skip(self), fields(run_id = %self.context.request.id, workers = self.context.request.workers, population_size = self.context.request.population_size))]
    pub fn run(mut self) -> Result<RunOutcome, Error> {
        tracing::info!("Starting run");
        let started = Instant::now();

        let handles = self.spawn_workers()?;

        if let Err(err) = self.monitor(started, &handles) {
            tracing::warn!(message = "Lost the shared state, stopping the run", err = ?err);
            self.state
                .recover(|s| s.request_stop(Conclusion::WorkerFailure));
            self.state.notify_all();
        }

        let (workers, failed_workers) = Self::join(handles);

        if let Err(err) = self.snapshot() {
            tracing::warn!(message = "Could not capture the final snapshot", err = ?err);
        }
        self.island_snapshots(&workers);

        let (best, generation, stop) = self
            .state
            .recover(|s| (s.best.clone(), s.generation, s.stop));

        let outcome = RunOutcome {
            run_id: self.context.request.id,
            best,
            generation,
            conclusion: stop.unwrap_or(Conclusion::WorkerFailure),
            elapsed: started.elapsed(),
            workers,
            failed_workers,
        };

        tracing::info!(
            conclusion = ?outcome.conclusion,
            generation = outcome.generation,
            best_fitness = ?outcome.best_fitness(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            failed_workers,
            "Run concluded"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{Configuration, bootstrap_optimizer};
    use crate::models::Path;

    fn service(workers: usize) -> Service {
        let config = Configuration {
            population_size: 20,
            num_generations: 50,
            workers,
            stagnation_limit: 0,
            seed: Some(17),
            ..Configuration::default()
        };

        bootstrap_optimizer(&config).unwrap().build().unwrap()
    }

    /// Publishes a one-cell path on the first passable cell and returns its fitness.
    fn publish_best(service: &Service) -> f64 {
        let environment = service.environment();
        let dimensions = environment.dimensions();
        let start = (0..dimensions.cell_count())
            .map(|i| dimensions.coord(i))
            .find(|&c| environment.is_passable(c))
            .unwrap();

        let mut path = Path::new(vec![start]);
        let fitness = service.context.model.evaluate(&mut path);
        assert!(service.state.lock_while(|s| s.publish(&path)).unwrap());
        fitness
    }

    #[test]
    fn it_reports_the_last_best_when_the_state_is_poisoned() {
        let service = service(2);
        let published = publish_best(&service);

        let state = service.state.clone();
        let poisoner = thread::spawn(move || {
            let _: Result<(), _> =
                state.lock_while(|_| panic!("worker crashed while holding the lock"));
        });
        assert!(poisoner.join().is_err());

        let outcome = service.run().unwrap();

        assert_eq!(outcome.conclusion(), Conclusion::WorkerFailure);
        assert_eq!(outcome.failed_workers(), 2);
        assert!(outcome.workers().is_empty());
        assert_eq!(outcome.best_fitness(), Some(published));
    }

    #[test]
    fn it_stops_when_a_worker_exits_early() {
        let mut service = service(1);
        let published = publish_best(&service);

        let handles: Vec<WorkerHandle> = vec![thread::spawn(|| {
            Ok(WorkerReport {
                worker_id: 0,
                local_generations: 0,
                best: None,
            })
        })];
        while !handles[0].is_finished() {
            thread::yield_now();
        }

        service.monitor(Instant::now(), &handles).unwrap();

        let (stop, best_fitness) = service
            .state
            .lock_while(|s| (s.stop, s.best_fitness()))
            .unwrap();
        assert_eq!(stop, Some(Conclusion::WorkerFailure));
        assert_eq!(best_fitness, Some(published));

        let (reports, failed) = Service::join(handles);
        assert_eq!(reports.len(), 1);
        assert_eq!(failed, 0);
    }
}
