use super::Error;
use super::models::{Arrival, RunContext, RunState, WorkerPhase, WorkerReport};
use crate::models::{Breeder, Conclusion, Coordination, Path, fittest};
use crate::services::lock;
use rand::{SeedableRng, rngs::StdRng};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::instrument;

/// How a worker left the barrier.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum BarrierOutcome {
    Released,
    Stalled,
}

/// Seed of a worker's private RNG. Distinct per worker, and per process and start time
/// unless a base seed makes the run reproducible.
pub(crate) fn worker_seed(base_seed: Option<u64>, worker_id: usize) -> u64 {
    if let Some(seed) = base_seed {
        return seed.wrapping_add(worker_id as u64);
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let pid = std::process::id() as u64;

    nanos ^ (worker_id as u64).wrapping_mul(7919) ^ (pid << 16)
}

/// Publishes `best`, registers at the barrier and waits for the round to complete.
///
/// Waits are bounded by the poll interval. After `barrier_spin_limit` fruitless waits
/// the worker force-stops the run so a dead or stalled peer cannot block everyone.
#[instrument(level = "debug", skip(state, coordination, best), fields(worker_id = worker_id, best_fitness = ?best.map(Path::fitness)))]
pub(crate) fn barrier(
    state: &lock::Service<RunState>,
    coordination: &Coordination,
    worker_id: usize,
    best: Option<&Path>,
) -> Result<BarrierOutcome, lock::Error> {
    let arrival = state.lock_while(|s| {
        if let Some(best) = best {
            if s.publish(best) {
                tracing::debug!(worker_id, fitness = best.fitness(), "Published new best");
            }
        }
        s.arrive()
    })?;

    let round = match arrival {
        Arrival::Last => {
            state.notify_all();
            return Ok(BarrierOutcome::Released);
        }
        Arrival::Waiting { round } => round,
    };

    for _ in 0..coordination.barrier_spin_limit {
        let timed_out =
            state.wait_while(coordination.poll_interval, |s| !s.is_released(round))?;
        if !timed_out {
            return Ok(BarrierOutcome::Released);
        }
    }

    state.lock_while(|s| s.request_stop(Conclusion::BarrierStall))?;
    state.notify_all();
    tracing::warn!(
        worker_id,
        round,
        spins = coordination.barrier_spin_limit,
        "Barrier wait exceeded the spin limit, stopping the run"
    );

    Ok(BarrierOutcome::Stalled)
}

/// Evolves one island and periodically synchronizes with its peers.
pub(crate) struct Worker {
    id: usize,
    island_size: usize,
    context: Arc<RunContext>,
    state: Arc<lock::Service<RunState>>,
    phase: WorkerPhase,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        island_size: usize,
        context: Arc<RunContext>,
        state: Arc<lock::Service<RunState>>,
    ) -> Self {
        Self {
            id,
            island_size,
            context,
            state,
            phase: WorkerPhase::Initializing,
        }
    }

    fn transition(&mut self, phase: WorkerPhase) {
        if self.phase != phase {
            tracing::trace!(worker_id = self.id, from = ?self.phase, to = ?phase, "Worker phase");
            self.phase = phase;
        }
    }

    #[instrument(level = "debug", skip(self), fields(worker_id = self.id, island_size = self.island_size))]
    pub(crate) fn run(mut self) -> Result<WorkerReport, Error> {
        let context = self.context.clone();
        let request = &context.request;
        let schedule = &request.schedule;
        let sync_interval = u64::from(request.coordination.sync_interval);

        let mut rng = StdRng::seed_from_u64(worker_seed(request.seed, self.id));
        let mut island =
            context
                .distribution
                .distribute(self.island_size, &context.model, &mut rng);
        let mut best = fittest(&island).cloned();

        let breeder = Breeder::new(
            &context.model,
            &request.selector,
            &request.crossover,
            &request.mutagen,
            request.elitism,
            request.max_path_length,
        );

        let mut local_generations = 0u64;
        loop {
            let (stop, generation) = self.state.lock_while(|s| (s.stop, s.generation))?;
            if stop.is_some() || schedule.is_exhausted(generation) {
                break;
            }

            self.transition(WorkerPhase::Evolving);
            breeder.next_generation(&mut island, schedule.progress(generation), &mut rng)?;
            local_generations += 1;

            if let Some(candidate) = fittest(&island) {
                if best
                    .as_ref()
                    .is_none_or(|b| candidate.fitness() > b.fitness())
                {
                    best = Some(candidate.clone());
                }
            }

            if local_generations % sync_interval == 0 {
                self.transition(WorkerPhase::Syncing);
                let outcome = barrier(
                    &self.state,
                    &request.coordination,
                    self.id,
                    best.as_ref(),
                )?;
                if outcome == BarrierOutcome::Stalled {
                    break;
                }
            }
        }

        self.transition(WorkerPhase::Terminated);
        if let Some(best) = &best {
            self.state.lock_while(|s| s.publish(best))?;
        }

        tracing::debug!(
            worker_id = self.id,
            local_generations,
            best_fitness = ?best.as_ref().map(Path::fitness),
            "Worker terminated"
        );

        Ok(WorkerReport {
            worker_id: self.id,
            local_generations,
            best,
        })
    }
}
