use super::{
    Crossover, Elitism, FitnessWeights, Mutagen, Schedule, Selector, StartPolicy, island_size,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// Tunables of the worker coordination protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoordinationParameters")]
pub struct Coordination {
    /// Local generations a worker evolves between two barrier rounds.
    pub(crate) sync_interval: u32,
    /// Bounded waits a worker tolerates at the barrier before it force-stops the run.
    pub(crate) barrier_spin_limit: u32,
    /// Upper bound of a single barrier wait and of the controller's polling period.
    pub(crate) poll_interval: Duration,
    /// Synchronized generations between two snapshots; `0` only snapshots at the end.
    pub(crate) snapshot_interval: u32,
}

#[derive(Deserialize)]
struct CoordinationParameters {
    sync_interval: u32,
    barrier_spin_limit: u32,
    poll_interval: Duration,
    snapshot_interval: u32,
}

impl TryFrom<CoordinationParameters> for Coordination {
    type Error = RequestValidationError;

    fn try_from(parameters: CoordinationParameters) -> Result<Self, Self::Error> {
        Self::new(
            parameters.sync_interval,
            parameters.barrier_spin_limit,
            parameters.poll_interval,
            parameters.snapshot_interval,
        )
    }
}

impl Coordination {
    pub fn new(
        sync_interval: u32,
        barrier_spin_limit: u32,
        poll_interval: Duration,
        snapshot_interval: u32,
    ) -> Result<Self, RequestValidationError> {
        if sync_interval == 0 {
            return Err(RequestValidationError::InvalidSyncInterval);
        }
        if barrier_spin_limit == 0 {
            return Err(RequestValidationError::InvalidBarrierSpinLimit);
        }
        if poll_interval.is_zero() {
            return Err(RequestValidationError::InvalidPollInterval);
        }

        Ok(Self {
            sync_interval,
            barrier_spin_limit,
            poll_interval,
            snapshot_interval,
        })
    }

    pub fn sync_interval(&self) -> u32 {
        self.sync_interval
    }

    pub fn barrier_spin_limit(&self) -> u32 {
        self.barrier_spin_limit
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn snapshot_interval(&self) -> u32 {
        self.snapshot_interval
    }
}

impl Default for Coordination {
    fn default() -> Self {
        Self {
            sync_interval: 5,
            barrier_spin_limit: 20_000,
            poll_interval: Duration::from_millis(1),
            snapshot_interval: 0,
        }
    }
}

/// A fully validated run with every genetic algorithm parameter.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub(crate) id: Uuid,
    pub(crate) requested_at: DateTime<Utc>,
    pub(crate) population_size: usize,
    pub(crate) workers: usize,
    pub(crate) max_path_length: usize,
    pub(crate) start_policy: StartPolicy,
    pub(crate) weights: FitnessWeights,
    pub(crate) selector: Selector,
    pub(crate) crossover: Crossover,
    pub(crate) mutagen: Mutagen,
    pub(crate) elitism: Elitism,
    pub(crate) schedule: Schedule,
    pub(crate) coordination: Coordination,
    pub(crate) seed: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum RequestValidationError {
    #[error("population_size must be at least 1")]
    InvalidPopulationSize,
    #[error("max_path_length must be at least 1")]
    InvalidPathLength,
    #[error("sync_interval must be at least 1")]
    InvalidSyncInterval,
    #[error("barrier_spin_limit must be at least 1")]
    InvalidBarrierSpinLimit,
    #[error("poll_interval must be greater than zero")]
    InvalidPollInterval,
    #[error(transparent)]
    Elitism(#[from] super::ElitismOutOfRange),
    #[error(transparent)]
    MutationRate(#[from] super::MutationRateOutOfRange),
    #[error(transparent)]
    CrossoverRate(#[from] super::ProbabilityOutOfRangeError),
    #[error(transparent)]
    Selection(#[from] super::SelectionError),
}

/// Resolves the requested worker count: `0` means one per available core, and there are
/// never more workers than paths.
pub fn resolve_workers(requested: usize, population_size: usize) -> usize {
    let workers = if requested == 0 {
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    } else {
        requested
    };

    workers.clamp(1, population_size.max(1))
}

impl RunRequest {
    #[allow(clippy::too_many_arguments)]
    #[instrument(level = "debug", skip(weights, selector, crossover, mutagen, schedule, coordination), fields(population_size = population_size, workers = workers, max_path_length = max_path_length, start_policy = ?start_policy))]
    pub fn new(
        population_size: usize,
        workers: usize,
        max_path_length: usize,
        start_policy: StartPolicy,
        weights: FitnessWeights,
        selector: Selector,
        crossover: Crossover,
        mutagen: Mutagen,
        elitism: Elitism,
        schedule: Schedule,
        coordination: Coordination,
        seed: Option<u64>,
    ) -> Result<Self, RequestValidationError> {
        if population_size == 0 {
            return Err(RequestValidationError::InvalidPopulationSize);
        }
        if max_path_length == 0 {
            return Err(RequestValidationError::InvalidPathLength);
        }

        Ok(Self {
            id: Uuid::now_v7(),
            requested_at: Utc::now(),
            population_size,
            workers: resolve_workers(workers, population_size),
            max_path_length,
            start_policy,
            weights,
            selector,
            crossover,
            mutagen,
            elitism,
            schedule,
            coordination,
            seed,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn island_size(&self) -> usize {
        island_size(self.population_size, self.workers)
    }

    pub fn max_path_length(&self) -> usize {
        self.max_path_length
    }

    pub fn start_policy(&self) -> StartPolicy {
        self.start_policy
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn coordination(&self) -> &Coordination {
        &self.coordination
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

/// The reason a run concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    /// The shared generation counter reached `max_generations`.
    GenerationLimit,
    /// The shared best fitness stopped improving.
    Stagnation,
    /// The wall-clock limit elapsed.
    TimeLimit,
    /// Stopped through an [`Interrupt`](crate::services::optimization::Interrupt) handle.
    Interrupted,
    /// A worker gave up waiting at the barrier.
    BarrierStall,
    /// A worker exited early with an error or panic.
    WorkerFailure,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_request(population_size: usize, workers: usize) -> RunRequest {
        RunRequest::new(
            population_size,
            workers,
            100,
            StartPolicy::Random,
            FitnessWeights::default(),
            Selector::tournament(3).expect("is valid"),
            Crossover::single_point(0.8).unwrap(),
            Mutagen::constant(0.25).unwrap(),
            Elitism::new(0.15).unwrap(),
            Schedule::new(200, 50, None),
            Coordination::default(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_request_creation() {
        let request = create_test_request(40, 4);

        assert_eq!(request.population_size(), 40);
        assert_eq!(request.workers(), 4);
        assert_eq!(request.island_size(), 10);

        // Verify UUID and timestamp were set (basic existence checks)
        assert!(!request.id().is_nil());
        assert!(request.requested_at() <= Utc::now());
    }

    #[test]
    fn it_clamps_workers_to_the_population() {
        let request = create_test_request(3, 8);

        assert_eq!(request.workers(), 3);
    }

    #[test]
    fn it_resolves_zero_workers_to_available_cores() {
        let request = create_test_request(10_000, 0);

        assert!(request.workers() >= 1);
        assert_eq!(resolve_workers(0, 1), 1);
    }

    #[test]
    fn it_rejects_empty_populations_and_paths() {
        let result = RunRequest::new(
            0,
            1,
            100,
            StartPolicy::Random,
            FitnessWeights::default(),
            Selector::tournament(3).unwrap(),
            Crossover::single_point(0.8).unwrap(),
            Mutagen::constant(0.25).unwrap(),
            Elitism::new(0.15).unwrap(),
            Schedule::new(200, 50, None),
            Coordination::default(),
            None,
        );
        assert!(matches!(
            result,
            Err(RequestValidationError::InvalidPopulationSize)
        ));

        let result = RunRequest::new(
            10,
            1,
            0,
            StartPolicy::Random,
            FitnessWeights::default(),
            Selector::tournament(3).unwrap(),
            Crossover::single_point(0.8).unwrap(),
            Mutagen::constant(0.25).unwrap(),
            Elitism::new(0.15).unwrap(),
            Schedule::new(200, 50, None),
            Coordination::default(),
            None,
        );
        assert!(matches!(result, Err(RequestValidationError::InvalidPathLength)));
    }

    #[test]
    fn it_validates_coordination() {
        assert!(Coordination::new(0, 10, Duration::from_millis(1), 0).is_err());
        assert!(Coordination::new(5, 0, Duration::from_millis(1), 0).is_err());
        assert!(Coordination::new(5, 10, Duration::ZERO, 0).is_err());
        assert_eq!(
            Coordination::new(5, 20_000, Duration::from_millis(1), 0).unwrap(),
            Coordination::default()
        );
    }

    #[test]
    fn it_validates_deserialized_coordination() {
        let valid = r#"{
            "sync_interval": 3,
            "barrier_spin_limit": 10,
            "poll_interval": { "secs": 0, "nanos": 1000000 },
            "snapshot_interval": 0
        }"#;
        let coordination: Coordination = serde_json::from_str(valid).unwrap();
        assert_eq!(coordination.sync_interval(), 3);
        assert_eq!(coordination.poll_interval(), Duration::from_millis(1));

        let zero_sync = valid.replace(r#""sync_interval": 3"#, r#""sync_interval": 0"#);
        assert!(serde_json::from_str::<Coordination>(&zero_sync).is_err());

        let zero_poll = valid.replace(r#""nanos": 1000000"#, r#""nanos": 0"#);
        assert!(serde_json::from_str::<Coordination>(&zero_poll).is_err());
    }

    #[test]
    fn it_round_trips_the_default_coordination() {
        let json = serde_json::to_string(&Coordination::default()).unwrap();
        let coordination: Coordination = serde_json::from_str(&json).unwrap();

        assert_eq!(coordination, Coordination::default());
    }
}
