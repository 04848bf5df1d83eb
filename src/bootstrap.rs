use crate::models::{
    Coordination, Crossover, Decay, Dimensions, Elitism, Environment, FitnessWeights, GridError,
    Mutagen, MutationRate, Priorities, RequestValidationError, RunRequest, Schedule, Selector,
    StartPolicy,
};
use crate::services::optimization::ServiceBuilder;
use anyhow::Context;
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// Run configuration as read from a JSON file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub grid_x: i32,
    pub grid_y: i32,
    pub grid_z: i32,

    pub population_size: usize,
    pub num_generations: u32,
    pub max_path_length: usize,
    /// `0` starts one worker per available core.
    pub workers: usize,

    pub num_survivors: usize,
    pub num_obstacles: usize,
    pub survivor_priorities: Vec<u32>,
    pub priority_default: u32,

    pub w1: f64,
    pub w2: f64,
    pub w3: f64,
    pub w4: f64,
    pub missing_priority_penalty: f64,
    pub full_rescue_bonus: f64,

    pub elitism_percent: f64,
    pub mutation_rate: f64,
    pub mutation_decay: Decay,
    pub crossover_rate: f64,
    pub tournament_size: usize,

    /// `0` disables stagnation detection.
    pub stagnation_limit: u32,
    /// `0` disables the time limit.
    pub time_limit_seconds: u64,
    pub start_policy: StartPolicy,

    pub sync_interval: u32,
    pub barrier_spin_limit: u32,
    pub poll_interval_ms: u64,
    pub snapshot_interval: u32,
    /// Makes grid generation and every worker's RNG reproducible.
    pub seed: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        let weights = FitnessWeights::default();
        let coordination = Coordination::default();

        Self {
            grid_x: 10,
            grid_y: 10,
            grid_z: 3,
            population_size: 40,
            num_generations: 200,
            max_path_length: 100,
            workers: 0,
            num_survivors: 7,
            num_obstacles: 10,
            survivor_priorities: Vec::new(),
            priority_default: 1,
            w1: weights.w1,
            w2: weights.w2,
            w3: weights.w3,
            w4: weights.w4,
            missing_priority_penalty: weights.missing_priority_penalty,
            full_rescue_bonus: weights.full_rescue_bonus,
            elitism_percent: 0.15,
            mutation_rate: 0.25,
            mutation_decay: Decay::Constant,
            crossover_rate: 0.8,
            tournament_size: 3,
            stagnation_limit: 50,
            time_limit_seconds: 0,
            start_policy: StartPolicy::Random,
            sync_interval: coordination.sync_interval(),
            barrier_spin_limit: coordination.barrier_spin_limit(),
            poll_interval_ms: coordination.poll_interval().as_millis() as u64,
            snapshot_interval: coordination.snapshot_interval(),
            seed: None,
        }
    }
}

impl Configuration {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read configuration {}", path.display()))?;

        serde_json::from_str(&text)
            .with_context(|| format!("Could not parse configuration {}", path.display()))
    }

    pub fn dimensions(&self) -> Result<Dimensions, GridError> {
        Dimensions::new(self.grid_x, self.grid_y, self.grid_z)
    }

    pub fn priorities(&self) -> Result<Priorities, GridError> {
        if self.priority_default < 1 || self.survivor_priorities.contains(&0) {
            return Err(GridError::InvalidPriority);
        }

        Ok(Priorities {
            listed: self.survivor_priorities.clone(),
            default: self.priority_default,
        })
    }

    pub fn weights(&self) -> FitnessWeights {
        FitnessWeights {
            w1: self.w1,
            w2: self.w2,
            w3: self.w3,
            w4: self.w4,
            missing_priority_penalty: self.missing_priority_penalty,
            full_rescue_bonus: self.full_rescue_bonus,
        }
    }

    pub fn schedule(&self) -> Schedule {
        let time_limit =
            (self.time_limit_seconds > 0).then(|| Duration::from_secs(self.time_limit_seconds));

        Schedule::new(self.num_generations, self.stagnation_limit, time_limit)
    }

    /// Validates every parameter and resolves the worker count.
    #[instrument(level = "debug", skip(self))]
    pub fn request(&self) -> Result<RunRequest, RequestValidationError> {
        let mutation_rate = MutationRate::new(self.mutation_rate, self.mutation_decay.clone())?;
        let coordination = Coordination::new(
            self.sync_interval,
            self.barrier_spin_limit,
            Duration::from_millis(self.poll_interval_ms),
            self.snapshot_interval,
        )?;

        RunRequest::new(
            self.population_size,
            self.workers,
            self.max_path_length,
            self.start_policy,
            self.weights(),
            Selector::tournament(self.tournament_size)?,
            Crossover::single_point(self.crossover_rate)?,
            Mutagen::new(mutation_rate),
            Elitism::new(self.elitism_percent)?,
            self.schedule(),
            coordination,
            self.seed,
        )
    }

    /// Places obstacles and survivors, reproducibly when a seed is configured.
    #[instrument(level = "debug", skip(self), fields(seed = ?self.seed))]
    pub fn environment(&self) -> Result<Environment, GridError> {
        let dimensions = self.dimensions()?;
        let priorities = self.priorities()?;

        match self.seed {
            Some(seed) => Environment::generate(
                dimensions,
                self.num_obstacles,
                self.num_survivors,
                &priorities,
                &mut StdRng::seed_from_u64(seed),
            ),
            None => Environment::generate(
                dimensions,
                self.num_obstacles,
                self.num_survivors,
                &priorities,
                &mut rand::rng(),
            ),
        }
    }
}

/// Validates `config`, generates the environment and returns a builder for the run.
pub fn bootstrap_optimizer(config: &Configuration) -> anyhow::Result<ServiceBuilder> {
    let request = config.request().context("Invalid run configuration")?;
    let environment = config
        .environment()
        .context("Could not generate the environment")?;

    tracing::info!(
        run_id = %request.id(),
        workers = request.workers(),
        island_size = request.island_size(),
        survivors = environment.survivors().len(),
        obstacles = environment.obstacles().len(),
        "Bootstrapped run"
    );

    Ok(ServiceBuilder::new(request, environment))
}
