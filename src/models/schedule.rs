use super::{Conclusion, Population};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// Smallest best-fitness gain that counts as an improvement.
pub const STAGNATION_EPSILON: f64 = 1e-9;

/// Controls when a run stops.
///
/// The controller consults the schedule every time it observes the shared generation
/// counter advance. Three independent conditions end a run:
///
/// - `max_generations`: hard limit on synchronized generations
/// - `stagnation_limit`: number of observed generation advances without improvement of
///   the shared best fitness; `0` disables stagnation detection
/// - `time_limit`: wall-clock bound on the run; `None` disables it
///
/// # Examples
///
/// ```rust
/// use rescue_ga::models::Schedule;
/// use std::time::Duration;
///
/// // Run all 200 generations unless nothing improves for 50 of them
/// let schedule = Schedule::new(200, 50, None);
///
/// // Fixed budget, stagnation detection disabled
/// let budgeted = Schedule::new(1_000, 0, Some(Duration::from_secs(30)));
/// assert_eq!(budgeted.time_limit(), Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Schedule {
    pub(crate) max_generations: u32,
    pub(crate) stagnation_limit: u32,
    pub(crate) time_limit: Option<Duration>,
}

/// Decision taken after observing a generation advance.
#[derive(Debug, PartialEq)]
pub enum ScheduleDecision {
    Continue,
    Terminate(Conclusion),
}

/// Counts consecutive generation advances without improvement.
#[derive(Debug, Default)]
pub(crate) struct StagnationTracker {
    best: Option<f64>,
    stagnant: u32,
}

impl StagnationTracker {
    /// Records the best fitness seen at a generation advance and returns the number of
    /// consecutive advances without improvement.
    pub(crate) fn observe(&mut self, best_fitness: Option<f64>) -> u32 {
        let improved = match (self.best, best_fitness) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(previous), Some(current)) => current > previous + STAGNATION_EPSILON,
        };

        if improved {
            self.best = best_fitness;
            self.stagnant = 0;
        } else {
            self.stagnant += 1;
        }

        self.stagnant
    }
}

impl Schedule {
    pub fn new(max_generations: u32, stagnation_limit: u32, time_limit: Option<Duration>) -> Self {
        Self {
            max_generations,
            stagnation_limit,
            time_limit,
        }
    }

    pub fn max_generations(&self) -> u32 {
        self.max_generations
    }

    pub fn stagnation_limit(&self) -> u32 {
        self.stagnation_limit
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Fraction of the generation budget consumed, in `[0.0, 1.0]`.
    pub fn progress(&self, generation: u32) -> f64 {
        if self.max_generations == 0 {
            return 1.0;
        }
        (generation as f64 / self.max_generations as f64).min(1.0)
    }

    pub(crate) fn is_exhausted(&self, generation: u32) -> bool {
        generation >= self.max_generations
    }

    /// Determines whether the run continues after the generation counter advanced.
    #[instrument(level = "debug", skip(self, population, tracker), fields(run_id = %population.run_id, generation = population.current_generation, best_fitness = ?population.best_fitness, max_generations = self.max_generations))]
    pub(crate) fn on_generation(
        &self,
        population: &Population,
        tracker: &mut StagnationTracker,
    ) -> ScheduleDecision {
        let stagnant = tracker.observe(population.best_fitness);

        if self.is_exhausted(population.current_generation) {
            return ScheduleDecision::Terminate(Conclusion::GenerationLimit);
        }

        if self.stagnation_limit > 0 && stagnant >= self.stagnation_limit {
            return ScheduleDecision::Terminate(Conclusion::Stagnation);
        }

        if let Some(limit) = self.time_limit {
            if population.elapsed > limit {
                return ScheduleDecision::Terminate(Conclusion::TimeLimit);
            }
        }

        ScheduleDecision::Continue
    }
}
