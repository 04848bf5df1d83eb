use super::{CellState, Environment, INVALID_FITNESS, Path};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

/// Weights of the fitness terms.
///
/// `full_rescue_bonus` and `missing_priority_penalty` are expected to dwarf the weighted
/// terms so that reaching every survivor outranks any partial solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessWeights {
    /// Reward per unit of survivor priority reached.
    pub w1: f64,
    /// Reward per unique cell covered.
    pub w2: f64,
    /// Cost per path step.
    pub w3: f64,
    /// Cost per obstacle adjacent to a visited cell.
    pub w4: f64,
    pub missing_priority_penalty: f64,
    pub full_rescue_bonus: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            w1: 25.0,
            w2: 3.0,
            w3: 0.2,
            w4: 2.0,
            missing_priority_penalty: 1000.0,
            full_rescue_bonus: 5000.0,
        }
    }
}

/// Scores paths against a fixed environment.
#[derive(Debug, Clone)]
pub struct FitnessModel {
    environment: Arc<Environment>,
    weights: FitnessWeights,
}

impl FitnessModel {
    pub fn new(environment: Arc<Environment>, weights: FitnessWeights) -> Self {
        Self {
            environment,
            weights,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    /// Evaluates `path` in place and returns its fitness.
    #[instrument(level = "trace", skip(self, path), fields(path_length = path.len()))]
    pub fn evaluate(&self, path: &mut Path) -> f64 {
        let env = &*self.environment;
        let dimensions = env.dimensions();

        let mut visited = HashSet::with_capacity(path.genes.len());
        let mut reached = vec![false; env.survivors().len()];
        let mut survivors_reached = 0;
        let mut priority_sum = 0u64;
        let mut risk = 0u64;

        for &c in &path.genes {
            if !env.is_passable(c) {
                path.fitness = INVALID_FITNESS;
                path.survivors_reached = 0;
                path.priority_sum = 0;
                path.coverage = 0;
                path.risk = 0;
                return path.fitness;
            }

            visited.insert(dimensions.index(c));

            if env.cell_at(c) == CellState::Survivor {
                if let Some(i) = env.survivor_at(c) {
                    if !reached[i] {
                        reached[i] = true;
                        survivors_reached += 1;
                        priority_sum += env.survivors()[i].priority as u64;
                    }
                }
            }

            risk += c
                .neighbourhood()
                .filter(|&n| env.is_valid(n) && env.cell_at(n) == CellState::Obstacle)
                .count() as u64;
        }

        let missing = env.total_priority().saturating_sub(priority_sum);
        let w = &self.weights;
        let bonus = if missing == 0 { w.full_rescue_bonus } else { 0.0 };

        path.survivors_reached = survivors_reached;
        path.priority_sum = priority_sum;
        path.coverage = visited.len();
        path.risk = risk;
        path.fitness = bonus + w.w1 * priority_sum as f64 + w.w2 * visited.len() as f64
            - w.w3 * path.genes.len() as f64
            - w.w4 * risk as f64
            - w.missing_priority_penalty * missing as f64;

        path.fitness
    }
}
