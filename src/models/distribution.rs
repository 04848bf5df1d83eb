use super::{Coord, Direction, Environment, FitnessModel, Path};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Consecutive infeasible move proposals tolerated before a random walk stops early.
pub const MAX_MOVE_ATTEMPTS: usize = 20;

/// Where random paths may begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Any non-obstacle cell.
    #[default]
    Random,
    /// A non-obstacle cell on the top face (`z = depth - 1`).
    TopFace,
    /// A non-obstacle cell anywhere on the grid boundary.
    Boundary,
}

#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error("NoStartCell: no passable cell satisfies start policy {0:?}")]
    NoStartCell(StartPolicy),
    #[error("InvalidPathLength: max_path_length must be at least 1")]
    InvalidPathLength,
}

/// Seeds initial populations with random walks from policy-conforming start cells.
#[derive(Debug, Clone)]
pub struct Distribution {
    policy: StartPolicy,
    start_cells: Vec<Coord>,
    max_path_length: usize,
}

impl Distribution {
    /// Resolves the eligible start cells once for the whole run.
    #[instrument(level = "debug", skip(environment), fields(policy = ?policy, max_path_length = max_path_length))]
    pub fn new(
        policy: StartPolicy,
        environment: &Environment,
        max_path_length: usize,
    ) -> Result<Self, DistributionError> {
        if max_path_length == 0 {
            return Err(DistributionError::InvalidPathLength);
        }

        let dimensions = environment.dimensions();
        let start_cells: Vec<Coord> = (0..dimensions.cell_count())
            .map(|i| dimensions.coord(i))
            .filter(|&c| environment.is_passable(c))
            .filter(|&c| match policy {
                StartPolicy::Random => true,
                StartPolicy::TopFace => c.z == dimensions.depth - 1,
                StartPolicy::Boundary => dimensions.is_boundary(c),
            })
            .collect();

        if start_cells.is_empty() {
            return Err(DistributionError::NoStartCell(policy));
        }

        Ok(Self {
            policy,
            start_cells,
            max_path_length,
        })
    }

    pub fn policy(&self) -> StartPolicy {
        self.policy
    }

    pub fn max_path_length(&self) -> usize {
        self.max_path_length
    }

    pub fn start_cells(&self) -> &[Coord] {
        &self.start_cells
    }

    fn pick_start<R: Rng>(&self, rng: &mut R) -> Coord {
        self.start_cells[rng.random_range(0..self.start_cells.len())]
    }

    /// Random walk of at most `max_path_length` genes along feasible unit moves.
    pub fn random_path<R: Rng>(&self, environment: &Environment, rng: &mut R) -> Path {
        let mut current = self.pick_start(rng);
        let mut genes = Vec::with_capacity(self.max_path_length);
        genes.push(current);

        'walk: while genes.len() < self.max_path_length {
            for _ in 0..MAX_MOVE_ATTEMPTS {
                let next = current.step(Direction::random(rng));
                if environment.is_passable(next) {
                    genes.push(next);
                    current = next;
                    continue 'walk;
                }
            }
            // Dead end: keep the shorter path
            break;
        }

        Path::new(genes)
    }

    /// Generates and evaluates `size` random paths.
    #[instrument(level = "debug", skip(self, model, rng), fields(size = size, policy = ?self.policy))]
    pub fn distribute<R: Rng>(&self, size: usize, model: &FitnessModel, rng: &mut R) -> Vec<Path> {
        (0..size)
            .map(|_| {
                let mut path = self.random_path(model.environment(), rng);
                model.evaluate(&mut path);
                path
            })
            .collect()
    }
}
