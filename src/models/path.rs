use super::Coord;
use serde::{Deserialize, Serialize};

pub type Gene = Coord;

/// Fitness assigned to any path that leaves the grid or enters an obstacle.
pub const INVALID_FITNESS: f64 = -1e18;

/// A candidate solution: an ordered walk through the grid and its cached evaluation.
///
/// `genes[0]` is the start position. Genetic operators never modify it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub(crate) genes: Vec<Gene>,
    pub(crate) fitness: f64,
    pub(crate) survivors_reached: usize,
    pub(crate) priority_sum: u64,
    pub(crate) coverage: usize,
    pub(crate) risk: u64,
}

impl Path {
    /// Creates an unevaluated path. Its fitness stays at [`INVALID_FITNESS`] until evaluated.
    pub fn new(genes: Vec<Gene>) -> Self {
        Self {
            genes,
            fitness: INVALID_FITNESS,
            survivors_reached: 0,
            priority_sum: 0,
            coverage: 0,
            risk: 0,
        }
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn start(&self) -> Option<Gene> {
        self.genes.first().copied()
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn survivors_reached(&self) -> usize {
        self.survivors_reached
    }

    pub fn priority_sum(&self) -> u64 {
        self.priority_sum
    }

    pub fn coverage(&self) -> usize {
        self.coverage
    }

    pub fn risk(&self) -> u64 {
        self.risk
    }

    pub fn is_feasible(&self) -> bool {
        self.fitness > INVALID_FITNESS
    }
}
