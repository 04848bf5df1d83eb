use crate::models::{Crossover, FitnessModel, Mutagen, Path, SelectionError, Selector};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::instrument;

/// Upper bound for the elite fraction; at least some offspring must be bred.
pub const MAX_ELITISM: f64 = 0.95;

/// Fraction of an island carried unchanged into the next generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64")]
pub struct Elitism(f64);

impl TryFrom<f64> for Elitism {
    type Error = ElitismOutOfRange;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("elitism_percent must be between 0.0 and {MAX_ELITISM}, got: {0}")]
pub struct ElitismOutOfRange(f64);

impl Elitism {
    pub fn new(value: f64) -> Result<Self, ElitismOutOfRange> {
        if !(0.0..=MAX_ELITISM).contains(&value) {
            return Err(ElitismOutOfRange(value));
        }

        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Number of elites for a population of `size`: `max(1, floor(elitism * size))`,
    /// never more than `size`.
    pub fn count(&self, size: usize) -> usize {
        ((self.0 * size as f64).floor() as usize).max(1).min(size)
    }
}

fn by_fitness_descending(a: &Path, b: &Path) -> Ordering {
    b.fitness.total_cmp(&a.fitness)
}

/// Runs one generational replacement step on a single island.
pub(crate) struct Breeder<'a> {
    model: &'a FitnessModel,
    selector: &'a Selector,
    crossover: &'a Crossover,
    mutagen: &'a Mutagen,
    elitism: Elitism,
    max_path_length: usize,
}

impl<'a> Breeder<'a> {
    pub(crate) fn new(
        model: &'a FitnessModel,
        selector: &'a Selector,
        crossover: &'a Crossover,
        mutagen: &'a Mutagen,
        elitism: Elitism,
        max_path_length: usize,
    ) -> Self {
        Self {
            model,
            selector,
            crossover,
            mutagen,
            elitism,
            max_path_length,
        }
    }

    fn breed_child(
        &self,
        parents: &[Path],
        progress: f64,
        rng: &mut impl rand::Rng,
    ) -> Result<Path, SelectionError> {
        let lhs = &parents[self.selector.select(parents, rng)?];
        let rhs = &parents[self.selector.select(parents, rng)?];

        let genes = if self.crossover.should_recombine(rng) {
            self.crossover.apply(rng, lhs, rhs, self.max_path_length)
        } else {
            lhs.genes().to_vec()
        };

        let mut child = Path::new(genes);
        self.mutagen
            .mutate(rng, &mut child, self.model.environment(), progress);
        self.model.evaluate(&mut child);

        Ok(child)
    }

    /// Replaces `island` with its next generation. Island size is preserved.
    ///
    /// After the call the island's elites sit at the front, sorted by fitness.
    #[instrument(level = "debug", skip(self, island, rng), fields(island_size = island.len(), elitism = self.elitism.value(), progress = progress))]
    pub(crate) fn next_generation(
        &self,
        island: &mut Vec<Path>,
        progress: f64,
        rng: &mut impl rand::Rng,
    ) -> Result<(), SelectionError> {
        if island.is_empty() {
            return Err(SelectionError::NoCandidates);
        }

        island.sort_by(by_fitness_descending);

        let size = island.len();
        let elites = self.elitism.count(size);

        let mut next = Vec::with_capacity(size);
        next.extend_from_slice(&island[..elites]);
        while next.len() < size {
            next.push(self.breed_child(island, progress, rng)?);
        }

        *island = next;
        Ok(())
    }
}

/// The fittest path of `paths`, if any.
pub(crate) fn fittest(paths: &[Path]) -> Option<&Path> {
    paths.iter().min_by(|a, b| by_fitness_descending(a, b))
}
