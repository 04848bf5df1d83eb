//! Parent selection for the island breeders.
//!
//! Selection is a k-way tournament: `k` candidates are drawn uniformly at random
//! (with replacement) from the island and the fittest one wins.
//!
//! Tournament size guidelines:
//! - **Size 2-3**: Balanced exploration and exploitation
//! - **Size 4-5**: Moderate selection pressure for steady convergence
//! - **Size 6+**: High pressure for rapid convergence (risk of premature convergence)
//!
//! Small islands combined with large tournaments converge quickly. With the default
//! island floor of five paths, sizes above five mostly return the island champion.
//!
//! ```rust
//! use rescue_ga::models::Selector;
//!
//! let balanced = Selector::tournament(3)?;
//! assert_eq!(balanced.tournament_size(), 3);
//! # Ok::<(), rescue_ga::models::SelectionError>(())
//! ```

use crate::models::Path;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Tournament selection configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(try_from = "SelectorParameters")]
pub struct Selector {
    tournament_size: usize,
}

#[derive(Deserialize)]
struct SelectorParameters {
    tournament_size: usize,
}

impl TryFrom<SelectorParameters> for Selector {
    type Error = SelectionError;

    fn try_from(parameters: SelectorParameters) -> Result<Self, Self::Error> {
        Self::tournament(parameters.tournament_size)
    }
}

/// Errors that can occur while configuring or running selection.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    /// A tournament needs at least two competitors to exert any selection pressure.
    #[error("tournament_size must be at least 2, got {0}")]
    InvalidTournamentSize(usize),

    /// Selection from an empty island.
    #[error("No candidates available for selection")]
    NoCandidates,
}

impl Selector {
    /// Creates a tournament selector. `tournament_size` must be at least 2.
    pub fn tournament(tournament_size: usize) -> Result<Self, SelectionError> {
        if tournament_size < 2 {
            return Err(SelectionError::InvalidTournamentSize(tournament_size));
        }

        Ok(Self { tournament_size })
    }

    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }

    /// Returns the index of the tournament winner.
    #[instrument(level = "trace", skip(self, candidates, rng), fields(tournament_size = self.tournament_size, num_candidates = candidates.len()))]
    pub(crate) fn select<R: Rng>(
        &self,
        candidates: &[Path],
        rng: &mut R,
    ) -> Result<usize, SelectionError> {
        if candidates.is_empty() {
            return Err(SelectionError::NoCandidates);
        }

        let mut winner = rng.random_range(0..candidates.len());
        for _ in 1..self.tournament_size {
            let challenger = rng.random_range(0..candidates.len());
            if candidates[challenger].fitness > candidates[winner].fitness {
                winner = challenger;
            }
        }

        Ok(winner)
    }
}
