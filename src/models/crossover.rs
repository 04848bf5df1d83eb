use crate::models::{Gene, Path};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Performs single-point crossover at the specified cut point.
///
/// The start gene always comes from `lhs`, as does everything before `point`.
fn crossover_single_point(lhs: &Path, rhs: &Path, point: usize, max_length: usize) -> Vec<Gene> {
    let lhs_genome = lhs.genes();
    let rhs_genome = rhs.genes();
    let mut genome = Vec::with_capacity(rhs_genome.len().min(max_length));

    genome.extend_from_slice(&lhs_genome[..point]); // Start and head from lhs
    genome.extend_from_slice(&rhs_genome[point..]); // Tail from rhs
    genome.truncate(max_length);
    genome
}

/// Single-point recombination of two paths.
///
/// With probability `rate` a child is produced by cutting both parents at the same
/// random position `c` in `[1, min_len - 1]` and joining the head of the first parent
/// with the tail of the second. Otherwise the breeder clones the first parent.
///
/// The cut never falls before index 1, so the child keeps the first parent's start
/// position. Parents with two genes or fewer cannot be cut meaningfully; the child is
/// then a plain copy of the first parent.
///
/// ```rust
/// use rescue_ga::models::Crossover;
///
/// let crossover = Crossover::single_point(0.8)?;
/// assert_eq!(crossover.rate(), 0.8);
///
/// assert!(Crossover::single_point(1.5).is_err());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CrossoverParameters")]
pub struct Crossover {
    rate: f64,
}

#[derive(Deserialize)]
struct CrossoverParameters {
    rate: f64,
}

impl TryFrom<CrossoverParameters> for Crossover {
    type Error = ProbabilityOutOfRangeError;

    fn try_from(parameters: CrossoverParameters) -> Result<Self, Self::Error> {
        Self::single_point(parameters.rate)
    }
}

/// Error returned when a crossover rate lies outside `[0.0, 1.0]`.
#[derive(Debug, thiserror::Error)]
#[error("crossover_rate must be between 0.0 and 1.0, got {0}")]
pub struct ProbabilityOutOfRangeError(f64);

impl Crossover {
    pub fn single_point(rate: f64) -> Result<Self, ProbabilityOutOfRangeError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ProbabilityOutOfRangeError(rate));
        }

        Ok(Self { rate })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Decides whether the next child is recombined or cloned.
    pub(crate) fn should_recombine<R: Rng>(&self, rng: &mut R) -> bool {
        rng.random_bool(self.rate)
    }

    /// Recombines two parents into a new genome of at most `max_length` genes.
    #[instrument(level = "trace", skip(self, rng, lhs, rhs), fields(lhs_length = lhs.len(), rhs_length = rhs.len()))]
    pub(crate) fn apply<R: Rng>(
        &self,
        rng: &mut R,
        lhs: &Path,
        rhs: &Path,
        max_length: usize,
    ) -> Vec<Gene> {
        let min_length = lhs.len().min(rhs.len());
        if min_length <= 2 {
            return lhs.genes().to_vec();
        }

        let point = rng.random_range(1..min_length); // Cut point
        crossover_single_point(lhs, rhs, point, max_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coord;
    use rand::{SeedableRng, rngs::StdRng};

    fn path(xs: &[i32]) -> Path {
        Path::new(xs.iter().map(|&x| Coord::new(x, 0, 0)).collect())
    }

    fn xs(genome: &[Gene]) -> Vec<i32> {
        genome.iter().map(|c| c.x).collect()
    }

    #[test]
    fn it_performs_single_point_crossover() {
        let parent_a = path(&[1, 2, 3, 4, 5]);
        let parent_b = path(&[6, 7, 8, 9, 10]);

        let child = crossover_single_point(&parent_a, &parent_b, 1, 100);
        assert_eq!(xs(&child), vec![1, 7, 8, 9, 10]);

        let child = crossover_single_point(&parent_a, &parent_b, 3, 100);
        assert_eq!(xs(&child), vec![1, 2, 3, 9, 10]);

        let child = crossover_single_point(&parent_a, &parent_b, 4, 100);
        assert_eq!(xs(&child), vec![1, 2, 3, 4, 10]);
    }

    #[test]
    fn it_takes_the_whole_tail_of_a_longer_second_parent() {
        let parent_a = path(&[1, 2, 3]);
        let parent_b = path(&[6, 7, 8, 9, 10, 11]);

        let child = crossover_single_point(&parent_a, &parent_b, 2, 100);
        assert_eq!(xs(&child), vec![1, 2, 8, 9, 10, 11]);
    }

    #[test]
    fn it_truncates_to_max_length() {
        let parent_a = path(&[1, 2, 3]);
        let parent_b = path(&[6, 7, 8, 9, 10, 11]);

        let child = crossover_single_point(&parent_a, &parent_b, 1, 4);
        assert_eq!(xs(&child), vec![1, 7, 8, 9]);
    }

    #[test]
    fn it_always_keeps_the_first_parents_start() {
        let crossover = Crossover::single_point(1.0).unwrap();
        let parent_a = path(&[1, 2, 3, 4, 5, 6, 7]);
        let parent_b = path(&[20, 21, 22, 23, 24]);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let child = crossover.apply(&mut rng, &parent_a, &parent_b, 100);
            assert_eq!(child[0], parent_a.genes()[0]);
            assert!(child.len() >= 2);
        }
    }

    #[test]
    fn it_copies_the_first_parent_when_too_short() {
        let crossover = Crossover::single_point(1.0).unwrap();
        let parent_a = path(&[1, 2, 3, 4]);
        let parent_b = path(&[6, 7]);
        let mut rng = StdRng::seed_from_u64(42);

        let child = crossover.apply(&mut rng, &parent_a, &parent_b, 100);
        assert_eq!(child, parent_a.genes());
    }

    #[test]
    fn it_validates_crossover_rate() {
        assert!(Crossover::single_point(-0.1).is_err());
        assert!(Crossover::single_point(1.5).is_err());
        assert!(Crossover::single_point(0.0).is_ok());
        assert!(Crossover::single_point(1.0).is_ok());
    }

    #[test]
    fn it_respects_extreme_rates() {
        let mut rng = StdRng::seed_from_u64(42);

        let never = Crossover::single_point(0.0).unwrap();
        let always = Crossover::single_point(1.0).unwrap();

        for _ in 0..50 {
            assert!(!never.should_recombine(&mut rng));
            assert!(always.should_recombine(&mut rng));
        }
    }

    #[test]
    fn it_validates_deserialized_rates() {
        let crossover: Crossover = serde_json::from_str(r#"{ "rate": 0.6 }"#).unwrap();
        assert_eq!(crossover.rate(), 0.6);

        assert!(serde_json::from_str::<Crossover>(r#"{ "rate": 1.5 }"#).is_err());
        assert!(serde_json::from_str::<Crossover>(r#"{ "rate": -0.2 }"#).is_err());
    }
}
