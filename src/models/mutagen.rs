use crate::models::{Direction, Environment, Path};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

fn decay_linear(value: f64, progress: f64, multiplier: f64) -> f64 {
    value * (1.0 - progress * multiplier).max(0.0)
}

fn decay_exponential(value: f64, progress: f64, multiplier: f64, exponent: i32) -> f64 {
    value * (1.0 - progress * multiplier).max(0.0).powi(exponent)
}

// ============================================================
// Decay
// ============================================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decay {
    #[default]
    Constant,
    Linear { multiplier: f64 },
    Exponential { multiplier: f64, exponent: i32 },
}

impl Decay {
    fn apply(&self, value: f64, progress: f64) -> f64 {
        match self {
            Decay::Constant => value,
            Decay::Linear { multiplier } => decay_linear(value, progress, *multiplier),
            Decay::Exponential {
                multiplier,
                exponent,
            } => decay_exponential(value, progress, *multiplier, *exponent),
        }
    }
}

// ============================================================
// MutationRate
// ============================================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MutationRateParameters")]
pub struct MutationRate {
    value: f64,
    decay: Decay,
}

#[derive(Deserialize)]
struct MutationRateParameters {
    value: f64,
    #[serde(default)]
    decay: Decay,
}

impl TryFrom<MutationRateParameters> for MutationRate {
    type Error = MutationRateOutOfRange;

    fn try_from(parameters: MutationRateParameters) -> Result<Self, Self::Error> {
        Self::new(parameters.value, parameters.decay)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("mutation_rate must be between 0.0 and 1.0, got: {0}")]
pub struct MutationRateOutOfRange(f64);

impl MutationRate {
    pub fn new(value: f64, decay: Decay) -> Result<Self, MutationRateOutOfRange> {
        let value = Self::validate(value)?;

        Ok(Self { value, decay })
    }

    pub fn constant(value: f64) -> Result<Self, MutationRateOutOfRange> {
        Self::new(value, Decay::Constant)
    }

    fn validate(value: f64) -> Result<f64, MutationRateOutOfRange> {
        if !(0.0..=1.0).contains(&value) {
            return Err(MutationRateOutOfRange(value));
        }

        Ok(value)
    }

    /// Rate at `progress` through the run, where `0.0` is the start and `1.0` the
    /// generation limit.
    pub fn get(&self, progress: f64) -> f64 {
        self.decay.apply(self.value, progress).clamp(0.0, 1.0)
    }
}

// ============================================================
// Mutagen
// ============================================================

/// Point mutation of a single non-start gene towards one of its six neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutagen {
    mutation_rate: MutationRate,
}

impl Mutagen {
    pub fn new(mutation_rate: MutationRate) -> Self {
        Self { mutation_rate }
    }

    pub fn constant(mutation_rate_value: f64) -> Result<Self, MutationRateOutOfRange> {
        Ok(Self::new(MutationRate::constant(mutation_rate_value)?))
    }

    pub fn mutation_rate(&self) -> &MutationRate {
        &self.mutation_rate
    }

    /// Mutates at most one gene of `path`. Returns whether a gene changed.
    ///
    /// The replacement must be passable; otherwise the gene is left as is. The caller
    /// re-evaluates the path afterwards.
    #[instrument(level = "trace", skip(self, rng, path, environment), fields(path_length = path.len(), progress = progress))]
    pub(crate) fn mutate<R: Rng>(
        &self,
        rng: &mut R,
        path: &mut Path,
        environment: &Environment,
        progress: f64,
    ) -> bool {
        // Should we mutate this path?
        if !rng.random_bool(self.mutation_rate.get(progress)) {
            return false;
        }
        if path.genes.len() < 2 {
            return false;
        }

        // Index 0 is the start position and stays fixed
        let index = rng.random_range(1..path.genes.len());
        let candidate = path.genes[index].step(Direction::random(rng));

        if environment.is_passable(candidate) {
            path.genes[index] = candidate;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coord, Dimensions};
    use rand::{SeedableRng, rngs::StdRng};

    fn open_environment() -> Environment {
        Environment::from_parts(Dimensions::new(5, 5, 5).unwrap(), vec![], vec![]).unwrap()
    }

    fn straight_path() -> Path {
        Path::new((0..5).map(|x| Coord::new(x, 2, 2)).collect())
    }

    #[test]
    fn test_mutation_rate_validation_errors() {
        assert!(MutationRate::new(-0.1, Decay::Constant).is_err());
        assert!(MutationRate::new(1.5, Decay::Constant).is_err());
        assert!(MutationRate::constant(-0.1).is_err());
        assert!(MutationRate::constant(1.5).is_err());
        assert!(Mutagen::constant(2.0).is_err());
    }

    #[test]
    fn test_linear_decay_through_mutation_rate() {
        let rate = MutationRate::new(1.0, Decay::Linear { multiplier: 1.0 }).unwrap();

        assert_eq!(rate.get(0.0), 1.0); // No progress
        assert_eq!(rate.get(0.5), 0.5); // Half progress
        assert_eq!(rate.get(1.0), 0.0); // Full progress
        assert_eq!(rate.get(1.5), 0.0); // Over-progress (clamped)
    }

    #[test]
    fn test_exponential_decay_through_mutation_rate() {
        let rate = MutationRate::new(
            1.0,
            Decay::Exponential {
                multiplier: 1.0,
                exponent: 2,
            },
        )
        .unwrap();

        assert_eq!(rate.get(0.0), 1.0); // No progress
        assert_eq!(rate.get(0.5), 0.25); // Quadratic: (1.0 - 0.5)^2 = 0.25
        assert_eq!(rate.get(1.0), 0.0); // Full progress
    }

    #[test]
    fn test_constant_decay() {
        let rate = MutationRate::constant(0.3).unwrap();

        assert_eq!(rate.get(0.0), 0.3);
        assert_eq!(rate.get(0.5), 0.3);
        assert_eq!(rate.get(1.0), 0.3);
    }

    #[test]
    fn it_mutates_one_non_start_gene_to_a_neighbour() {
        let mut rng = StdRng::seed_from_u64(42);
        let env = open_environment();
        let mutagen = Mutagen::constant(1.0).unwrap();

        // The walk sits in the middle of an open grid, so every neighbour is passable
        for _ in 0..50 {
            let original = straight_path();
            let mut path = original.clone();

            assert!(mutagen.mutate(&mut rng, &mut path, &env, 0.0));
            assert_eq!(path.genes()[0], original.genes()[0]);

            let changed: Vec<usize> = (0..path.len())
                .filter(|&i| path.genes()[i] != original.genes()[i])
                .collect();
            assert_eq!(changed.len(), 1);
            let i = changed[0];
            assert_eq!(path.genes()[i].manhattan(original.genes()[i]), 1);
        }
    }

    #[test]
    fn it_never_moves_into_obstacles_or_off_grid() {
        let mut rng = StdRng::seed_from_u64(9);
        let dimensions = Dimensions::new(3, 1, 1).unwrap();
        let env = Environment::from_parts(dimensions, vec![Coord::new(2, 0, 0)], vec![]).unwrap();
        let mutagen = Mutagen::constant(1.0).unwrap();

        for _ in 0..100 {
            let mut path = Path::new(vec![Coord::new(0, 0, 0), Coord::new(1, 0, 0)]);
            mutagen.mutate(&mut rng, &mut path, &env, 0.0);

            assert_eq!(path.genes()[0], Coord::new(0, 0, 0));
            assert!(path.genes().iter().all(|&c| env.is_passable(c)));
        }
    }

    #[test]
    fn it_respects_zero_mutation_rate() {
        let mut rng = StdRng::seed_from_u64(42);
        let env = open_environment();
        let mutagen = Mutagen::constant(0.0).unwrap();

        let mut path = straight_path();
        assert!(!mutagen.mutate(&mut rng, &mut path, &env, 0.0));
        assert_eq!(path, straight_path());
    }

    #[test]
    fn it_leaves_single_gene_paths_alone() {
        let mut rng = StdRng::seed_from_u64(42);
        let env = open_environment();
        let mutagen = Mutagen::constant(1.0).unwrap();

        let mut path = Path::new(vec![Coord::new(1, 1, 1)]);
        assert!(!mutagen.mutate(&mut rng, &mut path, &env, 0.0));
    }

    #[test]
    fn it_applies_progress_to_decay() {
        let mutagen = Mutagen::new(
            MutationRate::new(0.8, Decay::Linear { multiplier: 1.0 })
                .expect("mutation_rate is in range"),
        );

        assert_eq!(mutagen.mutation_rate().get(0.0), 0.8);
        assert!((mutagen.mutation_rate().get(0.5) - 0.4).abs() < 1e-12);
        assert_eq!(mutagen.mutation_rate().get(1.0), 0.0);
    }

    #[test]
    fn it_validates_deserialized_mutation_rates() {
        let rate: MutationRate = serde_json::from_str(r#"{ "value": 0.4 }"#).unwrap();
        assert_eq!(rate.get(0.5), 0.4);

        let decaying: MutationRate = serde_json::from_str(
            r#"{ "value": 0.4, "decay": { "kind": "linear", "multiplier": 1.0 } }"#,
        )
        .unwrap();
        assert_eq!(decaying.get(1.0), 0.0);

        assert!(serde_json::from_str::<MutationRate>(r#"{ "value": 1.2 }"#).is_err());
    }
}
