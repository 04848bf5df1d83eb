use std::time::Duration;
use uuid::Uuid;

/// Smallest island a worker evolves, regardless of how many workers share the population.
pub const MIN_ISLAND_SIZE: usize = 5;

/// Progress of a run as observed by the controller at a generation advance.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub(crate) struct Population {
    pub(crate) run_id: Uuid,
    pub(crate) current_generation: u32,
    pub(crate) best_fitness: Option<f64>,
    pub(crate) elapsed: Duration,
}

/// Number of paths each worker evolves: an even share of the population, but never
/// fewer than [`MIN_ISLAND_SIZE`].
pub fn island_size(population_size: usize, workers: usize) -> usize {
    (population_size / workers.max(1)).max(MIN_ISLAND_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_splits_the_population_evenly() {
        assert_eq!(island_size(40, 4), 10);
        assert_eq!(island_size(40, 4) * 4, 40);
        assert_eq!(island_size(40, 1), 40);
    }

    #[test]
    fn it_keeps_islands_above_the_floor() {
        assert_eq!(island_size(40, 16), MIN_ISLAND_SIZE);
        assert_eq!(island_size(3, 1), MIN_ISLAND_SIZE);
    }

    #[test]
    fn it_treats_zero_workers_as_one() {
        assert_eq!(island_size(12, 0), 12);
    }
}
