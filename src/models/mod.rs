mod breeder;
mod coord;
mod crossover;
mod distribution;
mod fitness;
mod grid;
mod mutagen;
mod path;
mod population;
mod request;
mod schedule;
mod selector;
mod snapshot;

pub use breeder::{Elitism, ElitismOutOfRange, MAX_ELITISM};
pub use coord::{Coord, Direction};
pub use crossover::{Crossover, ProbabilityOutOfRangeError};
pub use distribution::{Distribution, DistributionError, MAX_MOVE_ATTEMPTS, StartPolicy};
pub use fitness::{FitnessModel, FitnessWeights};
pub use grid::{CellState, Dimensions, Environment, Grid, GridError, Priorities, Survivor};
pub use mutagen::{Decay, Mutagen, MutationRate, MutationRateOutOfRange};
pub use path::{Gene, INVALID_FITNESS, Path};
pub use population::{MIN_ISLAND_SIZE, island_size};
pub use request::{Conclusion, Coordination, RequestValidationError, RunRequest, resolve_workers};
pub use schedule::{STAGNATION_EPSILON, Schedule, ScheduleDecision};
pub use selector::{SelectionError, Selector};
pub use snapshot::{IslandSnapshot, JsonSnapshotWriter, Snapshot, SnapshotSink};

pub(crate) use breeder::{Breeder, fittest};
pub(crate) use population::Population;
pub(crate) use schedule::StagnationTracker;
