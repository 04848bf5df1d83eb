pub mod baseline;
pub mod benchmark;
pub mod bootstrap;
pub mod models;
pub mod services;

pub use benchmark::{WorkerComparison, compare_workers};
pub use bootstrap::{Configuration, bootstrap_optimizer};
pub use services::optimization::{
    Error, Interrupt, RunOutcome, Service, ServiceBuilder, WorkerReport,
};
