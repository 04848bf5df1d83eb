mod errors;
mod service;
mod service_builder;
mod worker;

pub(crate) mod models;

pub use errors::Error;
pub use models::{Interrupt, RunOutcome, WorkerReport};
pub use service::Service;
pub use service_builder::ServiceBuilder;
