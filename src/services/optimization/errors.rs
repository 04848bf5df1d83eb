use crate::models::{DistributionError, RequestValidationError, SelectionError};
use crate::services::lock;

/// Errors that can occur while setting up or running an optimization.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("DistributionError: {0}")]
    DistributionError(#[from] DistributionError),
    #[error("RequestValidationError: {0}")]
    RequestValidationError(#[from] RequestValidationError),
    #[error("Selection error: {0}")]
    SelectionError(#[from] SelectionError),
    #[error("Lock error: {0}")]
    LockError(#[from] lock::Error),
    #[error("WorkerPanicked: worker {worker_id} panicked")]
    WorkerPanicked { worker_id: usize },
    #[error("Spawn: could not start worker {worker_id}: {source}")]
    Spawn {
        worker_id: usize,
        source: std::io::Error,
    },
}
