mod error;
mod service;

pub use error::Error;
pub(crate) use service::Service;
