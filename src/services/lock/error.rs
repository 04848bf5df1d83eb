#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Poisoned: a thread panicked while holding the shared state lock")]
    Poisoned,
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::Poisoned
    }
}
