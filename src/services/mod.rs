pub mod lock;
pub mod optimization;
