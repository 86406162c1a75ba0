use std::io;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, WalkError>;

/// Failure taxonomy for the walk engine.
///
/// Corrupted walker records are deliberately not a variant: a record failing
/// validation on load is dropped, counted and logged rather than aborting the
/// run. See the `lost` counter on `WalkManager`.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("infeasible working set: {0}")]
    SchedulerInfeasible(String),
    #[error("corruption detected: {0}")]
    Corruption(String),
}
