//! Error taxonomy shared by all three player subsystems.
//!
//! Mirrors the three-valued status surface the original C ABI exposes
//! (`OK` / `ERROR` / `INVALID_PARAM`) while giving callers inside this
//! crate a typed error to match on.

use thiserror::Error;

/// Errors surfaced by the playback engine.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// Header validation or event-stream validation failed at `open`.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// The handle passed to a control operation is not in the registry.
    #[error("invalid handle")]
    InvalidHandle,

    /// The audio driver rejected an operation for a reason other than
    /// "still playing".
    #[error("driver failure: {0}")]
    DriverFailure(String),

    /// A mutex or condvar wait failed (poisoned lock).
    #[error("synchronization failure: {0}")]
    SyncFailure(String),

    /// Allocation or worker spawn failed during `open`.
    #[error("resource exhausted")]
    ResourceExhausted,
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// The flattened 3-valued status an ABI boundary would want; every
/// [`EngineError`] maps onto one of these, and the absence of an error
/// maps onto `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
    InvalidParam,
}

impl EngineError {
    pub fn to_status(&self) -> Status {
        match self {
            EngineError::InvalidHandle => Status::InvalidParam,
            _ => Status::Error,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for EngineError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        EngineError::SyncFailure(e.to_string())
    }
}
