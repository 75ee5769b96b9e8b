//! Error types shared across AutoClaw crates.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AutoClawError>;

/// Top-level AutoClaw error.
#[derive(Debug, Error)]
pub enum AutoClawError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A loop was requested for a new session without an executor.
    #[error("Invalid session '{0}': an executor is required to create a new session loop")]
    InvalidSession(String),

    #[error("Goal source error: {0}")]
    Goal(String),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Failure reported by an [`Executor`](crate::traits::Executor) invocation.
///
/// Always recoverable from the loop's point of view: it counts towards the
/// consecutive-error threshold and is retried on the next tick.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("executor failed: {0}")]
    Failed(String),

    #[error("executor timed out after {0}s")]
    Timeout(u64),

    #[error("executor unavailable: {0}")]
    Unavailable(String),
}
