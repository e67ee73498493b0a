//! Error types for Pacer
//!
//! Centralized error handling using thiserror. Only the scheduler
//! lifecycle can fail; task registration and removal are infallible.

use thiserror::Error;

/// All error types that can occur in Pacer
#[derive(Debug, Error)]
pub enum PacerError {
    /// start() called while the scheduling loop is already running
    #[error("scheduler already started")]
    AlreadyStarted,

    /// stop() called before start(), or after a previous stop()
    #[error("scheduler not running")]
    NotRunning,

    /// The scheduling loop thread died unwinding
    #[error("scheduler loop panicked")]
    LoopPanicked,

    /// The OS refused to spawn the scheduling loop thread
    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type alias for Pacer operations
pub type Result<T> = std::result::Result<T, PacerError>;
