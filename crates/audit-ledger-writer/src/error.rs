//! Error types for the writer and its bounded queue.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type WriterResult<T> = Result<T, WriterError>;

/// Errors surfaced by the queue and the Single Writer.
#[derive(Debug, Clone, Error)]
pub enum WriterError {
    /// The queue has been closed; no further intents are accepted
    /// (the *shutting-down* error kind).
    #[error("queue is shutting down")]
    ShuttingDown,

    /// The writer transitioned to `Failed` and will not process any more
    /// intents (surfaced to callers as a *writer-error*). The held reason is whatever
    /// caused the terminal failure: lost lease, a fatal store error, or a
    /// duplicate-sequence conflict.
    #[error("writer failed: {0}")]
    Failed(String),

    /// `WriterConfig` failed validation at construction time.
    #[error("invalid writer configuration: {0}")]
    InvalidConfig(String),

    /// The caller's cancellation signal fired before the operation completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl WriterError {
    /// `true` when this error should be reported to the host as 500/"writer
    /// error" rather than a client-facing 4xx.
    pub fn is_writer_error(&self) -> bool {
        matches!(self, WriterError::Failed(_))
    }
}
