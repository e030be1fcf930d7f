//! Facade-level error taxonomy, one variant per error kind the outer API
//! can surface.

use audit_ledger_store_core::StoreError;
use audit_ledger_writer::WriterError;
use thiserror::Error;

/// Errors returned by [`crate::Ledger`]'s public operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// `event_type` was empty, or some other caller-supplied value failed
    /// validation before an intent was ever built.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The ledger is shutting down and no longer accepts new intents.
    #[error("ledger is shutting down")]
    ShuttingDown,

    /// The caller's cancellation token fired before the operation completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The store rejected or failed the operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The Single Writer rejected or failed the intent.
    #[error("writer error: {0}")]
    Writer(#[from] WriterError),
}
