#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **audit-ledger-store-core** – the Store Contract.
//!
//! This crate defines [`LedgerStore`], the abstract persistence boundary the
//! Single Writer, Producer Facade and Verifier all depend on, plus the
//! [`StoreError`] taxonomy and the lease types used to coordinate exclusive
//! writer ownership across process restarts. Concrete backends (an
//! in-memory reference store, or a real persistent one) live in separate
//! crates and implement this trait — this crate does not name them.

use std::time::Duration;

use async_trait::async_trait;
use audit_ledger_types::LedgerEntry;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Errors that can occur during store operations.
///
/// Distinguishes transient failures from fatal ones:
/// [`StoreError::DuplicateSequence`] and [`StoreError::LeaseUnavailable`] are
/// fatal to the caller; [`StoreError::Transient`] is retryable.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `append` was called with a `sequence` that already exists. Fatal: it
    /// indicates a second writer is active or the store violated the
    /// uniqueness invariant.
    #[error("duplicate sequence {sequence}")]
    DuplicateSequence {
        /// The sequence number that already existed in the store.
        sequence: u64,
    },
    /// A lease for `resource` is already held by another worker and has not
    /// expired.
    #[error("lease for {resource:?} is held by another worker")]
    LeaseUnavailable {
        /// The resource name the lease was requested for.
        resource: String,
    },
    /// A transient I/O, network, or timeout failure. Callers may retry.
    #[error("transient store error: {0}")]
    Transient(String),
    /// A non-retryable backend failure (schema error, authentication failure, etc).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// `true` if the writer should retry this operation (a transient store
    /// error), `false` if it is fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Result alias for [`LedgerStore`] operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A granted (or renewed) exclusive lease on the writer role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseGrant {
    /// The resource the lease guards (the writer's `lock_resource_name`).
    pub resource: String,
    /// The worker that currently holds the lease.
    pub holder: Uuid,
    /// When the lease expires unless renewed.
    pub expires_at: DateTime<Utc>,
}

/// Abstraction over ledger persistence: append, head lookup, ordered scan,
/// point lookup, and exclusive lease coordination.
///
/// Implementations must preserve durability of appended entries, uniqueness
/// of `sequence` within a ledger, and lease mutual exclusion over its
/// declared duration.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist `entry` atomically. Must enforce sequence uniqueness; a
    /// duplicate sequence surfaces as [`StoreError::DuplicateSequence`].
    async fn append(&self, entry: LedgerEntry) -> StoreResult<()>;

    /// Return the entry with the maximum `sequence`, or `None` if the
    /// ledger is empty.
    async fn get_head(&self) -> StoreResult<Option<LedgerEntry>>;

    /// Return all entries ordered by `(sequence asc, id asc)`. Ordering must
    /// be stable even if insertion order differs from sequence order.
    async fn get_all(&self) -> StoreResult<Vec<LedgerEntry>>;

    /// Return the entry with the given `id`, or `None` if it does not exist.
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<LedgerEntry>>;

    /// Grant or extend an exclusive lease on `resource` to `worker_id` for
    /// `duration`. Succeeds if no lease currently exists, the existing lease
    /// has expired, or `worker_id` already holds it (renewal). Otherwise
    /// fails with [`StoreError::LeaseUnavailable`].
    async fn acquire_or_renew_lease(
        &self,
        resource: &str,
        worker_id: Uuid,
        duration: Duration,
    ) -> StoreResult<LeaseGrant>;
}
