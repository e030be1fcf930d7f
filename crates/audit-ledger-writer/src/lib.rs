#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! The bounded intent queue and Single Writer state machine. Producers
//! submit [`audit_ledger_types::Intent`]s through an
//! [`IntentQueue`]; a single spawned [`writer::spawn`] task owns the chain
//! head and is the only component that calls
//! [`audit_ledger_store_core::LedgerStore::append`].

mod config;
mod error;
mod queue;
mod writer;

pub use config::{
    WriterConfig, DEFAULT_LEASE_DURATION, DEFAULT_LEASE_RENEW_INTERVAL, DEFAULT_LOCK_RESOURCE_NAME,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_SECONDS,
};
pub use error::{WriterError, WriterResult};
pub use queue::{IntentQueue, IntentReceiver};
pub use writer::{spawn, WriterHandle};
