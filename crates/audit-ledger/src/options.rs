//! `LedgerOptions`: the validated construction-time configuration for a
//! [`crate::Ledger`]. Deliberately a plain struct, not a `config`-crate file
//! loader — loading it from env/CLI is the host's job; `apps/audit-ledger-cli`
//! shows one way to do it.

use std::time::Duration;

use audit_ledger_canon::SecretKey;
use audit_ledger_writer::{WriterConfig, WriterError};

/// Construction-time options for a [`crate::Ledger`].
#[derive(Clone)]
pub struct LedgerOptions {
    /// The deployment-wide Genesis anchor: 64-char lowercase hex.
    pub genesis_hash: String,
    /// The HMAC secret key shared by the writer and the verifier.
    pub secret: SecretKey,
    /// Resource name the writer's lease is acquired against.
    pub lock_resource_name: String,
    /// How long an acquired lease remains valid without renewal.
    pub lease_duration: Duration,
    /// How often the writer's heartbeat renews the lease.
    pub lease_renew_interval: Duration,
    /// Maximum persistence attempts per intent (including the first).
    pub retry_attempts: u32,
    /// Base delay, in seconds, for the exponential retry backoff.
    pub retry_base_seconds: u64,
    /// Bounded queue capacity (default 100,000).
    pub queue_capacity: usize,
}

impl LedgerOptions {
    /// Build options with the library's defaults for everything but the
    /// Genesis anchor and secret.
    pub fn new(genesis_hash: impl Into<String>, secret: SecretKey) -> Self {
        let writer_defaults = WriterConfig::new(genesis_hash, secret);
        Self {
            genesis_hash: writer_defaults.genesis_hash,
            secret: writer_defaults.secret,
            lock_resource_name: writer_defaults.lock_resource_name,
            lease_duration: writer_defaults.lease_duration,
            lease_renew_interval: writer_defaults.lease_renew_interval,
            retry_attempts: writer_defaults.retry_attempts,
            retry_base_seconds: writer_defaults.retry_base_seconds,
            queue_capacity: writer_defaults.queue_capacity,
        }
    }

    pub(crate) fn into_writer_config(self) -> WriterConfig {
        WriterConfig {
            genesis_hash: self.genesis_hash,
            secret: self.secret,
            lock_resource_name: self.lock_resource_name,
            lease_duration: self.lease_duration,
            lease_renew_interval: self.lease_renew_interval,
            retry_attempts: self.retry_attempts,
            retry_base_seconds: self.retry_base_seconds,
            queue_capacity: self.queue_capacity,
        }
    }

    /// Validate option invariants. Fails at startup, never
    /// mid-operation.
    pub fn validate(&self) -> Result<(), WriterError> {
        self.clone().into_writer_config().validate()
    }
}
