//! Configuration for the Single Writer's lease, retry and queue behavior.

use std::time::Duration;

use audit_ledger_canon::{validate_genesis, SecretKey};

use crate::error::{WriterError, WriterResult};

/// Default lease TTL.
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(30);
/// Default lease renewal interval.
pub const DEFAULT_LEASE_RENEW_INTERVAL: Duration = Duration::from_secs(10);
/// Default bounded-queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;
/// Default retry attempt count.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Default base delay in seconds for the exponential retry schedule.
pub const DEFAULT_RETRY_BASE_SECONDS: u64 = 2;
/// Default resource name the writer's lease is acquired against.
pub const DEFAULT_LOCK_RESOURCE_NAME: &str = "ledger_writer_lock_v1";

/// Configuration recognized by the Single Writer.
///
/// Construct with [`WriterConfig::new`] and call [`WriterConfig::validate`]
/// before starting a writer: a plain, serializable config struct with an
/// explicit fallible validation step rather than validating implicitly on
/// first use.
#[derive(Clone)]
pub struct WriterConfig {
    /// The Genesis anchor: 64-char lowercase hex, `previous_hash` of sequence 1.
    pub genesis_hash: String,
    /// The HMAC secret key used to seal every entry.
    pub secret: SecretKey,
    /// Resource name the writer's lease is acquired against.
    pub lock_resource_name: String,
    /// How long an acquired lease remains valid without renewal.
    pub lease_duration: Duration,
    /// How often the heartbeat task renews the lease. Must be `<
    /// lease_duration`.
    pub lease_renew_interval: Duration,
    /// Maximum number of retries attempted after an intent's initial
    /// persistence try fails with a transient error. Total tries per intent
    /// is this value plus one. Default 3, matching the three documented
    /// backoff delays (2s, 4s, 8s) — one delay precedes each retry.
    pub retry_attempts: u32,
    /// Base delay, in seconds, for the exponential retry backoff
    /// (`base, base*2, base*4, ...`).
    pub retry_base_seconds: u64,
    /// Bounded queue capacity.
    pub queue_capacity: usize,
}

impl WriterConfig {
    /// Build a config with the library's defaults for everything but the
    /// Genesis anchor and secret, which are always required.
    pub fn new(genesis_hash: impl Into<String>, secret: SecretKey) -> Self {
        Self {
            genesis_hash: genesis_hash.into(),
            secret,
            lock_resource_name: DEFAULT_LOCK_RESOURCE_NAME.to_string(),
            lease_duration: DEFAULT_LEASE_DURATION,
            lease_renew_interval: DEFAULT_LEASE_RENEW_INTERVAL,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_seconds: DEFAULT_RETRY_BASE_SECONDS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Validate option invariants. Fails at startup, never
    /// mid-operation.
    pub fn validate(&self) -> WriterResult<()> {
        validate_genesis(&self.genesis_hash)
            .map_err(|e| WriterError::InvalidConfig(e.to_string()))?;
        if self.lease_renew_interval >= self.lease_duration {
            return Err(WriterError::InvalidConfig(format!(
                "lease_renew_interval ({:?}) must be < lease_duration ({:?})",
                self.lease_renew_interval, self.lease_duration
            )));
        }
        if self.queue_capacity == 0 {
            return Err(WriterError::InvalidConfig(
                "queue_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The fixed exponential retry delay for the given zero-based attempt
    /// index (0 => first retry delay, 1 => second, ...).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.retry_base_seconds.saturating_mul(1u64 << attempt))
    }
}
