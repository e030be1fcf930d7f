#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **audit-ledger** – public facade over the tamper-evident, HMAC-chained
//! audit ledger. Wires the canonical serializer, the Store Contract, the
//! bounded-queue Single Writer, and the full-chain verifier into a single
//! [`Ledger`] handle.

mod error;
mod options;

pub use audit_ledger_canon::SecretKey;
pub use audit_ledger_store_core::{LedgerStore, StoreError};
pub use audit_ledger_types::{IntentFailure, LedgerEntry, PayloadValue};
pub use audit_ledger_verifier::VerifyOutcome;
pub use error::LedgerError;
pub use options::LedgerOptions;

use std::sync::Arc;

use audit_ledger_types::Intent;
use audit_ledger_writer::{IntentQueue, WriterHandle};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// The Producer Facade: the only entry point host applications use to
/// append to, read from, and verify the ledger.
///
/// Cloning a `Ledger` is cheap — every clone shares the same queue and
/// store handle — so it can be handed to many concurrent producers exactly
/// like `audit_ledger_writer::IntentQueue` itself — the producer never reads
/// the chain head, computes hashes, or assigns sequences; only the writer does.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    queue: IntentQueue,
    genesis_hash: String,
    secret: SecretKey,
}

impl Ledger {
    /// Start a ledger backed by `store`: validates `options`, spawns the
    /// Single Writer, and returns the ready-to-use facade plus a
    /// [`WriterHandle`] the host uses to request a graceful shutdown.
    pub fn start(
        store: Arc<dyn LedgerStore>,
        options: LedgerOptions,
    ) -> Result<(Self, WriterHandle), LedgerError> {
        options.validate().map_err(LedgerError::Writer)?;

        let genesis_hash = options.genesis_hash.clone();
        let secret = options.secret.clone();
        let queue_capacity = options.queue_capacity;
        let worker_id = Uuid::new_v4();

        let (queue, receiver) = IntentQueue::new(queue_capacity);
        let writer_config = options.into_writer_config();
        let writer_handle = audit_ledger_writer::spawn(
            store.clone(),
            queue.clone(),
            receiver,
            writer_config,
            worker_id,
        )
        .map_err(LedgerError::Writer)?;

        info!(%worker_id, "ledger started");

        Ok((
            Self {
                store,
                queue,
                genesis_hash,
                secret,
            },
            writer_handle,
        ))
    }

    /// Append a new event to the ledger. Suspends under queue backpressure
    /// and again while awaiting durable persistence; on success the
    /// returned entry has already been sealed and durably written.
    pub async fn add_entry(
        &self,
        event_type: impl Into<String>,
        payload: PayloadValue,
        cancel: CancellationToken,
    ) -> Result<LedgerEntry, LedgerError> {
        let event_type = event_type.into();
        if event_type.is_empty() {
            return Err(LedgerError::InvalidInput(
                "event_type must not be empty".to_string(),
            ));
        }
        if payload.is_null() {
            return Err(LedgerError::InvalidInput(
                "payload must not be null".to_string(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(LedgerError::Cancelled);
        }

        let (ack, ack_rx) = oneshot::channel();
        let intent = Intent {
            event_type,
            payload,
            ack,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LedgerError::Cancelled),
            result = self.queue.submit(intent) => {
                result.map_err(|_| LedgerError::ShuttingDown)?;
            }
        }

        // Cancellation after enqueue detaches the caller; the writer still
        // processes the intent.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LedgerError::Cancelled),
            outcome = ack_rx => {
                match outcome {
                    Ok(Ok(entry)) => Ok(entry),
                    Ok(Err(IntentFailure::WriterError(reason))) => {
                        Err(LedgerError::Writer(audit_ledger_writer::WriterError::Failed(reason)))
                    }
                    Err(_) => Err(LedgerError::ShuttingDown),
                }
            }
        }
    }

    /// Return the current chain head, or `None` if the ledger is empty.
    pub async fn get_head(&self) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.store.get_head().await?)
    }

    /// Look up an entry by its id.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// Run a full-chain verification pass. Read-only; safe to call
    /// concurrently with ongoing writes.
    pub async fn verify(&self, cancel: CancellationToken) -> Result<VerifyOutcome, LedgerError> {
        audit_ledger_verifier::verify(self.store.clone(), &self.genesis_hash, &self.secret, cancel)
            .await
            .map_err(|e| match e {
                audit_ledger_verifier::VerifyError::Cancelled => LedgerError::Cancelled,
                audit_ledger_verifier::VerifyError::Store(reason) => {
                    LedgerError::Store(StoreError::Backend(reason))
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_ledger_store_memory::MemoryStore;

    fn options() -> LedgerOptions {
        let secret = SecretKey::new(b"facade-test-key".to_vec()).unwrap();
        let mut opts = LedgerOptions::new("0".repeat(64), secret);
        opts.lease_renew_interval = std::time::Duration::from_millis(50);
        opts.lease_duration = std::time::Duration::from_millis(500);
        opts
    }

    #[tokio::test]
    async fn add_entry_then_get_by_id_round_trips() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
        let (ledger, writer) = Ledger::start(store, options()).unwrap();

        let payload = PayloadValue::mapping(vec![("actorId".to_string(), PayloadValue::String("alice".to_string()))]);
        let entry = ledger
            .add_entry("USER_LOGIN", payload, CancellationToken::new())
            .await
            .unwrap();
        let fetched = ledger.get_by_id(entry.id).await.unwrap().unwrap();
        assert_eq!(fetched, entry);

        writer.request_shutdown();
        writer.join().await.unwrap();
    }

    #[tokio::test]
    async fn verify_reports_ok_on_untampered_ledger() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
        let (ledger, writer) = Ledger::start(store, options()).unwrap();

        ledger
            .add_entry("A", PayloadValue::empty_mapping(), CancellationToken::new())
            .await
            .unwrap();
        ledger
            .add_entry("B", PayloadValue::empty_mapping(), CancellationToken::new())
            .await
            .unwrap();

        let outcome = ledger.verify(CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, VerifyOutcome::Ok { .. }));

        writer.request_shutdown();
        writer.join().await.unwrap();
    }

    #[tokio::test]
    async fn empty_event_type_is_rejected_before_enqueue() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
        let (ledger, writer) = Ledger::start(store, options()).unwrap();

        let err = ledger
            .add_entry("", PayloadValue::empty_mapping(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        writer.request_shutdown();
        writer.join().await.unwrap();
    }

    #[tokio::test]
    async fn null_payload_is_rejected_before_enqueue() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
        let (ledger, writer) = Ledger::start(store, options()).unwrap();

        let err = ledger
            .add_entry("A", PayloadValue::Null, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        writer.request_shutdown();
        writer.join().await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_before_enqueue_is_honored() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
        let (ledger, writer) = Ledger::start(store, options()).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ledger
            .add_entry("A", PayloadValue::empty_mapping(), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Cancelled));

        writer.request_shutdown();
        writer.join().await.unwrap();
    }
}
