//! The Single Writer: the only component that mutates the chain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use audit_ledger_canon::{canonical_bytes, seal};
use audit_ledger_store_core::LedgerStore;
use audit_ledger_types::{Intent, IntentFailure, LedgerEntry};
use chrono::Utc;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::WriterConfig;
use crate::error::WriterError;
use crate::queue::{IntentQueue, IntentReceiver};

/// States of the Single Writer's lifecycle. `Failed` is terminal and
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Starting,
    LeaseAcquired,
    Initialized,
    Running,
    Draining,
    Stopped,
    Failed,
}

/// Shared coordination state between the main writer loop and its heartbeat
/// task. Lives only as long as one writer run; never touched by producers
/// or readers.
struct Shared {
    shutdown: Notify,
    lease_lost: AtomicBool,
    lease_lost_notify: Notify,
    heartbeat_stop: Notify,
}

/// Handle used by the host application to request a graceful shutdown and
/// to await the writer's termination.
pub struct WriterHandle {
    shared: Arc<Shared>,
    join: tokio::task::JoinHandle<Result<(), WriterError>>,
}

impl WriterHandle {
    /// Signal the writer to stop accepting new work and drain
    /// (`Running -> Draining`).
    pub fn request_shutdown(&self) {
        self.shared.shutdown.notify_one();
    }

    /// Wait for the writer task to reach a terminal state.
    pub async fn join(self) -> Result<(), WriterError> {
        match self.join.await {
            Ok(result) => result,
            Err(join_err) => Err(WriterError::Failed(format!("writer task panicked: {join_err}"))),
        }
    }
}

/// Spawn the Single Writer as a long-lived task.
///
/// `worker_id` identifies this writer instance for lease ownership; callers
/// typically pass a freshly generated `Uuid::new_v4()` per process.
pub fn spawn(
    store: Arc<dyn LedgerStore>,
    queue: IntentQueue,
    receiver: IntentReceiver,
    config: WriterConfig,
    worker_id: Uuid,
) -> Result<WriterHandle, WriterError> {
    config.validate()?;

    let shared = Arc::new(Shared {
        shutdown: Notify::new(),
        lease_lost: AtomicBool::new(false),
        lease_lost_notify: Notify::new(),
        heartbeat_stop: Notify::new(),
    });

    let run_shared = shared.clone();
    let join = tokio::spawn(async move { run(store, queue, receiver, config, worker_id, run_shared).await });

    Ok(WriterHandle { shared, join })
}

async fn run(
    store: Arc<dyn LedgerStore>,
    queue: IntentQueue,
    mut receiver: IntentReceiver,
    config: WriterConfig,
    worker_id: Uuid,
    shared: Arc<Shared>,
) -> Result<(), WriterError> {
    let mut state = WriterState::Starting;
    info!(%worker_id, "writer starting");

    if let Err(e) = store
        .acquire_or_renew_lease(&config.lock_resource_name, worker_id, config.lease_duration)
        .await
    {
        error!(%worker_id, error = %e, "failed to acquire writer lease");
        return Err(WriterError::Failed(format!("lease acquisition failed: {e}")));
    }
    state = WriterState::LeaseAcquired;
    info!(%worker_id, ?state, "lease acquired");

    let head = store
        .get_head()
        .await
        .map_err(|e| WriterError::Failed(format!("failed to read chain head: {e}")))?;
    let mut head_hash = head
        .as_ref()
        .map(|e| e.current_hash.clone())
        .unwrap_or_else(|| config.genesis_hash.clone());
    let mut head_seq = head.as_ref().map(|e| e.sequence).unwrap_or(0);
    state = WriterState::Initialized;
    info!(%worker_id, head_seq, ?state, "chain head initialized");

    let heartbeat = tokio::spawn(heartbeat_loop(
        store.clone(),
        config.clone(),
        worker_id,
        shared.clone(),
    ));
    state = WriterState::Running;
    info!(%worker_id, ?state, "writer running");

    let result = loop {
        tokio::select! {
            biased;

            _ = shared.lease_lost_notify.notified() => {
                state = WriterState::Failed;
                error!(%worker_id, ?state, "writer lost its lease, stopping");
                break Err(WriterError::Failed("lease lost".to_string()));
            }

            _ = shared.shutdown.notified() => {
                queue.close();
                state = WriterState::Draining;
                info!(%worker_id, ?state, "shutdown requested, draining queue");
                queue.wait_drained().await;
                break drain(&store, &config, &mut receiver, &mut head_hash, &mut head_seq).await;
            }

            maybe_intent = receiver.recv() => {
                match maybe_intent {
                    Some(intent) => {
                        if let Outcome::Fatal(err) = process_intent(
                            &store, &config, &mut head_hash, &mut head_seq, intent,
                        ).await {
                            state = WriterState::Failed;
                            error!(%worker_id, ?state, error = %err, "fatal error processing intent");
                            break Err(err);
                        }
                    }
                    None => {
                        state = WriterState::Stopped;
                        info!(%worker_id, ?state, "producer handles dropped, stopping");
                        break Ok(());
                    }
                }
            }
        }
    };

    shared.heartbeat_stop.notify_one();
    let _ = heartbeat.await;

    if result.is_ok() && state == WriterState::Draining {
        state = WriterState::Stopped;
        info!(%worker_id, ?state, "writer drained and stopped");
    }

    result
}

enum Outcome {
    Continue,
    Fatal(WriterError),
}

async fn process_intent(
    store: &Arc<dyn LedgerStore>,
    config: &WriterConfig,
    head_hash: &mut String,
    head_seq: &mut u64,
    intent: Intent,
    ) -> Outcome {
    let next_seq = *head_seq + 1;
    let mut entry = LedgerEntry {
        id: Uuid::new_v4(),
        sequence: next_seq,
        timestamp: Utc::now(),
        event_type: intent.event_type,
        payload: intent.payload,
        previous_hash: head_hash.clone(),
        current_hash: String::new(),
    };
    let bytes = canonical_bytes(&entry);
    entry.current_hash = seal(&bytes, &config.secret);

    // `config.retry_attempts` counts retries after the initial try, so the
    // last iteration (attempt == retry_attempts) is the final retry, not an
    // extra attempt beyond the documented schedule.
    for attempt in 0..=config.retry_attempts {
        match store.append(entry.clone()).await {
            Ok(()) => {
                *head_hash = entry.current_hash.clone();
                *head_seq = next_seq;
                let _ = intent.ack.send(Ok(entry));
                return Outcome::Continue;
            }
            Err(e) if e.is_retryable() => {
                if attempt == config.retry_attempts {
                    warn!(sequence = next_seq, error = %e, "persistence retries exhausted, failing intent");
                    let _ = intent.ack.send(Err(IntentFailure::WriterError(e.to_string())));
                    return Outcome::Continue;
                }
                let delay = config.retry_delay(attempt);
                warn!(sequence = next_seq, attempt, ?delay, error = %e, "transient store error, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!(sequence = next_seq, error = %e, "fatal store error");
                let _ = intent.ack.send(Err(IntentFailure::WriterError(e.to_string())));
                return Outcome::Fatal(WriterError::Failed(e.to_string()));
            }
        }
    }
    unreachable!("the loop always returns on its final iteration")
}

async fn drain(
    store: &Arc<dyn LedgerStore>,
    config: &WriterConfig,
    receiver: &mut IntentReceiver,
    head_hash: &mut String,
    head_seq: &mut u64,
) -> Result<(), WriterError> {
    while let Some(intent) = receiver.try_recv() {
        if let Outcome::Fatal(err) = process_intent(store, config, head_hash, head_seq, intent).await {
            return Err(err);
        }
    }
    Ok(())
}

async fn heartbeat_loop(
    store: Arc<dyn LedgerStore>,
    config: WriterConfig,
    worker_id: Uuid,
    shared: Arc<Shared>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shared.heartbeat_stop.notified() => return,
            _ = tokio::time::sleep(config.lease_renew_interval) => {}
        }

        match store
            .acquire_or_renew_lease(&config.lock_resource_name, worker_id, config.lease_duration)
            .await
        {
            Ok(_) => {}
            Err(e) => {
                warn!(%worker_id, error = %e, "heartbeat failed to renew lease");
                shared.lease_lost.store(true, Ordering::Release);
                shared.lease_lost_notify.notify_one();
                return;
            }
        }
    }
}
