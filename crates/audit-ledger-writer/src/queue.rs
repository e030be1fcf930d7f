//! Bounded, backpressured handoff from many producers to the Single Writer.

use std::sync::{Arc, Mutex};

use audit_ledger_types::Intent;
use tokio::sync::{mpsc, Notify};

use crate::error::WriterError;

/// Coordination state shared by every clone of an [`IntentQueue`]: whether
/// submission has been closed, and how many `submit` calls are currently
/// between their backpressure check and a completed send.
///
/// A bare `AtomicBool` closed flag is not enough to make `close()` safe: a
/// `submit` call that read `closed == false` a moment before `close()` ran
/// can still be suspended on a full channel when the writer's drain pass
/// gives up, silently losing an intent the caller believes is still
/// pending. Tracking in-flight sends under the same lock as the flag lets
/// `close()`'s caller wait until every already-admitted submission has
/// actually landed in the channel before treating it as drained.
#[derive(Default)]
struct Gate {
    closed: bool,
    in_flight: usize,
}

/// Producer-facing handle onto the bounded intent queue.
///
/// `submit` suspends (never drops) when the channel is full — this is the
/// backpressure mechanism this queue exists to provide. Cloning an `IntentQueue`
/// is cheap and all clones share the same gate, so closing one handle closes
/// submission for every producer.
#[derive(Clone)]
pub struct IntentQueue {
    tx: mpsc::Sender<Intent>,
    gate: Arc<Mutex<Gate>>,
    idle: Arc<Notify>,
}

/// Writer-side receiver for the intent queue.
pub struct IntentReceiver {
    rx: mpsc::Receiver<Intent>,
}

impl IntentQueue {
    /// Create a new bounded queue with the given capacity, returning the
    /// producer handle and the writer-side receiver.
    pub fn new(capacity: usize) -> (Self, IntentReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                gate: Arc::new(Mutex::new(Gate::default())),
                idle: Arc::new(Notify::new()),
            },
            IntentReceiver { rx },
        )
    }

    /// Enqueue `intent`, suspending under backpressure. Returns
    /// [`WriterError::ShuttingDown`] if the queue has been closed.
    pub async fn submit(&self, intent: Intent) -> Result<(), WriterError> {
        {
            let mut gate = self.gate.lock().expect("poisoned mutex");
            if gate.closed {
                return Err(WriterError::ShuttingDown);
            }
            gate.in_flight += 1;
        }

        let result = self.tx.send(intent).await;

        {
            let mut gate = self.gate.lock().expect("poisoned mutex");
            gate.in_flight -= 1;
            if gate.closed && gate.in_flight == 0 {
                self.idle.notify_waiters();
            }
        }

        result.map_err(|_| WriterError::ShuttingDown)
    }

    /// Prevent further enqueue. Intents already admitted are unaffected;
    /// call [`IntentQueue::wait_drained`] to block until they have all
    /// finished landing in the channel before draining it.
    pub fn close(&self) {
        let mut gate = self.gate.lock().expect("poisoned mutex");
        gate.closed = true;
        if gate.in_flight == 0 {
            self.idle.notify_waiters();
        }
    }

    /// `true` once [`IntentQueue::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.gate.lock().expect("poisoned mutex").closed
    }

    /// Wait until the queue is closed and every `submit` call admitted
    /// before closure has finished depositing its intent in the channel.
    ///
    /// Only the writer's drain phase calls this, immediately after
    /// `close()`, so that its subsequent `try_recv` sweep cannot race a
    /// still-in-flight send and miss an intent the caller was told would be
    /// processed.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.idle.notified();
            let drained = {
                let gate = self.gate.lock().expect("poisoned mutex");
                gate.closed && gate.in_flight == 0
            };
            if drained {
                return;
            }
            notified.await;
        }
    }
}

impl IntentReceiver {
    /// Await the next intent in arrival order, or `None` if every producer
    /// handle has been dropped.
    pub async fn recv(&mut self) -> Option<Intent> {
        self.rx.recv().await
    }

    /// Drain any intents already buffered without waiting for more.
    pub fn try_recv(&mut self) -> Option<Intent> {
        self.rx.try_recv().ok()
    }
}
