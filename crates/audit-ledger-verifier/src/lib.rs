#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **audit-ledger-verifier** – read-only full-chain recomputation. Safe to
//! run concurrently with the Single Writer: it only ever
//! calls [`LedgerStore::get_all`].

use std::sync::Arc;

use audit_ledger_canon::{canonical_bytes, seal, SecretKey};
use audit_ledger_store_core::LedgerStore;
use audit_ledger_types::LedgerEntry;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// The result of a completed verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Every entry recomputed cleanly; the chain is intact.
    Ok {
        /// Human-readable summary, e.g. "ledger empty" or entry count.
        message: String,
    },
    /// The chain failed to recompute at some point.
    Tampered {
        /// What went wrong: chain-broken, data-tampered, or sequence-violation.
        reason: String,
        /// The offending entry's id, when one was identified.
        id: Option<Uuid>,
        /// The offending entry's sequence, when one was identified.
        sequence: Option<u64>,
    },
}

/// Errors raised by the verification run itself, distinct from a discovered
/// tamper (which is a [`VerifyOutcome::Tampered`] value, never an `Err`).
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The underlying store failed to answer `get_all`.
    #[error("store read failed: {0}")]
    Store(String),
    /// The caller's cancellation token fired before the pass completed.
    #[error("verification cancelled")]
    Cancelled,
}

/// Recompute the chain from the Genesis anchor to the tail, checking every
/// invariant along the way.
///
/// `genesis` is lowercased before comparison, matching [`validate_genesis`]'s
/// acceptance of lowercase-only anchors. `cancel` is polled once per entry so
/// a caller can abort a long-running pass over a large ledger.
///
/// [`validate_genesis`]: audit_ledger_canon::validate_genesis
pub async fn verify(
    store: Arc<dyn LedgerStore>,
    genesis: &str,
    secret: &SecretKey,
    cancel: CancellationToken,
) -> Result<VerifyOutcome, VerifyError> {
    let mut entries = store
        .get_all()
        .await
        .map_err(|e| VerifyError::Store(e.to_string()))?;

    // Defensive re-sort; a conformant store already
    // returns entries in this order.
    entries.sort_by(|a, b| a.sequence.cmp(&b.sequence).then(a.id.cmp(&b.id)));

    if entries.is_empty() {
        info!("verification complete: ledger empty");
        return Ok(VerifyOutcome::Ok {
            message: "ledger empty".to_string(),
        });
    }

    if let Some(outcome) = check_sequences(&entries) {
        warn!(?outcome, "verification found a sequence violation");
        return Ok(outcome);
    }

    let mut expected = genesis.to_lowercase();
    for entry in &entries {
        if cancel.is_cancelled() {
            return Err(VerifyError::Cancelled);
        }

        if entry.previous_hash != expected {
            let outcome = VerifyOutcome::Tampered {
                reason: format!(
                    "chain-broken: entry {} (sequence {}) expected previous_hash {} but found {}",
                    entry.id, entry.sequence, expected, entry.previous_hash
                ),
                id: Some(entry.id),
                sequence: Some(entry.sequence),
            };
            warn!(?outcome, "verification found a broken chain link");
            return Ok(outcome);
        }

        let recomputed = seal(&canonical_bytes(entry), secret);
        if recomputed != entry.current_hash {
            let outcome = VerifyOutcome::Tampered {
                reason: format!(
                    "data-tampered: entry {} (sequence {}) recomputed hash does not match stored current_hash",
                    entry.id, entry.sequence
                ),
                id: Some(entry.id),
                sequence: Some(entry.sequence),
            };
            warn!(?outcome, "verification found a tampered entry");
            return Ok(outcome);
        }

        expected = recomputed;
    }

    info!(count = entries.len(), "verification complete: chain intact");
    Ok(VerifyOutcome::Ok {
        message: format!("{} entries verified, chain intact", entries.len()),
    })
}

fn check_sequences(entries: &[LedgerEntry]) -> Option<VerifyOutcome> {
    for (idx, entry) in entries.iter().enumerate() {
        let expected_sequence = (idx as u64) + 1;
        if entry.sequence != expected_sequence {
            return Some(VerifyOutcome::Tampered {
                reason: format!(
                    "sequence-violation: expected sequence {} at position {} but found {}",
                    expected_sequence, idx, entry.sequence
                ),
                id: Some(entry.id),
                sequence: Some(entry.sequence),
            });
        }
    }
    None
}
