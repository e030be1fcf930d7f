#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **audit-ledger-store-memory** – reference in-memory [`LedgerStore`].
//!
//! An ordered list guarded by a mutex, plus a map for leases keyed by
//! resource name — exactly the reference implementation the Store Contract
//! calls for. Intended for tests and local development; it has no
//! durability guarantees and loses all data when the process exits.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use audit_ledger_store_core::{LeaseGrant, LedgerStore, StoreError, StoreResult};
use audit_ledger_types::LedgerEntry;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct LeaseRecord {
    holder: Uuid,
    expires_at: chrono::DateTime<Utc>,
}

/// An in-memory, non-persistent [`LedgerStore`].
///
/// Stores all entries in a `Vec` guarded by a `tokio::sync::Mutex`, plus a
/// `HashMap` of lease records. Safe for concurrent readers and a single
/// writer; see `audit-ledger-writer` for the component that is meant to be
/// the sole caller of `append`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<LedgerEntry>>,
    sequences: Mutex<HashSet<u64>>,
    leases: Mutex<HashMap<String, LeaseRecord>>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append(&self, entry: LedgerEntry) -> StoreResult<()> {
        let mut sequences = self.sequences.lock().await;
        if !sequences.insert(entry.sequence) {
            return Err(StoreError::DuplicateSequence {
                sequence: entry.sequence,
            });
        }
        let mut entries = self.entries.lock().await;
        debug!(sequence = entry.sequence, id = %entry.id, "appended ledger entry");
        entries.push(entry);
        Ok(())
    }

    async fn get_head(&self) -> StoreResult<Option<LedgerEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().max_by_key(|e| e.sequence).cloned())
    }

    async fn get_all(&self) -> StoreResult<Vec<LedgerEntry>> {
        let mut entries = self.entries.lock().await.clone();
        // Defensive: ordering must be stable regardless of insertion order.
        entries.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<LedgerEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().find(|e| e.id == id).cloned())
    }

    async fn acquire_or_renew_lease(
        &self,
        resource: &str,
        worker_id: Uuid,
        duration: Duration,
    ) -> StoreResult<LeaseGrant> {
        let now = Utc::now();
        let mut leases = self.leases.lock().await;
        let expires_at = now
            + chrono::Duration::from_std(duration)
                .map_err(|e| StoreError::Backend(e.to_string()))?;

        match leases.get(resource) {
            Some(existing) if existing.holder != worker_id && existing.expires_at > now => {
                Err(StoreError::LeaseUnavailable {
                    resource: resource.to_string(),
                })
            }
            _ => {
                leases.insert(
                    resource.to_string(),
                    LeaseRecord {
                        holder: worker_id,
                        expires_at,
                    },
                );
                Ok(LeaseGrant {
                    resource: resource.to_string(),
                    holder: worker_id,
                    expires_at,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_ledger_types::PayloadValue;

    fn entry(sequence: u64, previous_hash: &str) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            event_type: "TEST".to_string(),
            payload: PayloadValue::empty_mapping(),
            previous_hash: previous_hash.to_string(),
            current_hash: format!("{:064x}", sequence),
        }
    }

    #[tokio::test]
    async fn append_and_get_head() {
        let store = MemoryStore::new();
        assert!(store.get_head().await.unwrap().is_none());

        store.append(entry(1, &"0".repeat(64))).await.unwrap();
        store.append(entry(2, &"0".repeat(64))).await.unwrap();

        let head = store.get_head().await.unwrap().unwrap();
        assert_eq!(head.sequence, 2);
    }

    #[tokio::test]
    async fn duplicate_sequence_is_rejected() {
        let store = MemoryStore::new();
        store.append(entry(1, &"0".repeat(64))).await.unwrap();
        let err = store.append(entry(1, &"0".repeat(64))).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSequence { sequence: 1 }));
    }

    #[tokio::test]
    async fn get_all_orders_by_sequence_then_id_regardless_of_insertion_order() {
        let store = MemoryStore::new();
        let e3 = entry(3, &"0".repeat(64));
        let e1 = entry(1, &"0".repeat(64));
        let e2 = entry(2, &"0".repeat(64));
        // Insert out of sequence order to exercise the defensive sort.
        store.append(e3.clone()).await.unwrap();
        store.append(e1.clone()).await.unwrap();
        store.append(e2.clone()).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn get_by_id_finds_and_misses() {
        let store = MemoryStore::new();
        let e1 = entry(1, &"0".repeat(64));
        store.append(e1.clone()).await.unwrap();

        assert_eq!(store.get_by_id(e1.id).await.unwrap(), Some(e1));
        assert_eq!(store.get_by_id(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn lease_is_exclusive_until_expiry() {
        let store = MemoryStore::new();
        let w1 = Uuid::new_v4();
        let w2 = Uuid::new_v4();

        store
            .acquire_or_renew_lease("resource", w1, Duration::from_secs(30))
            .await
            .unwrap();

        let err = store
            .acquire_or_renew_lease("resource", w2, Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::LeaseUnavailable { .. }));

        // The current holder may always renew.
        store
            .acquire_or_renew_lease("resource", w1, Duration::from_secs(30))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn lease_can_be_taken_over_after_expiry() {
        let store = MemoryStore::new();
        let w1 = Uuid::new_v4();
        let w2 = Uuid::new_v4();

        store
            .acquire_or_renew_lease("resource", w1, Duration::from_millis(1))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        let grant = store
            .acquire_or_renew_lease("resource", w2, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(grant.holder, w2);
    }
}
