#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **audit-ledger-types** – core data model for the tamper-evident audit ledger.
//!
//! This crate defines [`LedgerEntry`], the sealed record that makes up the
//! chain, the order-preserving [`PayloadValue`] sum type used for entry
//! payloads, and [`Intent`], the producer-to-writer handoff unit. It has no
//! opinions about hashing, storage, or scheduling — those live in sibling
//! crates so that the data model can be shared by stores, writers and
//! verifiers without a dependency cycle.

use std::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Recursive, order-preserving value used for ledger entry payloads.
///
/// Payloads are opaque to the core, but their
/// *key order* is part of the signed content, so a plain `HashMap` or
/// `serde_json::Map` (whose default build does not preserve insertion order)
/// cannot be used here. [`PayloadValue::Mapping`] stores key/value pairs as a
/// `Vec` in the order the producer supplied them.
///
/// `Serialize`/`Deserialize` are hand-written rather than derived: an
/// `#[serde(untagged)]` derive would serialize `Mapping` as a JSON array of
/// `[key, value]` pairs (tuples serialize as sequences, not objects), and
/// untagged variant matching would then prefer `Sequence` over `Mapping` on
/// the way back in — silently turning every object payload into nested
/// arrays. Dispatching directly on the serde data model (`visit_map` vs.
/// `visit_seq`) sidesteps that ambiguity entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON integer (no exponent form, no negative zero — see `audit-ledger-canon`).
    Integer(i64),
    /// JSON floating point number.
    Float(f64),
    /// JSON string.
    String(String),
    /// JSON array. Order is always significant.
    Sequence(Vec<PayloadValue>),
    /// JSON object. Key order is preserved exactly as supplied by the producer.
    Mapping(Vec<(String, PayloadValue)>),
}

impl Serialize for PayloadValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PayloadValue::Null => serializer.serialize_unit(),
            PayloadValue::Bool(b) => serializer.serialize_bool(*b),
            PayloadValue::Integer(i) => serializer.serialize_i64(*i),
            PayloadValue::Float(f) => serializer.serialize_f64(*f),
            PayloadValue::String(s) => serializer.serialize_str(s),
            PayloadValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            PayloadValue::Mapping(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (k, v) in pairs {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for PayloadValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PayloadValueVisitor)
    }
}

struct PayloadValueVisitor;

impl<'de> Visitor<'de> for PayloadValueVisitor {
    type Value = PayloadValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON null, bool, number, string, array, or object")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(PayloadValue::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(PayloadValue::Null)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
        Ok(PayloadValue::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(PayloadValue::Integer(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        match i64::try_from(v) {
            Ok(i) => Ok(PayloadValue::Integer(i)),
            Err(_) => Ok(PayloadValue::Float(v as f64)),
        }
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(PayloadValue::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        Ok(PayloadValue::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
        Ok(PayloadValue::String(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(PayloadValue::Sequence(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut pairs = Vec::new();
        while let Some(entry) = map.next_entry()? {
            pairs.push(entry);
        }
        Ok(PayloadValue::Mapping(pairs))
    }
}

impl PayloadValue {
    /// Build an empty mapping, the canonical "no payload" value.
    pub fn empty_mapping() -> Self {
        PayloadValue::Mapping(Vec::new())
    }

    /// Convenience constructor for a single-key mapping, the common case for
    /// small event payloads (e.g. `{"actorId": "alice"}`).
    pub fn mapping(pairs: impl IntoIterator<Item = (impl Into<String>, PayloadValue)>) -> Self {
        PayloadValue::Mapping(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// `true` for [`PayloadValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, PayloadValue::Null)
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        PayloadValue::String(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        PayloadValue::String(value)
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        PayloadValue::Integer(value)
    }
}

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        PayloadValue::Bool(value)
    }
}

/// A sealed entry in the audit ledger chain.
///
/// `id`, `sequence` and `timestamp` are assigned by the Single Writer and are
/// immutable once sealed. `current_hash` is excluded from its own canonical
/// input; see `audit-ledger-canon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Globally unique identifier (UUID v4), assigned by the writer.
    pub id: Uuid,
    /// Strictly monotonic sequence number, unique across the ledger, ≥ 1.
    pub sequence: u64,
    /// Wall-clock instant assigned by the writer at sealing time.
    pub timestamp: DateTime<Utc>,
    /// Non-empty classifier of the event.
    pub event_type: String,
    /// Arbitrary structured payload, opaque to the core.
    pub payload: PayloadValue,
    /// Lowercase 64-hex `current_hash` of the prior entry, or the Genesis anchor.
    pub previous_hash: String,
    /// Lowercase 64-hex seal: `HMAC(secret, canonical_bytes(self without current_hash))`.
    pub current_hash: String,
}

impl LedgerEntry {
    /// Returns the canonical 8-4-4-4-12 lowercase hex form of `id`.
    pub fn id_canonical(&self) -> String {
        self.id.hyphenated().to_string()
    }
}

/// A producer's pending submission, handed off to the Single Writer.
///
/// `event_type` and `payload` come straight from `add_entry`'s caller; `ack`
/// is the one-shot completion promise the writer resolves (or rejects) once
/// the entry has been sealed and persisted (or has permanently failed).
pub struct Intent {
    /// Non-empty classifier of the event.
    pub event_type: String,
    /// Arbitrary structured payload supplied by the producer.
    pub payload: PayloadValue,
    /// One-shot channel the writer uses to deliver the outcome.
    pub ack: tokio::sync::oneshot::Sender<Result<LedgerEntry, IntentFailure>>,
}

/// Terminal outcome of a failed intent, as seen by the producer.
///
/// This is deliberately narrow: the producer facade never observes the
/// writer's internal retry attempts, only a final verdict.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IntentFailure {
    /// Persistence failed after exhausting retries, or the writer lost its lease.
    #[error("writer error: {0}")]
    WriterError(String),
}
