#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **audit-ledger-canon** – canonical serialization and sealing.
//!
//! [`canonical_bytes`] is the single source of truth for "what bytes get
//! hashed": a hand-written, fixed-field-order JSON writer, deliberately
//! *not* built on `serde_json`'s struct serialization (struct field order is
//! not part of serde's contract, and a `HashMap`-backed `serde_json::Value`
//! would silently reorder payload keys). [`seal`] turns those bytes into the
//! HMAC-SHA256 hex digest that is an entry's `current_hash`.

use audit_ledger_types::{LedgerEntry, PayloadValue};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Errors raised while validating sealing options.
///
/// These are startup-time failures, not runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    /// The Genesis anchor was not a 64-character lowercase hex string.
    #[error("genesis anchor must be 64 lowercase hex characters, got {0:?}")]
    InvalidGenesisAnchor(String),
    /// The HMAC secret key was empty.
    #[error("secret key must be non-empty")]
    EmptySecretKey,
}

/// The HMAC secret key, held only in process memory.
///
/// Never logged, never persisted alongside entries. The `Debug` impl
/// redacts the contents so an accidental `{:?}` in a log statement cannot
/// leak it.
#[derive(Clone)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Build a secret key, rejecting the empty string.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, CanonError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(CanonError::EmptySecretKey);
        }
        Ok(Self(bytes))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&"<redacted>").finish()
    }
}

/// Validate a Genesis anchor string: exactly 64 lowercase hex characters.
pub fn validate_genesis(genesis: &str) -> Result<(), CanonError> {
    let ok = genesis.len() == 64
        && genesis.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if ok {
        Ok(())
    } else {
        Err(CanonError::InvalidGenesisAnchor(genesis.to_string()))
    }
}

/// Produce the deterministic, UTF-8, fixed-field-order canonical bytes of an
/// entry's signable content (i.e. everything except `current_hash`).
///
/// Field order: `sequence`, `id`, `timestamp`, `previousHash`, `eventType`,
/// `payload`. No whitespace, no trailing commas.
pub fn canonical_bytes(entry: &LedgerEntry) -> Vec<u8> {
    let mut out = String::new();
    out.push('{');

    out.push_str("\"sequence\":");
    write_integer(&mut out, entry.sequence as i64);
    out.push(',');

    out.push_str("\"id\":");
    write_string(&mut out, &entry.id.hyphenated().to_string());
    out.push(',');

    out.push_str("\"timestamp\":");
    write_string(&mut out, &entry.timestamp.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, false));
    out.push(',');

    out.push_str("\"previousHash\":");
    write_string(&mut out, &entry.previous_hash.to_lowercase());
    out.push(',');

    out.push_str("\"eventType\":");
    write_string(&mut out, &entry.event_type);
    out.push(',');

    out.push_str("\"payload\":");
    write_payload(&mut out, &entry.payload);

    out.push('}');
    out.into_bytes()
}

fn write_payload(out: &mut String, value: &PayloadValue) {
    match value {
        PayloadValue::Null => out.push_str("null"),
        PayloadValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        PayloadValue::Integer(i) => write_integer(out, *i),
        PayloadValue::Float(f) => write_float(out, *f),
        PayloadValue::String(s) => write_string(out, s),
        PayloadValue::Sequence(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_payload(out, item);
            }
            out.push(']');
        }
        PayloadValue::Mapping(pairs) => {
            out.push('{');
            for (i, (k, v)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, k);
                out.push(':');
                write_payload(out, v);
            }
            out.push('}');
        }
    }
}

fn write_integer(out: &mut String, value: i64) {
    // i64 has no exponent form and no negative-zero representation.
    out.push_str(&value.to_string());
}

fn write_float(out: &mut String, value: f64) {
    if value == 0.0 {
        // Collapses +0.0 and -0.0 to the same canonical literal.
        out.push_str("0.0");
        return;
    }
    let rendered = format!("{value}");
    if rendered.contains(['e', 'E']) {
        // Rust's default Display can fall back to scientific notation for
        // very large/small magnitudes; exponent literals are not canonical.
        let mut fixed = format!("{value:.17}");
        while fixed.contains('.') && fixed.ends_with('0') {
            fixed.pop();
        }
        if fixed.ends_with('.') {
            fixed.push('0');
        }
        out.push_str(&fixed);
    } else {
        out.push_str(&rendered);
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            // Non-ASCII characters pass through unescaped.
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Compute `HMAC-SHA256(secret, bytes)` and return it as 64 lowercase hex
/// characters — an entry's `current_hash`.
pub fn seal(bytes: &[u8], secret: &SecretKey) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(bytes);
    hex::encode(mac.finalize().into_bytes())
}
