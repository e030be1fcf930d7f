#![forbid(unsafe_code)]

//! Audit ledger CLI – a small demo binary exercising the `audit-ledger`
//! facade against the in-memory reference store.
//!
//! This is not a server: the store lives only for the duration of one
//! invocation, so each subcommand sets up a fresh ledger, performs its
//! scripted operations, and tears the writer down again. It exists to give
//! the crate an executable entry point alongside the library.
//!
//! Usage examples:
//!   $ audit-ledger-cli append USER_LOGIN '{"actorId":"alice"}'
//!   $ audit-ledger-cli demo
//!
//! Build & run in debug mode:
//!   cargo run -p audit-ledger-cli -- demo

use std::sync::Arc;

use anyhow::{Context, Result};
use audit_ledger::{Ledger, LedgerOptions, LedgerStore, PayloadValue, SecretKey, VerifyOutcome};
use audit_ledger_store_memory::MemoryStore;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "audit-ledger",
    version = env!("CARGO_PKG_VERSION"),
    about = "Demo CLI for the tamper-evident audit ledger",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Genesis anchor: 64-char lowercase hex. Defaults to 64 zeros.
    #[arg(long, global = true, default_value = "0000000000000000000000000000000000000000000000000000000000000000")]
    genesis: String,

    /// HMAC secret key. Defaults to a fixed demo key — never use this default
    /// outside local experimentation.
    #[arg(long, global = true, default_value = "demo-secret-key")]
    secret: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a single event and print the sealed entry as JSON.
    Append {
        /// Event classifier, e.g. `USER_LOGIN`.
        event_type: String,
        /// JSON object payload, e.g. `{"actorId":"alice"}`.
        payload: String,
    },
    /// Run a short scripted scenario: three sequential entries, then verify.
    Demo,
    /// Print the current chain head, or nothing if the ledger is empty.
    Head,
    /// Look up a single entry by id and print it as JSON.
    Show {
        /// The entry's id, e.g. `00000000-0000-0000-0000-000000000001`.
        id: Uuid,
    },
    /// Start an empty ledger and immediately verify it.
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::try_init().ok();
    let cli = Cli::parse();

    let genesis = cli.genesis.trim().to_lowercase();
    let secret = SecretKey::new(cli.secret.into_bytes())
        .map_err(|e| anyhow::anyhow!("invalid secret: {e}"))?;
    let options = LedgerOptions::new(genesis, secret);

    let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
    let (ledger, writer) = Ledger::start(store, options)
        .map_err(|e| anyhow::anyhow!("failed to start ledger: {e}"))?;

    match cli.command {
        Commands::Append { event_type, payload } => {
            let payload = parse_payload(&payload)?;
            let entry = ledger
                .add_entry(event_type, payload, CancellationToken::new())
                .await
                .map_err(|e| anyhow::anyhow!("append failed: {e}"))?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        Commands::Demo => {
            let events = [
                ("USER_LOGIN", r#"{"actorId":"alice"}"#),
                ("DOCUMENT_VIEWED", r#"{"actorId":"alice","docId":"42"}"#),
                ("USER_LOGOUT", r#"{"actorId":"alice"}"#),
            ];
            for (event_type, payload) in events {
                let payload = parse_payload(payload)?;
                let entry = ledger
                    .add_entry(event_type, payload, CancellationToken::new())
                    .await
                    .map_err(|e| anyhow::anyhow!("append failed: {e}"))?;
                println!(
                    "sequence={} event_type={} current_hash={}",
                    entry.sequence, entry.event_type, entry.current_hash
                );
            }
            report_verify(&ledger).await?;
        }
        Commands::Head => match ledger.get_head().await.map_err(|e| anyhow::anyhow!("get_head failed: {e}"))? {
            Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
            None => println!("ledger is empty"),
        },
        Commands::Show { id } => {
            match ledger
                .get_by_id(id)
                .await
                .map_err(|e| anyhow::anyhow!("get_by_id failed: {e}"))?
            {
                Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
                None => println!("no entry with id {id}"),
            }
        }
        Commands::Verify => {
            report_verify(&ledger).await?;
        }
    }

    writer.request_shutdown();
    writer
        .join()
        .await
        .map_err(|e| anyhow::anyhow!("writer did not shut down cleanly: {e}"))?;
    Ok(())
}

async fn report_verify(ledger: &Ledger) -> Result<()> {
    match ledger
        .verify(CancellationToken::new())
        .await
        .map_err(|e| anyhow::anyhow!("verify failed: {e}"))?
    {
        VerifyOutcome::Ok { message } => println!("verify: ok ({message})"),
        VerifyOutcome::Tampered { reason, id, sequence } => {
            println!("verify: TAMPERED ({reason}) id={id:?} sequence={sequence:?}")
        }
    }
    Ok(())
}

fn parse_payload(raw: &str) -> Result<PayloadValue> {
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("invalid JSON payload: {raw:?}"))?;
    Ok(json_to_payload(value))
}

fn json_to_payload(value: serde_json::Value) -> PayloadValue {
    match value {
        serde_json::Value::Null => PayloadValue::Null,
        serde_json::Value::Bool(b) => PayloadValue::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                PayloadValue::Integer(i)
            } else {
                PayloadValue::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => PayloadValue::String(s),
        serde_json::Value::Array(items) => {
            PayloadValue::Sequence(items.into_iter().map(json_to_payload).collect())
        }
        serde_json::Value::Object(map) => {
            PayloadValue::Mapping(map.into_iter().map(|(k, v)| (k, json_to_payload(v))).collect())
        }
    }
}
