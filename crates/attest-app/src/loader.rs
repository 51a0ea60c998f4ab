//! The load/import path: classify pasted input, verify or import it, and
//! report a single user-facing outcome.
//!
//! Flow: parse wire form, then either scan the trust store for a validating
//! key, or structurally validate and import a bare public key. Every failure
//! mode on this path becomes a [`LoadOutcome`]; nothing here panics or
//! propagates an error to the surface.
//!
//! The work itself (SQLite reads/writes plus signature checks) runs on one
//! owned worker task fed by an mpsc queue; each submission gets its result
//! back on a oneshot channel, so the interactive caller never blocks.

use attest_crypto::Identity;
use attest_protocol::{wire, Candidate, CodecError, Payload, SignedMessage};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::trust_store::TrustStore;
use crate::verifier::{self, Verdict};

/// User-facing result of loading pasted input.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LoadOutcome {
    /// Signature validated against at least one trusted key.
    Verified {
        message: String,
        timestamp_ms: Option<i64>,
        matched_keys: Vec<String>,
    },
    /// No trusted key validates the signature.
    VerificationFailed,
    /// Input was a structurally valid public key and is now in the trust set.
    Imported { key_id: String, already_trusted: bool },
    /// Base64 decoding failed somewhere in the input.
    InvalidEncoding { detail: String },
    /// Input decoded but is not a valid key or wire form.
    InvalidFormat { detail: String },
    /// Anything else, surfaced with its underlying message.
    Error { detail: String },
}

impl std::fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified { message, .. } => {
                write!(f, "Signature verified. Decoded message: {message}")
            }
            Self::VerificationFailed => write!(f, "Signature verification failed"),
            Self::Imported {
                key_id,
                already_trusted: false,
            } => write!(f, "Public key imported successfully ({key_id})"),
            Self::Imported {
                key_id,
                already_trusted: true,
            } => write!(f, "Public key already trusted ({key_id})"),
            Self::InvalidEncoding { detail } => write!(f, "Invalid base64 input: {detail}"),
            Self::InvalidFormat { detail } => write!(f, "Invalid input format: {detail}"),
            Self::Error { detail } => write!(f, "An unexpected error occurred: {detail}"),
        }
    }
}

/// Classify and handle one pasted input against the trust store.
///
/// Synchronous; the [`Loader`] runs it on its worker.
pub fn handle_load(trust: &TrustStore, raw: &str) -> LoadOutcome {
    match wire::parse(raw) {
        Ok(Candidate::SignedMessage(msg)) => verify_message(trust, &msg),
        Ok(Candidate::PublicKey { der }) => import_key(trust, &der),
        Err(CodecError::InvalidEncoding(detail)) => LoadOutcome::InvalidEncoding { detail },
        Err(e) => LoadOutcome::InvalidFormat {
            detail: e.to_string(),
        },
    }
}

fn verify_message(trust: &TrustStore, msg: &SignedMessage) -> LoadOutcome {
    let keys = match trust.list() {
        Ok(keys) => keys,
        Err(e) => {
            return LoadOutcome::Error {
                detail: e.to_string(),
            }
        }
    };

    match verifier::verify(&msg.payload, &msg.signature, &keys) {
        Verdict::Verified { matched } => {
            let (message, timestamp_ms) = match Payload::from_bytes(&msg.payload) {
                Ok(p) => (p.text, Some(p.timestamp_ms)),
                // Foreign or unversioned payload: the bytes verified, show them as-is.
                Err(_) => (String::from_utf8_lossy(&msg.payload).into_owned(), None),
            };
            LoadOutcome::Verified {
                message,
                timestamp_ms,
                matched_keys: matched.into_iter().map(|k| k.public_key).collect(),
            }
        }
        Verdict::NotVerified => LoadOutcome::VerificationFailed,
    }
}

fn import_key(trust: &TrustStore, der: &[u8]) -> LoadOutcome {
    let key = match Identity::decode_public_key(der) {
        Ok(key) => key,
        Err(e) => {
            return LoadOutcome::InvalidFormat {
                detail: e.to_string(),
            }
        }
    };

    // Store the canonical re-encoding of the decoded DER, so dedup holds over
    // one spelling of the key regardless of pasted formatting.
    let public_key_b64 = BASE64.encode(der);
    let key_id = Identity::key_id_of(&key);

    match trust.add(&public_key_b64) {
        Ok(inserted) => {
            tracing::info!(key_id = %key_id, already_trusted = !inserted, "trusted key import");
            LoadOutcome::Imported {
                key_id,
                already_trusted: !inserted,
            }
        }
        Err(e) => LoadOutcome::Error {
            detail: e.to_string(),
        },
    }
}

struct LoadJob {
    raw: String,
    reply: oneshot::Sender<LoadOutcome>,
}

/// Handle to the background load worker.
///
/// One owned task consumes the job queue. Dropping every handle closes the
/// queue and the worker exits after draining it; there is no detached task
/// left behind.
#[derive(Clone)]
pub struct Loader {
    tx: mpsc::Sender<LoadJob>,
}

impl Loader {
    /// Spawn the worker over `trust`.
    pub fn spawn(trust: TrustStore) -> Self {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(worker_loop(trust, rx));
        Self { tx }
    }

    /// Submit raw input and await its outcome.
    pub async fn load(&self, raw: String) -> LoadOutcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = LoadJob {
            raw,
            reply: reply_tx,
        };
        if self.tx.send(job).await.is_err() {
            return LoadOutcome::Error {
                detail: "load worker is gone".into(),
            };
        }
        reply_rx.await.unwrap_or_else(|_| LoadOutcome::Error {
            detail: "load worker dropped the job".into(),
        })
    }
}

async fn worker_loop(trust: TrustStore, mut rx: mpsc::Receiver<LoadJob>) {
    while let Some(job) = rx.recv().await {
        let store = trust.clone();
        let raw = job.raw;
        // SQLite access and signature checks are blocking work; keep them off
        // the async threads.
        let outcome = tokio::task::spawn_blocking(move || handle_load(&store, &raw))
            .await
            .unwrap_or_else(|e| LoadOutcome::Error {
                detail: format!("load task failed: {e}"),
            });
        if job.reply.send(outcome).is_err() {
            tracing::debug!("load result dropped, submitter went away");
        }
    }
}
