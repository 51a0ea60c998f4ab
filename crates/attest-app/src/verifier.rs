use attest_crypto::Identity;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::Signature;

use crate::trust_store::TrustedKey;

/// Result of scanning the trust set for keys that validate a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// At least one trusted key validates the signature. Every matching key
    /// is reported, so a multi-match is visible instead of silently resolving
    /// to whichever key happened to be scanned first.
    Verified { matched: Vec<TrustedKey> },
    /// No trusted key validates. A normal negative result, not an error.
    NotVerified,
}

/// Check `signature` over `payload` against every trusted key.
///
/// A stored key that fails base64 or SPKI decoding is skipped with a warning;
/// one bad row must not abort verification against the rest of the set.
pub fn verify(payload: &[u8], signature: &[u8], trusted: &[TrustedKey]) -> Verdict {
    let Ok(signature) = Signature::from_slice(signature) else {
        // Not even signature-shaped; no key can validate it.
        return Verdict::NotVerified;
    };

    let mut matched = Vec::new();
    for key in trusted {
        let der = match BASE64.decode(&key.public_key) {
            Ok(der) => der,
            Err(e) => {
                tracing::warn!(error = %e, "skipping trusted key with invalid base64");
                continue;
            }
        };
        let verifying = match Identity::decode_public_key(&der) {
            Ok(k) => k,
            Err(e) => {
                tracing::warn!(error = %e, "skipping structurally invalid trusted key");
                continue;
            }
        };
        if Identity::verify(&verifying, payload, &signature).is_ok() {
            matched.push(key.clone());
        }
    }

    if matched.is_empty() {
        Verdict::NotVerified
    } else {
        Verdict::Verified { matched }
    }
}
