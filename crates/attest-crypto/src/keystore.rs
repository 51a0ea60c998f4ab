//! Identity lifecycle over a [`Keychain`].
//!
//! One rule matters here: stored key material that fails to decode is a fatal
//! configuration error, never a trigger to regenerate. A silently regenerated
//! keypair would invalidate every public key the user has already handed out.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::CryptoError;
use crate::identity::Identity;
use crate::keychain::{Keychain, KEY_CREATED_AT, KEY_PRIVATE, KEY_PUBLIC};

/// Load the stored identity, or generate and persist a fresh one on first use.
///
/// Idempotent across calls and stable across restarts.
pub fn get_or_create(keychain: &dyn Keychain) -> Result<Identity, CryptoError> {
    let public = keychain.get(KEY_PUBLIC)?;
    let private = keychain.get(KEY_PRIVATE)?;

    match (public, private) {
        (Some(public_b64), Some(private_b64)) => {
            load_existing(keychain, &public_b64, &private_b64)
        }
        (None, None) => generate_fresh(keychain),
        _ => Err(CryptoError::InvalidKey(
            "persisted identity is incomplete (one key half missing); refusing to regenerate"
                .into(),
        )),
    }
}

fn load_existing(
    keychain: &dyn Keychain,
    public_b64: &str,
    private_b64: &str,
) -> Result<Identity, CryptoError> {
    let private_der = BASE64
        .decode(private_b64)
        .map_err(|e| CryptoError::InvalidKey(format!("stored private key is not base64: {e}")))?;
    let public_der = BASE64
        .decode(public_b64)
        .map_err(|e| CryptoError::InvalidKey(format!("stored public key is not base64: {e}")))?;

    let created_at_ms = keychain
        .get(KEY_CREATED_AT)?
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let identity = Identity::from_pkcs8_der(&private_der, created_at_ms)?;

    // The stored public half must match the private half it was generated
    // with; a mismatch means the keychain contents were tampered with or
    // partially overwritten.
    if identity.public_key_der()? != public_der {
        return Err(CryptoError::InvalidKey(
            "stored public key does not match the stored private key".into(),
        ));
    }

    tracing::debug!(key_id = %identity.key_id(), "loaded existing identity");
    Ok(identity)
}

fn generate_fresh(keychain: &dyn Keychain) -> Result<Identity, CryptoError> {
    let identity = Identity::generate(timestamp_now_ms());

    keychain.put(KEY_PRIVATE, &BASE64.encode(identity.to_pkcs8_der()?))?;
    keychain.put(KEY_PUBLIC, &identity.public_key_b64()?)?;
    keychain.put(KEY_CREATED_AT, &identity.created_at_ms().to_string())?;

    tracing::info!(key_id = %identity.key_id(), "generated new identity");
    Ok(identity)
}

/// Current UNIX timestamp in milliseconds.
fn timestamp_now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(i64::MAX)
}
