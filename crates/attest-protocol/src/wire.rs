//! Wire form shared between users: `base64(payload):base64(signature)` for a
//! signed message, or a bare base64 SPKI key offered for import.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::CodecError;
use crate::message::SignedMessage;

/// What a pasted/loaded string turned out to be.
#[derive(Debug, Clone)]
pub enum Candidate {
    /// Two-part wire form: a signed message awaiting verification.
    SignedMessage(SignedMessage),
    /// A bare public key offered for import (`SubjectPublicKeyInfo` DER).
    PublicKey { der: Vec<u8> },
}

/// Wire-encode a payload and its signature.
pub fn serialize(payload: &[u8], signature: &[u8]) -> String {
    format!("{}:{}", BASE64.encode(payload), BASE64.encode(signature))
}

/// Classify and decode raw pasted input.
///
/// All whitespace (spaces, tabs, newlines) is stripped first, so wrapped or
/// line-broken copies parse the same as clean ones. More than one `:`
/// separator is rejected outright rather than guessed at.
pub fn parse(raw: &str) -> Result<Candidate, CodecError> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(CodecError::EmptyInput);
    }

    let parts: Vec<&str> = cleaned.split(':').collect();
    match parts.as_slice() {
        [key_b64] => {
            let der = BASE64
                .decode(key_b64)
                .map_err(|e| CodecError::InvalidEncoding(e.to_string()))?;
            Ok(Candidate::PublicKey { der })
        }
        [payload_b64, signature_b64] => {
            let payload = BASE64
                .decode(payload_b64)
                .map_err(|e| CodecError::InvalidEncoding(format!("payload half: {e}")))?;
            let signature = BASE64
                .decode(signature_b64)
                .map_err(|e| CodecError::InvalidEncoding(format!("signature half: {e}")))?;
            Ok(Candidate::SignedMessage(SignedMessage { payload, signature }))
        }
        _ => Err(CodecError::MalformedInput(format!(
            "expected at most one ':' separator, found {}",
            parts.len() - 1
        ))),
    }
}
