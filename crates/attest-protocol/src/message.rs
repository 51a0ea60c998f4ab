use attest_crypto::Identity;

use crate::payload::Payload;
use crate::wire;

/// A payload plus the Ed25519 signature over its exact bytes.
///
/// Immutable once constructed. The signature always covers `payload` as
/// transmitted; verification must use the identical byte sequence, never a
/// re-derived one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl SignedMessage {
    /// Sign `text` with `identity`, capturing the timestamp now.
    pub fn create(identity: &Identity, text: &str) -> Self {
        let payload = Payload::new(text).to_bytes();
        let signature = identity.sign(&payload).to_bytes().to_vec();
        Self { payload, signature }
    }

    /// Wire form: `base64(payload):base64(signature)`.
    pub fn to_wire(&self) -> String {
        wire::serialize(&self.payload, &self.signature)
    }
}
