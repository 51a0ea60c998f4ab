use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

/// The local signing identity.
///
/// Exactly one identity is active per installation. Its public key, exported
/// as base64 `SubjectPublicKeyInfo`, is what correspondents add to their
/// trust set; the private half never leaves this type except through the
/// keychain persistence path.
#[derive(ZeroizeOnDrop)]
pub struct Identity {
    signing_key: SigningKey,
    /// Unix ms at which the keypair was first generated.
    #[zeroize(skip)]
    created_at_ms: i64,
}

impl Identity {
    /// Generate a new random identity.
    pub fn generate(created_at_ms: i64) -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self {
            signing_key,
            created_at_ms,
        }
    }

    /// Restore an identity from its PKCS#8 private-key document.
    pub fn from_pkcs8_der(der: &[u8], created_at_ms: i64) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::InvalidKey(format!("bad PKCS#8 document: {e}")))?;
        Ok(Self {
            signing_key,
            created_at_ms,
        })
    }

    /// Encode the private key as a PKCS#8 DER document (for keychain storage).
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>, CryptoError> {
        let doc = self
            .signing_key
            .to_pkcs8_der()
            .map_err(|e| CryptoError::KeyGeneration(format!("PKCS#8 encoding: {e}")))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// Get the public verifying key.
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Encode the public key as X.509 `SubjectPublicKeyInfo` DER.
    pub fn public_key_der(&self) -> Result<Vec<u8>, CryptoError> {
        let doc = self
            .signing_key
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyGeneration(format!("SPKI encoding: {e}")))?;
        Ok(doc.into_vec())
    }

    /// The export form shared with correspondents: base64 of the SPKI DER.
    pub fn public_key_b64(&self) -> Result<String, CryptoError> {
        Ok(BASE64.encode(self.public_key_der()?))
    }

    /// When this keypair was generated (unix ms; 0 when unknown).
    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    /// Short stable identifier for display and logging.
    pub fn key_id(&self) -> String {
        Self::key_id_of(&self.public_key())
    }

    /// Short identifier for any verifying key: hex of its leading 8 bytes.
    pub fn key_id_of(key: &VerifyingKey) -> String {
        hex::encode(&key.as_bytes()[..8])
    }

    /// Sign a message with this identity's private key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Verify a signature against a public key.
    pub fn verify(
        public_key: &VerifyingKey,
        message: &[u8],
        signature: &Signature,
    ) -> Result<(), CryptoError> {
        public_key
            .verify(message, signature)
            .map_err(|e| CryptoError::Verification(e.to_string()))
    }

    /// Parse SPKI DER bytes into a verifying key.
    ///
    /// This is the structural validity check for key import: bytes that
    /// base64-decoded fine but are not an Ed25519 `SubjectPublicKeyInfo`
    /// document fail here.
    pub fn decode_public_key(der: &[u8]) -> Result<VerifyingKey, CryptoError> {
        VerifyingKey::from_public_key_der(der)
            .map_err(|e| CryptoError::InvalidKey(format!("not an Ed25519 public key: {e}")))
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("key_id", &self.key_id())
            .field("created_at_ms", &self.created_at_ms)
            .finish()
    }
}
