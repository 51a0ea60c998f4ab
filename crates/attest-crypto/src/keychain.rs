use crate::CryptoError;

/// Trait for identity key storage. Abstracts over the actual backend.
///
/// The app crate implements this with an encrypted file store; tests use an
/// in-memory map. Values are base64-encoded key material (or small metadata
/// strings), stored under the names below.
pub trait Keychain: Send + Sync {
    /// Look up a stored value by name.
    fn get(&self, name: &str) -> Result<Option<String>, CryptoError>;

    /// Store a value under a name, replacing any previous value.
    fn put(&self, name: &str, value: &str) -> Result<(), CryptoError>;
}

// Entry names used by the keystore.

/// Base64 SPKI DER of the identity public key.
pub const KEY_PUBLIC: &str = "public_key";
/// Base64 PKCS#8 DER of the identity private key.
pub const KEY_PRIVATE: &str = "private_key";
/// Unix ms at which the identity was generated.
pub const KEY_CREATED_AT: &str = "created_at";
