use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use attest_crypto::{CryptoError, Keychain};
use parking_lot::Mutex;
use rand::RngCore;

/// Encrypted file-backed keychain for identity material at rest.
///
/// Stands in for platform secure storage: one file holding an
/// AES-256-GCM-encrypted JSON map, with the file key derived from the user
/// passphrase via `Argon2id`. The file body is `nonce (12 bytes) ||
/// ciphertext`; every save re-encrypts under a fresh nonce and replaces the
/// file atomically.
pub struct EncryptedStore {
    path: PathBuf,
    key: [u8; 32],
    entries: Mutex<BTreeMap<String, String>>,
}

impl EncryptedStore {
    /// Open the store file at `path`, creating state for a fresh file if none
    /// exists yet. A wrong passphrase surfaces as a decrypt failure here.
    pub fn open(path: &Path, passphrase: &str) -> Result<Self, CryptoError> {
        let key = derive_key(passphrase);
        let entries = if path.exists() {
            let blob = std::fs::read(path)
                .map_err(|e| CryptoError::Storage(format!("read keychain file: {e}")))?;
            decrypt_entries(&key, &blob)?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            key,
            entries: Mutex::new(entries),
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), CryptoError> {
        let blob = encrypt_entries(&self.key, entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &blob)
            .map_err(|e| CryptoError::Storage(format!("write keychain file: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| CryptoError::Storage(format!("replace keychain file: {e}")))?;
        Ok(())
    }
}

impl Keychain for EncryptedStore {
    fn get(&self, name: &str) -> Result<Option<String>, CryptoError> {
        Ok(self.entries.lock().get(name).cloned())
    }

    fn put(&self, name: &str, value: &str) -> Result<(), CryptoError> {
        let mut entries = self.entries.lock();
        entries.insert(name.to_string(), value.to_string());
        self.save(&entries)
    }
}

fn encrypt_entries(
    key: &[u8; 32],
    entries: &BTreeMap<String, String>,
) -> Result<Vec<u8>, CryptoError> {
    let json = serde_json::to_vec(entries)
        .map_err(|e| CryptoError::Storage(format!("serialize keychain: {e}")))?;

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Storage(e.to_string()))?;
    let mut nonce_bytes = [0u8; 12];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, json.as_slice())
        .map_err(|e| CryptoError::Storage(format!("encrypt keychain: {e}")))?;

    let mut blob = Vec::with_capacity(12 + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

fn decrypt_entries(key: &[u8; 32], blob: &[u8]) -> Result<BTreeMap<String, String>, CryptoError> {
    if blob.len() < 12 {
        return Err(CryptoError::Storage("keychain file too short".into()));
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Storage(e.to_string()))?;
    let nonce = Nonce::from_slice(&blob[..12]);

    let json = cipher.decrypt(nonce, &blob[12..]).map_err(|_| {
        CryptoError::Storage("keychain decrypt failed (wrong passphrase or corrupt file)".into())
    })?;

    serde_json::from_slice(&json)
        .map_err(|e| CryptoError::Storage(format!("keychain contents unreadable: {e}")))
}

/// Derive the 32-byte file key from a passphrase with `Argon2id`.
///
/// Production: `m=65536, t=3, p=4`. Test builds: `m=256, t=1, p=1`.
fn derive_key(passphrase: &str) -> [u8; 32] {
    use argon2::{Algorithm, Argon2, Params, Version};

    let salt = b"attest-keychain-salt";

    #[cfg(debug_assertions)]
    let params = Params::new(256, 1, 1, Some(32)).expect("invalid argon2 params");
    #[cfg(not(debug_assertions))]
    let params = Params::new(65536, 3, 4, Some(32)).expect("invalid argon2 params");

    let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = [0u8; 32];
    hasher
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .expect("argon2 hash failed");
    key
}
