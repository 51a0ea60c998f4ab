use crate::db::{Db, StoreError};

/// A public key the user has chosen to trust.
///
/// `public_key` is the canonical base64 of the SPKI DER and is the row's
/// primary key; there is no payload beyond the key material itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedKey {
    pub public_key: String,
}

/// Durable set of trusted public keys.
#[derive(Clone)]
pub struct TrustStore {
    db: Db,
}

impl TrustStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Insert a key. Returns `false` when it was already present; a duplicate
    /// insert is a no-op, not an error.
    pub fn add(&self, public_key_b64: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO trusted_keys (public_key) VALUES (?1)",
            rusqlite::params![public_key_b64],
        )?;
        Ok(inserted == 1)
    }

    /// All trusted keys, oldest import first.
    pub fn list(&self) -> Result<Vec<TrustedKey>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT public_key FROM trusted_keys ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows
            .filter_map(Result::ok)
            .map(|public_key| TrustedKey { public_key })
            .collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>, StoreError> {
        self.db
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
