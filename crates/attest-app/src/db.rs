use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;

/// Trust database schema version. Bump when the schema changes.
const SCHEMA_VERSION: i64 = 1;

/// Shared handle to the trust database connection.
pub type Db = Arc<Mutex<Connection>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("trust database unavailable: {0}")]
    Unavailable(String),
}

/// Open (or create) the trust database at `path` and apply the schema.
pub fn open_db(path: &str) -> Result<Db, StoreError> {
    let conn = Connection::open(path)?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    let current: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if current != SCHEMA_VERSION {
        if current != 0 {
            tracing::info!(
                old = current,
                new = SCHEMA_VERSION,
                "trust db schema version mismatch, recreating"
            );
            conn.execute_batch("DROP TABLE IF EXISTS trusted_keys;")?;
        }
        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(Arc::new(Mutex::new(conn)))
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS trusted_keys (
    public_key TEXT PRIMARY KEY
);
";
