mod assets;
mod characters;
mod events;

pub use assets::*;
pub use characters::*;
pub use events::*;

use std::path::Path;
use std::sync::Once;

use sqlite_vec::sqlite3_vec_init;
use tokio_rusqlite::{Connection, ffi::sqlite3_auto_extension};

use crate::error::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS campaign_events (
    id TEXT PRIMARY KEY,
    campaign_name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    document TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS campaign_events_by_campaign
    ON campaign_events (campaign_name, created_at);

CREATE TABLE IF NOT EXISTS campaign_characters (
    campaign_name TEXT NOT NULL,
    player_id TEXT NOT NULL,
    document TEXT NOT NULL,
    PRIMARY KEY (campaign_name, player_id)
);

CREATE TABLE IF NOT EXISTS skyboxes (
    id TEXT PRIMARY KEY,
    file_url TEXT NOT NULL UNIQUE,
    embedding BLOB NOT NULL,
    document TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS portraits (
    id TEXT PRIMARY KEY,
    file_url TEXT NOT NULL UNIQUE,
    embedding BLOB NOT NULL,
    document TEXT NOT NULL
);
"#;

static REGISTER_VEC: Once = Once::new();

fn register_sqlite_vec() {
    REGISTER_VEC.call_once(|| unsafe {
        sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())));
    });
}

/// Handle to the document store. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the store file, creating missing parent directories.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        register_sqlite_vec();
        let conn = Connection::open(path).await?;
        Self::initialize(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        register_sqlite_vec();
        let conn = Connection::open_in_memory().await?;
        Self::initialize(conn).await
    }

    async fn initialize(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        log::info!("Document store ready");
        Ok(Self { conn })
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

// A unique or primary key conflict, which callers treat as "already stored".
pub(crate) fn is_duplicate_key(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// Runs an INSERT, mapping a key conflict to `Ok(false)`.
pub(crate) fn insert_unless_duplicate(
    result: std::result::Result<usize, rusqlite::Error>,
) -> std::result::Result<bool, rusqlite::Error> {
    match result {
        Ok(_) => Ok(true),
        Err(err) if is_duplicate_key(&err) => Ok(false),
        Err(err) => Err(err),
    }
}
