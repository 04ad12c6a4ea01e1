use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;

use crate::CacheError;

#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> Result<Connection, CacheError> {
        Connection::open(&self.path).map_err(|error| CacheError::sqlite("open sqlite", error))
    }
}

pub fn init_sqlite(db: &Db) -> Result<(), CacheError> {
    let conn = db.open()?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS cached_responses (
            url TEXT PRIMARY KEY,
            body BLOB NOT NULL,
            cached_at_ms INTEGER NOT NULL
        );",
    )
    .map_err(|error| CacheError::sqlite("create cached_responses", error))
}

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis().min(i64::MAX as u128) as i64)
        .unwrap_or(0)
}
