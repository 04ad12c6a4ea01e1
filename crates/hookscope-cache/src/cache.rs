use std::time::Duration;

use rusqlite::{OptionalExtension, params};

use crate::CacheError;
use crate::db::{Db, init_sqlite, now_ms};

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Rewritten response bodies, keyed by request URL.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    db: Db,
    max_age: Duration,
}

impl ResponseCache {
    /// Opens the cache, creating its table if needed.
    pub fn open(db: Db, max_age: Duration) -> Result<Self, CacheError> {
        init_sqlite(&db)?;
        Ok(Self { db, max_age })
    }

    /// True when `url` has an entry younger than the configured max age.
    pub fn has_valid_cache(&self, url: &str) -> Result<bool, CacheError> {
        let conn = self.db.open()?;
        let cached_at: Option<i64> = conn
            .query_row(
                "SELECT cached_at_ms FROM cached_responses WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()
            .map_err(|error| CacheError::sqlite("read cached_at_ms", error))?;
        let max_age_ms = i64::try_from(self.max_age.as_millis()).unwrap_or(i64::MAX);
        Ok(cached_at.is_some_and(|cached_at| now_ms().saturating_sub(cached_at) < max_age_ms))
    }

    pub fn get_cached_file(&self, url: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let conn = self.db.open()?;
        conn.query_row(
            "SELECT body FROM cached_responses WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )
        .optional()
        .map_err(|error| CacheError::sqlite("read cached body", error))
    }

    /// Stores `content` for `url`, replacing any previous entry.
    pub fn cache_file(&self, url: &str, content: &[u8]) -> Result<(), CacheError> {
        let conn = self.db.open()?;
        conn.execute(
            "INSERT INTO cached_responses (url, body, cached_at_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(url) DO UPDATE SET body = excluded.body, cached_at_ms = excluded.cached_at_ms",
            params![url, content, now_ms()],
        )
        .map_err(|error| CacheError::sqlite("upsert cached body", error))?;
        Ok(())
    }

    /// Returns whether an entry existed.
    pub fn remove_file(&self, url: &str) -> Result<bool, CacheError> {
        let conn = self.db.open()?;
        let removed = conn
            .execute("DELETE FROM cached_responses WHERE url = ?1", params![url])
            .map_err(|error| CacheError::sqlite("delete cached body", error))?;
        Ok(removed > 0)
    }

    /// Cached URLs with their age, oldest first.
    pub fn entries(&self) -> Result<Vec<(String, Duration)>, CacheError> {
        let conn = self.db.open()?;
        let mut stmt = conn
            .prepare("SELECT url, cached_at_ms FROM cached_responses ORDER BY cached_at_ms ASC")
            .map_err(|error| CacheError::sqlite("prepare cache listing", error))?;
        let now = now_ms();
        stmt.query_map([], |row| {
            let url: String = row.get(0)?;
            let cached_at: i64 = row.get(1)?;
            let age_ms = u64::try_from(now.saturating_sub(cached_at)).unwrap_or(0);
            Ok((url, Duration::from_millis(age_ms)))
        })
        .map_err(|error| CacheError::sqlite("query cache listing", error))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| CacheError::sqlite("read cache listing row", error))
    }
}
