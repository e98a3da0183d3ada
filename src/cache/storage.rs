//! SQLite-based cache storage
//!
//! Holds the scoped key-value entries behind the local cache and the
//! versioned response buckets behind the request router.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CacheError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 2;

pub(crate) type Result<T> = std::result::Result<T, CacheError>;

/// SQLite-backed cache storage
pub struct CacheStorage {
    pub(super) conn: Connection,
}

/// A raw entry as stored, fresh or not
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub data: Vec<u8>,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheStorage {
    /// Get the cache directory path (~/.cache/dreava on Linux)
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Ok(cache_base.join("dreava"))
    }

    /// Open cache storage at a specific directory
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;

        let db_path = cache_dir.join("cache.db");
        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(&db_path)?;
            return Self::open_at(cache_dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_key TEXT PRIMARY KEY NOT NULL,
                scope TEXT,
                data TEXT NOT NULL,
                stored_at INTEGER NOT NULL,
                ttl_ms INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_scope ON cache_entries(scope);

            CREATE TABLE IF NOT EXISTS cache_buckets (
                name TEXT PRIMARY KEY NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS bucket_entries (
                bucket TEXT NOT NULL,
                request_key TEXT NOT NULL,
                url TEXT NOT NULL,
                status INTEGER NOT NULL,
                kind TEXT NOT NULL,
                headers TEXT NOT NULL,
                body BLOB NOT NULL,
                stored_at INTEGER NOT NULL,
                PRIMARY KEY (bucket, request_key)
            );
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self { conn })
    }

    /// Get an entry regardless of age; freshness is the caller's call
    pub fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        let row: Option<(String, i64, i64)> = self
            .conn
            .query_row(
                "SELECT data, stored_at, ttl_ms FROM cache_entries WHERE cache_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        Ok(row.map(|(data, stored_at, ttl_ms)| StoredEntry {
            data: data.into_bytes(),
            stored_at: from_millis(stored_at),
            ttl: Duration::from_millis(ttl_ms.max(0) as u64),
        }))
    }

    /// Store data, overwriting any previous entry under the key
    pub fn put(&self, key: &str, data: &[u8], scope: Option<&str>, ttl: Duration) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        self.conn.execute(
            "INSERT OR REPLACE INTO cache_entries
             (cache_key, scope, data, stored_at, ttl_ms, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key,
                scope,
                String::from_utf8_lossy(data).to_string(),
                now,
                ttl_ms,
                data.len()
            ],
        )?;
        Ok(())
    }

    /// Delete a specific cache entry by key
    pub fn delete(&self, key: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM cache_entries WHERE cache_key = ?1", [key])?;
        Ok(deleted > 0)
    }

    /// Clear all entries and all buckets
    pub fn clear_all(&self) -> Result<ClearStats> {
        let entries: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |r| r.get(0))?;
        let buckets: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cache_buckets", [], |r| r.get(0))?;

        self.conn.execute_batch(
            "DELETE FROM cache_entries; DELETE FROM bucket_entries; DELETE FROM cache_buckets;",
        )?;

        Ok(ClearStats {
            entries_removed: entries as usize,
            buckets_removed: buckets as usize,
        })
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let now = Utc::now().timestamp_millis();

        let total_entries: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM cache_entries", [], |r| r.get(0))?;

        let fresh_entries: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE stored_at + ttl_ms > ?1",
            [now],
            |r| r.get(0),
        )?;

        let entry_bytes: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM cache_entries",
            [],
            |r| r.get(0),
        )?;

        let bucket_bytes: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(body)), 0) FROM bucket_entries",
            [],
            |r| r.get(0),
        )?;

        let bucket_responses: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM bucket_entries", [], |r| r.get(0))?;

        let (oldest, newest): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(stored_at), MAX(stored_at) FROM cache_entries",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        Ok(CacheStats {
            total_entries: total_entries as usize,
            fresh_entries: fresh_entries as usize,
            stale_entries: (total_entries - fresh_entries) as usize,
            bucket_responses: bucket_responses as usize,
            total_size_bytes: (entry_bytes + bucket_bytes) as usize,
            oldest_entry: oldest.map(from_millis),
            newest_entry: newest.map(from_millis),
        })
    }

    /// Nuke the cache database
    fn nuke(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| CacheError::Io(format!("Failed to remove cache DB: {}", e)))?;
        }
        Ok(())
    }
}

pub(super) fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Statistics about cache clear operation
#[derive(Debug)]
pub struct ClearStats {
    pub entries_removed: usize,
    pub buckets_removed: usize,
}

/// Statistics about cache state
#[derive(Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
    pub bucket_responses: usize,
    pub total_size_bytes: usize,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_storage() -> (CacheStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::open_at(dir.path()).unwrap();
        (storage, dir)
    }

    #[test]
    fn test_put_get() {
        let (storage, _dir) = test_storage();
        let data = b"[1,2,3]";

        storage
            .put("key1", data, Some("0xabc"), Duration::from_secs(60))
            .unwrap();

        let entry = storage.get("key1").unwrap().unwrap();
        assert_eq!(entry.data, data.to_vec());
        assert_eq!(entry.ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_expired_entry_still_returned() {
        let (storage, _dir) = test_storage();

        storage
            .put("key3", b"data", None, Duration::from_secs(0))
            .unwrap();

        // Staleness never invalidates existence
        let entry = storage.get("key3").unwrap();
        assert!(entry.is_some());
    }

    #[test]
    fn test_put_overwrites() {
        let (storage, _dir) = test_storage();
        storage.put("k", b"one", None, Duration::from_secs(60)).unwrap();
        storage.put("k", b"two", None, Duration::from_secs(60)).unwrap();

        let entry = storage.get("k").unwrap().unwrap();
        assert_eq!(entry.data, b"two".to_vec());
        assert_eq!(storage.stats().unwrap().total_entries, 1);
    }

    #[test]
    fn test_delete() {
        let (storage, _dir) = test_storage();
        storage.put("k", b"v", None, Duration::from_secs(60)).unwrap();
        assert!(storage.delete("k").unwrap());
        assert!(!storage.delete("k").unwrap());
        assert!(storage.get("k").unwrap().is_none());
    }

    #[test]
    fn test_clear_all() {
        let (storage, _dir) = test_storage();

        storage.put("k1", b"d1", None, Duration::from_secs(60)).unwrap();
        storage.put("k2", b"d2", None, Duration::from_secs(60)).unwrap();

        let stats = storage.clear_all().unwrap();
        assert_eq!(stats.entries_removed, 2);

        assert!(storage.get("k1").unwrap().is_none());
        assert!(storage.get("k2").unwrap().is_none());
    }

    #[test]
    fn test_stats_counts_fresh_and_stale() {
        let (storage, _dir) = test_storage();

        storage.put("k1", b"data1", None, Duration::from_secs(60)).unwrap();
        storage.put("k2", b"data2", None, Duration::from_secs(0)).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.fresh_entries, 1);
        assert_eq!(stats.stale_entries, 1);
        assert!(stats.total_size_bytes > 0);
        assert!(stats.oldest_entry.is_some());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        {
            let storage = CacheStorage::open_at(dir.path()).unwrap();
            storage.put("k", b"v", None, Duration::from_secs(60)).unwrap();
        }
        let storage = CacheStorage::open_at(dir.path()).unwrap();
        assert!(storage.get("k").unwrap().is_some());
    }
}
