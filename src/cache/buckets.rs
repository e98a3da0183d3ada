//! Named response buckets used by the request router
//!
//! One response per request identity per bucket; a put overwrites.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::storage::{CacheStorage, Result};
use crate::error::CacheError;

/// A response as persisted in a bucket
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
    pub url: String,
    pub status: u16,
    /// Response type tag (`basic`, `cors`, `opaque`)
    pub kind: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CacheStorage {
    /// Create the bucket if it doesn't exist yet
    pub fn open_bucket(&self, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO cache_buckets (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    /// All bucket names, oldest first
    pub fn bucket_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM cache_buckets ORDER BY created_at, name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Drop a bucket and everything in it
    pub fn delete_bucket(&self, name: &str) -> Result<bool> {
        self.conn
            .execute("DELETE FROM bucket_entries WHERE bucket = ?1", [name])?;
        let deleted = self
            .conn
            .execute("DELETE FROM cache_buckets WHERE name = ?1", [name])?;
        Ok(deleted > 0)
    }

    /// Number of responses held by a bucket
    pub fn bucket_len(&self, name: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bucket_entries WHERE bucket = ?1",
            [name],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    /// Look up the response stored for a request identity
    pub fn bucket_match(&self, bucket: &str, request_key: &str) -> Result<Option<StoredResponse>> {
        let row: Option<(String, u16, String, String, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT url, status, kind, headers, body FROM bucket_entries
                 WHERE bucket = ?1 AND request_key = ?2",
                params![bucket, request_key],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((url, status, kind, headers, body)) => {
                let headers = serde_json::from_str(&headers)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                Ok(Some(StoredResponse {
                    url,
                    status,
                    kind,
                    headers,
                    body,
                }))
            }
            None => Ok(None),
        }
    }

    /// Store a response, replacing whatever the identity held before
    pub fn bucket_put(&self, bucket: &str, request_key: &str, response: &StoredResponse) -> Result<()> {
        self.open_bucket(bucket)?;
        let headers = serde_json::to_string(&response.headers)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        self.conn.execute(
            "INSERT OR REPLACE INTO bucket_entries
             (bucket, request_key, url, status, kind, headers, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                bucket,
                request_key,
                response.url,
                response.status,
                response.kind,
                headers,
                response.body,
                Utc::now().timestamp_millis()
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn response(body: &str) -> StoredResponse {
        StoredResponse {
            url: "https://cdn.example/a.png".to_string(),
            status: 200,
            kind: "cors".to_string(),
            headers: vec![("content-type".to_string(), "image/png".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_put_creates_bucket_and_matches() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::open_at(dir.path()).unwrap();

        storage
            .bucket_put("dreava-images-v1", "req-1", &response("png"))
            .unwrap();

        assert_eq!(storage.bucket_names().unwrap(), vec!["dreava-images-v1"]);
        let hit = storage.bucket_match("dreava-images-v1", "req-1").unwrap();
        assert_eq!(hit, Some(response("png")));
        assert!(storage.bucket_match("dreava-api-v1", "req-1").unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites_identity() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::open_at(dir.path()).unwrap();

        storage.bucket_put("b", "req", &response("old")).unwrap();
        storage.bucket_put("b", "req", &response("new")).unwrap();

        assert_eq!(storage.bucket_len("b").unwrap(), 1);
        let hit = storage.bucket_match("b", "req").unwrap().unwrap();
        assert_eq!(hit.body, b"new".to_vec());
    }

    #[test]
    fn test_delete_bucket_removes_entries() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::open_at(dir.path()).unwrap();

        storage.bucket_put("old", "req", &response("x")).unwrap();
        storage.open_bucket("current").unwrap();

        assert!(storage.delete_bucket("old").unwrap());
        assert!(!storage.delete_bucket("old").unwrap());
        assert_eq!(storage.bucket_names().unwrap(), vec!["current"]);
        assert_eq!(storage.bucket_len("old").unwrap(), 0);
    }

    #[test]
    fn test_open_bucket_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::open_at(dir.path()).unwrap();

        storage.open_bucket("b").unwrap();
        storage.open_bucket("b").unwrap();
        assert_eq!(storage.bucket_names().unwrap().len(), 1);
    }
}
