//! SQLite-backed store with pragma configuration.
//!
//! Opens the database, applies pragmas for performance and concurrency
//! (WAL mode), and runs migrations. Operations run on tokio-rusqlite's
//! background thread. Expiry is stored as unix milliseconds and filtered at
//! read time; [`SqliteStore::purge_expired`] removes dead rows.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use tokio_rusqlite::{Connection, params};

use super::{ClosableStore, ExpiringStore, Store, StoreError, migrations};
use crate::Error;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

fn backend(err: tokio_rusqlite::Error) -> StoreError {
    match err {
        tokio_rusqlite::Error::ConnectionClosed => StoreError::Closed,
        other => StoreError::Backend(other.to_string()),
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn expires_at(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| now_ms().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)))
}

/// Key-value store in a SQLite database.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(backend)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }

    /// Delete expired rows. Returns the number of deleted rows.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = now_ms();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM kv_store WHERE expires_at IS NOT NULL AND expires_at <= ?1", params![now])
            })
            .await
            .map(|count| count as u64)
            .map_err(backend)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let key = key.to_string();
        let now = now_ms();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
                conn.query_row(
                    "SELECT value FROM kv_store WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                    params![key, now],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map(|value| value.map(Bytes::from))
            .map_err(backend)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError> {
        let key = key.to_string();
        let expires_at = expires_at(ttl);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO kv_store (key, value, expires_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        expires_at = excluded.expires_at",
                    params![key, value.as_ref(), expires_at],
                )
            })
            .await
            .map(|_| ())
            .map_err(backend)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let key = key.to_string();
        let now = now_ms();
        self.conn
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let live = conn.execute(
                    "DELETE FROM kv_store WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                    params![key, now],
                )?;
                // an expired row still occupies the key; drop it without reporting it
                conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
                Ok(live > 0)
            })
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl ExpiringStore for SqliteStore {
    async fn expire(&self, key: &str, ttl: Option<Duration>) -> Result<bool, StoreError> {
        let key = key.to_string();
        let now = now_ms();
        let expires_at = expires_at(ttl);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE kv_store SET expires_at = ?3
                    WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                    params![key, now, expires_at],
                )
            })
            .await
            .map(|updated| updated > 0)
            .map_err(backend)
    }
}

#[async_trait]
impl ClosableStore for SqliteStore {
    async fn close(&self) -> Result<(), StoreError> {
        self.conn.clone().close().await.map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let version = store
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.set("k", Bytes::from_static(b"body"), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(Bytes::from_static(b"body")));

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_value() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.set("k", Bytes::from_static(b"old"), None).await.unwrap();
        store.set("k", Bytes::from_static(b"new"), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(Bytes::from_static(b"new")));
    }

    #[tokio::test]
    async fn test_ttl_expiry_and_purge() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store
            .set("expiring", Bytes::from_static(b"x"), Some(Duration::from_millis(200)))
            .await
            .unwrap();
        store
            .set("fresh", Bytes::from_static(b"y"), Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert!(store.get("expiring").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(store.get("expiring").await.unwrap().is_none());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.get("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expire_updates_live_keys_only() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store
            .set("k", Bytes::from_static(b"v"), Some(Duration::from_millis(200)))
            .await
            .unwrap();
        assert!(store.expire("k", None).await.unwrap());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(store.get("k").await.unwrap().is_some());
        assert!(!store.expire("missing", Some(Duration::from_secs(1))).await.unwrap());
    }

    #[tokio::test]
    async fn test_close_rejects_further_calls() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.close().await.unwrap();
        assert!(store.get("k").await.is_err());
    }
}
