//! Key-value store contract consumed by the cache manager.
//!
//! A store only needs `get`, `set` with an optional TTL, and `delete`.
//! Expired keys must read as absent. Extras that only some backends offer
//! are separate capability traits.
//!
//! Individual calls are expected to be atomic; nothing spans calls, so a
//! reader may observe an entry's metadata before its content is written.

pub mod memory;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::Error;
use crate::config::{AppConfig, StoreKind};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors raised by store adapters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store is closed")]
    Closed,
}

/// Asynchronous key-value map with per-key expiry.
#[async_trait]
pub trait Store: Send + Sync {
    /// Value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// `ttl` of `None` keeps the key until it is replaced or deleted.
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Remove `key`. Returns `true` if a live value was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// Stores that can refresh the TTL of an existing key in place.
#[async_trait]
pub trait ExpiringStore: Store {
    /// Reset the expiry of `key`. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Option<Duration>) -> Result<bool, StoreError>;
}

/// Stores holding a connection that should be released explicitly.
#[async_trait]
pub trait ClosableStore: Store {
    async fn close(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError> {
        (**self).set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key).await
    }
}

#[async_trait]
impl<S: ExpiringStore + ?Sized> ExpiringStore for Arc<S> {
    async fn expire(&self, key: &str, ttl: Option<Duration>) -> Result<bool, StoreError> {
        (**self).expire(key, ttl).await
    }
}

/// Open the store selected by `config`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `sqlite` is selected without a
/// `db_path`, or the error from opening the database.
pub async fn open(config: &AppConfig) -> Result<Arc<dyn Store>, Error> {
    match config.store {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::Sqlite => {
            let path = config
                .require_db_path()
                .map_err(|e| Error::InvalidArgument(e.to_string()))?;
            tracing::info!(path = %path.display(), "opening sqlite store");
            Ok(Arc::new(SqliteStore::open(path).await?))
        }
    }
}
