//! In-process store backed by a `HashMap`.
//!
//! Uses a tokio `RwLock` for concurrent access. Expiry is checked lazily on
//! read; [`MemoryStore::purge_expired`] sweeps dead keys. Keys set without a
//! TTL are only ever removed by `delete` or by being overwritten.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{ExpiringStore, Store, StoreError};

/// Stored value with its optional deadline.
struct StoredValue {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Deadline `ttl` from now; a TTL past the clock's range never expires.
fn deadline(ttl: Option<Duration>) -> Option<Instant> {
    ttl.and_then(|ttl| Instant::now().checked_add(ttl))
}

/// In-memory key-value store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, StoredValue>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired keys. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, stored| !stored.is_expired());
        before - entries.len()
    }

    /// Number of keys held, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|stored| !stored.is_expired())
            .map(|stored| stored.value.clone()))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), StoredValue { value, expires_at: deadline(ttl) });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some_and(|stored| !stored.is_expired()))
    }
}

#[async_trait]
impl ExpiringStore for MemoryStore {
    async fn expire(&self, key: &str, ttl: Option<Duration>) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(stored) if !stored.is_expired() => {
                stored.expires_at = deadline(ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
