//! Persisted cache entry record.
//!
//! One record is stored per normalized URL under its metadata key; the raw
//! body lives separately under the content key.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, HeaderMap};

/// Request and response snapshot captured when the entry was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    /// Request URL as given by the caller (not normalized).
    pub url: String,
    #[serde(default = "default_status")]
    pub status: u16,
    pub req_headers: HeaderMap,
    pub res_headers: HeaderMap,
}

fn default_status() -> u16 {
    200
}

/// Metadata record stored under an entry's metadata key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    /// Content key the body is stored under.
    pub key: String,
    #[serde(default)]
    pub integrity: Option<String>,
    #[serde(default)]
    pub size: u64,
    /// Milliseconds since epoch the content was written.
    pub time: i64,
    /// Milliseconds since epoch the origin last confirmed the entry.
    #[serde(default)]
    pub validated_at: Option<i64>,
    /// Freshness lifetime computed at the last write.
    #[serde(default)]
    pub ttl_ms: u64,
    pub metadata: EntryMetadata,
}

impl EntryRecord {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.time).unwrap_or_default()
    }

    /// Freshness anchor; falls back to the write time for older records.
    pub fn validated_at(&self) -> DateTime<Utc> {
        self.validated_at
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(|| self.cached_at())
    }

    pub fn etag(&self) -> Option<&str> {
        self.metadata.res_headers.get("etag")
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.metadata.res_headers.get("last-modified")
    }

    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| Error::MalformedCachedRecord(format!("failed to encode record: {e}")))
    }

    pub fn from_bytes(key: &str, bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedCachedRecord(format!("{key}: {e}")))
    }
}
