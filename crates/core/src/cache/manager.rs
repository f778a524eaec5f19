//! Cache manager: the `lookup` / `put` / `delete` contract over a [`Store`].
//!
//! Each cached URL occupies two keys: a JSON [`EntryRecord`] under the
//! metadata key and the raw body under the content key. Metadata is always
//! written before content. The pair is not written atomically, so a
//! concurrent reader can see new metadata next to old or missing content;
//! a missing body reads as a miss.

use std::time::Duration;

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use super::entry::{EntryMetadata, EntryRecord};
use super::freshness::{self, Freshness};
use super::hash::compute_integrity;
use super::key::{content_key_for, metadata_key_for};
use super::validator;
use crate::config::AppConfig;
use crate::store::{ClosableStore, ExpiringStore, Store};
use crate::{CacheRequest, CacheResponse, Error, HeaderMap};

pub const X_LOCAL_CACHE: &str = "X-Local-Cache";
pub const X_LOCAL_CACHE_KEY: &str = "X-Local-Cache-Key";
pub const X_LOCAL_CACHE_HASH: &str = "X-Local-Cache-Hash";
pub const X_LOCAL_CACHE_TIME: &str = "X-Local-Cache-Time";

const DIAGNOSTIC_HEADERS: &[&str] = &[X_LOCAL_CACHE, X_LOCAL_CACHE_KEY, X_LOCAL_CACHE_HASH, X_LOCAL_CACHE_TIME];

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Request headers excluded from stored snapshots and comparisons by default.
pub const DEFAULT_NON_CACHEABLE_HEADERS: &[&str] = &["authorization"];

fn encode(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Store TTL for a freshness lifetime; zero means keep until replaced.
///
/// Zero-TTL entries (validators but no lifetime) carry no store expiry, so
/// nothing reclaims them except `delete` or a later write with a lifetime.
fn store_ttl(ttl: Duration) -> Option<Duration> {
    (!ttl.is_zero()).then_some(ttl)
}

/// Caller-supplied options for cache operations.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Expected integrity on lookup; integrity to record on put.
    pub integrity: Option<String>,
}

/// A cache hit synthesized from a stored entry.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub response: CacheResponse,
    pub freshness: Freshness,
    pub record: EntryRecord,
}

impl CachedResponse {
    pub fn is_fresh(&self) -> bool {
        self.freshness.is_fresh()
    }

    /// Headers to attach when revalidating this entry with the origin.
    ///
    /// `If-None-Match` when an `ETag` was recorded; otherwise
    /// `If-Modified-Since` when a `Last-Modified` was recorded.
    pub fn conditional_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(etag) = self.record.etag() {
            headers.set("If-None-Match", etag);
        } else if let Some(last_modified) = self.record.last_modified() {
            headers.set("If-Modified-Since", last_modified);
        }
        headers
    }

    pub fn into_response(self) -> CacheResponse {
        self.response
    }
}

/// RFC 7234 cache over a key-value store.
///
/// Instances do not coordinate with each other; each owns its keys in the
/// store it was given.
pub struct CacheManager<S> {
    store: S,
    name: String,
    non_cacheable_headers: Vec<String>,
}

impl<S: Store> CacheManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            name: "request-cache".to_string(),
            non_cacheable_headers: DEFAULT_NON_CACHEABLE_HEADERS.iter().map(|h| h.to_string()).collect(),
        }
    }

    pub fn from_config(store: S, config: &AppConfig) -> Self {
        Self { store, name: config.name.clone(), non_cacheable_headers: config.non_cacheable_request_headers.clone() }
    }

    /// Label reported in `X-Local-Cache` and attached to log events.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Copy of `request` without headers that must not affect caching.
    fn strip(&self, request: &CacheRequest) -> CacheRequest {
        CacheRequest { headers: request.headers.without(&self.non_cacheable_headers), ..request.clone() }
    }

    fn decorate(&self, headers: &mut HeaderMap, record: &EntryRecord) {
        headers.set(X_LOCAL_CACHE, encode(&self.name));
        headers.set(X_LOCAL_CACHE_KEY, encode(&record.key));
        headers.set(X_LOCAL_CACHE_HASH, encode(record.integrity.as_deref().unwrap_or_default()));
        headers.set(X_LOCAL_CACHE_TIME, freshness::format_http_date(record.cached_at()));
    }

    async fn load_record(&self, metadata_key: &str) -> Result<Option<EntryRecord>, Error> {
        match self.store.get(metadata_key).await? {
            Some(raw) => EntryRecord::from_bytes(metadata_key, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// Find a stored response usable for `request`.
    ///
    /// Returns `None` on a miss, an expired entry, a `Vary`/integrity/URL
    /// mismatch, or a missing body. Hits carry the recorded headers plus the
    /// `X-Local-Cache*` diagnostics and a [`Freshness`] verdict; HEAD hits
    /// have an empty body.
    pub async fn lookup(
        &self, request: &CacheRequest, options: &CacheOptions,
    ) -> Result<Option<CachedResponse>, Error> {
        request.validate()?;
        let request = self.strip(request);
        let metadata_key = metadata_key_for(&request)?;

        let Some(record) = self.load_record(&metadata_key).await? else {
            tracing::debug!(cache = %self.name, key = %metadata_key, "cache miss");
            return Ok(None);
        };

        if !validator::matches(&request, &record, options.integrity.as_deref()) {
            tracing::debug!(cache = %self.name, key = %metadata_key, "cached entry does not match request");
            return Ok(None);
        }

        let body = if request.is_head() {
            bytes::Bytes::new()
        } else {
            match self.store.get(&record.key).await? {
                Some(body) => body,
                None => {
                    tracing::debug!(cache = %self.name, key = %record.key, "cached content missing");
                    return Ok(None);
                }
            }
        };

        let freshness = freshness::evaluate(
            record.ttl(),
            record.validated_at(),
            &record.metadata.res_headers,
            &request.headers,
            Utc::now(),
        );

        let mut headers = record.metadata.res_headers.clone();
        self.decorate(&mut headers, &record);

        tracing::debug!(cache = %self.name, key = %metadata_key, ?freshness, "cache hit");

        let response = CacheResponse { status: record.metadata.status, headers, body };
        Ok(Some(CachedResponse { response, freshness, record }))
    }

    /// Record `response` as the cached answer for `request`.
    ///
    /// Uncacheable responses come back untouched. HEAD requests and 304
    /// responses only merge headers into the existing entry and come back
    /// decorated with diagnostics; they fail with
    /// [`Error::MalformedCachedRecord`] if nothing was cached before.
    pub async fn put(
        &self, request: &CacheRequest, response: CacheResponse, options: &CacheOptions,
    ) -> Result<CacheResponse, Error> {
        request.validate()?;
        response.validate()?;
        let request = self.strip(request);

        if !freshness::should_cache(&response.headers) || !freshness::request_allows_store(&request.headers) {
            tracing::debug!(cache = %self.name, url = %request.url, "response not storable");
            return Ok(response);
        }

        if request.is_head() || response.is_not_modified() {
            return self.merge(&request, response).await;
        }

        let now = Utc::now();
        let metadata_key = metadata_key_for(&request)?;
        let content_key = content_key_for(&request)?;
        let ttl = freshness::compute_ttl(&response.headers, now);

        let record = EntryRecord {
            key: content_key.clone(),
            integrity: Some(
                options
                    .integrity
                    .clone()
                    .unwrap_or_else(|| compute_integrity(&response.body)),
            ),
            size: response.body.len() as u64,
            time: now.timestamp_millis(),
            validated_at: Some(now.timestamp_millis()),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            metadata: EntryMetadata {
                url: request.url.clone(),
                status: response.status,
                req_headers: request.headers.clone(),
                res_headers: response.headers.without(DIAGNOSTIC_HEADERS),
            },
        };

        self.store
            .set(&metadata_key, record.to_bytes()?, store_ttl(ttl))
            .await?;
        self.store
            .set(&content_key, response.body.clone(), store_ttl(ttl))
            .await?;

        tracing::debug!(
            cache = %self.name,
            key = %metadata_key,
            ttl_ms = record.ttl_ms,
            size = record.size,
            "stored response"
        );

        Ok(response)
    }

    /// Merge a HEAD or 304 response into the existing record. Content is untouched.
    async fn merge(&self, request: &CacheRequest, mut response: CacheResponse) -> Result<CacheResponse, Error> {
        let metadata_key = metadata_key_for(request)?;
        let mut record = self
            .load_record(&metadata_key)
            .await?
            .ok_or_else(|| Error::MalformedCachedRecord(format!("no cached metadata to update for {}", request.url)))?;

        merge_headers(&mut record.metadata.res_headers, &response.headers);

        let now = Utc::now();
        let ttl = freshness::compute_ttl(&record.metadata.res_headers, now);
        record.validated_at = Some(now.timestamp_millis());
        record.ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);

        self.store
            .set(&metadata_key, record.to_bytes()?, store_ttl(ttl))
            .await?;

        tracing::debug!(cache = %self.name, key = %metadata_key, ttl_ms = record.ttl_ms, "merged revalidated headers");

        self.decorate(&mut response.headers, &record);
        Ok(response)
    }

    /// Remove the entry for `request`. Returns `true` if either key held a value.
    pub async fn delete(&self, request: &CacheRequest, _options: &CacheOptions) -> Result<bool, Error> {
        request.validate()?;
        let metadata_key = metadata_key_for(request)?;
        let content_key = content_key_for(request)?;

        let removed_metadata = self.store.delete(&metadata_key).await?;
        let removed_content = self.store.delete(&content_key).await?;

        tracing::debug!(
            cache = %self.name,
            key = %metadata_key,
            removed = removed_metadata || removed_content,
            "deleted entry"
        );

        Ok(removed_metadata || removed_content)
    }
}

impl<S: ExpiringStore> CacheManager<S> {
    /// Reset the store expiry of both keys of the entry for `request`.
    ///
    /// Returns `false` if no metadata is stored for it.
    pub async fn touch(&self, request: &CacheRequest, ttl: Option<Duration>) -> Result<bool, Error> {
        request.validate()?;
        let touched = self.store.expire(&metadata_key_for(request)?, ttl).await?;
        if touched {
            self.store.expire(&content_key_for(request)?, ttl).await?;
        }
        Ok(touched)
    }
}

impl<S: ClosableStore> CacheManager<S> {
    pub async fn close(&self) -> Result<(), Error> {
        self.store.close().await?;
        Ok(())
    }
}

/// Replace stored headers with the ones a 304 carried (RFC 7234 §4.3.4).
fn merge_headers(stored: &mut HeaderMap, fresh: &HeaderMap) {
    let mut replaced: Vec<&str> = Vec::new();
    for (name, _) in fresh.iter() {
        if name.eq_ignore_ascii_case("content-length")
            || DIAGNOSTIC_HEADERS.iter().any(|d| d.eq_ignore_ascii_case(name))
            || replaced.iter().any(|r| r.eq_ignore_ascii_case(name))
        {
            continue;
        }
        stored.remove(name);
        for value in fresh.get_all(name) {
            stored.append(name, value);
        }
        replaced.push(name);
    }
}

/// Cached-at time as reported by `X-Local-Cache-Time`.
pub fn parse_cache_time(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    headers.get(X_LOCAL_CACHE_TIME).and_then(freshness::parse_http_date)
}
