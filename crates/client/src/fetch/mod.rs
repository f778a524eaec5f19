//! HTTP fetch pipeline with RFC 7234 caching.
//!
//! ### Cache use per request
//! - Safe methods (`GET`, `HEAD`) consult the cache according to the
//!   request's [`CacheMode`]
//! - Fresh hits are served without a network call
//! - Stale or `no-cache` hits are revalidated with `If-None-Match` or
//!   `If-Modified-Since`; a 304 is merged into the entry and the cached body
//!   is served
//! - Cacheable responses are stored; successful unsafe methods invalidate
//!   the entry for their URL
//!
//! ### Failure handling
//! - Per-request timeout: a cancelled request never reaches the cache
//! - Store failures degrade to a miss when `fail_open` is set
//! - Max redirects and max body bytes are enforced by the transport

pub mod transport;

use std::sync::Arc;
use std::time::{Duration, Instant};

use apicache_core::cache::freshness;
use apicache_core::{
    AppConfig, CacheManager, CacheMode, CacheOptions, CacheRequest, CacheResponse, CachedResponse, Error, Store,
};

pub use transport::{ReqwestTransport, Transport};

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "apicache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 10)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "apicache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 10,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// Per-request overrides.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Cache mode; the client default when `None`.
    pub mode: Option<CacheMode>,
    /// Deadline for the network call; the client default when `None`.
    pub timeout: Option<Duration>,
    /// Expected integrity of the cached body.
    pub integrity: Option<String>,
}

impl FetchOptions {
    pub fn mode(mode: CacheMode) -> Self {
        Self { mode: Some(mode), ..Default::default() }
    }
}

/// Where a [`FetchResponse`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from the cache without contacting the origin.
    Cache,
    /// The origin confirmed the cached entry with a 304.
    Revalidated,
    /// Full response from the origin.
    Network,
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub response: CacheResponse,
    pub source: ResponseSource,
    /// Time taken to answer in milliseconds
    pub fetch_ms: u64,
}

/// HTTP client that answers from and maintains a [`CacheManager`].
pub struct CachingClient<T, S> {
    transport: T,
    cache: CacheManager<S>,
    mode: CacheMode,
    timeout: Duration,
    fail_open: bool,
}

impl CachingClient<ReqwestTransport, Arc<dyn Store>> {
    /// Build a reqwest-backed client and open the configured store.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let transport = ReqwestTransport::new(FetchConfig::from(config))?;
        let store = apicache_core::store::open(config).await?;
        Ok(Self {
            transport,
            cache: CacheManager::from_config(store, config),
            mode: config.cache_mode,
            timeout: config.timeout(),
            fail_open: config.fail_open,
        })
    }
}

impl<T: Transport, S: Store> CachingClient<T, S> {
    pub fn new(transport: T, cache: CacheManager<S>) -> Self {
        Self { transport, cache, mode: CacheMode::Default, timeout: FetchConfig::default().timeout, fail_open: true }
    }

    /// Mode used when a request does not set one.
    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    pub fn cache(&self) -> &CacheManager<S> {
        &self.cache
    }

    /// Answer `request` from the cache, the origin, or both.
    ///
    /// # Errors
    ///
    /// - [`Error::NotCached`] for an `only-if-cached` miss
    /// - [`Error::FetchTimeout`] when the network call exceeds its deadline
    /// - Transport errors as returned by the [`Transport`]
    /// - Cache errors when `fail_open` is off
    pub async fn fetch(&self, request: CacheRequest, options: FetchOptions) -> Result<FetchResponse, Error> {
        request.validate()?;
        let start = Instant::now();
        let mode = options.mode.unwrap_or(self.mode);
        let timeout = options.timeout.unwrap_or(self.timeout);
        let cache_options = CacheOptions { integrity: options.integrity };

        let (response, source) = if !request.is_cacheable_method() {
            self.fetch_unsafe(&request, &cache_options, timeout).await?
        } else if !mode.writes_cache() || !freshness::request_allows_store(&request.headers) {
            (self.send(&request, timeout).await?, ResponseSource::Network)
        } else {
            self.fetch_cached(&request, &cache_options, mode, timeout).await?
        };

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            ?source,
            ?mode,
            fetch_ms,
            "fetch complete"
        );

        Ok(FetchResponse { response, source, fetch_ms })
    }

    async fn fetch_cached(
        &self, request: &CacheRequest, options: &CacheOptions, mode: CacheMode, timeout: Duration,
    ) -> Result<(CacheResponse, ResponseSource), Error> {
        let cached = if mode.reads_cache() { self.lookup(request, options).await? } else { None };

        match (mode, cached) {
            (CacheMode::ForceCache | CacheMode::OnlyIfCached, Some(hit)) => {
                Ok((hit.into_response(), ResponseSource::Cache))
            }
            (CacheMode::OnlyIfCached, None) => Err(Error::NotCached(request.url.clone())),
            (CacheMode::Default, Some(hit)) if hit.is_fresh() => Ok((hit.into_response(), ResponseSource::Cache)),
            (_, Some(hit)) => self.revalidate(request, options, hit, timeout).await,
            (_, None) => {
                let response = self.send(request, timeout).await?;
                // a HEAD miss has no entry to merge into
                let response = if request.is_head() { response } else { self.store(request, response, options).await? };
                Ok((response, ResponseSource::Network))
            }
        }
    }

    async fn revalidate(
        &self, request: &CacheRequest, options: &CacheOptions, hit: CachedResponse, timeout: Duration,
    ) -> Result<(CacheResponse, ResponseSource), Error> {
        let mut conditional = request.clone();
        for (name, value) in hit.conditional_headers().iter() {
            conditional.headers.set(name, value);
        }

        tracing::debug!(cache = %self.cache.name(), url = %request.url, freshness = ?hit.freshness, "revalidating");

        let response = self.send(&conditional, timeout).await?;

        if !response.is_not_modified() {
            let response = self.store(request, response, options).await?;
            return Ok((response, ResponseSource::Network));
        }

        if let Err(err) = self.cache.put(request, response, options).await {
            self.degrade(err, "merge")?;
            return Ok((hit.into_response(), ResponseSource::Revalidated));
        }

        let refreshed = self.lookup(request, options).await?;
        let response = refreshed.map_or_else(|| hit.into_response(), CachedResponse::into_response);
        Ok((response, ResponseSource::Revalidated))
    }

    /// Send an unsafe request and invalidate its URL on success (RFC 7234 §4.4).
    async fn fetch_unsafe(
        &self, request: &CacheRequest, options: &CacheOptions, timeout: Duration,
    ) -> Result<(CacheResponse, ResponseSource), Error> {
        let response = self.send(request, timeout).await?;

        if (200..400).contains(&response.status) {
            match self.cache.delete(request, options).await {
                Ok(removed) => {
                    tracing::debug!(cache = %self.cache.name(), url = %request.url, removed, "invalidated entry")
                }
                Err(err) => self.degrade(err, "delete")?,
            }
        }

        Ok((response, ResponseSource::Network))
    }

    async fn lookup(&self, request: &CacheRequest, options: &CacheOptions) -> Result<Option<CachedResponse>, Error> {
        match self.cache.lookup(request, options).await {
            Ok(hit) => Ok(hit),
            Err(err) => {
                self.degrade(err, "lookup")?;
                Ok(None)
            }
        }
    }

    async fn store(
        &self, request: &CacheRequest, response: CacheResponse, options: &CacheOptions,
    ) -> Result<CacheResponse, Error> {
        if !freshness::is_cacheable_status(response.status) {
            return Ok(response);
        }
        match self.cache.put(request, response.clone(), options).await {
            Ok(stored) => Ok(stored),
            Err(err) => {
                self.degrade(err, "put")?;
                Ok(response)
            }
        }
    }

    /// Swallow a cache-layer error when failing open; otherwise return it.
    fn degrade(&self, err: Error, operation: &str) -> Result<(), Error> {
        if self.fail_open && err.is_cache_error() {
            tracing::warn!(
                cache = %self.cache.name(),
                operation,
                error = %err,
                "cache unavailable, continuing without it"
            );
            Ok(())
        } else {
            Err(err)
        }
    }

    async fn send(&self, request: &CacheRequest, timeout: Duration) -> Result<CacheResponse, Error> {
        tokio::time::timeout(timeout, self.transport.send(request))
            .await
            .map_err(|_| Error::FetchTimeout(format!("{} exceeded {}ms", request.url, timeout.as_millis())))?
    }
}
