//! The network leg of the pipeline.
//!
//! [`Transport`] is the seam between the caching logic and the actual HTTP
//! call, so the pipeline can be driven by a stub in tests.

use std::sync::Arc;
use std::time::Instant;

use apicache_core::{CacheRequest, CacheResponse, Error, HeaderMap};
use async_trait::async_trait;
use reqwest::{Client, Method};

use super::FetchConfig;

/// Sends one request to the origin.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &CacheRequest) -> Result<CacheResponse, Error>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &CacheRequest) -> Result<CacheResponse, Error> {
        (**self).send(request).await
    }
}

/// [`Transport`] backed by a reqwest client.
///
/// Every status is passed through; only network failures and oversized
/// bodies are errors.
pub struct ReqwestTransport {
    http: Client,
    config: FetchConfig,
}

impl ReqwestTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: u64) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

fn network_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(err.to_string())
    } else {
        Error::HttpError(format!("network error: {}", err))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &CacheRequest) -> Result<CacheResponse, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidArgument(format!("invalid method {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len));
        }

        let headers: HeaderMap = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        let body = response.bytes().await.map_err(network_error)?;

        if body.len() > self.config.max_bytes {
            return Err(self.too_large(body.len() as u64));
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched from origin"
        );

        Ok(CacheResponse { status, headers, body })
    }
}
