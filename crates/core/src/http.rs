//! Request and response shapes exchanged with the cache.

use bytes::Bytes;

use crate::{Error, HeaderMap};

/// An outbound request as seen by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    pub url: String,
    /// Upper-case method name (`GET`, `HEAD`, ...).
    pub method: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CacheRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into().to_ascii_uppercase(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new("HEAD", url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_head(&self) -> bool {
        self.method.eq_ignore_ascii_case("HEAD")
    }

    /// Methods whose responses the pipeline may serve from cache.
    pub fn is_cacheable_method(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET") || self.is_head()
    }

    /// Rejects requests the cache cannot key.
    pub fn validate(&self) -> Result<(), Error> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidArgument("request url is empty".into()));
        }
        if self.method.trim().is_empty() {
            return Err(Error::InvalidArgument("request method is empty".into()));
        }
        Ok(())
    }
}

/// A response either received from the network or synthesized from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CacheResponse {
    pub fn new(status: u16) -> Self {
        Self { status, headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(100..=599).contains(&self.status) {
            return Err(Error::InvalidArgument(format!("response status {} is out of range", self.status)));
        }
        Ok(())
    }
}
