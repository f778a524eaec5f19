//! Cache key derivation from normalized request URLs.
//!
//! Normalization steps:
//! 1. Trim leading/trailing whitespace
//! 2. Default scheme to https:// if missing
//! 3. Lowercase the host
//! 4. Remove fragment (#...)
//! 5. Sort query parameters by name (stable for repeated names)

use crate::{CacheRequest, Error};

/// Prefix of the key holding an entry's metadata record.
pub const METADATA_KEY_PREFIX: &str = "request-cache-metadata:";

/// Prefix of the key holding an entry's raw response body.
pub const CONTENT_KEY_PREFIX: &str = "request-cache:";

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::Empty => Error::InvalidArgument("request url is empty".into()),
            other => Error::InvalidUrl(other.to_string()),
        }
    }
}

/// Normalize a URL string so that equivalent requests share one cache entry.
///
/// `?a=1&b=2` and `?b=2&a=1` normalize identically; the fragment never
/// participates in the key.
pub fn normalize_url(input: &str) -> Result<String, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    let mut pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        parsed.query_pairs_mut().clear().extend_pairs(&pairs);
    }

    Ok(parsed.into())
}

/// Key of the metadata record for `request`.
pub fn metadata_key_for(request: &CacheRequest) -> Result<String, Error> {
    Ok(format!("{METADATA_KEY_PREFIX}{}", normalize_url(&request.url)?))
}

/// Key of the stored body for `request`.
pub fn content_key_for(request: &CacheRequest) -> Result<String, Error> {
    Ok(format!("{CONTENT_KEY_PREFIX}{}", normalize_url(&request.url)?))
}
