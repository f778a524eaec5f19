//! Unified error types for apicache.
//!
//! Every variant renders with a stable upper-case code prefix so callers can
//! match on the rendered message as well as on the variant.

use crate::store::StoreError;

/// Unified error type for the cache manager and the client pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request or response handed to the cache is structurally invalid.
    #[error("INVALID_ARGUMENT: {0}")]
    InvalidArgument(String),

    /// The request URL could not be parsed or normalized.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The backing key-value store rejected an operation.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Stored metadata is missing or does not decode into a cache record.
    #[error("MALFORMED_CACHED_RECORD: {0}")]
    MalformedCachedRecord(String),

    /// Store schema migration failed to apply.
    #[error("STORE_UNAVAILABLE: migration failed: {0}")]
    MigrationFailed(String),

    /// Network error or unusable HTTP response.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Network request exceeded its deadline.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Response body exceeded the configured size limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// `only-if-cached` request found nothing usable in the cache.
    #[error("NOT_CACHED: {0}")]
    NotCached(String),
}

impl Error {
    /// Whether this error came from the cache layer rather than the network.
    ///
    /// The client pipeline uses this to decide whether a failure may be
    /// downgraded to a cache miss.
    pub fn is_cache_error(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::MalformedCachedRecord(_) | Error::MigrationFailed(_))
    }
}
