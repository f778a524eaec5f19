//! RFC 7234 response caching on top of a pluggable key-value store.
//!
//! - [`key`]: cache keys from normalized request URLs
//! - [`control`] and [`freshness`]: cacheability, TTL and reuse decisions
//! - [`validator`]: `Vary` and integrity matching against a live request
//! - [`manager`]: the `lookup` / `put` / `delete` contract used by clients

pub mod control;
pub mod entry;
pub mod freshness;
pub mod hash;
pub mod key;
pub mod manager;
pub mod mode;
pub mod validator;

pub use control::CacheControl;
pub use entry::{EntryMetadata, EntryRecord};
pub use freshness::Freshness;
pub use key::{content_key_for, metadata_key_for, normalize_url};
pub use manager::{CacheManager, CacheOptions, CachedResponse};
pub use mode::CacheMode;
