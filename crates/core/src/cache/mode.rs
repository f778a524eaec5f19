//! Per-request cache modes, named after the fetch standard's `cache` option.

use serde::{Deserialize, Serialize};

/// How the client pipeline uses the cache for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Serve fresh hits, revalidate stale ones, store cacheable responses.
    #[default]
    Default,
    /// Bypass the cache entirely; nothing is read or written.
    NoStore,
    /// Skip the lookup but store the live response.
    Reload,
    /// Always revalidate a hit, even a fresh one.
    NoCache,
    /// Serve any hit regardless of freshness; fetch only on a miss.
    ForceCache,
    /// Serve any hit regardless of freshness; fail on a miss.
    OnlyIfCached,
}

impl CacheMode {
    pub fn reads_cache(self) -> bool {
        !matches!(self, CacheMode::NoStore | CacheMode::Reload)
    }

    pub fn writes_cache(self) -> bool {
        !matches!(self, CacheMode::NoStore)
    }
}
