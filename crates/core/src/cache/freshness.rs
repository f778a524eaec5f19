//! Freshness evaluation: cacheability, TTL computation and reuse decisions.
//!
//! ### TTL precedence (most restrictive wins)
//! 1. `no-store` / `private` - never stored (see [`should_cache`])
//! 2. `s-maxage=N`
//! 3. `max-age=N`
//! 4. `Expires` minus now
//! 5. Nothing - TTL 0, stored but always revalidated
//!
//! `no-cache` never affects the TTL; it only forces revalidation on reuse.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};

use super::control::CacheControl;
use crate::HeaderMap;

/// Longest lifetime ever persisted: 2^31 seconds (RFC 7234 §1.2.1).
pub const MAX_TTL: Duration = Duration::from_secs(2_147_483_648);

/// Statuses that are cacheable by default (RFC 7231 §6.1).
const CACHEABLE_STATUSES: &[u16] = &[200, 203, 204, 300, 301, 308, 404, 405, 410, 414, 501];

/// How a stored entry may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Within its TTL; may be served without contacting the origin.
    Fresh,
    /// TTL elapsed; must be revalidated before use.
    Stale,
    /// `no-cache` on the stored response or the live request.
    MustRevalidate,
}

impl Freshness {
    pub fn is_fresh(self) -> bool {
        self == Freshness::Fresh
    }
}

/// Whether a response with these headers may be persisted at all.
pub fn should_cache(response_headers: &HeaderMap) -> bool {
    let cc = CacheControl::from_headers(response_headers);
    !(cc.no_store || cc.private)
}

/// Whether the live request permits storing its response.
pub fn request_allows_store(request_headers: &HeaderMap) -> bool {
    !CacheControl::from_headers(request_headers).no_store
}

/// Whether a response status may be stored by the client pipeline.
pub fn is_cacheable_status(status: u16) -> bool {
    CACHEABLE_STATUSES.contains(&status)
}

/// Freshness lifetime to persist with a response, relative to `now`.
///
/// A zero duration means "stored but immediately stale". Never exceeds
/// [`MAX_TTL`].
pub fn compute_ttl(response_headers: &HeaderMap, now: DateTime<Utc>) -> Duration {
    lifetime(response_headers, now).min(MAX_TTL)
}

fn lifetime(response_headers: &HeaderMap, now: DateTime<Utc>) -> Duration {
    let cc = CacheControl::from_headers(response_headers);

    if let Some(lifetime) = cc.s_maxage.or(cc.max_age) {
        let age = response_age(response_headers);
        return Duration::from_secs(lifetime.seconds().saturating_sub(age));
    }

    if let Some(expires) = response_headers.get("expires") {
        // RFC 7234 §5.3: an unparseable Expires means "already expired"
        return parse_http_date(expires)
            .and_then(|at| (at - now).to_std().ok())
            .unwrap_or(Duration::ZERO);
    }

    Duration::ZERO
}

/// Whether every reuse of a stored response must be revalidated.
pub fn requires_revalidation(response_headers: &HeaderMap) -> bool {
    CacheControl::from_headers(response_headers).no_cache
}

/// Decide how a stored entry may be used for a live request.
///
/// `validated_at` is when the origin last confirmed the stored response
/// (its original write or latest 304 merge).
pub fn evaluate(
    ttl: Duration, validated_at: DateTime<Utc>, response_headers: &HeaderMap, request_headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Freshness {
    let request_cc = CacheControl::from_headers(request_headers);
    let request_forbids_stored = request_cc.no_cache || request_cc.max_age.is_some_and(|m| m.seconds() == 0);

    if requires_revalidation(response_headers) || request_forbids_stored {
        return Freshness::MustRevalidate;
    }

    let elapsed = (now - validated_at).to_std().unwrap_or(Duration::ZERO);
    if elapsed < ttl { Freshness::Fresh } else { Freshness::Stale }
}

/// Value of the `Age` header in seconds; absent or invalid counts as zero.
fn response_age(headers: &HeaderMap) -> u64 {
    headers
        .get("age")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Parse an HTTP-date in any of the three formats of RFC 7231 §7.1.1.1.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Render a timestamp in the IMF-fixdate (RFC 1123) form used by HTTP.
pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
