//! `Cache-Control` directive parsing.

use crate::HeaderMap;

/// A delta-seconds directive value (`max-age=N`, `s-maxage=N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaSeconds {
    Valid(u64),
    /// Present but negative, non-numeric or missing its argument.
    Invalid,
}

impl DeltaSeconds {
    fn parse(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return DeltaSeconds::Invalid;
        };
        let raw = raw.trim().trim_matches('"');
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return DeltaSeconds::Invalid;
        }
        // RFC 7234 §1.2.1: values too large to represent saturate
        DeltaSeconds::Valid(raw.parse().unwrap_or(u64::MAX))
    }

    /// Seconds of freshness this value grants; invalid values grant none.
    pub fn seconds(self) -> u64 {
        match self {
            DeltaSeconds::Valid(n) => n,
            DeltaSeconds::Invalid => 0,
        }
    }

    /// Repeated directives keep the most restrictive value.
    fn restrict(current: Option<Self>, next: Self) -> Option<Self> {
        match (current, next) {
            (None, next) => Some(next),
            (Some(DeltaSeconds::Invalid), _) | (_, DeltaSeconds::Invalid) => Some(DeltaSeconds::Invalid),
            (Some(DeltaSeconds::Valid(a)), DeltaSeconds::Valid(b)) => Some(DeltaSeconds::Valid(a.min(b))),
        }
    }
}

/// Directives relevant to caching decisions, from request or response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    pub no_store: bool,
    pub no_cache: bool,
    pub private: bool,
    pub max_age: Option<DeltaSeconds>,
    pub s_maxage: Option<DeltaSeconds>,
}

impl CacheControl {
    /// Parse a directive list such as `"public, max-age=60"`.
    ///
    /// Directive names are case-insensitive; list items are separated by a
    /// comma and optional whitespace. Directives without a field here, such as
    /// `public` and `must-revalidate`, are ignored.
    pub fn parse(value: &str) -> Self {
        let mut cc = CacheControl::default();

        for directive in value.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let (name, arg) = match directive.split_once('=') {
                Some((name, arg)) => (name.trim(), Some(arg)),
                None => (directive, None),
            };

            match name.to_ascii_lowercase().as_str() {
                "no-store" => cc.no_store = true,
                "no-cache" => cc.no_cache = true,
                "private" => cc.private = true,
                "max-age" => cc.max_age = DeltaSeconds::restrict(cc.max_age, DeltaSeconds::parse(arg)),
                "s-maxage" => cc.s_maxage = DeltaSeconds::restrict(cc.s_maxage, DeltaSeconds::parse(arg)),
                _ => {}
            }
        }

        cc
    }

    /// Parse every `Cache-Control` field in `headers` as one combined list.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get_joined("cache-control")
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}
