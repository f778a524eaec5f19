//! Matching a stored entry against a live request.
//!
//! Checks run in order and the first failure wins:
//! 1. `Vary: *` never matches
//! 2. Every header named by `Vary` must be byte-equal between the live
//!    request and the request recorded at write time
//! 3. An expected integrity token, if supplied, must equal the stored one
//! 4. Normalized URLs must be equal

use super::entry::EntryRecord;
use super::key::normalize_url;
use crate::CacheRequest;

/// Header names listed by the stored response's `Vary` fields, lower-cased.
fn vary_fields(record: &EntryRecord) -> Vec<String> {
    record
        .metadata
        .res_headers
        .get_all("vary")
        .flat_map(|v| v.split(','))
        .map(|f| f.trim().to_ascii_lowercase())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Whether `record` may answer `request`.
///
/// `request` is expected to have non-cacheable headers already stripped.
pub fn matches(request: &CacheRequest, record: &EntryRecord, expected_integrity: Option<&str>) -> bool {
    let fields = vary_fields(record);

    if fields.iter().any(|f| f == "*") {
        return false;
    }

    for field in &fields {
        let live = request.headers.get_joined(field);
        let stored = record.metadata.req_headers.get_joined(field);
        if live != stored {
            tracing::debug!(field = %field, "vary mismatch");
            return false;
        }
    }

    if let (Some(stored), Some(expected)) = (record.integrity.as_deref(), expected_integrity)
        && stored != expected
    {
        return false;
    }

    match (normalize_url(&request.url), normalize_url(&record.metadata.url)) {
        (Ok(live), Ok(stored)) => live == stored,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeaderMap;
    use crate::cache::entry::EntryMetadata;

    fn record(res_headers: HeaderMap, req_headers: HeaderMap) -> EntryRecord {
        EntryRecord {
            key: "request-cache:https://example.com/products".into(),
            integrity: Some("sha256-stored".into()),
            size: 0,
            time: 0,
            validated_at: None,
            ttl_ms: 0,
            metadata: EntryMetadata {
                url: "https://example.com/products".into(),
                status: 200,
                req_headers,
                res_headers,
            },
        }
    }

    #[test]
    fn test_plain_entry_matches() {
        let r = record(HeaderMap::new(), HeaderMap::new());
        assert!(matches(&CacheRequest::get("https://example.com/products"), &r, None));
        assert!(matches(&CacheRequest::get("https://EXAMPLE.com/products#top"), &r, None));
    }

    #[test]
    fn test_vary_star_never_matches() {
        let r = record(HeaderMap::from([("Vary", "*")]), HeaderMap::new());
        assert!(!matches(&CacheRequest::get("https://example.com/products"), &r, None));
    }

    #[test]
    fn test_vary_header_mismatch() {
        let r = record(
            HeaderMap::from([("Vary", "accept-encoding")]),
            HeaderMap::from([("accept-encoding", "gzip")]),
        );
        let req = CacheRequest::get("https://example.com/products").with_header("accept-encoding", "compress");
        assert!(!matches(&req, &r, None));
    }

    #[test]
    fn test_vary_header_equal_ignores_name_case() {
        let r = record(
            HeaderMap::from([("Vary", "Accept-Encoding, Accept")]),
            HeaderMap::from([("accept-encoding", "gzip"), ("accept", "application/json")]),
        );
        let req = CacheRequest::get("https://example.com/products")
            .with_header("Accept", "application/json")
            .with_header("ACCEPT-ENCODING", "gzip");
        assert!(matches(&req, &r, None));
    }

    #[test]
    fn test_vary_header_absent_on_both_sides() {
        let r = record(HeaderMap::from([("Vary", "x-site-id")]), HeaderMap::new());
        assert!(matches(&CacheRequest::get("https://example.com/products"), &r, None));

        let req = CacheRequest::get("https://example.com/products").with_header("x-site-id", "RefArch");
        assert!(!matches(&req, &r, None));
    }

    #[test]
    fn test_integrity_comparison() {
        let r = record(HeaderMap::new(), HeaderMap::new());
        let req = CacheRequest::get("https://example.com/products");
        assert!(matches(&req, &r, Some("sha256-stored")));
        assert!(!matches(&req, &r, Some("sha256-other")));

        let mut unhashed = r.clone();
        unhashed.integrity = None;
        assert!(matches(&req, &unhashed, Some("sha256-other")));
    }

    #[test]
    fn test_url_mismatch() {
        let r = record(HeaderMap::new(), HeaderMap::new());
        assert!(!matches(&CacheRequest::get("https://example.com/categories"), &r, None));
        assert!(matches(&CacheRequest::get("https://example.com/products?"), &r, None));
    }
}
