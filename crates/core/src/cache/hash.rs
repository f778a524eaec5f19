//! Content integrity tokens for cached bodies.

use sha2::{Digest, Sha256};

/// Compute the integrity token recorded alongside a cached body.
///
/// Format: `sha256-<hex digest>`.
pub fn compute_integrity(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    format!("sha256-{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_stability() {
        assert_eq!(compute_integrity(b"{\"mock\":\"data\"}"), compute_integrity(b"{\"mock\":\"data\"}"));
    }

    #[test]
    fn test_integrity_differs_by_content() {
        assert_ne!(compute_integrity(b"a"), compute_integrity(b"b"));
    }

    #[test]
    fn test_integrity_format() {
        let token = compute_integrity(b"");
        let digest = token.strip_prefix("sha256-").unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
