//! Request cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request from its method and URL.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_request_key("GET", "http://localhost:8100/");
        let hash2 = compute_request_key("GET", "http://localhost:8100/");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_url() {
        let root = compute_request_key("GET", "http://localhost:8100/");
        let mobile = compute_request_key("GET", "http://localhost:8100/mobile");
        assert_ne!(root, mobile);
    }

    #[test]
    fn test_hash_separator() {
        let a = compute_request_key("GE", "Thttp://a/");
        let b = compute_request_key("GET", "http://a/");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_request_key("GET", "http://localhost:8100/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
