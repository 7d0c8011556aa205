//! Cache key generation.
//!
//! An entry is identified by its method, URL, and the request header values
//! the response said it varies on.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::http::CacheRequest;

/// Request header values for each name a response varies on.
///
/// A header absent from the request is recorded as `None` so that it never
/// compares equal to an empty value.
pub type VaryValues = BTreeMap<String, Option<String>>;

/// Capture the request's values for the given `Vary` header names.
pub fn vary_values(request: &CacheRequest, vary: &[String]) -> VaryValues {
    vary.iter()
        .map(|name| (name.clone(), request.header(name).map(str::to_string)))
        .collect()
}

/// Whether `request` matches an entry stored with `stored` vary values.
///
/// `Vary: *` never matches.
pub fn vary_matches(stored: &VaryValues, request: &CacheRequest) -> bool {
    if stored.contains_key("*") {
        return false;
    }
    stored
        .iter()
        .all(|(name, value)| request.header(name) == value.as_deref())
}

/// Compute the cache key for an entry.
pub fn compute_cache_key(method: &str, url: &str, vary: &VaryValues) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    for (name, value) in vary {
        hasher.update(b"\n");
        hasher.update(name.as_bytes());
        hasher.update(b":");
        match value {
            Some(v) => {
                hasher.update(b"=");
                hasher.update(v.as_bytes());
            }
            None => hasher.update(b"!"),
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("GET", "https://example.com/a.js", &VaryValues::new());
        let hash2 = compute_cache_key("GET", "https://example.com/a.js", &VaryValues::new());
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_method() {
        let get = compute_cache_key("GET", "https://example.com", &VaryValues::new());
        let head = compute_cache_key("HEAD", "https://example.com", &VaryValues::new());
        assert_ne!(get, head);
    }

    #[test]
    fn test_hash_different_vary_values() {
        let gzip = VaryValues::from([("accept-encoding".to_string(), Some("gzip".to_string()))]);
        let br = VaryValues::from([("accept-encoding".to_string(), Some("br".to_string()))]);
        let missing = VaryValues::from([("accept-encoding".to_string(), None)]);
        let empty = VaryValues::from([("accept-encoding".to_string(), Some(String::new()))]);

        let url = "https://example.com";
        assert_ne!(compute_cache_key("GET", url, &gzip), compute_cache_key("GET", url, &br));
        assert_ne!(compute_cache_key("GET", url, &missing), compute_cache_key("GET", url, &empty));
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("GET", "https://example.com", &VaryValues::new());
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_vary_values_and_match() {
        let stored_req = CacheRequest::get("https://example.com/a.js").with_header("Accept-Encoding", "gzip");
        let stored = vary_values(&stored_req, &["accept-encoding".to_string(), "x-missing".to_string()]);
        assert_eq!(stored.get("accept-encoding"), Some(&Some("gzip".to_string())));
        assert_eq!(stored.get("x-missing"), Some(&None));

        assert!(vary_matches(&stored, &stored_req));

        let other = CacheRequest::get("https://example.com/a.js").with_header("accept-encoding", "br");
        assert!(!vary_matches(&stored, &other));

        let extra = stored_req.clone().with_header("x-missing", "now-present");
        assert!(!vary_matches(&stored, &extra));
    }

    #[test]
    fn test_vary_star_never_matches() {
        let req = CacheRequest::get("https://example.com/a.js");
        let stored = vary_values(&req, &["*".to_string()]);
        assert!(!vary_matches(&stored, &req));
    }

    #[test]
    fn test_empty_vary_always_matches() {
        let req = CacheRequest::get("https://example.com/a.js").with_header("accept", "*/*");
        assert!(vary_matches(&VaryValues::new(), &req));
    }
}
