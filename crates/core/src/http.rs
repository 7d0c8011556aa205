//! Request and response model shared by the store and the network seam.
//!
//! A [`CacheRequest`] is the lookup key (method, URL, headers) and a
//! [`CachedResponse`] is the stored value (status, headers, body).

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A request as seen by the cache: the key half of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRequest {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Absolute URL without fragment.
    pub url: String,
    /// Request headers keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
}

impl CacheRequest {
    pub fn new(method: &str, url: &str) -> Self {
        Self { method: method.to_ascii_uppercase(), url: strip_fragment(url).to_string(), headers: BTreeMap::new() }
    }

    /// A plain `GET` request for `url`.
    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    /// Add a header, normalizing the name.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

fn strip_fragment(url: &str) -> &str {
    match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

/// A fully buffered response.
///
/// Cloning shares the body buffer, so the copy handed to the requester and
/// the copy written to the store never contend for a single-read stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub status_text: String,
    /// Response headers keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    /// Final URL the response was served from.
    pub url: String,
}

impl CachedResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, status_text: String::new(), headers: BTreeMap::new(), body: body.into(), url: String::new() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Header names listed in `Vary`, lower-cased.
    pub fn vary(&self) -> Vec<String> {
        self.header("vary")
            .map(|v| {
                v.split(',')
                    .map(|name| name.trim().to_ascii_lowercase())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_normalization() {
        let req = CacheRequest::new("get", "https://example.com/a.js#top").with_header("Accept-Encoding", "gzip");
        assert_eq!(req.method, "GET");
        assert_eq!(req.url, "https://example.com/a.js");
        assert_eq!(req.header("accept-encoding"), Some("gzip"));
        assert!(req.is_get());
    }

    #[test]
    fn test_response_is_ok() {
        assert!(CachedResponse::new(200, "x").is_ok());
        assert!(CachedResponse::new(204, "").is_ok());
        assert!(!CachedResponse::new(404, "").is_ok());
        assert!(!CachedResponse::new(301, "").is_ok());
    }

    #[test]
    fn test_response_vary() {
        let resp = CachedResponse::new(200, "").with_header("Vary", "Accept-Encoding, , User-Agent");
        assert_eq!(resp.vary(), vec!["accept-encoding".to_string(), "user-agent".to_string()]);
        assert!(CachedResponse::new(200, "").vary().is_empty());
    }

    #[test]
    fn test_clone_shares_body() {
        let resp = CachedResponse::new(200, Bytes::from_static(b"payload"));
        let copy = resp.clone();
        assert_eq!(resp.body.as_ptr(), copy.body.as_ptr());
    }
}
