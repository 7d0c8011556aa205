//! Network seam for the cache agent.
//!
//! [`Fetcher`] is what the agent calls when the cache cannot answer. It
//! follows platform `fetch` semantics: any HTTP status is a response, and
//! only transport failures are errors.
//!
//! [`FetchClient`] implements it over reqwest:
//! - Max redirects: 5
//! - Max body bytes: 64MB (configurable)
//! - Request timeout: 30s (configurable)

pub mod url;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, header};

pub use url::{UrlError, canonicalize, resolve, resolve_request};

use swcache_core::{AppConfig, CacheRequest, CachedResponse, Error};

/// Issues network requests on a cache miss.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request and buffer the whole response.
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 64MB)
    pub max_bytes: usize,

    /// Request timeout (default: 30s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 64 * 1024 * 1024,
            timeout: Duration::from_millis(30_000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, Error> {
        let start = Instant::now();
        let url = canonicalize(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", request.method)))?;

        let mut builder = self.http.request(method, url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{url}: {e}")))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && exceeds_limit(len, self.config.max_bytes)
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response from {url}: {e}")))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(CachedResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            url: final_url,
        })
    }
}

/// Whether a declared body length is over `max_bytes`, without truncating on 32-bit targets.
fn exceeds_limit(len: u64, max_bytes: usize) -> bool {
    usize::try_from(len).map_or(true, |len| len > max_bytes)
}

/// Flatten a header map, joining repeated headers with ", ".
fn collect_headers(map: &header::HeaderMap) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else {
            continue;
        };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP/1.1 response on a random local port.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 64 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(30_000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "mgba-web/1.0".into(), max_bytes: 1024, timeout_ms: 500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "mgba-web/1.0");
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_collect_headers_joins_repeats() {
        let mut map = header::HeaderMap::new();
        map.append("vary", "accept".parse().unwrap());
        map.append("vary", "accept-encoding".parse().unwrap());
        map.insert("content-type", "text/css".parse().unwrap());

        let headers = collect_headers(&map);
        assert_eq!(headers.get("vary").map(String::as_str), Some("accept, accept-encoding"));
        assert_eq!(headers.get("content-type").map(String::as_str), Some("text/css"));
    }

    #[test]
    fn test_exceeds_limit() {
        assert!(!exceeds_limit(8, 8));
        assert!(exceeds_limit(9, 8));
        assert!(exceeds_limit(u64::MAX, 64 * 1024 * 1024));
        assert!(exceeds_limit(u64::from(u32::MAX) + 1, u32::MAX as usize));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_ok_response() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/javascript\r\nContent-Length: 11\r\nConnection: close\r\n\r\nconsole.log",
        )
        .await;
        let client = FetchClient::new(FetchConfig::default()).unwrap();

        let response = client.fetch(&CacheRequest::get(&format!("{base}/game.js"))).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, "OK");
        assert_eq!(response.content_type(), Some("text/javascript"));
        assert_eq!(&response.body[..], b"console.log");
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_a_response() {
        let base = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let client = FetchClient::new(FetchConfig::default()).unwrap();

        let response = client.fetch(&CacheRequest::get(&format!("{base}/missing.js"))).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let base =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 16\r\nConnection: close\r\n\r\n0123456789abcdef").await;
        let config = FetchConfig { max_bytes: 8, ..Default::default() };
        let client = FetchClient::new(config).unwrap();

        let result = client.fetch(&CacheRequest::get(&format!("{base}/build/mgba.wasm"))).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let result = client.fetch(&CacheRequest::get(&format!("http://{addr}/offline-only.json"))).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let result = client.fetch(&CacheRequest::get("ftp://example.com/a.js")).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
