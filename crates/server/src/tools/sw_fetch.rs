//! sw_fetch tool implementation.
//!
//! Dispatches a request as if a controlled page had issued it: answered by
//! the active version's cache when possible, otherwise by the network.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{ResponseSource, resolve_request};
use swcache_core::{AppConfig, CacheRequest, Error};

use crate::platform::ServiceWorkerHost;
use crate::tools::json_result;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// URL to request. Paths and scheme-less URLs resolve against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests touch the cache.
    #[serde(default)]
    pub method: Option<String>,

    /// Request headers, consulted when a stored response varies on them.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// "cache" or "network".
    pub source: String,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
    pub body_bytes: usize,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(
    host: &ServiceWorkerHost, config: &AppConfig, params: SwFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
    let url = resolve_request(&origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let method = params.method.as_deref().unwrap_or("GET");
    let request = params
        .headers
        .unwrap_or_default()
        .iter()
        .fold(CacheRequest::new(method, url.as_str()), |req, (name, value)| req.with_header(name, value));

    let outcome = host.handle_fetch(&request).await?;
    let response = outcome.response;

    let output = SwFetchOutput {
        url: if response.url.is_empty() { request.url.clone() } else { response.url.clone() },
        status: response.status,
        status_text: response.status_text.clone(),
        source: match outcome.source {
            ResponseSource::Cache => "cache".to_string(),
            ResponseSource::Network => "network".to_string(),
        },
        content_type: response.content_type().map(str::to_string),
        body: std::str::from_utf8(&response.body).ok().map(str::to_string),
        body_bytes: response.body.len(),
        headers: response.headers,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::output_json;
    use std::sync::Arc;
    use swcache_client::{AgentSettings, CacheAgent, testing::StaticFetcher};
    use swcache_core::{AppConfig, CacheDb, CachedResponse};

    const INDEX: &str = "http://localhost:8080/index.html";

    fn config() -> AppConfig {
        AppConfig { version: "v1".into(), manifest: vec!["/index.html".into()], ..Default::default() }
    }

    async fn active_host() -> (ServiceWorkerHost, Arc<StaticFetcher>) {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let fetcher = Arc::new(StaticFetcher::new().with_response(
            INDEX,
            CachedResponse::new(200, "<html>").with_header("content-type", "text/html"),
        ));
        let host = ServiceWorkerHost::new(fetcher.clone(), store.clone());

        let agent = CacheAgent::new(AgentSettings::from_config(&config()).unwrap(), store, fetcher.clone());
        host.register(agent).await.unwrap();
        host.activate_waiting().await.unwrap();
        (host, fetcher)
    }

    async fn fetch(host: &ServiceWorkerHost, params: SwFetchParams) -> Result<CallToolResult, McpError> {
        fetch_impl(host, &config(), params).await
    }

    fn get(url: &str) -> SwFetchParams {
        SwFetchParams { url: url.to_string(), method: None, headers: None }
    }

    #[tokio::test]
    async fn test_fetch_impl_cache_hit() {
        let (host, fetcher) = active_host().await;
        let calls = fetcher.call_count();

        let result = fetch(&host, get(INDEX)).await.unwrap();
        let output: SwFetchOutput = serde_json::from_value(output_json(&result)).unwrap();
        assert_eq!(output.source, "cache");
        assert_eq!(output.status, 200);
        assert_eq!(output.content_type.as_deref(), Some("text/html"));
        assert_eq!(output.body.as_deref(), Some("<html>"));
        assert_eq!(output.body_bytes, 6);
        assert_eq!(fetcher.call_count(), calls);
    }

    #[tokio::test]
    async fn test_fetch_impl_equivalent_urls_hit_precache() {
        let (host, fetcher) = active_host().await;
        let calls = fetcher.call_count();

        for url in [
            "http://LOCALHOST:8080/index.html",
            "http://localhost:8080/./index.html",
            "localhost:8080/index.html",
            "/index.html",
        ] {
            let output: SwFetchOutput =
                serde_json::from_value(output_json(&fetch(&host, get(url)).await.unwrap())).unwrap();
            assert_eq!(output.source, "cache", "{url}");
            assert_eq!(output.body.as_deref(), Some("<html>"));
        }
        assert_eq!(fetcher.call_count(), calls);
    }

    #[tokio::test]
    async fn test_fetch_impl_unsupported_scheme() {
        let (host, fetcher) = active_host().await;
        let calls = fetcher.call_count();

        let err = fetch(&host, get("ftp://localhost:8080/index.html")).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
        assert_eq!(fetcher.call_count(), calls);
    }

    #[tokio::test]
    async fn test_fetch_impl_network_then_cache() {
        let (host, fetcher) = active_host().await;
        let url = "http://localhost:8080/new-asset.png";
        fetcher.set_response(url, CachedResponse::new(200, vec![0x89, 0x50, 0x4e, 0x47, 0xff]));

        let first: SwFetchOutput =
            serde_json::from_value(output_json(&fetch(&host, get(url)).await.unwrap())).unwrap();
        assert_eq!(first.source, "network");
        assert!(first.body.is_none());
        assert_eq!(first.body_bytes, 5);

        let second: SwFetchOutput =
            serde_json::from_value(output_json(&fetch(&host, get(url)).await.unwrap())).unwrap();
        assert_eq!(second.source, "cache");
    }

    #[tokio::test]
    async fn test_fetch_impl_network_error() {
        let (host, fetcher) = active_host().await;
        let url = "http://localhost:8080/offline-only.json";
        fetcher.set_failure(url, "offline");

        let err = fetch(&host, get(url)).await.unwrap_err();
        assert_eq!(err.code.0, -32008);
    }

    #[tokio::test]
    async fn test_fetch_impl_post_bypasses_cache() {
        let (host, fetcher) = active_host().await;
        let params = SwFetchParams { url: INDEX.to_string(), method: Some("post".into()), headers: None };

        let output: SwFetchOutput =
            serde_json::from_value(output_json(&fetch(&host, params).await.unwrap())).unwrap();
        assert_eq!(output.source, "network");
        assert_eq!(fetcher.calls_for(INDEX), 2);
    }

    #[tokio::test]
    async fn test_fetch_impl_empty_url() {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let host = ServiceWorkerHost::new(Arc::new(StaticFetcher::new()), store);
        let err = fetch(&host, get("  ")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
