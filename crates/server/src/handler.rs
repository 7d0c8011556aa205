//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::platform::ServiceWorkerHost;
use crate::tools::{
    SwFetchParams, SwInstallParams,
    cache::{CacheEntriesParams, entries_impl, keys_impl},
    sw_activate::activate_impl,
    sw_fetch::fetch_impl,
    sw_install::install_impl,
    sw_status::status_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::Fetcher;
use swcache_core::{AppConfig, CacheStore};

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    tool_router: ToolRouter<Self>,
    config: Arc<AppConfig>,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<ServiceWorkerHost>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a host already driven by `main`.
    pub fn new(
        config: Arc<AppConfig>, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>, host: Arc<ServiceWorkerHost>,
    ) -> Self {
        Self { tool_router: Self::tool_router(), config, store, fetcher, host }
    }

    #[tool(description = "Install a version: precache the asset manifest into its bucket. \
                          Defaults to the configured build version. Succeeds only if every asset fetched with 2xx.")]
    async fn sw_install(&self, params: Parameters<SwInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.host, &self.config, self.store.clone(), self.fetcher.clone(), params.0).await
    }

    #[tool(description = "Activate the waiting version. Deletes every cache bucket that belongs to another version.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.host).await
    }

    /// Dispatch a request through the active version.
    ///
    /// Cache hits never touch the network; misses are fetched and written through.
    #[tool(description = "Fetch a URL as a controlled page would: cache first, network on miss. \
                          Returns status, headers, body and whether it came from cache or network.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, &self.config, params.0).await
    }

    #[tool(description = "Report the installing, waiting, active and recently redundant versions.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.host).await
    }

    #[tool(description = "List cache bucket names, oldest first.")]
    async fn cache_keys(&self) -> Result<CallToolResult, McpError> {
        keys_impl(self.store.as_ref()).await
    }

    #[tool(description = "List the requests stored in one cache bucket.")]
    async fn cache_entries(&self, params: Parameters<CacheEntriesParams>) -> Result<CallToolResult, McpError> {
        entries_impl(self.store.as_ref(), params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!(
                "Offline cache agent for {} (bucket {}).",
                self.config.origin,
                self.config.cache_name()
            )),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swcache_client::testing::StaticFetcher;
    use swcache_core::CacheDb;

    async fn server() -> SwCacheServer {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let store: Arc<dyn CacheStore> = db.clone();
        let fetcher: Arc<dyn Fetcher> = Arc::new(StaticFetcher::new());
        let host = Arc::new(ServiceWorkerHost::new(fetcher.clone(), db));
        SwCacheServer::new(Arc::new(AppConfig::default()), store, fetcher, host)
    }

    #[tokio::test]
    async fn test_tool_router_lists_all_tools() {
        let server = server().await;
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_entries", "cache_keys", "sw_activate", "sw_fetch", "sw_install", "sw_status"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = server().await;
        let info = server.get_info();
        assert_eq!(info.server_info.name, "swcache");
        assert!(info.instructions.unwrap().contains("mgba-dev"));
    }
}
