//! sw_activate tool implementation.
//!
//! Activates the waiting version and deletes the buckets of every other one.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use swcache_client::ActivateReport;

use crate::platform::ServiceWorkerHost;
use crate::tools::json_result;

/// Implementation of the sw_activate tool.
pub async fn activate_impl(host: &ServiceWorkerHost) -> Result<CallToolResult, McpError> {
    let report: ActivateReport = host.activate_waiting().await?;
    json_result(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::output_json;
    use std::sync::Arc;
    use swcache_client::{AgentSettings, CacheAgent, testing::StaticFetcher};
    use swcache_core::{AppConfig, CacheDb, CacheStore};

    #[tokio::test]
    async fn test_activate_impl_nothing_waiting() {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let host = ServiceWorkerHost::new(Arc::new(StaticFetcher::new()), store);
        let err = activate_impl(&host).await.unwrap_err();
        assert_eq!(err.code.0, -32010);
    }

    #[tokio::test]
    async fn test_activate_impl_reports_deleted() {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        store.open_bucket("mgba-v0").await.unwrap();
        let fetcher = Arc::new(StaticFetcher::new());
        let host = ServiceWorkerHost::new(fetcher.clone(), store.clone());

        let config = AppConfig { version: "v1".into(), manifest: Vec::new(), ..Default::default() };
        let agent = CacheAgent::new(AgentSettings::from_config(&config).unwrap(), store.clone(), fetcher);
        host.register(agent).await.unwrap();

        let result = activate_impl(&host).await.unwrap();
        let output = output_json(&result);
        assert_eq!(output["kept"], "mgba-v1");
        assert_eq!(output["deleted"], serde_json::json!(["mgba-v0"]));
        assert_eq!(store.bucket_names().await.unwrap(), vec!["mgba-v1".to_string()]);
    }
}
