//! cache_keys tool implementation.
//!
//! Lists bucket names in creation order.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::CacheStore;

use crate::tools::json_result;

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    /// Bucket names, oldest first.
    pub buckets: Vec<String>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(store: &dyn CacheStore) -> Result<CallToolResult, McpError> {
    let buckets = store.bucket_names().await?;
    json_result(&CacheKeysOutput { buckets })
}
