//! cache_entries tool implementation.
//!
//! Lists the request keys stored in one bucket.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheStore, Error};

use crate::tools::json_result;

/// Parameters for the cache_entries tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesParams {
    /// Bucket name, e.g. `mgba-3f2a9c1`.
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntryKey {
    pub method: String,
    pub url: String,
}

/// Output from the cache_entries tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesOutput {
    pub bucket: String,
    /// Stored requests in insertion order.
    pub entries: Vec<EntryKey>,
}

/// Implementation of the cache_entries tool.
pub async fn entries_impl(store: &dyn CacheStore, params: CacheEntriesParams) -> Result<CallToolResult, McpError> {
    if params.bucket.trim().is_empty() {
        return Err(Error::InvalidInput("bucket cannot be empty".into()).into());
    }

    let entries = store
        .entry_keys(&params.bucket)
        .await?
        .into_iter()
        .map(|request| EntryKey { method: request.method, url: request.url })
        .collect();

    json_result(&CacheEntriesOutput { bucket: params.bucket, entries })
}
