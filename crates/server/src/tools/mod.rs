//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server: lifecycle
//! events (`sw_*`) and read-only views of the cache store (`cache_*`).

pub mod cache;
pub mod sw_activate;
pub mod sw_fetch;
pub mod sw_install;
pub mod sw_status;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use swcache_core::Error;

pub use sw_fetch::SwFetchParams;
pub use sw_install::SwInstallParams;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Parse the JSON text of a tool result.
#[cfg(test)]
pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
