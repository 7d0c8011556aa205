//! sw_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};

use crate::platform::ServiceWorkerHost;
use crate::tools::json_result;

/// Implementation of the sw_status tool.
pub async fn status_impl(host: &ServiceWorkerHost) -> Result<CallToolResult, McpError> {
    json_result(&host.status().await)
}
