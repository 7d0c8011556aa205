//! sw_install tool implementation.
//!
//! Registers a version with the host, precaching its manifest. Without a
//! `version` the configured build token is used.

use std::sync::Arc;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{AgentSettings, CacheAgent, Fetcher};
use swcache_core::{AppConfig, CacheStore};

use crate::error::HostError;
use crate::platform::{RegisterOutcome, ServiceWorkerHost, WorkerState};
use crate::tools::json_result;

/// Input parameters for sw_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallParams {
    /// Build token to install instead of the configured one.
    #[serde(default)]
    pub version: Option<String>,
}

/// Output structure for sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallOutput {
    pub cache_name: String,
    /// State of the version after the call.
    pub state: WorkerState,
    /// False when the version was already active or waiting.
    pub installed: bool,
    /// URLs precached by this call.
    pub cached: Vec<String>,
    pub bytes: u64,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(
    host: &ServiceWorkerHost, config: &AppConfig, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>,
    params: SwInstallParams,
) -> Result<CallToolResult, McpError> {
    let settings = match params.version.as_deref() {
        Some(version) => AgentSettings::for_version(config, version),
        None => AgentSettings::from_config(config),
    }
    .map_err(HostError::from)?;

    let agent = CacheAgent::new(settings, store, fetcher);
    let output = match host.register(agent).await? {
        RegisterOutcome::Unchanged(status) => SwInstallOutput {
            cache_name: status.cache_name,
            state: status.state,
            installed: false,
            cached: Vec::new(),
            bytes: 0,
        },
        RegisterOutcome::Installed(report) => SwInstallOutput {
            cache_name: report.cache_name,
            state: WorkerState::Installed,
            installed: true,
            cached: report.cached,
            bytes: report.bytes,
        },
    };

    json_result(&output)
}
