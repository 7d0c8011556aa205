//! Structured errors for the swcache server.
//!
//! Lifecycle-state errors live here; agent and store failures pass through
//! with the codes assigned in `swcache_core::Error`.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use swcache_core::{ConfigError, Error};

/// Structured errors for the service worker host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Activation requested with nothing installed and waiting.
    #[error("NO_WAITING_VERSION: nothing is installed and waiting to activate")]
    NoWaitingVersion,

    /// Another install or activation is still running.
    #[error("LIFECYCLE_BUSY: {0}")]
    Busy(String),

    /// Requested version could not be configured.
    #[error("INVALID_INPUT: {0}")]
    Config(#[from] ConfigError),

    /// The agent's handler failed.
    #[error(transparent)]
    Agent(#[from] Error),
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        let (code, message) = match err {
            HostError::Agent(e) => return e.into(),
            HostError::Config(e) => (-32602, e.to_string()),
            e @ HostError::NoWaitingVersion => (-32010, e.to_string()),
            HostError::Busy(msg) => (-32011, msg),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
