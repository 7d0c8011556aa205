//! Client code for swcache.
//!
//! This crate provides the network seam, URL resolution, and the cache
//! lifecycle agent (install, activate, fetch-intercept) built on the
//! store from `swcache-core`.

pub mod agent;
pub mod fetch;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use agent::{
    ActivateReport, AgentSettings, CacheAgent, FetchOutcome, InstallReport, ResponseSource, activate, fetch_intercept,
    install,
};

pub use fetch::{FetchClient, FetchConfig, Fetcher, resolve_request};
