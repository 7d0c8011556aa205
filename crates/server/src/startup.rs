//! Startup: resume the previous run's versions, then bring up the configured one.

use std::sync::Arc;

use swcache_client::{AgentSettings, CacheAgent, Fetcher};
use swcache_core::{AppConfig, CacheStore};

use crate::error::HostError;
use crate::platform::ServiceWorkerHost;

/// Restore the recorded active and waiting versions, then register and
/// activate the configured version.
///
/// A restored active version keeps serving from its bucket when the
/// configured version cannot be installed (for example while offline).
/// Lifecycle failures are logged and left for `sw_install` to retry; only an
/// invalid configuration is an error.
pub async fn resume(
    host: &ServiceWorkerHost, config: &AppConfig, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>,
) -> Result<(), HostError> {
    match host.saved_registrations().await {
        Ok(saved) => {
            let active = revive(saved.active.as_deref(), config, &store, &fetcher).await;
            let waiting = revive(saved.waiting.as_deref(), config, &store, &fetcher).await;
            host.restore(active, waiting).await;
        }
        Err(e) => tracing::warn!("cannot read recorded registrations: {e}"),
    }

    let agent = CacheAgent::new(AgentSettings::from_config(config)?, store, fetcher);
    if let Err(e) = host.register(agent).await {
        tracing::warn!("startup install failed: {e}");
    }

    if host.status().await.waiting.is_some()
        && let Err(e) = host.activate_waiting().await
    {
        tracing::warn!("startup activate failed: {e}");
    }

    Ok(())
}

/// Rebuild the agent for a recorded cache name, if its bucket survived.
async fn revive(
    cache_name: Option<&str>, config: &AppConfig, store: &Arc<dyn CacheStore>, fetcher: &Arc<dyn Fetcher>,
) -> Option<CacheAgent> {
    let cache_name = cache_name?;
    match store.has_bucket(cache_name).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("recorded version {cache_name} has no bucket, dropping it");
            return None;
        }
        Err(e) => {
            tracing::warn!("cannot check bucket {cache_name}: {e}");
            return None;
        }
    }

    let settings = if cache_name == config.cache_name() {
        AgentSettings::from_config(config)
    } else {
        let Some(version) = cache_name.strip_prefix(&format!("{}-", config.cache_prefix)) else {
            tracing::warn!("recorded version {cache_name} does not use prefix {}", config.cache_prefix);
            return None;
        };
        AgentSettings::for_version(config, version)
    };

    match settings {
        Ok(settings) => Some(CacheAgent::new(settings, store.clone(), fetcher.clone())),
        Err(e) => {
            tracing::warn!("cannot restore {cache_name}: {e}");
            None
        }
    }
}
