//! Activate: garbage-collect buckets left by other versions.

use futures_util::future::join_all;
use serde::Serialize;
use swcache_core::{CacheStore, Error};

/// Outcome of stale-bucket cleanup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivateReport {
    /// The current bucket, never deleted.
    pub kept: String,
    pub deleted: Vec<String>,
    /// Buckets whose deletion failed, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Delete every bucket whose name differs from `cache_name`.
///
/// Deletions run concurrently and independently. A failed deletion is
/// recorded in the report rather than failing activation; only failing to
/// enumerate buckets is an error.
pub async fn activate(store: &dyn CacheStore, cache_name: &str) -> Result<ActivateReport, Error> {
    let stale: Vec<String> = store
        .bucket_names()
        .await?
        .into_iter()
        .filter(|name| name != cache_name)
        .collect();

    let results = join_all(stale.iter().map(|name| async move {
        tracing::info!("sw {cache_name} activate deleting cache: {name}");
        (name, store.delete_bucket(name).await)
    }))
    .await;

    let mut report = ActivateReport { kept: cache_name.to_string(), ..Default::default() };
    for (name, result) in results {
        match result {
            Ok(true) => report.deleted.push(name.clone()),
            Ok(false) => tracing::debug!(bucket = %name, "stale cache already gone"),
            Err(e) => {
                tracing::warn!(bucket = %name, error = %e, "failed to delete stale cache");
                report.failed.push((name.clone(), e.to_string()));
            }
        }
    }

    Ok(report)
}
