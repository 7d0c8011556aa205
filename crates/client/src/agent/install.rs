//! Install: precache the asset manifest into the version's bucket.

use futures_util::future::try_join_all;
use serde::Serialize;
use swcache_core::{AssetManifest, Bucket, CacheRequest, CacheStore, Error};
use url::Url;

use crate::fetch::{Fetcher, resolve};

/// Result of a successful install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub cache_name: String,
    /// URLs stored, in manifest order.
    pub cached: Vec<String>,
    /// Total body bytes stored.
    pub bytes: u64,
}

/// Populate `cache_name` with every asset in `manifest`.
///
/// All assets are fetched before anything is written. Any transport failure
/// or non-2xx status rejects the install and leaves the bucket's contents
/// untouched; on success the bucket holds exactly the manifest.
pub async fn install(
    store: &dyn CacheStore, fetcher: &dyn Fetcher, origin: &Url, manifest: &AssetManifest, cache_name: &str,
) -> Result<InstallReport, Error> {
    let bucket = Bucket::open(store, cache_name).await?;

    let requests = manifest
        .unique_paths()
        .into_iter()
        .map(|path| -> Result<(String, CacheRequest), Error> {
            let url = resolve(origin, path)
                .map_err(|e| Error::ManifestFetch { path: path.to_string(), reason: e.to_string() })?;
            Ok((path.to_string(), CacheRequest::get(url.as_str())))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let fetches = requests.iter().map(|(path, request)| async move {
        let response = fetcher
            .fetch(request)
            .await
            .map_err(|e| Error::ManifestFetch { path: path.clone(), reason: e.to_string() })?;
        if !response.is_ok() {
            return Err(Error::ManifestFetch { path: path.clone(), reason: format!("status {}", response.status) });
        }
        Ok::<_, Error>((request.clone(), response))
    });

    let entries = try_join_all(fetches).await?;

    let cached = entries.iter().map(|(request, _)| request.url.clone()).collect();
    let bytes = entries.iter().map(|(_, response)| response.body.len() as u64).sum();

    bucket.replace_all(entries).await?;

    Ok(InstallReport { cache_name: cache_name.to_string(), cached, bytes })
}
