//! Fetch intercept: cache-first, write-through on miss.

use serde::Serialize;
use swcache_core::{Bucket, CacheRequest, CacheStore, CachedResponse, Error, LookupScope, MatchScope};

use crate::fetch::{Fetcher, canonicalize};

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
}

/// Response delivered to the requester.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: CachedResponse,
    pub source: ResponseSource,
}

/// Answer `request` from the cache, falling back to the network.
///
/// A network response is written to `cache_name` before it is returned, so
/// a repeat request is served locally. Requests other than `GET` bypass the
/// cache in both directions. Concurrent misses for the same request each go
/// to the network; the last write wins.
///
/// The URL is canonicalized first, so spellings that differ only in host case
/// or dot segments share one cache entry.
pub async fn fetch_intercept(
    store: &dyn CacheStore, fetcher: &dyn Fetcher, cache_name: &str, scope: LookupScope, request: &CacheRequest,
) -> Result<FetchOutcome, Error> {
    let request = &normalized(request)?;

    if !request.is_get() {
        tracing::debug!("{} {} bypasses cache", request.method, request.url);
        let response = fetcher.fetch(request).await?;
        return Ok(FetchOutcome { response, source: ResponseSource::Network });
    }

    let match_scope = match scope {
        LookupScope::AllBuckets => MatchScope::AllBuckets,
        LookupScope::CurrentBucketOnly => MatchScope::Bucket(cache_name),
    };

    if let Some(response) = store.match_entry(match_scope, request).await? {
        tracing::debug!("cache hit for {}", request.url);
        return Ok(FetchOutcome { response, source: ResponseSource::Cache });
    }

    tracing::debug!("cache miss for {}", request.url);
    let response = fetcher.fetch(request).await?;

    if response.status == 206 {
        tracing::debug!("not caching partial response for {}", request.url);
    } else {
        let bucket = Bucket::open(store, cache_name).await?;
        bucket.put(request, &response).await?;
    }

    Ok(FetchOutcome { response, source: ResponseSource::Network })
}

fn normalized(request: &CacheRequest) -> Result<CacheRequest, Error> {
    let url = canonicalize(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    Ok(CacheRequest { url: url.to_string(), ..request.clone() })
}
