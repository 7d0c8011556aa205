//! Scripted [`Fetcher`] for tests.
//!
//! Routes are keyed by URL. Unrouted URLs answer `404 Not Found`, the way a
//! static file server would.

use std::collections::HashMap;
use std::sync::Mutex;

use swcache_core::{CacheRequest, CachedResponse, Error};

use crate::fetch::Fetcher;

enum Route {
    Respond(CachedResponse),
    Fail(String),
}

/// A fetcher that serves canned responses and records every call.
#[derive(Default)]
pub struct StaticFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `status` with `body` for `url`.
    pub fn with_body(self, url: &str, status: u16, body: &str) -> Self {
        self.set_response(url, CachedResponse::new(status, body.to_string()).with_url(url));
        self
    }

    pub fn with_response(self, url: &str, response: CachedResponse) -> Self {
        self.set_response(url, response);
        self
    }

    /// Fail requests for `url` as if the network were unreachable.
    pub fn with_failure(self, url: &str, reason: &str) -> Self {
        self.set_failure(url, reason);
        self
    }

    pub fn set_response(&self, url: &str, response: CachedResponse) {
        self.lock_routes().insert(url.to_string(), Route::Respond(response));
    }

    pub fn set_failure(&self, url: &str, reason: &str) {
        self.lock_routes().insert(url.to_string(), Route::Fail(reason.to_string()));
    }

    /// Total number of fetches issued.
    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    /// Number of fetches issued for `url`.
    pub fn calls_for(&self, url: &str) -> usize {
        self.lock_calls().iter().filter(|u| *u == url).count()
    }

    fn lock_routes(&self) -> std::sync::MutexGuard<'_, HashMap<String, Route>> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, Error> {
        self.lock_calls().push(request.url.clone());
        match self.lock_routes().get(&request.url) {
            Some(Route::Respond(response)) => Ok(response.clone()),
            Some(Route::Fail(reason)) => Err(Error::Network(reason.clone())),
            None => Ok(CachedResponse::new(404, "").with_url(&request.url)),
        }
    }
}
