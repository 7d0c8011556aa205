//! Versioned cache buckets over an opaque key-value store.
//!
//! The [`CacheStore`] trait is the whole surface the lifecycle agent sees:
//! named buckets holding request/response pairs, origin-wide lookup, and
//! bucket enumeration and deletion. [`CacheDb`] implements it on SQLite
//! with async access via tokio-rusqlite. It provides:
//!
//! - Keys hashed with SHA-256 over method, URL and `Vary` values
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - One statement or transaction per operation

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod registrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use registrations::{RegistrationStore, Registrations};

use crate::http::{CacheRequest, CachedResponse};

/// Which buckets a lookup searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope<'a> {
    /// Every bucket in the origin, in creation order.
    AllBuckets,
    /// A single named bucket.
    Bucket(&'a str),
}

/// Persistent, origin-scoped store of named buckets.
///
/// Each call is atomic on its own; no grouping exists across calls.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the bucket if absent. Opening an existing bucket keeps its entries.
    async fn open_bucket(&self, name: &str) -> Result<(), Error>;

    async fn has_bucket(&self, name: &str) -> Result<bool, Error>;

    /// Bucket names in creation order.
    async fn bucket_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a bucket and all its entries. Returns false if it did not exist.
    async fn delete_bucket(&self, name: &str) -> Result<bool, Error>;

    /// Store a response under `request`, replacing any entry with the same key.
    ///
    /// The bucket is created when absent. Only `GET` requests and non-partial
    /// responses are accepted.
    async fn put_entry(&self, bucket: &str, request: &CacheRequest, response: &CachedResponse) -> Result<(), Error>;

    /// Atomically replace the bucket's contents with `entries`.
    async fn replace_entries(&self, bucket: &str, entries: Vec<(CacheRequest, CachedResponse)>) -> Result<(), Error>;

    /// First stored response matching `request` within `scope`.
    async fn match_entry(&self, scope: MatchScope<'_>, request: &CacheRequest)
    -> Result<Option<CachedResponse>, Error>;

    /// Request keys stored in a bucket, in insertion order.
    async fn entry_keys(&self, bucket: &str) -> Result<Vec<CacheRequest>, Error>;
}

/// Handle to an opened bucket.
#[derive(Clone, Copy)]
pub struct Bucket<'a> {
    store: &'a dyn CacheStore,
    name: &'a str,
}

impl<'a> Bucket<'a> {
    /// Open (creating if absent) the bucket called `name`.
    pub async fn open(store: &'a dyn CacheStore, name: &'a str) -> Result<Self, Error> {
        store.open_bucket(name).await?;
        Ok(Self { store, name })
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub async fn put(&self, request: &CacheRequest, response: &CachedResponse) -> Result<(), Error> {
        self.store.put_entry(self.name, request, response).await
    }

    pub async fn replace_all(&self, entries: Vec<(CacheRequest, CachedResponse)>) -> Result<(), Error> {
        self.store.replace_entries(self.name, entries).await
    }

    pub async fn match_request(&self, request: &CacheRequest) -> Result<Option<CachedResponse>, Error> {
        self.store.match_entry(MatchScope::Bucket(self.name), request).await
    }

    pub async fn keys(&self) -> Result<Vec<CacheRequest>, Error> {
        self.store.entry_keys(self.name).await
    }
}

impl std::fmt::Debug for Bucket<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket").field("name", &self.name).finish_non_exhaustive()
    }
}
