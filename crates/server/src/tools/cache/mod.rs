//! Cache-related MCP tools.
//!
//! Read-only views of the bucket store, the equivalent of `caches.keys()`
//! and `cache.keys()`.

pub mod entries;
pub mod keys;

pub use entries::{CacheEntriesParams, entries_impl};
pub use keys::keys_impl;
