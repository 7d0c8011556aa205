//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Cache store abstraction with a SQLite backend
//! - Request/response model and cache key hashing
//! - Asset manifest handling
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod manifest;

pub use cache::{Bucket, CacheDb, CacheStore, MatchScope, RegistrationStore, Registrations};
pub use config::{AppConfig, ConfigError, LookupScope};
pub use error::Error;
pub use http::{CacheRequest, CachedResponse};
pub use manifest::AssetManifest;
