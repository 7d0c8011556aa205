//! Asset manifest: the ordered list of paths precached at install time.
//!
//! The list is produced by the build; at runtime it is immutable.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Paths the mGBA web frontend needs to boot offline.
pub const DEFAULT_ASSETS: &[&str] = &[
    "/index.html",
    "/manifest.json",
    "/build/mgba.js",
    "/build/mgba.wasm",
    "/controls.js",
    "/game.js",
    "/game.css",
    "/gamemenu.js",
    "/menu.js",
    "/settings.js",
    "/style.css",
    "/fileloader.js",
    "/storage.js",
    "/icons/mgba.ico",
];

/// Ordered sequence of precache-critical asset paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest {
    paths: Vec<String>,
}

impl AssetManifest {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    /// Parse a JSON array of paths.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("invalid manifest: {e}")))
    }

    /// Read a JSON manifest emitted by the build step.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidInput(format!("cannot read manifest {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Paths with later duplicates removed, order preserved.
    pub fn unique_paths(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.paths
            .iter()
            .map(String::as_str)
            .filter(|p| seen.insert(*p))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self::new(DEFAULT_ASSETS.iter().map(|p| p.to_string()).collect())
    }
}

impl From<Vec<&str>> for AssetManifest {
    fn from(paths: Vec<&str>) -> Self {
        Self::new(paths.into_iter().map(str::to_string).collect())
    }
}
