//! Cache lifecycle agent.
//!
//! Three handlers driven by the host:
//!
//! - [`install`] precaches the asset manifest into the version's bucket
//! - [`activate`] deletes every bucket belonging to another version
//! - [`fetch_intercept`] answers requests cache-first and writes through on a miss
//!
//! [`CacheAgent`] binds them to one version's settings, store and fetcher.

mod activate;
mod install;
mod intercept;

use std::sync::Arc;

use swcache_core::{AppConfig, AssetManifest, CacheRequest, CacheStore, ConfigError, Error, LookupScope};
use url::Url;

use crate::fetch::Fetcher;

pub use activate::{ActivateReport, activate};
pub use install::{InstallReport, install};
pub use intercept::{FetchOutcome, ResponseSource, fetch_intercept};

/// Per-version settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub cache_name: String,
    pub origin: Url,
    pub manifest: AssetManifest,
    pub lookup_scope: LookupScope,
}

impl AgentSettings {
    /// Resolve settings for the configured version.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            cache_name: config.cache_name(),
            origin: config.origin_url()?,
            manifest: config.asset_manifest()?,
            lookup_scope: config.lookup_scope,
        })
    }

    /// Resolve settings for `version` instead of the configured one.
    pub fn for_version(config: &AppConfig, version: &str) -> Result<Self, ConfigError> {
        let config = AppConfig { version: version.to_string(), ..config.clone() };
        config.validate()?;
        Self::from_config(&config)
    }
}

/// One version of the agent, bound to its store and network.
#[derive(Clone)]
pub struct CacheAgent {
    settings: Arc<AgentSettings>,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl CacheAgent {
    pub fn new(settings: AgentSettings, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { settings: Arc::new(settings), store, fetcher }
    }

    pub fn cache_name(&self) -> &str {
        &self.settings.cache_name
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn store(&self) -> &dyn CacheStore {
        self.store.as_ref()
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        tracing::info!("sw {} install", self.cache_name());
        let settings = &self.settings;
        install(
            self.store.as_ref(),
            self.fetcher.as_ref(),
            &settings.origin,
            &settings.manifest,
            &settings.cache_name,
        )
        .await
    }

    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        tracing::info!("sw {} activate", self.cache_name());
        activate(self.store.as_ref(), self.cache_name()).await
    }

    pub async fn on_fetch(&self, request: &CacheRequest) -> Result<FetchOutcome, Error> {
        fetch_intercept(
            self.store.as_ref(),
            self.fetcher.as_ref(),
            self.cache_name(),
            self.settings.lookup_scope,
            request,
        )
        .await
    }
}

impl std::fmt::Debug for CacheAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAgent").field("settings", &self.settings).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticFetcher;
    use swcache_core::{CacheDb, MatchScope};

    fn config(version: &str, manifest: &[&str]) -> AppConfig {
        AppConfig {
            version: version.into(),
            manifest: manifest.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_settings_from_config() {
        let settings = AgentSettings::from_config(&config("v1", &["/index.html"])).unwrap();
        assert_eq!(settings.cache_name, "mgba-v1");
        assert_eq!(settings.origin.as_str(), "http://localhost:8080/");
        assert_eq!(settings.manifest.paths(), &["/index.html".to_string()]);
        assert_eq!(settings.lookup_scope, LookupScope::AllBuckets);
    }

    #[test]
    fn test_settings_for_version() {
        let settings = AgentSettings::for_version(&config("v1", &[]), "3f2a9c1").unwrap();
        assert_eq!(settings.cache_name, "mgba-3f2a9c1");
    }

    #[test]
    fn test_settings_for_version_rejects_blank() {
        assert!(matches!(
            AgentSettings::for_version(&config("v1", &[]), ""),
            Err(ConfigError::Missing { field, .. }) if field == "version"
        ));
    }

    #[test]
    fn test_settings_invalid_origin() {
        let config = AppConfig { origin: "file:///srv/mgba".into(), ..Default::default() };
        assert!(matches!(AgentSettings::from_config(&config), Err(ConfigError::Invalid { .. })));
    }

    #[tokio::test]
    async fn test_version_upgrade_lifecycle() {
        let db: Arc<dyn CacheStore> = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_body("http://localhost:8080/index.html", 200, "<html>")
                .with_body("http://localhost:8080/a.js", 200, "export {}"),
        );

        let v0 = CacheAgent::new(
            AgentSettings::from_config(&config("v0", &["/index.html"])).unwrap(),
            db.clone(),
            fetcher.clone(),
        );
        v0.on_install().await.unwrap();
        v0.on_activate().await.unwrap();

        let v1 = CacheAgent::new(
            AgentSettings::from_config(&config("v1", &["/index.html", "/a.js"])).unwrap(),
            db.clone(),
            fetcher.clone(),
        );
        v1.on_install().await.unwrap();
        assert_eq!(db.bucket_names().await.unwrap(), vec!["mgba-v0".to_string(), "mgba-v1".to_string()]);

        let report = v1.on_activate().await.unwrap();
        assert_eq!(report.deleted, vec!["mgba-v0".to_string()]);
        assert_eq!(db.bucket_names().await.unwrap(), vec!["mgba-v1".to_string()]);

        let before = fetcher.call_count();
        let outcome = v1.on_fetch(&CacheRequest::get("http://localhost:8080/a.js")).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(fetcher.call_count(), before);
    }

    #[tokio::test]
    async fn test_on_fetch_writes_to_current_bucket() {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let fetcher = Arc::new(StaticFetcher::new().with_body("http://localhost:8080/new-asset.png", 200, "png"));
        let agent = CacheAgent::new(AgentSettings::from_config(&config("v1", &[])).unwrap(), db.clone(), fetcher);

        let request = CacheRequest::get("http://localhost:8080/new-asset.png");
        let outcome = agent.on_fetch(&request).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert!(db.match_entry(MatchScope::Bucket("mgba-v1"), &request).await.unwrap().is_some());
    }
}
