//! Service worker host: the lifecycle state machine around a [`CacheAgent`].
//!
//! A version moves through `installing -> installed (waiting) -> activating ->
//! activated`, or drops to `redundant` when its install fails or a newer
//! version replaces it. Only the active version intercepts fetches.
//!
//! The slot lock is released before any handler runs, so a slow install
//! never blocks status queries or fetches served by the active version.
//! The names in the active and waiting slots are recorded in the
//! [`RegistrationStore`] after every transition, and [`ServiceWorkerHost::restore`]
//! puts them back after a restart.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{ActivateReport, CacheAgent, FetchOutcome, Fetcher, InstallReport, ResponseSource};
use swcache_core::{CacheRequest, RegistrationStore, Registrations};
use tokio::sync::RwLock;

use crate::error::HostError;

/// Redundant versions remembered for status reporting.
const REDUNDANT_HISTORY: usize = 8;

/// Lifecycle state of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// Snapshot of one worker version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatus {
    pub cache_name: String,
    pub state: WorkerState,
    /// RFC 3339 timestamp of the last state change.
    pub since: String,
}

/// Snapshot of every slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct HostStatus {
    pub installing: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
    pub active: Option<WorkerStatus>,
    /// Most recent redundant versions, newest last.
    pub redundant: Vec<WorkerStatus>,
}

/// Result of a registration.
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    /// The version is already active or waiting.
    Unchanged(WorkerStatus),
    /// The version installed and is now waiting.
    Installed(InstallReport),
}

struct Worker {
    agent: CacheAgent,
    state: WorkerState,
    since: DateTime<Utc>,
}

impl Worker {
    fn new(agent: CacheAgent, state: WorkerState) -> Self {
        Self { agent, state, since: Utc::now() }
    }

    fn set_state(&mut self, state: WorkerState) {
        self.state = state;
        self.since = Utc::now();
    }

    fn status(&self) -> WorkerStatus {
        WorkerStatus {
            cache_name: self.agent.cache_name().to_string(),
            state: self.state,
            since: self.since.to_rfc3339(),
        }
    }
}

#[derive(Default)]
struct Slots {
    installing: Option<Worker>,
    waiting: Option<Worker>,
    active: Option<Worker>,
    redundant: Vec<WorkerStatus>,
}

impl Slots {
    fn current(&self, cache_name: &str) -> Option<&Worker> {
        [self.active.as_ref(), self.waiting.as_ref()]
            .into_iter()
            .flatten()
            .find(|w| w.agent.cache_name() == cache_name)
    }

    fn registrations(&self) -> Registrations {
        Registrations {
            active: self.active.as_ref().map(|w| w.agent.cache_name().to_string()),
            waiting: self.waiting.as_ref().map(|w| w.agent.cache_name().to_string()),
        }
    }

    fn retire(&mut self, mut worker: Worker) {
        tracing::info!("sw {} redundant", worker.agent.cache_name());
        worker.set_state(WorkerState::Redundant);
        self.redundant.push(worker.status());
        if self.redundant.len() > REDUNDANT_HISTORY {
            self.redundant.remove(0);
        }
    }
}

/// Hosts the installing, waiting and active versions for one origin.
pub struct ServiceWorkerHost {
    slots: RwLock<Slots>,
    network: Arc<dyn Fetcher>,
    registry: Arc<dyn RegistrationStore>,
}

impl ServiceWorkerHost {
    /// `network` serves fetches while no version is active; `registry`
    /// records which versions are active and waiting.
    pub fn new(network: Arc<dyn Fetcher>, registry: Arc<dyn RegistrationStore>) -> Self {
        Self { slots: RwLock::new(Slots::default()), network, registry }
    }

    /// Active and waiting cache names as last recorded.
    pub async fn saved_registrations(&self) -> Result<Registrations, HostError> {
        Ok(self.registry.load_registrations().await?)
    }

    /// Put back versions recorded by a previous run without running their handlers.
    pub async fn restore(&self, active: Option<CacheAgent>, waiting: Option<CacheAgent>) {
        let mut slots = self.slots.write().await;
        if let Some(agent) = active {
            tracing::info!("sw {} restored as active", agent.cache_name());
            slots.active = Some(Worker::new(agent, WorkerState::Activated));
        }
        if let Some(agent) = waiting {
            tracing::info!("sw {} restored as waiting", agent.cache_name());
            slots.waiting = Some(Worker::new(agent, WorkerState::Installed));
        }
    }

    /// Install `agent` unless the same version is already active or waiting.
    ///
    /// On success the version waits for activation and replaces any previous
    /// waiting version. On failure it becomes redundant and the error is
    /// returned; registering it again retries the install. A new version
    /// cannot register while the waiting one is activating.
    pub async fn register(&self, agent: CacheAgent) -> Result<RegisterOutcome, HostError> {
        {
            let mut slots = self.slots.write().await;
            if let Some(worker) = slots.current(agent.cache_name()) {
                tracing::debug!("sw {} already registered", agent.cache_name());
                return Ok(RegisterOutcome::Unchanged(worker.status()));
            }
            if let Some(installing) = &slots.installing {
                return Err(HostError::Busy(format!("{} is installing", installing.agent.cache_name())));
            }
            if let Some(waiting) = &slots.waiting
                && waiting.state == WorkerState::Activating
            {
                return Err(HostError::Busy(format!("{} is activating", waiting.agent.cache_name())));
            }
            slots.installing = Some(Worker::new(agent.clone(), WorkerState::Installing));
        }

        let result = agent.on_install().await;

        let mut slots = self.slots.write().await;
        let Some(mut worker) = slots.installing.take() else {
            return Err(HostError::Busy(format!("{} install slot was cleared", agent.cache_name())));
        };

        match result {
            Ok(report) => {
                tracing::info!(
                    "sw {} installed {} assets ({} bytes)",
                    report.cache_name,
                    report.cached.len(),
                    report.bytes
                );
                worker.set_state(WorkerState::Installed);
                if let Some(previous) = slots.waiting.replace(worker) {
                    slots.retire(previous);
                }
                self.persist(&slots).await;
                Ok(RegisterOutcome::Installed(report))
            }
            Err(e) => {
                tracing::warn!("sw {} install failed: {e}", agent.cache_name());
                slots.retire(worker);
                Err(e.into())
            }
        }
    }

    /// Activate the waiting version, making it the one that intercepts fetches.
    ///
    /// The previously active version becomes redundant. If cleanup fails the
    /// version stays waiting.
    pub async fn activate_waiting(&self) -> Result<ActivateReport, HostError> {
        let agent = {
            let mut slots = self.slots.write().await;
            let waiting = slots.waiting.as_mut().ok_or(HostError::NoWaitingVersion)?;
            if waiting.state == WorkerState::Activating {
                return Err(HostError::Busy(format!("{} is activating", waiting.agent.cache_name())));
            }
            waiting.set_state(WorkerState::Activating);
            waiting.agent.clone()
        };

        let result = agent.on_activate().await;

        // register refuses while the waiting version is activating, so the slot still holds `agent`
        let mut slots = self.slots.write().await;
        let Some(mut worker) = slots.waiting.take() else {
            return Err(HostError::Busy(format!("{} waiting slot was cleared", agent.cache_name())));
        };

        match result {
            Ok(report) => {
                worker.set_state(WorkerState::Activated);
                tracing::info!("sw {} activated", worker.agent.cache_name());
                if let Some(previous) = slots.active.replace(worker) {
                    slots.retire(previous);
                }
                self.persist(&slots).await;
                Ok(report)
            }
            Err(e) => {
                tracing::warn!("sw {} activate failed: {e}", agent.cache_name());
                worker.set_state(WorkerState::Installed);
                slots.waiting = Some(worker);
                Err(e.into())
            }
        }
    }

    async fn persist(&self, slots: &Slots) {
        if let Err(e) = self.registry.save_registrations(&slots.registrations()).await {
            tracing::warn!("failed to record registrations: {e}");
        }
    }

    /// Route a request through the active version, or straight to the network.
    pub async fn handle_fetch(&self, request: &CacheRequest) -> Result<FetchOutcome, HostError> {
        let active = self.active_agent().await;
        match active {
            Some(agent) => Ok(agent.on_fetch(request).await?),
            None => {
                tracing::debug!("no active worker, passing {} through", request.url);
                let response = self.network.fetch(request).await?;
                Ok(FetchOutcome { response, source: ResponseSource::Network })
            }
        }
    }

    pub async fn active_agent(&self) -> Option<CacheAgent> {
        self.slots.read().await.active.as_ref().map(|w| w.agent.clone())
    }

    pub async fn status(&self) -> HostStatus {
        let slots = self.slots.read().await;
        HostStatus {
            installing: slots.installing.as_ref().map(Worker::status),
            waiting: slots.waiting.as_ref().map(Worker::status),
            active: slots.active.as_ref().map(Worker::status),
            redundant: slots.redundant.clone(),
        }
    }
}
