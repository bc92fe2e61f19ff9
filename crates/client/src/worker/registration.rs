//! Registration host: drives worker lifecycles and routes page requests.
//!
//! A new version replaces the active one only after it installs. Activation
//! runs with the route held exclusively, so no request reaches either worker
//! until the old caches are gone.

use std::sync::Arc;

use netfirst_core::{CacheDb, Error, Request};
use tokio::sync::{Mutex, RwLock};

use super::{Interception, ResponseSource, Served, ServiceWorker};
use crate::fetch::Network;

/// Holds the active worker for one scope.
pub struct Registration {
    network: Arc<dyn Network>,
    active: RwLock<Option<Arc<ServiceWorker>>>,
    update: Mutex<()>,
}

impl Registration {
    /// `network` serves requests that no worker intercepts.
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self { network, active: RwLock::new(None), update: Mutex::new(()) }
    }

    /// The worker currently handling traffic, if any.
    pub async fn active(&self) -> Option<Arc<ServiceWorker>> {
        self.active.read().await.clone()
    }

    /// Install and activate `worker`, replacing the current one.
    ///
    /// Registering the version that is already active is a no-op. A version
    /// whose cache survives from an earlier run is restored instead of
    /// precached again. If install fails the current worker stays active and
    /// the install error is returned.
    pub async fn register(&self, worker: ServiceWorker) -> Result<Arc<ServiceWorker>, Error> {
        let _update = self.update.lock().await;

        if let Some(current) = self.active().await.filter(|w| w.version() == worker.version()) {
            tracing::debug!(version = current.version(), "version already active");
            return Ok(current);
        }

        let worker = Arc::new(worker);
        let restored = worker.restore().await?;

        if !restored && let Err(err) = worker.install().await {
            let current = self.active.read().await.as_ref().map(|w| w.version().to_string());
            tracing::warn!(
                version = worker.version(),
                active = current.as_deref().unwrap_or("none"),
                error = %err,
                "new version failed to install; keeping current worker"
            );
            return Err(err);
        }

        let mut active = self.active.write().await;
        if let Some(previous) = active.take() {
            previous.settle().await;
            if let Err(err) = previous.retire().await {
                tracing::warn!(version = previous.version(), error = %err, "could not retire previous worker");
            }
        }

        worker.activate().await?;
        if let Err(err) = worker.storage().record_active(worker.version(), worker.precache_urls()).await {
            tracing::warn!(version = worker.version(), error = %err, "could not record active version");
        }
        *active = Some(worker.clone());
        tracing::info!(version = worker.version(), "worker activated");

        Ok(worker)
    }

    /// Bring back the version that was active when `storage` was last used.
    ///
    /// Runs before registering the configured version, so a failed upgrade
    /// after a restart still leaves the previous version serving. Returns
    /// `None` when nothing was recorded or its cache is gone or empty.
    pub async fn resume(&self, storage: &CacheDb) -> Result<Option<Arc<ServiceWorker>>, Error> {
        let _update = self.update.lock().await;

        if let Some(current) = self.active().await {
            return Ok(Some(current));
        }

        let Some(record) = storage.active_version().await? else {
            return Ok(None);
        };

        let worker = ServiceWorker::new(record.name, record.precache, storage.clone(), self.network.clone());
        if !worker.restore().await? {
            tracing::warn!(version = worker.version(), "recorded active version has no cache; not resuming");
            return Ok(None);
        }

        let mut active = self.active.write().await;
        worker.activate().await?;
        let worker = Arc::new(worker);
        *active = Some(worker.clone());
        tracing::info!(version = worker.version(), "resumed previously active worker");

        Ok(Some(worker))
    }

    /// Issue a page request through the active worker.
    pub async fn fetch(&self, request: &Request) -> Result<Served, Error> {
        let interception = {
            let active = self.active.read().await;
            match active.as_ref() {
                Some(worker) => worker.handle_fetch(request).await?,
                None => Interception::Passthrough,
            }
        };

        match interception {
            Interception::Respond(served) => Ok(served),
            Interception::Passthrough => {
                let response = self.network.fetch(request).await?;
                Ok(Served { response, source: ResponseSource::Passthrough })
            }
        }
    }
}
