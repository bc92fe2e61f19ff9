//! Network-first cache worker.
//!
//! ### Install
//! - Opens the cache named by the version tag and fetches every precache URL.
//! - All-or-nothing: one failed fetch (or non-2xx status) and nothing is stored.
//!
//! ### Activate
//! - Deletes every cache whose name is not the version tag. Best effort:
//!   a deletion error is logged and the worker still becomes active.
//!
//! ### Fetch
//! - Non-GET requests pass through untouched.
//! - GET goes to the network first. A response is returned at once and a copy
//!   is written to the cache by a detached task.
//! - If the network rejects, the cache is consulted; a miss surfaces the
//!   original network error.

pub mod registration;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use netfirst_core::{AppConfig, CacheDb, Error, Request, Response, WorkerState};
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;
use url::Url;

use crate::fetch::{Network, parse_origin, resolve};

pub use registration::Registration;

/// Partial responses are never stored.
const PARTIAL_CONTENT: u16 = 206;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Live network response, intercepted by the worker.
    Network,
    /// Stored response, served because the network failed.
    Cache,
    /// Not intercepted; fetched directly by the host.
    Passthrough,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Passthrough => "passthrough",
        }
    }
}

/// A response together with where it came from.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
}

/// Outcome of offering a request to the worker.
#[derive(Debug, Clone)]
pub enum Interception {
    /// The worker declined; the host sends the request itself.
    Passthrough,
    /// The worker answered.
    Respond(Served),
}

/// One version of the cache worker.
pub struct ServiceWorker {
    version: String,
    precache: Vec<Url>,
    storage: CacheDb,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    tasks: TaskTracker,
}

impl ServiceWorker {
    /// Create a worker owning the cache named `version`.
    pub fn new(version: impl Into<String>, precache: Vec<Url>, storage: CacheDb, network: Arc<dyn Network>) -> Self {
        Self {
            version: version.into(),
            precache,
            storage,
            network,
            state: RwLock::new(WorkerState::Unregistered),
            tasks: TaskTracker::new(),
        }
    }

    /// Build a worker from configuration, resolving precache paths against the origin.
    pub fn from_config(config: &AppConfig, storage: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = parse_origin(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let precache = config
            .precache_urls
            .iter()
            .map(|entry| resolve(&origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(config.cache_version.clone(), precache, storage, network))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn precache_urls(&self) -> &[Url] {
        &self.precache
    }

    pub fn storage(&self) -> &CacheDb {
        &self.storage
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn advance(&self, next: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        *state = state.transition(next)?;
        tracing::info!(version = %self.version, state = %next, "worker state changed");
        Ok(())
    }

    /// Run the install phase: precache every configured URL.
    ///
    /// On failure the worker becomes redundant and the error names the first
    /// URL that could not be fetched.
    pub async fn install(&self) -> Result<(), Error> {
        self.advance(WorkerState::Installing).await?;

        match self.precache().await {
            Ok(count) => {
                tracing::info!(version = %self.version, count, "precache complete");
                self.advance(WorkerState::Installed).await
            }
            Err(err) => {
                tracing::warn!(version = %self.version, error = %err, "install failed");
                self.advance(WorkerState::Redundant).await?;
                Err(err)
            }
        }
    }

    /// Adopt the entries an earlier run of this same version left in storage,
    /// moving straight to `installed` without touching the network.
    ///
    /// Returns false, with the state untouched, when the version's cache is
    /// missing or empty.
    pub async fn restore(&self) -> Result<bool, Error> {
        let populated = match self.storage.existing_cache(&self.version).await? {
            Some(cache) => !cache.is_empty().await?,
            None => false,
        };
        if !populated {
            return Ok(false);
        }

        self.advance(WorkerState::Installing).await?;
        self.advance(WorkerState::Installed).await?;
        tracing::info!(version = %self.version, "restored cache from previous run");
        Ok(true)
    }

    async fn precache(&self) -> Result<usize, Error> {
        let cache = self.storage.open_cache(&self.version).await?;
        let network = &self.network;

        let fetches = self.precache.iter().map(move |url| {
            let request = Request::get(url.clone());
            async move {
                match network.fetch(&request).await {
                    Ok(response) if response.ok() => Ok((request, response)),
                    Ok(response) => Err(Error::PrecacheFailed {
                        url: request.url().to_string(),
                        reason: format!("status {}", response.status),
                    }),
                    Err(err) => Err(Error::PrecacheFailed { url: request.url().to_string(), reason: err.to_string() }),
                }
            }
        });

        let entries = try_join_all(fetches).await?;
        cache.put_all(&entries).await?;
        Ok(entries.len())
    }

    /// Run the activate phase: drop every cache but this version's.
    pub async fn activate(&self) -> Result<(), Error> {
        self.advance(WorkerState::Activating).await?;

        match self.storage.cache_names().await {
            Ok(names) => {
                let storage = &self.storage;
                let deletions = names.into_iter().filter(|name| *name != self.version).map(move |name| async move {
                    match storage.delete_cache(&name).await {
                        Ok(_) => tracing::info!(cache = %name, "deleted stale cache"),
                        Err(err) => tracing::warn!(cache = %name, error = %err, "failed to delete stale cache"),
                    }
                });
                join_all(deletions).await;
            }
            Err(err) => tracing::warn!(error = %err, "could not list caches; skipping cleanup"),
        }

        self.advance(WorkerState::Active).await
    }

    /// Mark a superseded worker redundant. It stops intercepting at once.
    pub async fn retire(&self) -> Result<(), Error> {
        self.advance(WorkerState::Redundant).await
    }

    /// Offer a page request to the worker.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Interception, Error> {
        if !self.state().await.handles_fetch() {
            return Ok(Interception::Passthrough);
        }

        if !request.is_get() {
            tracing::debug!(method = request.method(), url = %request.url(), "not intercepting non-GET request");
            return Ok(Interception::Passthrough);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_detached(request.clone(), response.clone());
                Ok(Interception::Respond(Served { response, source: ResponseSource::Network }))
            }
            Err(network_err) => match self.lookup(request).await {
                Some(response) => {
                    tracing::debug!(url = %request.url(), error = %network_err, "network failed; serving from cache");
                    Ok(Interception::Respond(Served { response, source: ResponseSource::Cache }))
                }
                None => Err(network_err),
            },
        }
    }

    async fn lookup(&self, request: &Request) -> Option<Response> {
        let result = match self.storage.existing_cache(&self.version).await {
            Ok(Some(cache)) => cache.match_request(request).await,
            Ok(None) => Ok(None),
            Err(err) => Err(err),
        };

        result.unwrap_or_else(|err| {
            tracing::warn!(url = %request.url(), error = %err, "cache lookup failed");
            None
        })
    }

    /// Write a response copy without making the caller wait.
    fn store_detached(&self, request: Request, response: Response) {
        if response.status == PARTIAL_CONTENT {
            tracing::debug!(url = %request.url(), "partial response not cached");
            return;
        }

        let storage = self.storage.clone();
        let version = self.version.clone();
        self.tasks.spawn(async move {
            if let Err(err) = write_entry(&storage, &version, &request, &response).await {
                tracing::warn!(url = %request.url(), error = %err, "failed to cache response");
            }
        });
    }

    /// Wait for every detached cache write started so far.
    pub async fn settle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

async fn write_entry(storage: &CacheDb, version: &str, request: &Request, response: &Response) -> Result<(), Error> {
    let cache = storage.open_cache(version).await?;
    cache.put(request, response).await
}
