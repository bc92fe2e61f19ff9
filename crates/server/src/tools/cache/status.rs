//! worker_status tool implementation.
//!
//! Reports the active worker and every cache present in storage.

use netfirst_client::Registration;
use netfirst_core::{CacheDb, Error, WorkerState};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One cache in storage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSummary {
    pub name: String,
    pub entries: u64,
}

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    /// Version of the active worker, if one is registered.
    pub version: Option<String>,
    /// Lifecycle state of the active worker.
    pub state: Option<WorkerState>,
    /// URLs precached by the active worker.
    pub precache_urls: Vec<String>,
    /// Caches in creation order.
    pub caches: Vec<CacheSummary>,
}

/// Implementation of the worker_status tool.
pub async fn status_impl(registration: &Registration, db: &CacheDb) -> Result<CallToolResult, McpError> {
    let (version, state, precache_urls) = match registration.active().await {
        Some(worker) => (
            Some(worker.version().to_string()),
            Some(worker.state().await),
            worker.precache_urls().iter().map(|u| u.to_string()).collect(),
        ),
        None => (None, None, Vec::new()),
    };

    let mut caches = Vec::new();
    for name in db.cache_names().await? {
        let entries = match db.existing_cache(&name).await? {
            Some(cache) => cache.len().await?,
            None => continue,
        };
        caches.push(CacheSummary { name, entries });
    }

    let output = WorkerStatusOutput { version, state, precache_urls, caches };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize status: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
