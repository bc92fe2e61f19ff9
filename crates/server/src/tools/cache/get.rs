//! cache_get tool implementation.
//!
//! Looks up a stored GET response in the active worker's cache.

use netfirst_client::{Registration, fetch::resolve};
use netfirst_core::{Error, Request};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL or origin-relative path of the cached page.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// Cache the entry was found in.
    pub cache: String,
    /// Resolved request URL.
    pub url: String,
    /// Stored status code.
    pub status: u16,
    /// Stored Content-Type header.
    pub content_type: Option<String>,
    /// Stored body size in bytes.
    pub size: usize,
    /// Stored body, decoded lossily as UTF-8.
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(
    registration: &Registration, origin: &Url, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let url = resolve(origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::get(url);

    let worker = registration
        .active()
        .await
        .ok_or_else(|| Error::CacheMiss(format!("{} (no active worker)", request.url())))?;

    let cache = worker
        .storage()
        .existing_cache(worker.version())
        .await?
        .ok_or_else(|| Error::CacheMiss(request.url().to_string()))?;

    let response = cache
        .match_request(&request)
        .await?
        .ok_or_else(|| Error::CacheMiss(request.url().to_string()))?;

    let output = CacheGetOutput {
        cache: cache.name().to_string(),
        url: request.url().to_string(),
        status: response.status,
        content_type: response.content_type().map(str::to_string),
        size: response.body.len(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
