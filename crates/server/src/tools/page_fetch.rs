//! page_fetch tool implementation.
//!
//! Issues a page request through the registration, the way a browser page
//! would with the worker in front of it.

use netfirst_client::{Registration, fetch::resolve};
use netfirst_core::{Error, Request};
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Input parameters for page_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageFetchParams {
    /// Page URL; paths such as `/mobile` are resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are cached.
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// A single response header.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

/// Output structure for page_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// HTTP status code of the delivered response.
    pub status: u16,
    /// "network", "cache" or "passthrough".
    pub source: String,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Response headers.
    pub headers: Vec<HeaderEntry>,
    /// Response body, decoded lossily as UTF-8.
    pub body: String,
}

/// Implementation of the page_fetch tool.
pub async fn page_fetch_impl(
    registration: &Registration, origin: &Url, params: PageFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let url = resolve(origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::new(&params.method, url);

    let served = registration.fetch(&request).await?;
    tracing::debug!(url = %request.url(), source = served.source.as_str(), "page request served");

    let response = served.response;
    let output = PageFetchOutput {
        url: request.url().to_string(),
        status: response.status,
        source: served.source.as_str().to_string(),
        content_type: response.content_type().map(str::to_string),
        headers: response
            .headers
            .iter()
            .map(|(name, value)| HeaderEntry { name: name.clone(), value: value.clone() })
            .collect(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
