//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, get_impl, status_impl};
use crate::tools::page_fetch::{PageFetchParams, page_fetch_impl};

use netfirst_client::Registration;
use netfirst_core::CacheDb;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use url::Url;

/// The main MCP server handler for netfirst.
#[derive(Clone)]
pub struct NetfirstServer {
    tool_router: ToolRouter<Self>,
    registration: Arc<Registration>,
    db: CacheDb,
    origin: Url,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl NetfirstServer {
    /// Create a new server handler around a registration and its storage.
    pub fn new(registration: Arc<Registration>, db: CacheDb, origin: Url) -> Self {
        Self { tool_router: Self::tool_router(), registration, db, origin }
    }

    /// Request a page through the worker.
    ///
    /// GET requests go to the network first and fall back to the cache when the network fails.
    #[tool(
        description = "Request a page through the network-first cache worker. Returns status, headers, body and whether it came from the network or the cache."
    )]
    async fn page_fetch(&self, params: Parameters<PageFetchParams>) -> Result<CallToolResult, McpError> {
        page_fetch_impl(&self.registration, &self.origin, params.0).await
    }

    /// Read a stored response from the active cache without touching the network.
    #[tool(description = "Read a cached page from the active worker's cache without any network access.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.registration, &self.origin, params.0).await
    }

    /// Report the active worker and the caches in storage.
    #[tool(description = "Show the active worker version, its lifecycle state and every cache with its entry count.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.registration, &self.db).await
    }
}

impl ServerHandler for NetfirstServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "netfirst".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
