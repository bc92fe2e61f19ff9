//! MCP tool implementations.
//!
//! This module contains all tools exposed by the netfirst server.

pub mod cache;
pub mod page_fetch;
