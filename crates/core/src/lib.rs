//! Core types and shared functionality for netfirst.
//!
//! This crate provides:
//! - Named cache storage with a SQLite backend
//! - Request/response values used as cache keys and entries
//! - The worker lifecycle state machine
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod message;

pub use cache::{ActiveVersion, Cache, CacheDb};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use lifecycle::WorkerState;
pub use message::{Request, Response};
