//! SQLite-backed cache storage for intercepted responses.
//!
//! This module provides a persistent set of named caches, each mapping a
//! request key to a stored response, using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Opening (creating if absent), listing and deleting named caches
//! - Atomic bulk inserts for precaching
//! - Last-write-wins puts keyed by method + URL
//! - A record of the last activated version
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::Cache;
pub use storage::ActiveVersion;
