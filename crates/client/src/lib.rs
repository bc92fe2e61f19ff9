//! Client code for netfirst.
//!
//! This crate provides the network layer and the network-first cache worker
//! that sits between page requests and the cache storage.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use worker::{Interception, Registration, ResponseSource, Served, ServiceWorker};
