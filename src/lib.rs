//! Proxy Search - search, validate proxies, download
//!
//! Resolves URLs through a search-engine API (or passes them through
//! directly), validates a pool of HTTP proxies for liveness and latency,
//! and downloads the results through the validated proxies in rotation.

pub mod config;
pub mod download;
pub mod error;
pub mod proxy;
pub mod queries;
pub mod search;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Settings;
pub use error::{Error, Result};
pub use proxy::*;
