//! Proxy module for loading, validating and rotating proxies
//!
//! This module provides functionality for:
//! - Loading proxy candidates from a line-oriented list in random order
//! - Probing each candidate through a test URL with bounded concurrency
//! - Ranking working proxies by latency
//! - Handing proxies out round-robin to outbound HTTP callers

pub mod manager;
pub mod models;
pub mod prober;
pub mod selector;
pub mod source;
pub mod validator;

pub use manager::ProxyManager;
pub use models::{ConnectionOptions, ProxyCandidate, ProxyPool, ProxyVerdict, ValidatedProxy};
pub use prober::{HttpProber, ProbeConfig, Prober};
pub use selector::ProxySelector;
pub use source::ProxySource;
pub use validator::{ProxyValidator, ValidationReport, ValidatorConfig};
