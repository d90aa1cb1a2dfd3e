//! Settings loading
//!
//! Settings come from a JSON file whose fields are all optional; search
//! engine credentials come from the environment.

use crate::error::{Error, Result};
use crate::proxy::{ProbeConfig, ValidatorConfig};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default URL to test proxies against
pub const DEFAULT_TEST_URL: &str = "https://httpbin.org/ip";

/// Default per-probe timeout in seconds
pub const DEFAULT_PROXY_TIMEOUT_SECS: f64 = 4.0;

/// Largest accepted per-probe timeout in seconds
pub const MAX_PROXY_TIMEOUT_SECS: f64 = 3600.0;

/// Default number of probes in flight
pub const DEFAULT_PROXY_CONCURRENCY: usize = 20;

/// Default minimum pool size before a warning is logged
pub const DEFAULT_MIN_SUCCESSFUL_PROXIES: usize = 5;

/// Default cap on the number of candidates probed
pub const DEFAULT_MAX_VALIDATED_PROXIES: usize = 50;

/// Default user agent for every outbound request
pub const DEFAULT_USER_AGENT: &str = "ProxySearchTool/1.0";

/// Default directory downloads are written under
pub const DEFAULT_DOWNLOADS_DIR: &str = "downloads";

/// Application settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// URL every proxy candidate is probed against
    pub test_url: String,
    /// Per-probe timeout, fractional seconds allowed
    pub proxy_timeout_seconds: f64,
    /// Number of probes in flight at once
    pub proxy_concurrency: usize,
    /// Pool size below which a warning is logged
    pub min_successful_proxies: usize,
    /// Maximum number of candidates probed per validation run
    pub max_validated_proxies: usize,
    /// User agent for probes, searches and downloads
    pub user_agent: String,
    /// Base directory for downloaded files
    pub downloads_base_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            test_url: DEFAULT_TEST_URL.to_string(),
            proxy_timeout_seconds: DEFAULT_PROXY_TIMEOUT_SECS,
            proxy_concurrency: DEFAULT_PROXY_CONCURRENCY,
            min_successful_proxies: DEFAULT_MIN_SUCCESSFUL_PROXIES,
            max_validated_proxies: DEFAULT_MAX_VALIDATED_PROXIES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            downloads_base_dir: DEFAULT_DOWNLOADS_DIR.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    ///
    /// A missing file is an error here; unlike the proxy list there is no
    /// sensible way to continue without one.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::SettingsNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate settings from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that numeric settings are usable
    pub fn validate(&self) -> Result<()> {
        if !self.proxy_timeout_seconds.is_finite() || self.proxy_timeout_seconds <= 0.0 {
            return Err(Error::InvalidSettings(format!(
                "proxy_timeout_seconds must be a positive number, got {}",
                self.proxy_timeout_seconds
            )));
        }

        if self.proxy_timeout_seconds > MAX_PROXY_TIMEOUT_SECS {
            return Err(Error::InvalidSettings(format!(
                "proxy_timeout_seconds must be at most {}, got {}",
                MAX_PROXY_TIMEOUT_SECS, self.proxy_timeout_seconds
            )));
        }

        if self.proxy_concurrency == 0 {
            return Err(Error::InvalidSettings(
                "proxy_concurrency must be at least 1".into(),
            ));
        }

        if self.test_url.trim().is_empty() {
            return Err(Error::InvalidSettings("test_url must not be empty".into()));
        }

        Ok(())
    }

    /// Per-probe timeout as a duration
    ///
    /// Values `validate` would reject fall back to the default timeout.
    pub fn proxy_timeout(&self) -> Duration {
        let seconds = self.proxy_timeout_seconds;
        if seconds.is_finite() && seconds > 0.0 && seconds <= MAX_PROXY_TIMEOUT_SECS {
            Duration::from_secs_f64(seconds)
        } else {
            Duration::from_secs_f64(DEFAULT_PROXY_TIMEOUT_SECS)
        }
    }

    /// Configuration for a single proxy probe
    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig::new()
            .with_test_url(self.test_url.clone())
            .with_timeout(self.proxy_timeout())
            .with_user_agent(self.user_agent.clone())
    }

    /// Configuration for a validation run
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig::new()
            .with_concurrency(self.proxy_concurrency)
            .with_max_candidates(self.max_validated_proxies)
            .with_min_successful(self.min_successful_proxies)
    }
}

/// Credentials for the Google Custom Search API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoogleCredentials {
    pub api_key: Option<String>,
    pub cx: Option<String>,
}

impl GoogleCredentials {
    /// Read `GOOGLE_API_KEY` and `GOOGLE_CX`; empty values count as unset
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_env("GOOGLE_API_KEY"),
            cx: non_empty_env("GOOGLE_CX"),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
