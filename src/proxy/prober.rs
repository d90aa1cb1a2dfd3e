//! Single-proxy liveness probe

use crate::config::{DEFAULT_PROXY_TIMEOUT_SECS, DEFAULT_TEST_URL, DEFAULT_USER_AGENT};
use crate::proxy::models::{ProxyCandidate, ProxyVerdict};
use async_trait::async_trait;
use reqwest::{Client, Proxy as ReqwestProxy};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Checks one candidate and reports a verdict
///
/// Implementations must not touch shared state; the validator may run many
/// probes at once.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, candidate: &ProxyCandidate) -> ProxyVerdict;
}

/// Configuration for an HTTP probe
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// URL fetched through the proxy
    pub test_url: String,
    /// Hard limit for the whole request including the body
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            test_url: DEFAULT_TEST_URL.to_string(),
            timeout: Duration::from_secs_f64(DEFAULT_PROXY_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_url(mut self, url: String) -> Self {
        self.test_url = url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Probes a proxy with one GET to the test URL routed through it
#[derive(Debug, Clone, Default)]
pub struct HttpProber {
    config: ProbeConfig,
}

impl HttpProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    fn create_client(&self, candidate: &ProxyCandidate) -> reqwest::Result<Client> {
        Client::builder()
            .proxy(ReqwestProxy::all(candidate.url())?)
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()
    }

    async fn fetch(&self, client: &Client) -> reqwest::Result<u16> {
        let response = client.get(&self.config.test_url).send().await?;
        let status = response.status().as_u16();
        response.bytes().await?;
        Ok(status)
    }
}

#[async_trait]
impl Prober for HttpProber {
    #[instrument(skip_all, fields(candidate = %candidate))]
    async fn probe(&self, candidate: &ProxyCandidate) -> ProxyVerdict {
        let client = match self.create_client(candidate) {
            Ok(client) => client,
            Err(e) => return ProxyVerdict::failed(candidate.clone(), e.to_string()),
        };

        let start = Instant::now();
        let verdict = match tokio::time::timeout(self.config.timeout, self.fetch(&client)).await {
            Ok(Ok(status)) if (200..400).contains(&status) => {
                ProxyVerdict::working(candidate.clone(), start.elapsed())
            }
            Ok(Ok(status)) => ProxyVerdict::bad_status(candidate.clone(), status),
            Ok(Err(e)) if e.is_timeout() => {
                ProxyVerdict::timeout(candidate.clone(), self.config.timeout)
            }
            Ok(Err(e)) => ProxyVerdict::failed(candidate.clone(), e.to_string()),
            Err(_) => ProxyVerdict::timeout(candidate.clone(), self.config.timeout),
        };

        match (&verdict.latency, &verdict.error) {
            (Some(latency), _) => debug!("OK {} ({}ms)", candidate, latency.as_millis()),
            (None, Some(error)) => debug!("FAIL {} -> {}", candidate, error),
            (None, None) => {}
        }

        verdict
    }
}
