//! Search clients that turn a query into URLs to download

use crate::config::{GoogleCredentials, DEFAULT_USER_AGENT};
use crate::error::{Error, Result};
use crate::proxy::ProxyManager;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Google Custom Search JSON API endpoint
pub const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// The API never returns more than this many items per request
const GOOGLE_MAX_NUM: usize = 10;

/// Timeout for search requests in seconds
const SEARCH_TIMEOUT_SECS: u64 = 10;

/// Characters of an error body kept in the log
const ERROR_BODY_PREVIEW: usize = 200;

/// One hit returned by a search client
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Option<Vec<GoogleItem>>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

/// Client for the Google Custom Search API
pub struct GoogleSearchClient {
    credentials: GoogleCredentials,
    base_url: String,
    user_agent: String,
    proxies: Option<Arc<ProxyManager>>,
}

impl GoogleSearchClient {
    pub fn new(credentials: GoogleCredentials) -> Self {
        Self {
            credentials,
            base_url: GOOGLE_SEARCH_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxies: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Route searches through the manager's proxy rotation
    pub fn with_proxy_manager(mut self, proxies: Arc<ProxyManager>) -> Self {
        self.proxies = Some(proxies);
        self
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Whether both the API key and the engine id are set
    pub fn is_configured(&self) -> bool {
        self.credentials.api_key.is_some() && self.credentials.cx.is_some()
    }

    fn create_client(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .user_agent(&self.user_agent);

        if let Some(options) = self.proxies.as_ref().and_then(|m| m.connection_options()) {
            builder = options.apply(builder)?;
        }

        Ok(builder.build()?)
    }

    /// Search for `query`, returning at most `min(max_results, 10)` hits
    ///
    /// An unconfigured client or a non-200 answer yields no results rather
    /// than an error; transport failures are returned.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let (Some(key), Some(cx)) = (&self.credentials.api_key, &self.credentials.cx) else {
            warn!("Google search not configured (GOOGLE_API_KEY/GOOGLE_CX missing)");
            return Ok(Vec::new());
        };

        let num = max_results.min(GOOGLE_MAX_NUM).to_string();
        let client = self.create_client()?;

        info!("Searching Google for {:?}", query);
        let response = client
            .get(&self.base_url)
            .query(&[
                ("key", key.as_str()),
                ("cx", cx.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            warn!("Google search returned HTTP {}: {}", status.as_u16(), preview);
            return Ok(Vec::new());
        }

        let body = response.text().await?;
        let results = parse_google_response(&body)?;
        info!("{} results for {:?}", results.len(), query);
        Ok(results)
    }
}

/// Extract results from a Custom Search response body
fn parse_google_response(body: &str) -> Result<Vec<SearchResult>> {
    let parsed: GoogleResponse = serde_json::from_str(body)
        .map_err(|e| Error::Search(format!("unexpected response: {}", e)))?;

    Ok(parsed
        .items
        .unwrap_or_default()
        .into_iter()
        .filter(|item| !item.link.is_empty())
        .map(|item| SearchResult {
            url: item.link,
            title: item.title,
            snippet: item.snippet,
        })
        .collect())
}

/// Client for the `direct` engine: the query is already the URL
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectUrlClient;

impl DirectUrlClient {
    pub fn new() -> Self {
        Self
    }

    /// Always exactly one result, whatever `max_results` says
    pub fn search(&self, url: &str, _max_results: usize) -> Vec<SearchResult> {
        vec![SearchResult::new(url)]
    }
}
