//! Query list loading
//!
//! One query per line: `engine;query;max_results;download_subdir`. Only
//! the first two fields are required.

use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Results requested when a line does not say
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Search backend named by a query line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Engine {
    Google,
    Direct,
    Other(String),
}

impl Engine {
    pub fn parse(s: &str) -> Self {
        match s {
            "google" => Engine::Google,
            "direct" => Engine::Direct,
            other => Engine::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Engine::Google => "google",
            Engine::Direct => "direct",
            Engine::Other(name) => name,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of the query list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub engine: Engine,
    /// Search terms, or the URL itself for the direct engine
    pub query: String,
    pub max_results: usize,
    /// Subdirectory of the download base the results land in
    pub download_subdir: String,
}

impl SearchQuery {
    /// Parse one line; blank lines, comments and lines with fewer than two
    /// fields yield `None`
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let parts: Vec<&str> = line.split(';').map(str::trim).collect();
        if parts.len() < 2 {
            return None;
        }

        let engine = parts[0];
        let max_results = parts
            .get(2)
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RESULTS);
        let download_subdir = parts
            .get(3)
            .filter(|s| !s.is_empty())
            .unwrap_or(&engine)
            .to_string();

        Some(Self {
            engine: Engine::parse(engine),
            query: parts[1].to_string(),
            max_results,
            download_subdir,
        })
    }
}

/// Parse every query in `content`
pub fn parse_str(content: &str) -> Vec<SearchQuery> {
    content.lines().filter_map(SearchQuery::parse_line).collect()
}

/// Load the query list; a missing file yields no queries
pub fn load<P: AsRef<Path>>(path: P) -> Vec<SearchQuery> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Query file not readable: {} ({})", path.display(), e);
            return Vec::new();
        }
    };

    let queries = parse_str(&content);
    info!("Loaded {} queries from {}", queries.len(), path.display());
    queries
}
