//! Proxy list loading
//!
//! The list is plain text, one candidate per line. Lines are trimmed,
//! blank lines and `#` comments are skipped.

use crate::proxy::models::ProxyCandidate;
use rand::seq::SliceRandom;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Marker for comment lines in the proxy list
const COMMENT_PREFIX: char = '#';

/// Loader for proxy candidate lists
pub struct ProxySource;

impl ProxySource {
    /// Parse a single line, returning `None` for blanks and comments
    pub fn parse_line(line: &str) -> Option<ProxyCandidate> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
            return None;
        }
        Some(ProxyCandidate::new(line))
    }

    /// Parse candidates from a string, preserving file order
    pub fn parse_str(content: &str) -> Vec<ProxyCandidate> {
        content.lines().filter_map(Self::parse_line).collect()
    }

    /// Load candidates from a file in shuffled order
    ///
    /// Shuffling keeps a latency-sorted or geographically grouped list from
    /// biasing which proxies get probed first. A missing or unreadable file
    /// yields an empty list so the caller can run without proxies.
    pub fn load<P: AsRef<Path>>(path: P) -> Vec<ProxyCandidate> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "Proxy list not found: {}. Continuing without proxies.",
                path.display()
            );
            return Vec::new();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Failed to read proxy list {}: {}. Continuing without proxies.",
                    path.display(),
                    e
                );
                return Vec::new();
            }
        };

        let mut candidates = Self::parse_str(&content);
        candidates.shuffle(&mut rand::thread_rng());

        info!(
            "Loaded {} proxies from {}",
            candidates.len(),
            path.display()
        );
        candidates
    }

    /// Save candidates to a file, one per line
    pub fn save_to_file<P: AsRef<Path>>(
        candidates: &[ProxyCandidate],
        path: P,
    ) -> std::io::Result<()> {
        let content: String = candidates
            .iter()
            .map(ProxyCandidate::as_str)
            .collect::<Vec<_>>()
            .join("\n");

        fs::write(path, content)
    }
}
