//! Load → validate → serve facade over the proxy subsystem

use crate::config::Settings;
use crate::proxy::models::{ConnectionOptions, ProxyCandidate, ProxyPool};
use crate::proxy::prober::{HttpProber, Prober};
use crate::proxy::selector::ProxySelector;
use crate::proxy::source::ProxySource;
use crate::proxy::validator::{ProxyValidator, ValidationReport};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Owns the candidate list, the validator and the rotating selector
///
/// Every failure inside degrades to running without a proxy; callers only
/// ever see `None` from [`ProxyManager::next_proxy`] or
/// [`ProxyManager::connection_options`].
pub struct ProxyManager<P = HttpProber> {
    proxies_file: PathBuf,
    candidates: Vec<ProxyCandidate>,
    validator: ProxyValidator<P>,
    selector: ProxySelector,
}

impl ProxyManager<HttpProber> {
    /// Manager probing over HTTP with the given settings
    pub fn new<T: AsRef<Path>>(proxies_file: T, settings: &Settings) -> Self {
        Self::with_prober(
            proxies_file,
            HttpProber::new(settings.probe_config()),
            settings,
        )
    }
}

impl<P: Prober> ProxyManager<P> {
    pub fn with_prober<T: AsRef<Path>>(proxies_file: T, prober: P, settings: &Settings) -> Self {
        Self {
            proxies_file: proxies_file.as_ref().to_path_buf(),
            candidates: Vec::new(),
            validator: ProxyValidator::new(prober, settings.validator_config()),
            selector: ProxySelector::default(),
        }
    }

    /// Read the proxy list; a missing file leaves the manager without proxies
    pub fn load_proxies(&mut self) -> &[ProxyCandidate] {
        self.candidates = ProxySource::load(&self.proxies_file);
        &self.candidates
    }

    /// Use an already loaded candidate list
    pub fn set_candidates(&mut self, candidates: Vec<ProxyCandidate>) {
        self.candidates = candidates;
    }

    pub fn candidates(&self) -> &[ProxyCandidate] {
        &self.candidates
    }

    /// Probe the loaded candidates and install the resulting pool
    ///
    /// Loads the list first if nothing has been loaded yet.
    pub async fn validate_proxies(&mut self) -> ValidationReport {
        if self.candidates.is_empty() {
            self.load_proxies();
        }

        let report = self.validator.run(self.candidates.clone()).await;
        self.selector.replace(report.pool.clone());

        if report.pool.is_empty() {
            warn!("No working proxies. Requests will go out directly.");
        } else {
            info!("Proxy pool ready with {} proxies", report.pool.len());
        }

        report
    }

    /// Next proxy in rotation
    pub fn next_proxy(&self) -> Option<ProxyCandidate> {
        self.selector.next()
    }

    /// Routing for one outbound request, `None` meaning connect directly
    pub fn connection_options(&self) -> Option<ConnectionOptions> {
        let candidate = self.next_proxy()?;
        match ConnectionOptions::for_candidate(&candidate) {
            Ok(options) => Some(options),
            Err(e) => {
                warn!("Skipping unusable proxy {}: {}", candidate, e);
                None
            }
        }
    }

    pub fn pool(&self) -> ProxyPool {
        self.selector.snapshot()
    }
}
