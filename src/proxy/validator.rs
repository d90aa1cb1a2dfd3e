//! Batch proxy validation with bounded concurrency

use crate::config::{
    DEFAULT_MAX_VALIDATED_PROXIES, DEFAULT_MIN_SUCCESSFUL_PROXIES, DEFAULT_PROXY_CONCURRENCY,
};
use crate::proxy::models::{ProxyCandidate, ProxyPool, ProxyVerdict};
use crate::proxy::prober::Prober;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for a validation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Probes in flight at once
    pub concurrency: usize,
    /// Only the first `max_candidates` candidates are probed
    pub max_candidates: usize,
    /// Pool size below which a warning is logged
    pub min_successful: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_PROXY_CONCURRENCY,
            max_candidates: DEFAULT_MAX_VALIDATED_PROXIES,
            min_successful: DEFAULT_MIN_SUCCESSFUL_PROXIES,
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn with_min_successful(mut self, min_successful: usize) -> Self {
        self.min_successful = min_successful;
        self
    }
}

/// Everything a validation run produced
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// One verdict per probed candidate, in completion order
    pub verdicts: Vec<ProxyVerdict>,
    pub pool: ProxyPool,
    /// The pool came out smaller than `min_successful`
    pub below_minimum: bool,
}

impl ValidationReport {
    pub fn failures(&self) -> impl Iterator<Item = &ProxyVerdict> {
        self.verdicts.iter().filter(|v| !v.success)
    }
}

/// Runs a prober over a candidate list and ranks the survivors
pub struct ProxyValidator<P> {
    prober: Arc<P>,
    config: ValidatorConfig,
}

impl<P: Prober> ProxyValidator<P> {
    pub fn new(prober: P, config: ValidatorConfig) -> Self {
        Self {
            prober: Arc::new(prober),
            config,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    /// Validate candidates and return the latency-ordered pool
    pub async fn validate(&self, candidates: Vec<ProxyCandidate>) -> ProxyPool {
        self.run(candidates).await.pool
    }

    /// Validate candidates, keeping every verdict alongside the pool
    ///
    /// At most `max_candidates` probes are dispatched and never more than
    /// `concurrency` run at once. A failing probe only affects its own
    /// verdict.
    pub async fn run(&self, mut candidates: Vec<ProxyCandidate>) -> ValidationReport {
        if candidates.is_empty() {
            info!("No proxies to validate. Running without proxies.");
            return ValidationReport {
                below_minimum: self.config.min_successful > 0,
                ..Default::default()
            };
        }

        candidates.truncate(self.config.max_candidates);
        let concurrency = self.config.concurrency.max(1);
        info!(
            "Validating {} proxies (max={}, concurrency={})",
            candidates.len(),
            self.config.max_candidates,
            concurrency
        );

        let verdicts: Vec<ProxyVerdict> = stream::iter(candidates)
            .map(|candidate| {
                let prober = Arc::clone(&self.prober);
                async move { prober.probe(&candidate).await }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let pool = ProxyPool::from_verdicts(verdicts.iter().cloned());

        info!(
            "{} of {} proxies passed validation",
            pool.len(),
            verdicts.len()
        );
        let below_minimum = pool.len() < self.config.min_successful;
        if below_minimum {
            warn!(
                "Only {} working proxies (minimum {})",
                pool.len(),
                self.config.min_successful
            );
        }

        ValidationReport {
            verdicts,
            pool,
            below_minimum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::prober::{HttpProber, ProbeConfig};
    use crate::test_support::{spawn_black_hole, spawn_responder, MockResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted outcome for one candidate
    #[derive(Clone)]
    enum Script {
        Pass(Duration),
        Fail(Duration),
    }

    /// Prober that replays scripted outcomes and records dispatch counts
    #[derive(Default)]
    struct ScriptedProber {
        scripts: HashMap<String, Script>,
        dispatched: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl ScriptedProber {
        fn with(mut self, candidate: &str, script: Script) -> Self {
            self.scripts.insert(candidate.to_string(), script);
            self
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, candidate: &ProxyCandidate) -> ProxyVerdict {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            let script = self
                .scripts
                .get(candidate.as_str())
                .cloned()
                .unwrap_or(Script::Fail(Duration::ZERO));

            let verdict = match script {
                Script::Pass(latency) => {
                    tokio::time::sleep(latency).await;
                    ProxyVerdict::working(candidate.clone(), latency)
                }
                Script::Fail(after) => {
                    tokio::time::sleep(after).await;
                    ProxyVerdict::timeout(candidate.clone(), after)
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            verdict
        }
    }

    fn candidates(raw: &[&str]) -> Vec<ProxyCandidate> {
        raw.iter().map(|c| ProxyCandidate::new(*c)).collect()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_validator_config_default() {
        let config = ValidatorConfig::default();
        assert_eq!(config.concurrency, DEFAULT_PROXY_CONCURRENCY);
        assert_eq!(config.max_candidates, DEFAULT_MAX_VALIDATED_PROXIES);
        assert_eq!(config.min_successful, DEFAULT_MIN_SUCCESSFUL_PROXIES);
    }

    #[test]
    fn test_validator_config_builder() {
        let config = ValidatorConfig::new()
            .with_concurrency(3)
            .with_max_candidates(9)
            .with_min_successful(1);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.max_candidates, 9);
        assert_eq!(config.min_successful, 1);
    }

    #[tokio::test]
    async fn test_empty_candidates_dispatch_nothing() {
        let validator = ProxyValidator::new(ScriptedProber::default(), ValidatorConfig::new());
        let pool = validator.validate(Vec::new()).await;

        assert!(pool.is_empty());
        assert_eq!(validator.prober().dispatched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_and_success_scenario() {
        let prober = ScriptedProber::default()
            .with("1.2.3.4:8080", Script::Fail(ms(120)))
            .with("5.6.7.8:3128", Script::Pass(ms(50)));
        let validator = ProxyValidator::new(prober, ValidatorConfig::new());

        let pool = validator
            .validate(candidates(&["1.2.3.4:8080", "5.6.7.8:3128"]))
            .await;

        assert_eq!(pool.len(), 1);
        let entry = pool.get(0).unwrap();
        assert_eq!(entry.candidate.as_str(), "5.6.7.8:3128");
        assert_eq!(entry.latency, ms(50));
    }

    #[tokio::test]
    async fn test_max_candidates_caps_probes() {
        let prober = ScriptedProber::default()
            .with("slow:1", Script::Pass(ms(40)))
            .with("fast:1", Script::Pass(ms(1)));
        let validator =
            ProxyValidator::new(prober, ValidatorConfig::new().with_max_candidates(1));

        let pool = validator.validate(candidates(&["slow:1", "fast:1"])).await;

        assert_eq!(validator.prober().dispatched.load(Ordering::SeqCst), 1);
        assert_eq!(pool.candidates(), candidates(&["slow:1"]));
    }

    #[tokio::test]
    async fn test_pool_excludes_failures_and_is_sorted() {
        let mut prober = ScriptedProber::default();
        let mut raw = Vec::new();
        for i in 0..12u64 {
            let name = format!("10.0.0.{}:80", i);
            let script = if i % 3 == 0 {
                Script::Fail(ms(i))
            } else {
                Script::Pass(ms(60 - i * 4))
            };
            prober = prober.with(&name, script);
            raw.push(name);
        }
        let validator = ProxyValidator::new(prober, ValidatorConfig::new().with_concurrency(4));

        let report = validator
            .run(raw.iter().map(ProxyCandidate::new).collect())
            .await;

        assert_eq!(report.verdicts.len(), 12);
        assert_eq!(report.failures().count(), 4);
        assert_eq!(report.pool.len(), 8);

        let failed: Vec<_> = report.failures().map(|v| v.candidate.clone()).collect();
        assert!(report.pool.iter().all(|p| !failed.contains(&p.candidate)));
        assert!(report
            .pool
            .iter()
            .zip(report.pool.iter().skip(1))
            .all(|(a, b)| a.latency <= b.latency));
    }

    #[tokio::test]
    async fn test_verdicts_arrive_in_completion_order() {
        let prober = ScriptedProber::default()
            .with("slow:1", Script::Pass(ms(80)))
            .with("fast:1", Script::Pass(ms(5)));
        let validator = ProxyValidator::new(prober, ValidatorConfig::new().with_concurrency(2));

        let report = validator.run(candidates(&["slow:1", "fast:1"])).await;

        let order: Vec<_> = report.verdicts.iter().map(|v| v.candidate.as_str()).collect();
        assert_eq!(order, vec!["fast:1", "slow:1"]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let mut prober = ScriptedProber::default();
        let raw: Vec<String> = (0..20).map(|i| format!("10.1.0.{}:80", i)).collect();
        for name in &raw {
            prober = prober.with(name, Script::Pass(ms(10)));
        }
        let validator = ProxyValidator::new(prober, ValidatorConfig::new().with_concurrency(3));

        let pool = validator
            .validate(raw.iter().map(ProxyCandidate::new).collect())
            .await;

        assert_eq!(pool.len(), 20);
        let peak = validator.prober().peak_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in flight was {}", peak);
        assert!(peak >= 2);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_runs() {
        let prober = ScriptedProber::default().with("a:1", Script::Pass(ms(1)));
        let validator = ProxyValidator::new(prober, ValidatorConfig::new().with_concurrency(0));

        let pool = validator.validate(candidates(&["a:1"])).await;
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty_pool() {
        let validator = ProxyValidator::new(
            ScriptedProber::default(),
            ValidatorConfig::new().with_min_successful(5),
        );

        let report = validator.run(candidates(&["a:1", "b:1", "c:1"])).await;
        assert!(report.pool.is_empty());
        assert_eq!(report.failures().count(), 3);
        assert!(report.below_minimum);
    }

    #[tokio::test]
    async fn test_below_minimum_flag() {
        let two_of_three = || {
            ScriptedProber::default()
                .with("a:1", Script::Pass(ms(10)))
                .with("b:1", Script::Pass(ms(20)))
        };

        let strict = ProxyValidator::new(two_of_three(), ValidatorConfig::new().with_min_successful(3));
        let report = strict.run(candidates(&["a:1", "b:1", "c:1"])).await;
        assert_eq!(report.pool.len(), 2);
        assert!(report.below_minimum);

        let lenient = ProxyValidator::new(two_of_three(), ValidatorConfig::new().with_min_successful(2));
        let report = lenient.run(candidates(&["a:1", "b:1", "c:1"])).await;
        assert_eq!(report.pool.len(), 2);
        assert!(!report.below_minimum);
    }

    #[tokio::test]
    async fn test_empty_input_is_below_minimum() {
        let validator = ProxyValidator::new(ScriptedProber::default(), ValidatorConfig::new());
        assert!(validator.run(Vec::new()).await.below_minimum);

        let validator = ProxyValidator::new(
            ScriptedProber::default(),
            ValidatorConfig::new().with_min_successful(0),
        );
        assert!(!validator.run(Vec::new()).await.below_minimum);
    }

    #[tokio::test]
    async fn test_http_prober_end_to_end() {
        let dead = spawn_black_hole().await;
        let live = spawn_responder(MockResponse::ok("{}").with_delay(ms(50))).await;

        let prober = HttpProber::new(
            ProbeConfig::new()
                .with_test_url("http://probe.invalid/ip".to_string())
                .with_timeout(ms(400)),
        );
        let validator = ProxyValidator::new(prober, ValidatorConfig::new());

        let pool = validator
            .validate(vec![
                ProxyCandidate::new(dead.to_string()),
                ProxyCandidate::new(live.to_string()),
            ])
            .await;

        assert_eq!(pool.len(), 1);
        let entry = pool.get(0).unwrap();
        assert_eq!(entry.candidate.as_str(), live.to_string());
        assert!(entry.latency >= ms(50));
        assert!(entry.latency < ms(400));
    }
}
