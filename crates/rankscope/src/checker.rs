//! Single-domain and batch checks.
//!
//! [`DomainChecker::check`] never returns an error: every failure becomes
//! an error-status [`DomainResult`]. [`DomainChecker::check_many`] runs
//! fixed-size groups concurrently with an unconditional pause between
//! groups.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::assemble::{assemble, assemble_failure, MetricsSource};
use crate::config::{BatchConfig, CheckerConfig};
use crate::extract::extract_features;
use crate::fetcher::{HttpFetcher, PageSource};
use crate::normalize::normalize_domain;
use crate::provider::{MetricsProvider, SerankingProvider};
use crate::scorer::{score, JitterSource, ThreadRngJitter};
use crate::types::{CheckResult, DomainResult};

/// Orchestrates fetch, extraction, scoring and assembly for domains.
#[derive(Clone)]
pub struct DomainChecker {
    pages: Arc<dyn PageSource>,
    provider: Option<Arc<dyn MetricsProvider>>,
    jitter: Arc<dyn JitterSource>,
    batch: BatchConfig,
    degraded_fallback: bool,
}

impl DomainChecker {
    /// Heuristic-only checker over the given page source, default batching.
    pub fn new(pages: Arc<dyn PageSource>) -> Self {
        Self {
            pages,
            provider: None,
            jitter: Arc::new(ThreadRngJitter),
            batch: BatchConfig::default(),
            degraded_fallback: false,
        }
    }

    /// Build the production checker: an HTTP fetcher plus the paid-metrics
    /// provider when an API key is configured.
    pub fn from_config(config: &CheckerConfig) -> Self {
        let fetcher = HttpFetcher::new(
            &config.user_agent,
            config.page_timeout,
            config.load_timeout,
        );
        Self::with_pages(Arc::new(fetcher), config)
    }

    /// Like [`DomainChecker::from_config`] but with a caller-supplied page source.
    pub fn with_pages(pages: Arc<dyn PageSource>, config: &CheckerConfig) -> Self {
        let mut checker = Self::new(pages)
            .with_batch(config.batch)
            .with_degraded_fallback(config.degraded_fallback);

        if let Some(key) = &config.provider_api_key {
            let mut provider = SerankingProvider::new(key.clone(), config.provider_timeout);
            if let Some(base) = &config.provider_base_url {
                provider = provider.with_base_url(base.clone());
            }
            checker = checker.with_provider(Arc::new(provider));
        }

        checker
    }

    pub fn with_provider(mut self, provider: Arc<dyn MetricsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = BatchConfig {
            group_size: batch.group_size.max(1),
            pause: batch.pause,
        };
        self
    }

    pub fn with_degraded_fallback(mut self, enabled: bool) -> Self {
        self.degraded_fallback = enabled;
        self
    }

    pub fn batch(&self) -> BatchConfig {
        self.batch
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Check one domain.
    pub async fn check(&self, raw: &str) -> DomainResult {
        let domain = match normalize_domain(raw) {
            Ok(d) => d,
            Err(e) => return assemble_failure(raw.trim(), &e),
        };

        if let Some(source) = self.external_metrics(&domain).await {
            return assemble(&domain, source);
        }

        match self.heuristic(&domain).await {
            Ok(source) => assemble(&domain, source),
            Err(e) => {
                debug!(domain = %domain, error = %e, "domain check failed");
                assemble_failure(&domain, &e)
            }
        }
    }

    /// Check domains in input order, in groups, pausing between groups.
    ///
    /// Always returns one result per input, in the same order.
    pub async fn check_many<S: AsRef<str>>(&self, domains: &[S]) -> Vec<DomainResult> {
        let total_groups = domains.len().div_ceil(self.batch.group_size);
        let mut results = Vec::with_capacity(domains.len());

        for (i, group) in domains.chunks(self.batch.group_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.batch.pause).await;
            }
            info!(
                group = i + 1,
                total_groups,
                size = group.len(),
                "checking domain group"
            );
            let checks = group.iter().map(|d| self.check(d.as_ref()));
            results.extend(join_all(checks).await);
        }

        results
    }

    /// Paid metrics when configured and non-trivial; `None` sends the caller
    /// down the heuristic path.
    async fn external_metrics(&self, domain: &str) -> Option<MetricsSource> {
        let provider = self.provider.as_ref()?;
        match provider.fetch_metrics(domain).await {
            Ok(metrics) if metrics.is_usable() => Some(MetricsSource::External {
                provider: provider.name().to_string(),
                metrics,
            }),
            Ok(_) => {
                debug!(domain, provider = provider.name(), "no usable provider data");
                None
            }
            Err(e) => {
                warn!(domain, error = %e, "provider failed, using heuristic");
                None
            }
        }
    }

    async fn heuristic(&self, domain: &str) -> CheckResult<MetricsSource> {
        let (page, tech) = tokio::join!(
            self.pages.fetch_page(domain),
            self.pages.measure_load(domain)
        );

        let features = match page {
            Ok(page) => Some(extract_features(&page.body, &page.meta)),
            Err(e) if self.degraded_fallback => {
                debug!(domain, error = %e, "scoring unreachable domain with placeholders");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(MetricsSource::Heuristic(score(
            features.as_ref(),
            Some(&tech),
            self.jitter.as_ref(),
        )))
    }
}
