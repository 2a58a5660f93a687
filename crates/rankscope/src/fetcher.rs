//! Landing page fetcher wrapping reqwest.
//!
//! One HTTPS attempt, then one plain HTTP attempt. No retries beyond that
//! single fallback. A separate HTTPS request measures load time.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::types::{CheckError, CheckResult, TechFeatures};

/// Browser-like user agent. Some servers reject empty or library agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/131.0.0.0 Safari/537.36";

/// Transport facts about a fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    /// HTTP status code.
    pub status: u16,
    /// Body size in bytes, before any decoding.
    pub content_length: u64,
    /// True only when the HTTPS attempt succeeded.
    pub has_ssl: bool,
    /// Set when the page came from the plain HTTP fallback.
    pub fallback: bool,
}

/// A fetched landing page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested.
    pub url: String,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub meta: ResponseMeta,
}

impl FetchedPage {
    fn new(url: String, status: u16, body: Vec<u8>, has_ssl: bool) -> Self {
        let content_length = body.len() as u64;
        Self {
            url,
            body: String::from_utf8_lossy(&body).into_owned(),
            meta: ResponseMeta {
                status,
                content_length,
                has_ssl,
                fallback: !has_ssl,
            },
        }
    }
}

/// Source of landing pages and load-time measurements.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the landing page, trying HTTPS then HTTP.
    async fn fetch_page(&self, domain: &str) -> CheckResult<FetchedPage>;

    /// Time a full HTTPS GET. Never fails: errors yield [`TechFeatures::unknown`].
    async fn measure_load(&self, domain: &str) -> TechFeatures;
}

/// HTTP page source used in production.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    page_timeout: Duration,
    load_timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the given user agent and per-request timeouts.
    pub fn new(user_agent: &str, page_timeout: Duration, load_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent)
            .build()
            .unwrap_or_default();

        Self {
            client,
            page_timeout,
            load_timeout,
        }
    }

    /// GET a URL, treating any non-2xx status as a failure.
    async fn get(&self, url: &str, timeout: Duration) -> Result<(u16, Vec<u8>), reqwest::Error> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok((status, body.to_vec()))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(
            DEFAULT_USER_AGENT,
            Duration::from_secs(10),
            Duration::from_secs(5),
        )
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch_page(&self, domain: &str) -> CheckResult<FetchedPage> {
        let https_url = format!("https://{domain}");
        let https_err = match self.get(&https_url, self.page_timeout).await {
            Ok((status, body)) => return Ok(FetchedPage::new(https_url, status, body, true)),
            Err(e) => e,
        };
        debug!(domain, error = %https_err, "HTTPS fetch failed, falling back to HTTP");

        let http_url = format!("http://{domain}");
        match self.get(&http_url, self.page_timeout).await {
            Ok((status, body)) => Ok(FetchedPage::new(http_url, status, body, false)),
            Err(http_err) => {
                debug!(domain, error = %http_err, "HTTP fallback failed");
                Err(CheckError::DomainUnreachable {
                    domain: domain.to_string(),
                    reason: https_err.to_string(),
                })
            }
        }
    }

    async fn measure_load(&self, domain: &str) -> TechFeatures {
        let url = format!("https://{domain}");
        let start = Instant::now();
        match self.get(&url, self.load_timeout).await {
            Ok(_) => TechFeatures::measured(start.elapsed().as_millis() as u64),
            Err(e) => {
                debug!(domain, error = %e, "load time measurement failed");
                TechFeatures::unknown()
            }
        }
    }
}
