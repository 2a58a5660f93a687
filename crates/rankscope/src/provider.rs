//! Paid domain-metrics providers.
//!
//! A provider returns authority metrics verbatim. The checker prefers them
//! over the heuristic whenever they are usable.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::types::{CheckError, CheckResult, ExternalMetrics};

/// Default SE Ranking API base URL.
pub const SERANKING_API_BASE: &str = "https://api.seranking.com";

/// Provider name recorded as the result source.
pub const SERANKING_NAME: &str = "seranking.com";

/// A third-party source of domain metrics.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Name recorded in the result's `source` field.
    fn name(&self) -> &str;

    /// Fetch metrics for a normalized domain.
    async fn fetch_metrics(&self, domain: &str) -> CheckResult<ExternalMetrics>;
}

/// SE Ranking backlinks API client.
#[derive(Clone)]
pub struct SerankingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
struct MetricsResponse {
    #[serde(default)]
    metrics: Vec<MetricsEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct MetricsEntry {
    #[serde(default)]
    backlinks: Option<u64>,
    #[serde(default)]
    refdomains: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthorityResponse {
    #[serde(default)]
    pages: Vec<AuthorityPage>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthorityPage {
    #[serde(default)]
    domain_inlink_rank: Option<f64>,
    #[serde(default)]
    inlink_rank: Option<f64>,
}

impl SerankingProvider {
    /// Create a client for the public API.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: SERANKING_API_BASE.to_string(),
            timeout,
        }
    }

    /// Point the client at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn error(&self, reason: impl Into<String>) -> CheckError {
        CheckError::ExternalProvider {
            provider: SERANKING_NAME.to_string(),
            reason: reason.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> CheckResult<T> {
        let url = format!("{}{endpoint}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| match e.status() {
                Some(status) => self.error(status.as_u16().to_string()),
                None => self.error(e.to_string()),
            })?;

        resp.json::<T>()
            .await
            .map_err(|e| self.error(format!("invalid response: {e}")))
    }
}

#[async_trait]
impl MetricsProvider for SerankingProvider {
    fn name(&self) -> &str {
        SERANKING_NAME
    }

    async fn fetch_metrics(&self, domain: &str) -> CheckResult<ExternalMetrics> {
        let target_url = format!("https://{domain}");
        let metrics_query = [
            ("apikey", self.api_key.as_str()),
            ("target", domain),
            ("mode", "domain"),
            ("output", "json"),
        ];
        let authority_query = [
            ("apikey", self.api_key.as_str()),
            ("target", target_url.as_str()),
            ("output", "json"),
        ];

        let (metrics, authority) = tokio::try_join!(
            self.get_json::<MetricsResponse>("/v1/backlinks/metrics", &metrics_query),
            self.get_json::<AuthorityResponse>("/v1/backlinks/authority", &authority_query),
        )?;

        let entry = metrics
            .metrics
            .into_iter()
            .next()
            .ok_or_else(|| self.error("No metrics data returned"))?;
        let page = authority.pages.into_iter().next().unwrap_or_default();

        Ok(ExternalMetrics {
            domain_trust: page.domain_inlink_rank.unwrap_or(0.0).round() as u32,
            page_trust: page.inlink_rank.unwrap_or(0.0).round() as u32,
            backlinks: format_count(entry.backlinks.unwrap_or(0)),
            referring_domains: format_count(entry.refdomains.unwrap_or(0)),
            organic_traffic: 0,
        })
    }
}

/// Render a count with a `K`/`M` suffix and one decimal, e.g. `1.2K`.
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1.0K");
        assert_eq!(format_count(1_260), "1.3K");
        assert_eq!(format_count(45_600), "45.6K");
        assert_eq!(format_count(2_500_000), "2.5M");
    }

    async fn mount_authority(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/v1/backlinks/authority"))
            .and(query_param("target", "https://example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fetch_metrics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/backlinks/metrics"))
            .and(query_param("apikey", "secret"))
            .and(query_param("target", "example.com"))
            .and(query_param("mode", "domain"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "metrics": [{ "backlinks": 15400, "refdomains": 320 }]
            })))
            .mount(&server)
            .await;
        mount_authority(
            &server,
            serde_json::json!({ "pages": [{ "domain_inlink_rank": 42, "inlink_rank": 17 }] }),
        )
        .await;

        let provider =
            SerankingProvider::new("secret", Duration::from_secs(5)).with_base_url(server.uri());
        let metrics = provider.fetch_metrics("example.com").await.unwrap();

        assert_eq!(metrics.domain_trust, 42);
        assert_eq!(metrics.page_trust, 17);
        assert_eq!(metrics.backlinks, "15.4K");
        assert_eq!(metrics.referring_domains, "320");
        assert_eq!(metrics.organic_traffic, 0);
        assert!(metrics.is_usable());
    }

    #[tokio::test]
    async fn test_missing_metrics_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/backlinks/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        mount_authority(&server, serde_json::json!({ "pages": [] })).await;

        let provider =
            SerankingProvider::new("k", Duration::from_secs(5)).with_base_url(server.uri());
        let err = provider.fetch_metrics("example.com").await.unwrap_err();
        assert!(err.to_string().contains("No metrics data returned"));
    }

    #[tokio::test]
    async fn test_http_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider =
            SerankingProvider::new("bad", Duration::from_secs(5)).with_base_url(server.uri());
        let err = provider.fetch_metrics("example.com").await.unwrap_err();
        assert_eq!(
            err,
            CheckError::ExternalProvider {
                provider: SERANKING_NAME.to_string(),
                reason: "401".to_string(),
            }
        );
    }
}
