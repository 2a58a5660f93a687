//! Result assembly.
//!
//! Both the heuristic and the paid-metrics path end here, so every
//! [`DomainResult`] has the same shape regardless of where its numbers
//! came from.

use chrono::{DateTime, Utc};

use crate::types::{
    CheckError, CheckStatus, DomainResult, ExternalMetrics, HeuristicScore, MetricValue,
    ResultSource,
};

/// Where a successful result's metrics came from.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsSource {
    Heuristic(HeuristicScore),
    External {
        provider: String,
        metrics: ExternalMetrics,
    },
}

/// Build a success result stamped with the current time.
pub fn assemble(domain: &str, source: MetricsSource) -> DomainResult {
    assemble_at(domain, source, Utc::now())
}

/// Build a success result with an explicit timestamp.
pub fn assemble_at(domain: &str, source: MetricsSource, checked_at: DateTime<Utc>) -> DomainResult {
    let mut result = empty(domain, CheckStatus::Success, ResultSource::Basic, checked_at);

    match source {
        MetricsSource::Heuristic(score) => {
            result.domain_rating = Some(score.domain_rating);
            result.backlinks = Some(MetricValue::Count(score.backlinks));
            result.referring_domains = Some(MetricValue::Count(score.referring_domains));
            result.organic_traffic = Some(MetricValue::Text(score.organic_traffic));
            result.page_speed = Some(score.page_speed);
            result.confidence = Some(score.confidence);
        }
        MetricsSource::External { provider, metrics } => {
            result.source = ResultSource::Provider(provider);
            result.domain_trust = Some(metrics.domain_trust);
            result.page_trust = Some(metrics.page_trust);
            result.backlinks = Some(MetricValue::Text(metrics.backlinks));
            result.referring_domains = Some(MetricValue::Text(metrics.referring_domains));
            result.organic_traffic = Some(MetricValue::Count(metrics.organic_traffic));
        }
    }

    result
}

/// Build an error result. No metric fields are set.
pub fn assemble_failure(domain: &str, error: &CheckError) -> DomainResult {
    let mut result = empty(domain, CheckStatus::Error, ResultSource::Basic, Utc::now());
    result.error = Some(error.to_string());
    result
}

fn empty(
    domain: &str,
    status: CheckStatus,
    source: ResultSource,
    checked_at: DateTime<Utc>,
) -> DomainResult {
    DomainResult {
        domain: domain.to_string(),
        domain_rating: None,
        domain_trust: None,
        page_trust: None,
        backlinks: None,
        referring_domains: None,
        organic_traffic: None,
        page_speed: None,
        confidence: None,
        status,
        error: None,
        source,
        checked_at,
    }
}
