//! Core data types for domain checks and their results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signals scraped from a domain's landing page.
///
/// Fields the HTTP fallback fetch cannot derive are `None`. The scorer
/// treats an absent field the same as a field that earns no bonus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFeatures {
    pub title: String,
    pub meta_description: Option<String>,
    pub h1_count: Option<u32>,
    pub h2_count: Option<u32>,
    pub image_count: Option<u32>,
    pub link_count: u32,
    /// Raw body size in bytes, as received.
    pub content_length: u64,
    pub has_ssl: bool,
    pub status_code: u16,
}

/// Coarse page speed bucket derived from load latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeedClass {
    Fast,
    Medium,
    Slow,
    Unknown,
}

impl SpeedClass {
    /// Bucket a measured load time: `< 1000` Fast, `< 3000` Medium, else Slow.
    pub fn from_load_time(load_time_ms: u64) -> Self {
        if load_time_ms < 1000 {
            SpeedClass::Fast
        } else if load_time_ms < 3000 {
            SpeedClass::Medium
        } else {
            SpeedClass::Slow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedClass::Fast => "Fast",
            SpeedClass::Medium => "Medium",
            SpeedClass::Slow => "Slow",
            SpeedClass::Unknown => "Unknown",
        }
    }

    /// Parse the stored string form. Unrecognized values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Fast" => Some(SpeedClass::Fast),
            "Medium" => Some(SpeedClass::Medium),
            "Slow" => Some(SpeedClass::Slow),
            "Unknown" => Some(SpeedClass::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for SpeedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load-time measurement for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechFeatures {
    pub load_time_ms: u64,
    pub speed_class: SpeedClass,
}

impl TechFeatures {
    /// A successful measurement.
    pub fn measured(load_time_ms: u64) -> Self {
        Self {
            load_time_ms,
            speed_class: SpeedClass::from_load_time(load_time_ms),
        }
    }

    /// The measurement request failed or timed out.
    pub fn unknown() -> Self {
        Self {
            load_time_ms: 0,
            speed_class: SpeedClass::Unknown,
        }
    }
}

/// How much the heuristic had to go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Scored from fetched page signals.
    Estimated,
    /// The page could not be fetched; numbers are random placeholders.
    Degraded,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Estimated => "estimated",
            Confidence::Degraded => "degraded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "estimated" => Some(Confidence::Estimated),
            "degraded" => Some(Confidence::Degraded),
            _ => None,
        }
    }
}

/// Output of the heuristic scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicScore {
    /// Always within `1..=100`.
    pub domain_rating: u8,
    pub backlinks: u64,
    pub referring_domains: u64,
    /// Range string such as `Est: 3K-4K/month`.
    pub organic_traffic: String,
    pub page_speed: SpeedClass,
    pub confidence: Confidence,
}

/// Metrics returned verbatim by a paid provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMetrics {
    pub domain_trust: u32,
    pub page_trust: u32,
    /// Pre-formatted count, e.g. `1.2K`.
    pub backlinks: String,
    pub referring_domains: String,
    pub organic_traffic: u64,
}

impl ExternalMetrics {
    /// Whether the provider actually knew anything about the domain.
    pub fn is_usable(&self) -> bool {
        self.domain_trust > 0 || self.backlinks != "0"
    }
}

/// A metric that is a plain count on the heuristic path and a formatted
/// string on the paid path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Text(String),
}

impl MetricValue {
    /// Rebuild a value from its stored text form.
    pub fn from_stored(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) => MetricValue::Count(n),
            Err(_) => MetricValue::Text(s.to_string()),
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            MetricValue::Count(n) => Some(*n),
            MetricValue::Text(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{n}"),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Success,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Success => "success",
            CheckStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(CheckStatus::Success),
            "error" => Some(CheckStatus::Error),
            _ => None,
        }
    }
}

/// Which path produced a result. Serialized as `basic` or the provider name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultSource {
    Basic,
    Provider(String),
}

impl ResultSource {
    pub fn as_str(&self) -> &str {
        match self {
            ResultSource::Basic => "basic",
            ResultSource::Provider(name) => name,
        }
    }
}

impl From<String> for ResultSource {
    fn from(s: String) -> Self {
        if s.is_empty() || s == "basic" {
            ResultSource::Basic
        } else {
            ResultSource::Provider(s)
        }
    }
}

impl From<ResultSource> for String {
    fn from(source: ResultSource) -> Self {
        source.as_str().to_string()
    }
}

/// The unit returned to callers and appended to storage.
///
/// Built only by the assembler: a success carries either the heuristic
/// fields (`domain_rating`, `page_speed`, `confidence`) or the provider
/// fields (`domain_trust`, `page_trust`); an error carries neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainResult {
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_trust: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_trust: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlinks: Option<MetricValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referring_domains: Option<MetricValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organic_traffic: Option<MetricValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_speed: Option<SpeedClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub source: ResultSource,
    pub checked_at: DateTime<Utc>,
}

impl DomainResult {
    pub fn is_success(&self) -> bool {
        self.status == CheckStatus::Success
    }
}

/// Errors raised inside a single domain check.
///
/// None of these escape [`crate::DomainChecker::check`]; they become
/// error-status results.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// Both the HTTPS and HTTP attempts failed. Carries the HTTPS failure.
    #[error("Cannot access domain: {reason}")]
    DomainUnreachable { domain: String, reason: String },

    #[error("Invalid domain: {0:?} is empty after normalization")]
    MalformedInput(String),

    #[error("{provider} API error: {reason}")]
    ExternalProvider { provider: String, reason: String },
}

/// Convenience result type.
pub type CheckResult<T> = Result<T, CheckError>;
