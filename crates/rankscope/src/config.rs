//! Checker configuration.
//!
//! Everything the core needs is passed in here; nothing is read from the
//! process environment.

use std::time::Duration;

use crate::fetcher::DEFAULT_USER_AGENT;

/// Fixed-window batching: groups of `group_size` run concurrently, with
/// `pause` between consecutive groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub group_size: usize,
    pub pause: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            group_size: 3,
            pause: Duration::from_millis(2000),
        }
    }
}

/// Settings for building a [`crate::DomainChecker`].
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Paid-metrics API key. `None` means heuristic only.
    pub provider_api_key: Option<String>,
    /// Override for the provider's API host.
    pub provider_base_url: Option<String>,
    pub page_timeout: Duration,
    pub load_timeout: Duration,
    pub provider_timeout: Duration,
    pub user_agent: String,
    pub batch: BatchConfig,
    /// Score unreachable domains with random placeholders instead of
    /// reporting an error.
    pub degraded_fallback: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            provider_api_key: None,
            provider_base_url: None,
            page_timeout: Duration::from_secs(10),
            load_timeout: Duration::from_secs(5),
            provider_timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            batch: BatchConfig::default(),
            degraded_fallback: false,
        }
    }
}

impl CheckerConfig {
    /// Set the paid-metrics key, ignoring blank values.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.provider_api_key = key.filter(|k| !k.trim().is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::default();
        assert_eq!(config.batch.group_size, 3);
        assert_eq!(config.batch.pause, Duration::from_millis(2000));
        assert_eq!(config.page_timeout, Duration::from_secs(10));
        assert_eq!(config.load_timeout, Duration::from_secs(5));
        assert!(config.provider_api_key.is_none());
        assert!(!config.degraded_fallback);
    }

    #[test]
    fn test_blank_api_key_ignored() {
        let config = CheckerConfig::default().with_api_key(Some("   ".to_string()));
        assert!(config.provider_api_key.is_none());
        let config = CheckerConfig::default().with_api_key(Some("abc".to_string()));
        assert_eq!(config.provider_api_key.as_deref(), Some("abc"));
    }
}
