//! Checker orchestration tests with in-memory page sources and providers.

use async_trait::async_trait;
use rankscope::{
    BatchConfig, CheckError, CheckResult, CheckStatus, Confidence, DomainChecker, ExternalMetrics,
    FetchedPage, FixedJitter, MetricValue, MetricsProvider, PageSource, ResponseMeta,
    ResultSource, SpeedClass, TechFeatures,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const PAGE: &str = r#"<html><head><title>A reasonably long title</title>
<meta name="description" content="short"></head>
<body><h1>Hi</h1><a href="/">home</a></body></html>"#;

/// Serves the same page for every domain except those listed as down.
struct StubPages {
    down: Vec<&'static str>,
    fetches: AtomicUsize,
}

impl StubPages {
    fn new(down: Vec<&'static str>) -> Self {
        Self {
            down,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageSource for StubPages {
    async fn fetch_page(&self, domain: &str) -> CheckResult<FetchedPage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.down.contains(&domain) {
            return Err(CheckError::DomainUnreachable {
                domain: domain.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(FetchedPage {
            url: format!("https://{domain}"),
            body: PAGE.to_string(),
            meta: ResponseMeta {
                status: 200,
                content_length: PAGE.len() as u64,
                has_ssl: true,
                fallback: false,
            },
        })
    }

    async fn measure_load(&self, domain: &str) -> TechFeatures {
        if self.down.contains(&domain) {
            TechFeatures::unknown()
        } else {
            TechFeatures::measured(1200)
        }
    }
}

struct StubProvider {
    result: CheckResult<ExternalMetrics>,
}

#[async_trait]
impl MetricsProvider for StubProvider {
    fn name(&self) -> &str {
        "stub-metrics"
    }

    async fn fetch_metrics(&self, _domain: &str) -> CheckResult<ExternalMetrics> {
        self.result.clone()
    }
}

fn metrics(domain_trust: u32, backlinks: &str) -> ExternalMetrics {
    ExternalMetrics {
        domain_trust,
        page_trust: 5,
        backlinks: backlinks.to_string(),
        referring_domains: "40".to_string(),
        organic_traffic: 0,
    }
}

fn checker(pages: Arc<StubPages>) -> DomainChecker {
    DomainChecker::new(pages)
        .with_jitter(Arc::new(FixedJitter(0)))
        .with_batch(BatchConfig {
            group_size: 3,
            pause: Duration::from_millis(2000),
        })
}

#[tokio::test(start_paused = true)]
async fn test_batch_isolates_failures() {
    let pages = Arc::new(StubPages::new(vec!["down.example"]));
    let results = checker(pages)
        .check_many(&["one.example", "down.example", "three.example"])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, CheckStatus::Success);
    assert_eq!(results[1].status, CheckStatus::Error);
    assert_eq!(results[2].status, CheckStatus::Success);

    assert_eq!(results[1].domain, "down.example");
    assert_eq!(
        results[1].error.as_deref(),
        Some("Cannot access domain: connection refused")
    );
    assert_eq!(results[1].domain_rating, None);

    // Siblings are scored exactly as they would be alone.
    assert_eq!(results[0].domain_rating, results[2].domain_rating);
    assert_eq!(results[0].backlinks, results[2].backlinks);
}

#[tokio::test(start_paused = true)]
async fn test_batch_pauses_only_between_groups() {
    let pages = Arc::new(StubPages::new(vec![]));
    let domains: Vec<String> = (1..=7).map(|i| format!("site{i}.example")).collect();

    let start = Instant::now();
    let results = checker(pages.clone()).check_many(&domains).await;
    let elapsed = start.elapsed();

    assert_eq!(results.len(), 7);
    assert_eq!(pages.fetches.load(Ordering::SeqCst), 7);
    // Three groups (3 + 3 + 1), two pauses.
    assert!(elapsed >= Duration::from_millis(4000), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(6000), "elapsed {elapsed:?}");

    let order: Vec<_> = results.iter().map(|r| r.domain.clone()).collect();
    assert_eq!(order, domains);
}

#[tokio::test(start_paused = true)]
async fn test_single_group_has_no_pause() {
    let pages = Arc::new(StubPages::new(vec![]));
    let start = Instant::now();
    checker(pages)
        .check_many(&["a.example", "b.example", "c.example"])
        .await;
    assert!(start.elapsed() < Duration::from_millis(2000));
}

#[tokio::test]
async fn test_heuristic_result_fields() {
    let pages = Arc::new(StubPages::new(vec![]));
    let r = checker(pages).check("www.fine.example").await;

    assert_eq!(r.domain, "fine.example");
    assert_eq!(r.source, ResultSource::Basic);
    // 20 + 15 ssl + 10 title + 5 h1 + 5 medium speed
    assert_eq!(r.domain_rating, Some(55));
    assert_eq!(r.backlinks, Some(MetricValue::Count(350)));
    assert_eq!(r.referring_domains, Some(MetricValue::Count(30)));
    assert_eq!(r.page_speed, Some(SpeedClass::Medium));
    assert_eq!(r.confidence, Some(Confidence::Estimated));
}

#[tokio::test]
async fn test_degraded_fallback_scores_unreachable_domain() {
    let pages = Arc::new(StubPages::new(vec!["down.example"]));
    let r = checker(pages)
        .with_degraded_fallback(true)
        .check("down.example")
        .await;

    assert_eq!(r.status, CheckStatus::Success);
    assert_eq!(r.confidence, Some(Confidence::Degraded));
    assert_eq!(r.domain_rating, Some(10));
    assert_eq!(r.backlinks, Some(MetricValue::Count(100)));
    assert_eq!(r.page_speed, Some(SpeedClass::Unknown));
    assert_eq!(
        r.organic_traffic,
        Some(MetricValue::Text("Est: 1K-5K/month".to_string()))
    );
}

#[tokio::test]
async fn test_usable_provider_metrics_win() {
    let pages = Arc::new(StubPages::new(vec![]));
    let provider = StubProvider {
        result: Ok(metrics(31, "2.4K")),
    };
    let r = checker(pages.clone())
        .with_provider(Arc::new(provider))
        .check("paid.example")
        .await;

    assert_eq!(r.source, ResultSource::Provider("stub-metrics".to_string()));
    assert_eq!(r.domain_trust, Some(31));
    assert_eq!(r.backlinks, Some(MetricValue::Text("2.4K".to_string())));
    assert_eq!(r.domain_rating, None);
    assert_eq!(pages.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_trivial_provider_metrics_fall_back() {
    let pages = Arc::new(StubPages::new(vec![]));
    let provider = StubProvider {
        result: Ok(metrics(0, "0")),
    };
    let r = checker(pages)
        .with_provider(Arc::new(provider))
        .check("empty.example")
        .await;

    assert_eq!(r.source, ResultSource::Basic);
    assert!(r.domain_rating.is_some());
    assert_eq!(r.domain_trust, None);
}

#[tokio::test]
async fn test_provider_error_falls_back() {
    let pages = Arc::new(StubPages::new(vec![]));
    let provider = StubProvider {
        result: Err(CheckError::ExternalProvider {
            provider: "stub-metrics".to_string(),
            reason: "500".to_string(),
        }),
    };
    let r = checker(pages)
        .with_provider(Arc::new(provider))
        .check("flaky.example")
        .await;

    assert_eq!(r.status, CheckStatus::Success);
    assert_eq!(r.source, ResultSource::Basic);
}
