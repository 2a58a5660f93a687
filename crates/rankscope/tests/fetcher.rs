//! HTTP fetcher behavior against local mock servers.
//!
//! The mock servers speak plain HTTP only, so the HTTPS attempt always
//! fails and the fallback path is exercised.

use rankscope::{CheckError, HttpFetcher, PageSource, SpeedClass, DEFAULT_USER_AGENT};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(
        DEFAULT_USER_AGENT,
        Duration::from_secs(5),
        Duration::from_secs(2),
    )
}

fn host(server: &MockServer) -> String {
    server.address().to_string()
}

#[tokio::test]
async fn test_http_fallback_marks_no_ssl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Plain</title>"))
        .mount(&server)
        .await;

    let page = fetcher().fetch_page(&host(&server)).await.unwrap();
    assert!(!page.meta.has_ssl);
    assert!(page.meta.fallback);
    assert_eq!(page.meta.status, 200);
    assert_eq!(page.meta.content_length, 20);
    assert!(page.url.starts_with("http://"));
    assert_eq!(page.body, "<title>Plain</title>");
}

#[tokio::test]
async fn test_error_status_on_both_attempts_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = fetcher().fetch_page(&host(&server)).await.unwrap_err();
    assert!(matches!(err, CheckError::DomainUnreachable { .. }));
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let err = fetcher().fetch_page("127.0.0.1:1").await.unwrap_err();
    match err {
        CheckError::DomainUnreachable { domain, reason } => {
            assert_eq!(domain, "127.0.0.1:1");
            assert!(!reason.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_load_time_unknown_without_https() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let tech = fetcher().measure_load(&host(&server)).await;
    assert_eq!(tech.speed_class, SpeedClass::Unknown);
    assert_eq!(tech.load_time_ms, 0);
}
