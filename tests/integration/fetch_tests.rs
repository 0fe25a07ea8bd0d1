//! Fetcher behavior against a mock server

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use sumi_search::config::{FetcherConfig, UserAgentConfig};
use sumi_search::crawler::{FetchError, FetchOutcome, Fetcher, RequestGate};
use sumi_search::state::HostThrottle;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn fetcher(max_retries: u32, max_body_bytes: usize) -> Fetcher {
    let config = FetcherConfig {
        timeout_secs: 5,
        connect_timeout_secs: 5,
        max_retries,
        retry_backoff_ms: 10,
        max_body_bytes,
    };
    Fetcher::new(&user_agent(), &config).unwrap()
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

/// Spaces requests through a host throttle and records what it admitted
struct SpacingGate {
    throttle: HostThrottle,
    delay: Duration,
    refuse_prefix: Option<String>,
    admitted: Mutex<Vec<(String, Instant)>>,
}

impl SpacingGate {
    fn new(delay: Duration) -> Self {
        Self {
            throttle: HostThrottle::new(),
            delay,
            refuse_prefix: None,
            admitted: Mutex::new(Vec::new()),
        }
    }

    fn admitted(&self) -> Vec<(String, Instant)> {
        self.admitted.lock().unwrap().clone()
    }
}

impl RequestGate for SpacingGate {
    fn admit(&self, url: &Url) -> impl Future<Output = bool> + Send {
        async move {
            if let Some(prefix) = &self.refuse_prefix {
                if url.path().starts_with(prefix.as_str()) {
                    return false;
                }
            }
            let host = format!("{}:{}", url.host_str().unwrap_or(""), url.port().unwrap_or(80));
            self.throttle.wait_turn(&host, self.delay).await;
            self.admitted
                .lock()
                .unwrap()
                .push((url.path().to_string(), Instant::now()));
            true
        }
    }
}

#[tokio::test]
async fn test_fetch_page_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header(
            "user-agent",
            user_agent().header_value().as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>hello</p>", "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    match fetcher(0, 1024).fetch(&url(&server, "/page")).await.unwrap() {
        FetchOutcome::Page {
            status,
            body,
            content_type,
            final_url,
        } => {
            assert_eq!(status, 200);
            assert_eq!(body, "<p>hello</p>");
            assert!(content_type.starts_with("text/html"));
            assert_eq!(final_url, url(&server, "/page"));
        }
        other => panic!("expected a page, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retries_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>ok</p>", "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = fetcher(2, 1024).fetch(&url(&server, "/flaky")).await;
    assert!(matches!(outcome, Ok(FetchOutcome::Page { .. })));
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let outcome = fetcher(2, 1024).fetch(&url(&server, "/down")).await;
    assert!(matches!(outcome, Err(FetchError::Status(500))));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = fetcher(2, 1024).fetch(&url(&server, "/gone")).await;
    assert!(matches!(outcome, Err(FetchError::Status(404))));
}

#[tokio::test]
async fn test_non_text_response_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 64], "application/pdf"))
        .mount(&server)
        .await;

    match fetcher(0, 1024).fetch(&url(&server, "/doc.pdf")).await.unwrap() {
        FetchOutcome::Skipped { content_type } => assert_eq!(content_type, "application/pdf"),
        other => panic!("expected skip, got {:?}", other),
    }
}

#[tokio::test]
async fn test_body_is_truncated_at_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("x".repeat(10_000), "text/plain"))
        .mount(&server)
        .await;

    match fetcher(0, 2048).fetch(&url(&server, "/big")).await.unwrap() {
        FetchOutcome::Page { body, .. } => assert_eq!(body.len(), 2048),
        other => panic!("expected a page, got {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_reports_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>moved</p>", "text/html"))
        .mount(&server)
        .await;

    match fetcher(0, 1024).fetch(&url(&server, "/old")).await.unwrap() {
        FetchOutcome::Page { final_url, .. } => assert_eq!(final_url, url(&server, "/new")),
        other => panic!("expected a page, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retries_wait_for_host_turn() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>ok</p>", "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    // The backoff (10ms) is far shorter than the host delay
    let delay = Duration::from_millis(300);
    let gate = SpacingGate::new(delay);
    let outcome = fetcher(2, 1024)
        .fetch_with(&url(&server, "/flaky"), &gate)
        .await;
    assert!(matches!(outcome, Ok(FetchOutcome::Page { .. })));

    let admitted = gate.admitted();
    assert_eq!(admitted.len(), 2);
    // Both instants are taken just after the throttle released the request
    assert!(admitted[1].1 - admitted[0].1 >= delay - Duration::from_millis(20));
}

#[tokio::test]
async fn test_every_redirect_hop_passes_the_gate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/middle"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/middle"))
        .respond_with(ResponseTemplate::new(307).insert_header("location", "/blocked/end"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blocked/end"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>secret</p>", "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let mut gate = SpacingGate::new(Duration::ZERO);
    gate.refuse_prefix = Some("/blocked".to_string());
    let outcome = fetcher(0, 1024)
        .fetch_with(&url(&server, "/start"), &gate)
        .await;

    assert!(matches!(outcome, Err(FetchError::Refused(ref target)) if target.ends_with("/blocked/end")));
    let paths: Vec<String> = gate.admitted().into_iter().map(|(p, _)| p).collect();
    assert_eq!(paths, vec!["/start", "/middle"]);
}

#[tokio::test]
async fn test_redirect_loop_is_cut_off() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&server)
        .await;

    let outcome = fetcher(0, 1024).fetch(&url(&server, "/loop")).await;
    assert!(matches!(outcome, Err(FetchError::TooManyRedirects(_))));
}
