//! Shared fixtures for the integration tests

use std::time::Duration;
use sumi_search::config::{parse_config, Config};
use sumi_search::{JobId, JobSpec, JobStatus, ScheduleType, SearchEngine};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A configuration tuned for fast local crawls
pub fn test_config() -> Config {
    parse_config(
        r#"
[crawler]
workers = 2
default-delay-secs = 0.0

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[fetcher]
timeout-secs = 5
max-retries = 0
retry-backoff-ms = 10
"#,
    )
    .expect("valid test config")
}

/// A manual job crawling `seed` to `max_depth` with no per-host delay
pub fn manual_job(name: &str, seed: &str, max_depth: u32) -> JobSpec {
    let mut spec = JobSpec::new(name, vec![seed.to_string()]);
    spec.schedule_type = ScheduleType::Manual;
    spec.max_depth = max_depth;
    spec.delay_seconds = Some(0.0);
    spec
}

/// Serves `body` as an HTML page at `route`
pub async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// Builds a small HTML page
pub fn page(title: &str, body: &str, links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><p>{}</p>{}</body></html>",
        title, body, anchors
    )
}

/// Waits for a background run of `job_id` to finish
pub async fn wait_for_run(engine: &SearchEngine, job_id: JobId) -> JobStatus {
    for _ in 0..200 {
        let status = engine.job(job_id).expect("job exists").status;
        if status != JobStatus::Running {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {} did not finish", job_id);
}
