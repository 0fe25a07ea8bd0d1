//! End-to-end crawl runs against mock servers

use crate::support::{manual_job, mount_page, page, test_config, wait_for_run};
use std::time::{Duration, Instant};
use sumi_search::url::{document_id, normalize_url};
use sumi_search::{JobStatus, RunRequest, SearchEngine};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn doc_id(url: &str) -> String {
    document_id(&normalize_url(url).unwrap())
}

/// Root links to /a and /b; /a links back to the root
async fn three_page_site() -> MockServer {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        page(
            "Home",
            "Welcome to the test site",
            &[format!("{}/a", base), "/b".to_string()],
        ),
    )
    .await;
    mount_page(&server, "/a", page("Page A", "apples and pears", &[base.clone()])).await;
    mount_page(&server, "/b", page("Page B", "bananas", &[])).await;

    server
}

#[tokio::test]
async fn test_crawl_three_page_site() {
    let server = three_page_site().await;
    let base = server.uri();
    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let job_id = engine
        .submit_crawl_job(manual_job("site", &format!("{}/", base), 1))
        .unwrap();

    let report = engine.run_job(job_id).await.unwrap();

    assert_eq!(report.status, JobStatus::Completed);
    assert_eq!(report.pages_indexed, 3);
    assert!(!report.cancelled);
    assert_eq!(engine.index_stats().unwrap().document_count, 3);

    let indexer = engine.indexer();
    let root = indexer.get(&doc_id(&base)).unwrap().expect("root indexed");
    let a = indexer.get(&doc_id(&format!("{}/a", base))).unwrap().expect("a indexed");
    let b = indexer.get(&doc_id(&format!("{}/b", base))).unwrap().expect("b indexed");
    assert_eq!((root.depth, a.depth, b.depth), (0, 1, 1));
    assert_eq!(a.title, "Page A");

    let job = engine.job(job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.pages_crawled_in_run, 3);
    assert!(job.last_run_at.is_some());
}

#[tokio::test]
async fn test_depth_zero_crawls_only_seed() {
    let server = three_page_site().await;
    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let job_id = engine
        .submit_crawl_job(manual_job("seed only", &server.uri(), 0))
        .unwrap();

    let report = engine.run_job(job_id).await.unwrap();
    assert_eq!(report.pages_indexed, 1);
}

#[tokio::test]
async fn test_page_budget_limits_run() {
    let server = three_page_site().await;
    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let mut spec = manual_job("budget", &server.uri(), 3);
    spec.max_pages = 2;
    let job_id = engine.submit_crawl_job(spec).unwrap();

    let report = engine.run_job(job_id).await.unwrap();
    assert_eq!(report.pages_indexed, 2);
    assert_eq!(engine.index_stats().unwrap().document_count, 2);
}

#[tokio::test]
async fn test_recrawl_replaces_documents() {
    let server = three_page_site().await;
    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let job_id = engine
        .submit_crawl_job(manual_job("site", &server.uri(), 1))
        .unwrap();

    engine.run_job(job_id).await.unwrap();
    let first = engine.index_stats().unwrap();
    engine.run_job(job_id).await.unwrap();
    let second = engine.index_stats().unwrap();

    assert_eq!(first.document_count, 3);
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_robots_disallowed_path_is_never_fetched() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            page("Secret", "classified", &[]),
            "text/html",
        ))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        page(
            "Home",
            "public landing page",
            &["/private/secret".to_string(), "/public".to_string()],
        ),
    )
    .await;
    mount_page(&server, "/public", page("Public", "open content", &[])).await;

    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let job_id = engine
        .submit_crawl_job(manual_job("robots", &base, 2))
        .unwrap();
    let report = engine.run_job(job_id).await.unwrap();

    assert_eq!(report.status, JobStatus::Completed);
    assert_eq!(report.pages_indexed, 2);
    assert!(report.pages_skipped >= 1);
    assert!(engine
        .indexer()
        .get(&doc_id(&format!("{}/private/secret", base)))
        .unwrap()
        .is_none());
    assert!(engine.search("classified", 10).is_empty());
}

#[tokio::test]
async fn test_failed_fetch_does_not_stop_run() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        page("Home", "start", &["/missing".to_string(), "/ok".to_string()]),
    )
    .await;
    mount_page(&server, "/ok", page("Fine", "all good", &[])).await;

    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let job_id = engine
        .submit_crawl_job(manual_job("errors", &base, 1))
        .unwrap();
    let report = engine.run_job(job_id).await.unwrap();

    assert_eq!(report.status, JobStatus::Completed);
    assert_eq!(report.pages_indexed, 2);
    assert_eq!(report.pages_failed, 1);
}

#[tokio::test]
async fn test_out_of_scope_links_are_not_followed() {
    let server = three_page_site().await;
    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let mut spec = manual_job("scoped", &server.uri(), 2);
    spec.allowed_domains = vec!["example.org".to_string()];
    let job_id = engine.submit_crawl_job(spec).unwrap();

    // The seed itself is outside the allowed domains
    let report = engine.run_job(job_id).await.unwrap();
    assert_eq!(report.status, JobStatus::Failed);
    assert_eq!(report.pages_indexed, 0);
}

#[tokio::test]
async fn test_run_job_now_twice() {
    let server = three_page_site().await;
    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let job_id = engine
        .submit_crawl_job(manual_job("twice", &server.uri(), 1))
        .unwrap();

    assert_eq!(engine.run_job_now(job_id), RunRequest::Accepted);
    assert_eq!(engine.run_job_now(job_id), RunRequest::AlreadyRunning);

    assert_eq!(wait_for_run(&engine, job_id).await, JobStatus::Completed);
    assert_eq!(engine.index_stats().unwrap().document_count, 3);
    assert_eq!(engine.run_job_now(job_id), RunRequest::Accepted);
    wait_for_run(&engine, job_id).await;
}

#[tokio::test]
async fn test_tick_starts_due_jobs() {
    let server = three_page_site().await;
    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let mut spec = manual_job("hourly", &server.uri(), 0);
    spec.schedule_type = sumi_search::ScheduleType::Hourly;
    let job_id = engine.submit_crawl_job(spec).unwrap();

    assert!(engine.tick(chrono::Utc::now()).is_empty());

    let later = chrono::Utc::now() + chrono::Duration::hours(2);
    assert_eq!(engine.tick(later), vec![job_id]);
    assert_eq!(wait_for_run(&engine, job_id).await, JobStatus::Completed);
    assert!(engine.job(job_id).unwrap().next_due_at.unwrap() > later);
}

#[tokio::test]
async fn test_redirect_into_disallowed_path_is_not_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/private/page"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            page("Hidden", "classified material", &[]),
            "text/html",
        ))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/", page("Home", "landing", &["/go".to_string()])).await;

    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let job_id = engine
        .submit_crawl_job(manual_job("redirect", &base, 1))
        .unwrap();
    let report = engine.run_job(job_id).await.unwrap();

    assert_eq!(report.pages_indexed, 1);
    assert_eq!(report.pages_skipped, 1);
    assert!(engine
        .indexer()
        .get(&doc_id(&format!("{}/private/page", base)))
        .unwrap()
        .is_none());
    assert!(engine.search("classified", 10).is_empty());
}

#[tokio::test]
async fn test_redirect_out_of_scope_is_not_followed() {
    let server = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    let elsewhere_port = elsewhere.address().port();

    Mock::given(method("GET"))
        .and(path("/away"))
        .respond_with(ResponseTemplate::new(301).insert_header(
            "location",
            format!("http://localhost:{}/landing", elsewhere_port).as_str(),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            page("Elsewhere", "foreign page", &[]),
            "text/html",
        ))
        .expect(0)
        .mount(&elsewhere)
        .await;
    mount_page(&server, "/", page("Home", "landing", &["/away".to_string()])).await;

    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let mut spec = manual_job("scoped redirect", &server.uri(), 1);
    spec.allowed_domains = vec!["127.0.0.1".to_string()];
    let job_id = engine.submit_crawl_job(spec).unwrap();
    let report = engine.run_job(job_id).await.unwrap();

    assert_eq!(report.pages_indexed, 1);
    assert_eq!(report.pages_skipped, 1);
    assert!(engine.search("foreign", 10).is_empty());
}

#[tokio::test]
async fn test_same_host_requests_respect_job_delay() {
    let server = three_page_site().await;
    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let mut spec = manual_job("polite", &server.uri(), 1);
    spec.delay_seconds = Some(0.3);
    let job_id = engine.submit_crawl_job(spec).unwrap();

    let started = Instant::now();
    let report = engine.run_job(job_id).await.unwrap();

    // Three page requests to one host need at least two full delays
    assert_eq!(report.pages_indexed, 3);
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn test_cancel_stops_run_and_keeps_index_whole() {
    let server = MockServer::start().await;
    let base = server.uri();
    let children: Vec<String> = (1..=6).map(|i| format!("/slow/{}", i)).collect();
    mount_page(&server, "/", page("Hub", "links to slow pages", &children)).await;
    for child in &children {
        Mock::given(method("GET"))
            .and(path(child.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(page("Slow", "sluggish content", &[]), "text/html")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
    }

    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let job_id = engine
        .submit_crawl_job(manual_job("cancel", &base, 1))
        .unwrap();

    let run = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run_job(job_id).await })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(engine.cancel_job(job_id));

    let report = run.await.unwrap().unwrap();
    assert!(report.cancelled);
    assert_eq!(report.status, JobStatus::Completed);
    assert!(report.pages_indexed < 7);
    assert!(!engine.cancel_job(job_id));

    // Every counted page is fully indexed and searchable; nothing else is
    let stats = engine.index_stats().unwrap();
    assert_eq!(stats.document_count, report.pages_indexed as usize);
    let slow_hits = engine.search("sluggish", 10);
    assert_eq!(slow_hits.len(), stats.document_count.saturating_sub(1));
    for hit in &slow_hits {
        let doc = engine.indexer().get(&hit.document_id).unwrap().unwrap();
        assert_eq!(doc.title, "Slow");
        assert_eq!(doc.content, "sluggish content");
    }
}

#[tokio::test]
async fn test_crawl_and_index_reuses_matching_job() {
    let server = three_page_site().await;
    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let seeds = vec![server.uri()];

    let first = engine.crawl_and_index(&seeds, 10, 1).await.unwrap();
    assert_eq!(first.status, JobStatus::Completed);
    assert_eq!(first.pages_indexed, 3);
    assert!(!engine.search("bananas", 10).is_empty());

    let second = engine.crawl_and_index(&seeds, 10, 1).await.unwrap();
    assert_eq!(second.job_id, first.job_id);
    assert_eq!(engine.jobs().len(), 1);
    assert_eq!(engine.jobs()[0].schedule_type, sumi_search::ScheduleType::Manual);
}
