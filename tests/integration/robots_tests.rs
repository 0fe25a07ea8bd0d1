//! Robots cache behavior against a mock server

use std::sync::Arc;
use std::time::Duration;
use sumi_search::robots::RobotsCache;
use tokio::task::JoinSet;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

async fn mount_robots(server: &MockServer, body: &str, delay: Duration, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .set_delay(delay),
        )
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_lookups_fetch_robots_once() {
    let server = MockServer::start().await;
    mount_robots(
        &server,
        "User-agent: *\nDisallow: /private\n",
        Duration::from_millis(200),
        1,
    )
    .await;

    let cache = Arc::new(RobotsCache::new(reqwest::Client::new(), 24));
    let mut lookups = JoinSet::new();
    for i in 0..8 {
        let cache = cache.clone();
        let target = if i % 2 == 0 {
            url(&server, "/public")
        } else {
            url(&server, "/private/page")
        };
        lookups.spawn(async move { (i, cache.allowed(&target, "TestBot").await) });
    }

    while let Some(joined) = lookups.join_next().await {
        let (i, allowed) = joined.unwrap();
        assert_eq!(allowed, i % 2 == 0);
    }
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_slow_host_does_not_block_other_hosts() {
    let slow = MockServer::start().await;
    let fast = MockServer::start().await;
    mount_robots(&slow, "User-agent: *\nAllow: /\n", Duration::from_secs(2), 1).await;
    mount_robots(&fast, "User-agent: *\nDisallow: /\n", Duration::ZERO, 1).await;

    let cache = Arc::new(RobotsCache::new(reqwest::Client::new(), 24));
    let slow_lookup = {
        let cache = cache.clone();
        let target = url(&slow, "/");
        tokio::spawn(async move { cache.allowed(&target, "TestBot").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let fast_answer = tokio::time::timeout(
        Duration::from_millis(500),
        cache.allowed(&url(&fast, "/"), "TestBot"),
    )
    .await
    .expect("unrelated host answered while another fetch was pending");
    assert!(!fast_answer);
    assert!(slow_lookup.await.unwrap());
}

#[tokio::test]
async fn test_stale_rules_are_refetched_on_next_access() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /old\n", Duration::ZERO, 2).await;

    let cache = RobotsCache::with_ttl(reqwest::Client::new(), chrono::Duration::milliseconds(100));
    let target = url(&server, "/page");

    assert!(cache.allowed(&target, "TestBot").await);
    // Still fresh: served from the cache
    assert!(cache.allowed(&target, "TestBot").await);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(cache.allowed(&target, "TestBot").await);
}
