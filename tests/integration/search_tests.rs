//! Ranking and suggestions over crawled pages

use crate::support::{manual_job, mount_page, test_config};
use sumi_search::{RankingWeights, SearchEngine};
use wiremock::MockServer;

/// Crawls a site where "ferris" appears in one title and in another body
async fn crawled_engine() -> (MockServer, SearchEngine) {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Index</title></head><body>
           <a href="/crab">crab</a> <a href="/blog">blog</a> <a href="/misc">misc</a>
           </body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/crab",
        r#"<html><head><title>Ferris the crab</title>
           <meta name="description" content="Mascot of the language"></head>
           <body><p>A friendly orange crustacean.</p></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/blog",
        r#"<html><head><title>Weekly notes</title></head>
           <body><p>This week we talked about many things, and ferris came up once.</p></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/misc",
        r#"<html><head><title>Ferrous metals</title></head>
           <body><p>Iron and steel.</p></body></html>"#
            .to_string(),
    )
    .await;

    let engine = SearchEngine::in_memory(test_config()).unwrap();
    let job_id = engine
        .submit_crawl_job(manual_job("site", &server.uri(), 1))
        .unwrap();
    engine.run_job(job_id).await.unwrap();
    assert_eq!(engine.index_stats().unwrap().document_count, 4);

    (server, engine)
}

#[tokio::test]
async fn test_title_match_ranks_first() {
    let (server, engine) = crawled_engine().await;

    let results = engine.search("ferris", 10);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, format!("{}/crab", server.uri()));
    assert_eq!(results[1].url, format!("{}/blog", server.uri()));
    assert!(results[0].score > results[1].score);
    assert!(results[0].breakdown.title > 0.0);
    assert_eq!(results[1].breakdown.title, 0.0);
    assert!(results[1].snippet.contains("ferris came up"));
}

#[tokio::test]
async fn test_search_is_deterministic() {
    let (_server, engine) = crawled_engine().await;

    let first: Vec<_> = engine.search("ferris crab notes", 10);
    let second: Vec<_> = engine.search("ferris crab notes", 10);
    let urls = |r: &[sumi_search::SearchResult]| r.iter().map(|r| r.url.clone()).collect::<Vec<_>>();
    assert_eq!(urls(&first), urls(&second));
}

#[tokio::test]
async fn test_empty_queries_return_nothing() {
    let (_server, engine) = crawled_engine().await;

    assert!(engine.search("", 10).is_empty());
    assert!(engine.search("  \t ", 10).is_empty());
    assert!(engine.search("the of and", 10).is_empty());
    assert!(engine.search("zeppelin", 10).is_empty());
}

#[tokio::test]
async fn test_weights_change_ranking_without_reindex() {
    let (server, engine) = crawled_engine().await;

    let mut weights = RankingWeights::default();
    weights.title = 0.0;
    weights.meta_description = 0.0;
    weights.url = 0.0;
    weights.content = 10.0;
    engine.set_ranking_weights(weights).unwrap();

    let results = engine.search("ferris", 10);
    assert_eq!(results[0].url, format!("{}/blog", server.uri()));
}

#[tokio::test]
async fn test_suggest_and_popular_terms() {
    let (_server, engine) = crawled_engine().await;

    let suggestions = engine.suggest("fer", 5);
    assert!(suggestions.contains(&"ferris".to_string()));
    assert!(suggestions.contains(&"ferrous".to_string()));

    engine.search("ferris", 10);
    assert_eq!(engine.suggest("fer", 1), vec!["ferris".to_string()]);

    let popular = engine.popular_terms(10);
    assert!(popular.contains(&"ferris".to_string()));
    assert!(popular.iter().all(|w| w.chars().count() > 3));
}
