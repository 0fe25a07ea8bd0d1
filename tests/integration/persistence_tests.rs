//! State surviving an engine restart

use crate::support::{manual_job, mount_page, page, test_config};
use sumi_search::config::Config;
use sumi_search::{JobStatus, RankingWeights, ScheduleType, SearchEngine};
use tempfile::TempDir;
use wiremock::MockServer;

fn file_config(dir: &TempDir) -> Config {
    let mut config = test_config();
    config.storage.database_path = dir.path().join("sumi.db").display().to_string();
    config
}

#[tokio::test]
async fn test_index_is_rebuilt_on_open() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        page("Lighthouse keeper", "notes on lenses", &["/fog".to_string()]),
    )
    .await;
    mount_page(&server, "/fog", page("Fog horns", "lighthouse signals", &[])).await;

    let dir = tempfile::tempdir().unwrap();
    let (job_id, before) = {
        let engine = SearchEngine::open(file_config(&dir)).unwrap();
        let job_id = engine
            .submit_crawl_job(manual_job("coast", &server.uri(), 1))
            .unwrap();
        engine.run_job(job_id).await.unwrap();
        (job_id, engine.search("lighthouse", 10))
    };
    assert_eq!(before.len(), 2);

    let engine = SearchEngine::open(file_config(&dir)).unwrap();
    assert_eq!(engine.index_stats().unwrap().document_count, 2);

    let after = engine.search("lighthouse", 10);
    let urls = |r: &[sumi_search::SearchResult]| r.iter().map(|r| r.url.clone()).collect::<Vec<_>>();
    assert_eq!(urls(&after), urls(&before));

    let job = engine.job(job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.pages_crawled_in_run, 2);
}

#[tokio::test]
async fn test_jobs_and_weights_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let job_id = {
        let engine = SearchEngine::open(file_config(&dir)).unwrap();
        let mut spec = manual_job("weekly", "https://example.com/", 2);
        spec.schedule_type = ScheduleType::Weekly;
        spec.schedule_time = "03:30".to_string();
        spec.allowed_domains = vec!["*.example.com".to_string()];
        let job_id = engine.submit_crawl_job(spec).unwrap();

        let mut weights = RankingWeights::default();
        weights.freshness = 0.25;
        engine.set_ranking_weights(weights).unwrap();
        job_id
    };

    let engine = SearchEngine::open(file_config(&dir)).unwrap();
    let job = engine.job(job_id).unwrap();
    assert_eq!(job.schedule_type, ScheduleType::Weekly);
    assert_eq!(job.schedule_time, "03:30");
    assert_eq!(job.allowed_domains, vec!["*.example.com"]);
    assert_eq!(job.max_depth, 2);
    assert!(job.next_due_at.is_some());
    assert_eq!(engine.ranking_weights().freshness, 0.25);

    engine.remove_job(job_id).unwrap();
    drop(engine);

    let engine = SearchEngine::open(file_config(&dir)).unwrap();
    assert!(engine.jobs().is_empty());
}

#[tokio::test]
async fn test_removed_document_stays_removed_after_restart() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        page("Harbour", "boats and tides", &["/old".to_string()]),
    )
    .await;
    mount_page(&server, "/old", page("Old pier", "tides of the past", &[])).await;
    let old_url = format!("{}/old", server.uri());

    let dir = tempfile::tempdir().unwrap();
    {
        let engine = SearchEngine::open(file_config(&dir)).unwrap();
        let job_id = engine
            .submit_crawl_job(manual_job("harbour", &server.uri(), 1))
            .unwrap();
        engine.run_job(job_id).await.unwrap();
        assert_eq!(engine.search("tides", 10).len(), 2);

        assert!(engine.remove_document(&old_url).unwrap());
        assert!(!engine.remove_document(&old_url).unwrap());
        assert_eq!(engine.search("tides", 10).len(), 1);
    }

    let engine = SearchEngine::open(file_config(&dir)).unwrap();
    assert_eq!(engine.index_stats().unwrap().document_count, 1);
    let hits = engine.search("tides", 10);
    assert_eq!(hits.len(), 1);
    assert_ne!(hits[0].url, old_url);
}
