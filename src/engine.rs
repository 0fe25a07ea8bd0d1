//! Engine facade
//!
//! `SearchEngine` wires the scheduler, the crawler, the index and the query
//! engine together and is the surface callers use. It is cheap to clone;
//! clones share all state.

use crate::config::{validate, Config};
use crate::crawler::{Crawler, Fetcher, RunControl, RunReport};
use crate::index::{Field, IndexStats, Indexer};
use crate::query::{QueryEngine, SearchResult};
use crate::ranking::RankingWeights;
use crate::robots::RobotsCache;
use crate::scheduler::{CrawlJob, JobId, JobScheduler, JobSpec, RunRequest};
use crate::storage::{shared, SharedStorage, SqliteStorage, Storage};
use crate::url::{document_id, normalize_url};
use crate::{Result, SumiError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A crawl-index-rank search engine
#[derive(Clone)]
pub struct SearchEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: Arc<Config>,
    indexer: Arc<Indexer>,
    query: QueryEngine,
    scheduler: Mutex<JobScheduler>,
    crawler: Crawler,
    storage: Option<SharedStorage>,
    runs: Mutex<HashMap<JobId, Arc<RunControl>>>,
}

impl SearchEngine {
    /// Opens the engine on the database named in the config
    ///
    /// Jobs, documents and ranking weights are loaded from the database and
    /// the inverted index is rebuilt from the stored documents. Weights saved
    /// with `set_ranking_weights` take precedence over the config file.
    pub fn open(config: Config) -> Result<Self> {
        validate(&config)?;
        let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
        Self::build(config, Some(shared(storage)))
    }

    /// Creates an engine that keeps everything in memory
    pub fn in_memory(config: Config) -> Result<Self> {
        validate(&config)?;
        Self::build(config, None)
    }

    fn build(config: Config, storage: Option<SharedStorage>) -> Result<Self> {
        let config = Arc::new(config);
        let indexer = Arc::new(Indexer::new());
        let mut weights = config.ranking;

        let scheduler = match &storage {
            Some(storage) => {
                let (documents, stored_weights) = {
                    let guard = storage
                        .lock()
                        .map_err(|_| SumiError::Poisoned("storage"))?;
                    (guard.load_documents()?, guard.load_ranking_weights()?)
                };

                let count = documents.len();
                for document in documents {
                    let id = document.id.clone();
                    if let Err(e) = indexer.index(document) {
                        tracing::warn!("Failed to index stored document {}: {}", id, e);
                    }
                }
                tracing::info!("Rebuilt index from {} stored documents", count);

                if let Some(stored) = stored_weights {
                    weights = stored;
                }
                JobScheduler::with_storage(config.crawler.default_delay_secs, storage.clone())?
            }
            None => JobScheduler::new(config.crawler.default_delay_secs),
        };

        let fetcher = Fetcher::new(&config.user_agent, &config.fetcher)?;
        let robots = Arc::new(RobotsCache::new(
            fetcher.client().clone(),
            config.robots.cache_ttl_hours,
        ));
        let crawler = Crawler::new(
            config.clone(),
            fetcher,
            robots,
            indexer.clone(),
            storage.clone(),
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                query: QueryEngine::new(indexer.clone(), weights),
                config,
                indexer,
                scheduler: Mutex::new(scheduler),
                crawler,
                storage,
                runs: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn indexer(&self) -> &Arc<Indexer> {
        &self.inner.indexer
    }

    fn scheduler(&self) -> MutexGuard<'_, JobScheduler> {
        self.inner
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn runs(&self) -> MutexGuard<'_, HashMap<JobId, Arc<RunControl>>> {
        self.inner.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Jobs =====

    /// Registers a crawl job
    pub fn submit_crawl_job(&self, spec: JobSpec) -> Result<JobId> {
        self.scheduler().add_job(spec, Utc::now())
    }

    /// Starts a job in the background
    ///
    /// Must be called from within a tokio runtime.
    pub fn run_job_now(&self, job_id: JobId) -> RunRequest {
        let now = Utc::now();
        let request = self.scheduler().run_now(job_id, now);
        if request == RunRequest::Accepted {
            if let Some(job) = self.job(job_id) {
                self.spawn_run(job);
            }
        }
        request
    }

    /// Runs a job to completion and returns its report
    ///
    /// # Errors
    ///
    /// `SumiError::JobNotFound` for an unknown id and `SumiError::JobRunning`
    /// when the job already has a run in progress.
    pub async fn run_job(&self, job_id: JobId) -> Result<RunReport> {
        let request = self.scheduler().run_now(job_id, Utc::now());
        match request {
            RunRequest::NotFound => Err(SumiError::JobNotFound(job_id)),
            RunRequest::AlreadyRunning => Err(SumiError::JobRunning(job_id)),
            RunRequest::Accepted => {
                let job = self.job(job_id).ok_or(SumiError::JobNotFound(job_id))?;
                Ok(self.execute(job).await)
            }
        }
    }

    /// Crawls `seed_urls` once and waits for the run to end
    ///
    /// Reuses a registered job with the same seeds and limits, otherwise
    /// registers a manual one.
    pub async fn crawl_and_index(
        &self,
        seed_urls: &[String],
        max_pages: u32,
        max_depth: u32,
    ) -> Result<RunReport> {
        let job_id =
            self.scheduler()
                .find_or_add_manual_job(seed_urls, max_pages, max_depth, Utc::now())?;
        tracing::info!("Crawling {} seed URLs as job {}", seed_urls.len(), job_id);
        self.run_job(job_id).await
    }

    /// Triggers every scheduled job due at `now`, returning their ids
    ///
    /// Must be called from within a tokio runtime.
    pub fn tick(&self, now: DateTime<Utc>) -> Vec<JobId> {
        let triggered = self.scheduler().tick(now);
        triggered
            .into_iter()
            .map(|job| {
                let id = job.id;
                self.spawn_run(job);
                id
            })
            .collect()
    }

    /// Asks a running job to stop; returns false when it is not running
    pub fn cancel_job(&self, job_id: JobId) -> bool {
        match self.runs().get(&job_id) {
            Some(control) => {
                tracing::info!("Cancelling run of job {}", job_id);
                control.cancel();
                true
            }
            None => false,
        }
    }

    /// Unregisters a job, cancelling its run if one is in progress
    pub fn remove_job(&self, job_id: JobId) -> Result<CrawlJob> {
        self.cancel_job(job_id);
        self.scheduler().remove_job(job_id)
    }

    pub fn job(&self, job_id: JobId) -> Option<CrawlJob> {
        self.scheduler().get(job_id).cloned()
    }

    /// All registered jobs, ordered by id
    pub fn jobs(&self) -> Vec<CrawlJob> {
        self.scheduler().jobs()
    }

    fn spawn_run(&self, job: CrawlJob) {
        let engine = self.clone();
        tokio::spawn(async move {
            engine.execute(job).await;
        });
    }

    async fn execute(&self, job: CrawlJob) -> RunReport {
        let control = Arc::new(RunControl::new());
        self.runs().insert(job.id, control.clone());

        let report = self.inner.crawler.run_job(&job, control.clone()).await;

        {
            let mut runs = self.runs();
            if runs.get(&job.id).is_some_and(|c| Arc::ptr_eq(c, &control)) {
                runs.remove(&job.id);
            }
        }
        if let Err(e) = self.scheduler().finish_run(job.id, &report, Utc::now()) {
            tracing::warn!("Could not record the end of job {}: {}", job.id, e);
        }
        report
    }

    // ===== Search =====

    /// Ranked results for a free-text query
    pub fn search(&self, query_text: &str, limit: usize) -> Vec<SearchResult> {
        self.inner.query.search(query_text, limit)
    }

    /// Ranked results matching only inside `fields`
    pub fn search_fields(&self, query_text: &str, limit: usize, fields: &[Field]) -> Vec<SearchResult> {
        self.inner.query.search_fields(query_text, limit, fields)
    }

    /// Query completions for a prefix
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        self.inner.query.suggest(prefix, limit)
    }

    /// Most common title words
    pub fn popular_terms(&self, limit: usize) -> Vec<String> {
        self.inner.query.popular_terms(limit)
    }

    pub fn index_stats(&self) -> Result<IndexStats> {
        self.inner.indexer.stats()
    }

    /// Drops the document for `url` from the index and the document store
    ///
    /// Returns false when the URL was not indexed.
    pub fn remove_document(&self, url: &str) -> Result<bool> {
        let url = normalize_url(url)?;
        let id = document_id(&url);

        let removed = self.inner.indexer.remove(&id)?;
        if let Some(storage) = &self.inner.storage {
            storage
                .lock()
                .map_err(|_| SumiError::Poisoned("storage"))?
                .delete_document(&id)?;
        }
        if removed {
            tracing::info!("Removed document {}", url);
        }
        Ok(removed)
    }

    // ===== Ranking =====

    pub fn ranking_weights(&self) -> RankingWeights {
        self.inner.query.weights()
    }

    /// Replaces the ranking weights and persists them
    ///
    /// Takes effect for queries started afterwards; nothing is re-indexed.
    pub fn set_ranking_weights(&self, weights: RankingWeights) -> Result<()> {
        weights.validate()?;
        if let Some(storage) = &self.inner.storage {
            storage
                .lock()
                .map_err(|_| SumiError::Poisoned("storage"))?
                .save_ranking_weights(&weights)?;
        }
        self.inner.query.set_weights(weights)
    }
}
