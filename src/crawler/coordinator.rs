//! Crawl run coordination
//!
//! A run seeds a fresh frontier from the job, then a fixed pool of workers
//! pulls entries from it until it is exhausted or the run is cancelled. Each
//! entry goes through the fetcher, the extractor and the indexer. Every
//! request the fetcher sends, redirect hops and retries included, first
//! passes the robots check, the job's domain scope and the host throttle.

use crate::config::Config;
use crate::crawler::extractor::extract;
use crate::crawler::fetcher::{FetchError, FetchOutcome, Fetcher, RequestGate};
use crate::crawler::frontier::{Frontier, FrontierEntry, VisitOutcome};
use crate::index::{Document, Indexer};
use crate::robots::RobotsCache;
use crate::scheduler::{CrawlJob, JobId};
use crate::state::{HostThrottle, JobStatus};
use crate::storage::{SharedStorage, Storage};
use crate::url::{extract_domain, host_key, normalize_url, DomainScope};
use crate::{Result, SumiError};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use url::Url;

/// Cancellation flag and wakeup channel for one run
#[derive(Debug, Default)]
pub struct RunControl {
    cancelled: AtomicBool,
    notify: Notify,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops handing out new entries; in-flight fetches still complete
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn wake_all(&self) {
        self.notify.notify_waiters();
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub pages_indexed: u32,
    pub pages_skipped: u32,
    pub pages_failed: u32,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// State shared by the workers of one run
struct RunState {
    job: CrawlJob,
    scope: DomainScope,
    frontier: Mutex<Frontier>,
    throttle: HostThrottle,
    control: Arc<RunControl>,
}

impl RunState {
    fn frontier(&self) -> Result<MutexGuard<'_, Frontier>> {
        self.frontier
            .lock()
            .map_err(|_| SumiError::Poisoned("frontier"))
    }
}

enum Step {
    Work(FrontierEntry),
    Wait,
    Done,
}

/// Executes crawl runs against a shared index
#[derive(Clone)]
pub struct Crawler {
    config: Arc<Config>,
    fetcher: Fetcher,
    robots: Arc<RobotsCache>,
    indexer: Arc<Indexer>,
    storage: Option<SharedStorage>,
}

impl Crawler {
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `config` - Worker count, user agent and default delay
    /// * `fetcher` - HTTP fetcher
    /// * `robots` - Process-wide robots.txt cache
    /// * `indexer` - Index receiving extracted documents
    /// * `storage` - Optional document store persisted alongside the index
    pub fn new(
        config: Arc<Config>,
        fetcher: Fetcher,
        robots: Arc<RobotsCache>,
        indexer: Arc<Indexer>,
        storage: Option<SharedStorage>,
    ) -> Self {
        Self {
            config,
            fetcher,
            robots,
            indexer,
            storage,
        }
    }

    fn user_agent(&self) -> &str {
        &self.config.user_agent.crawler_name
    }

    /// Runs a job to completion
    ///
    /// The run ends `Completed` when the frontier drains, the page budget is
    /// spent or the run is cancelled, and `Failed` when no seed is usable or
    /// a worker dies.
    pub async fn run_job(&self, job: &CrawlJob, control: Arc<RunControl>) -> RunReport {
        let started_at = Utc::now();
        tracing::info!("Starting run of job {} ({})", job.id, job.name);

        let scope = DomainScope::new(&job.allowed_domains);
        let mut frontier = Frontier::new(job.id, job.max_depth, job.max_pages, scope.clone());
        if frontier.seed(&job.seed_urls) == 0 {
            tracing::warn!("Job {} has no usable seed URLs", job.id);
            return RunReport {
                job_id: job.id,
                status: JobStatus::Failed,
                pages_indexed: 0,
                pages_skipped: 0,
                pages_failed: 0,
                cancelled: false,
                started_at,
                finished_at: Utc::now(),
            };
        }

        let run = Arc::new(RunState {
            job: job.clone(),
            scope,
            frontier: Mutex::new(frontier),
            throttle: HostThrottle::new(),
            control,
        });

        let worker_count = self.config.crawler.workers.max(1);
        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let crawler = self.clone();
            let run = run.clone();
            workers.spawn(async move { crawler.worker(run, worker_id).await });
        }

        let mut worker_failed = false;
        while let Some(joined) = workers.join_next().await {
            let error = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            tracing::error!("Worker of job {} failed: {}", job.id, error);
            if !worker_failed {
                worker_failed = true;
                run.control.cancel();
            }
        }

        let cancelled = run.control.is_cancelled() && !worker_failed;
        let (pages_indexed, pages_skipped, pages_failed) = match run.frontier() {
            Ok(f) => (f.pages_indexed(), f.pages_skipped(), f.pages_failed()),
            Err(_) => (0, 0, 0),
        };
        let status = if worker_failed {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };

        tracing::info!(
            "Run of job {} {}: {} indexed, {} skipped, {} failed{}",
            job.id,
            status,
            pages_indexed,
            pages_skipped,
            pages_failed,
            if cancelled { " (cancelled)" } else { "" }
        );

        RunReport {
            job_id: job.id,
            status,
            pages_indexed,
            pages_skipped,
            pages_failed,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn worker(self, run: Arc<RunState>, worker_id: u32) -> Result<()> {
        tracing::trace!("Worker {} of job {} started", worker_id, run.job.id);

        loop {
            // Created before inspecting the frontier so no wakeup is missed
            let notified = run.control.notify.notified();

            let step = {
                let mut frontier = run.frontier()?;
                if run.control.is_cancelled() {
                    Step::Done
                } else if let Some(entry) = frontier.next() {
                    Step::Work(entry)
                } else if frontier.is_exhausted() {
                    Step::Done
                } else {
                    Step::Wait
                }
            };

            match step {
                Step::Work(entry) => {
                    let url = entry.url.clone();
                    let outcome = self.process(&run, entry).await;
                    run.frontier()?.mark_visited(&url, outcome);
                    run.control.wake_all();
                }
                Step::Wait => notified.await,
                Step::Done => {
                    run.control.wake_all();
                    return Ok(());
                }
            }
        }
    }

    /// Crawls one frontier entry and reports how it ended
    async fn process(&self, run: &RunState, entry: FrontierEntry) -> VisitOutcome {
        let url = &entry.url;
        let gate = RunGate { crawler: self, run };

        tracing::debug!("Fetching {} (depth {})", url, entry.depth);
        let (body, final_url) = match self.fetcher.fetch_with(url, &gate).await {
            Ok(FetchOutcome::Page { body, final_url, .. }) => (body, final_url),
            Ok(FetchOutcome::Skipped { content_type }) => {
                tracing::debug!("Skipping {}: content type {}", url, content_type);
                return VisitOutcome::Skipped;
            }
            Err(FetchError::Refused(target)) => {
                tracing::debug!("Not fetching {}: {} is disallowed or out of scope", url, target);
                return VisitOutcome::Skipped;
            }
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                return VisitOutcome::Failed;
            }
        };

        let document_url = match self.resolve_redirect(run, url, &final_url) {
            Ok(Some(u)) => u,
            Ok(None) => return VisitOutcome::Skipped,
            Err(e) => {
                tracing::warn!("Dropping {}: {}", url, e);
                return VisitOutcome::Failed;
            }
        };

        let mut document = match extract(&document_url, &body) {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!("No document for {}: {}", url, e);
                return VisitOutcome::Skipped;
            }
        };
        document.depth = entry.depth;

        if let Err(e) = self.offer_links(run, &document) {
            tracing::warn!("Could not queue links of {}: {}", url, e);
        }

        self.index(document)
    }

    /// Picks the URL a fetched page is indexed under
    ///
    /// A redirect to a new URL marks that URL visited for the run. A redirect
    /// to a URL this run already handled yields None.
    fn resolve_redirect(&self, run: &RunState, requested: &Url, final_url: &Url) -> Result<Option<Url>> {
        let final_url = match normalize_url(final_url.as_str()) {
            Ok(u) => u,
            Err(_) => return Ok(Some(requested.clone())),
        };
        if &final_url == requested {
            return Ok(Some(final_url));
        }

        let mut frontier = run.frontier()?;
        if frontier.is_visited(&final_url) {
            tracing::debug!("{} redirected to already visited {}", requested, final_url);
            return Ok(None);
        }
        frontier.mark_alias(&final_url);
        Ok(Some(final_url))
    }

    /// Offers a document's links one level deeper
    fn offer_links(&self, run: &RunState, document: &Document) -> Result<()> {
        if document.depth >= run.job.max_depth {
            return Ok(());
        }

        let next_depth = document.depth + 1;
        let mut accepted = 0;
        {
            let mut frontier = run.frontier()?;
            for link in &document.outbound_links {
                match frontier.offer(link, next_depth) {
                    Ok(()) => accepted += 1,
                    Err(reason) => tracing::trace!("Not queueing {}: {}", link, reason),
                }
            }
        }

        if accepted > 0 {
            run.control.wake_all();
        }
        Ok(())
    }

    fn index(&self, document: Document) -> VisitOutcome {
        let url = document.url.clone();
        let stored = document.clone();

        match self.indexer.index(document) {
            Ok(outcome) => {
                tracing::debug!("Indexed {} ({:?})", url, outcome);
            }
            Err(e) => {
                tracing::warn!("Index update for {} dropped: {}", url, e);
                return VisitOutcome::Failed;
            }
        }

        if let Some(storage) = &self.storage {
            let saved = storage
                .lock()
                .map_err(|_| SumiError::Poisoned("storage"))
                .and_then(|mut s| s.save_document(&stored).map_err(SumiError::from));
            if let Err(e) = saved {
                tracing::warn!("Failed to persist document {}: {}", url, e);
            }
        }

        VisitOutcome::Indexed
    }
}

/// Admits a request only if robots.txt and the job scope allow it, then
/// waits for the host's turn
struct RunGate<'a> {
    crawler: &'a Crawler,
    run: &'a RunState,
}

impl RequestGate for RunGate<'_> {
    fn admit(&self, url: &Url) -> impl Future<Output = bool> + Send {
        async move {
            let (Some(host), Some(domain)) = (host_key(url), extract_domain(url)) else {
                return false;
            };
            if !self.run.scope.allows(&domain) {
                return false;
            }

            let robots = &self.crawler.robots;
            let user_agent = self.crawler.user_agent();
            if !robots.allowed(url, user_agent).await {
                return false;
            }

            let delay = robots
                .delay_for(url, user_agent, self.run.job.delay_seconds)
                .await;
            self.run.throttle.wait_turn(&host, delay).await;
            true
        }
    }
}
