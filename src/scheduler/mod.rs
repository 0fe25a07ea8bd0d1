//! Crawl job scheduling
//!
//! The scheduler owns the registered jobs and decides when they run. It does
//! not keep a clock of its own: a caller drives it with `tick(now)` (the
//! daemon loop does this on an interval) and the scheduler answers with the
//! jobs that became due.

mod job;
mod schedule;

pub use job::{CrawlJob, JobId, JobSpec, RunRequest, ScheduleType};
pub use schedule::{advance, first_due, parse_schedule_time, period};

use crate::config::validate_domain_pattern;
use crate::crawler::RunReport;
use crate::state::JobStatus;
use crate::storage::{SharedStorage, Storage};
use crate::url::normalize_url;
use crate::{Result, SumiError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Registry of crawl jobs and their schedules
#[derive(Debug)]
pub struct JobScheduler {
    jobs: BTreeMap<JobId, CrawlJob>,
    /// Id for the next job; never reused within a process, even after removal
    next_id: JobId,
    default_delay_secs: f64,
    storage: Option<SharedStorage>,
}

impl JobScheduler {
    /// Creates an empty, in-memory scheduler
    pub fn new(default_delay_secs: f64) -> Self {
        Self {
            jobs: BTreeMap::new(),
            next_id: 1,
            default_delay_secs,
            storage: None,
        }
    }

    /// Creates a scheduler backed by storage, loading the persisted jobs
    ///
    /// Jobs recorded as running belonged to a process that is gone, so they
    /// come back idle.
    pub fn with_storage(default_delay_secs: f64, storage: SharedStorage) -> Result<Self> {
        let loaded = {
            let guard = storage
                .lock()
                .map_err(|_| SumiError::Poisoned("storage"))?;
            guard.load_jobs()?
        };

        let mut scheduler = Self {
            jobs: BTreeMap::new(),
            next_id: 1,
            default_delay_secs,
            storage: Some(storage),
        };

        for mut job in loaded {
            if job.status == JobStatus::Running {
                tracing::warn!("Job {} was interrupted; resetting to idle", job.id);
                job.status = JobStatus::Idle;
                scheduler.persist(&job);
            }
            scheduler.next_id = scheduler.next_id.max(job.id + 1);
            scheduler.jobs.insert(job.id, job);
        }

        tracing::debug!("Loaded {} crawl jobs", scheduler.jobs.len());
        Ok(scheduler)
    }

    /// Validates and registers a new job
    ///
    /// # Errors
    ///
    /// Returns `SumiError::InvalidJob` when `spec` has no name, no seeds,
    /// a seed that cannot be normalized, a zero page budget, a negative or
    /// non-finite delay, a malformed schedule time or a bad domain pattern.
    pub fn add_job(&mut self, spec: JobSpec, now: DateTime<Utc>) -> Result<JobId> {
        let (seed_urls, delay_seconds) = self.validate_spec(&spec)?;
        let time = parse_schedule_time(&spec.schedule_time).ok_or_else(|| {
            SumiError::InvalidJob(format!(
                "schedule time '{}' is not HH:MM",
                spec.schedule_time
            ))
        })?;

        let id = self.next_id;
        let job = CrawlJob {
            id,
            name: spec.name.trim().to_string(),
            seed_urls,
            schedule_type: spec.schedule_type,
            schedule_time: spec.schedule_time.trim().to_string(),
            max_pages: spec.max_pages,
            max_depth: spec.max_depth,
            delay_seconds,
            allowed_domains: spec
                .allowed_domains
                .iter()
                .map(|d| d.trim().to_lowercase())
                .collect(),
            status: JobStatus::Idle,
            last_run_at: None,
            next_due_at: first_due(spec.schedule_type, time, now),
            pages_crawled_in_run: 0,
            created_at: now,
        };

        tracing::info!(
            "Registered job {} ({}, {}, {} seeds)",
            id,
            job.name,
            job.schedule_type,
            job.seed_urls.len()
        );
        self.persist(&job);
        self.jobs.insert(id, job);
        self.next_id += 1;
        Ok(id)
    }

    /// Returns the job crawling exactly `seed_urls` with the same limits,
    /// registering a manual job when there is none
    ///
    /// Seeds are compared after normalization and regardless of order.
    pub fn find_or_add_manual_job(
        &mut self,
        seed_urls: &[String],
        max_pages: u32,
        max_depth: u32,
        now: DateTime<Utc>,
    ) -> Result<JobId> {
        let wanted: BTreeSet<String> = seed_urls
            .iter()
            .filter_map(|seed| normalize_url(seed).ok())
            .map(|url| url.to_string())
            .collect();

        let existing = self.jobs.values().find(|job| {
            job.max_pages == max_pages
                && job.max_depth == max_depth
                && job.seed_urls.iter().cloned().collect::<BTreeSet<_>>() == wanted
        });
        if let Some(job) = existing {
            return Ok(job.id);
        }

        let first = seed_urls.first().map(String::as_str).unwrap_or("");
        let mut spec = JobSpec::new(manual_job_name(first), seed_urls.to_vec());
        spec.schedule_type = ScheduleType::Manual;
        spec.max_pages = max_pages;
        spec.max_depth = max_depth;
        self.add_job(spec, now)
    }

    fn validate_spec(&self, spec: &JobSpec) -> Result<(Vec<String>, f64)> {
        if spec.name.trim().is_empty() {
            return Err(SumiError::InvalidJob("name cannot be empty".to_string()));
        }
        if spec.seed_urls.is_empty() {
            return Err(SumiError::InvalidJob(
                "at least one seed URL is required".to_string(),
            ));
        }
        let mut seeds = Vec::with_capacity(spec.seed_urls.len());
        for seed in &spec.seed_urls {
            let url = normalize_url(seed)
                .map_err(|e| SumiError::InvalidJob(format!("seed '{}': {}", seed, e)))?;
            seeds.push(url.to_string());
        }
        if spec.max_pages == 0 {
            return Err(SumiError::InvalidJob("max_pages must be >= 1".to_string()));
        }
        let delay = spec.delay_seconds.unwrap_or(self.default_delay_secs);
        if !delay.is_finite() || delay < 0.0 {
            return Err(SumiError::InvalidJob(format!(
                "delay_seconds must be a finite value >= 0, got {}",
                delay
            )));
        }
        for pattern in &spec.allowed_domains {
            validate_domain_pattern(pattern.trim())
                .map_err(|e| SumiError::InvalidJob(e.to_string()))?;
        }
        Ok((seeds, delay))
    }

    pub fn get(&self, job_id: JobId) -> Option<&CrawlJob> {
        self.jobs.get(&job_id)
    }

    /// All jobs, ordered by id
    pub fn jobs(&self) -> Vec<CrawlJob> {
        self.jobs.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Unregisters a job
    pub fn remove_job(&mut self, job_id: JobId) -> Result<CrawlJob> {
        let job = self
            .jobs
            .remove(&job_id)
            .ok_or(SumiError::JobNotFound(job_id))?;

        if let Some(storage) = &self.storage {
            match storage.lock() {
                Ok(mut guard) => {
                    if let Err(e) = guard.delete_job(job_id) {
                        tracing::warn!("Failed to delete job {} from storage: {}", job_id, e);
                    }
                }
                Err(_) => tracing::warn!("Storage lock poisoned; job {} not deleted", job_id),
            }
        }

        tracing::info!("Removed job {} ({})", job_id, job.name);
        Ok(job)
    }

    /// Marks a job running so the caller can start it immediately
    ///
    /// Does not touch `next_due_at`: a manual run does not consume the next
    /// scheduled window.
    pub fn run_now(&mut self, job_id: JobId, now: DateTime<Utc>) -> RunRequest {
        let Some(job) = self.jobs.get_mut(&job_id) else {
            return RunRequest::NotFound;
        };
        if !job.status.can_trigger() {
            tracing::debug!("Job {} is already running", job_id);
            return RunRequest::AlreadyRunning;
        }

        Self::start(job, now);
        let job = job.clone();
        self.persist(&job);
        RunRequest::Accepted
    }

    /// Triggers every scheduled job that is due at `now`
    ///
    /// Each triggered job is marked running and its `next_due_at` advanced
    /// past `now`. Running jobs are left alone and stay due.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<CrawlJob> {
        let mut triggered = Vec::new();

        for job in self.jobs.values_mut() {
            let (Some(due), Some(period)) = (job.next_due_at, period(job.schedule_type)) else {
                continue;
            };
            if due > now || !job.status.can_trigger() {
                continue;
            }

            Self::start(job, now);
            job.next_due_at = Some(advance(due, period, now));
            tracing::info!(
                "Job {} due at {}; next run at {:?}",
                job.id,
                due,
                job.next_due_at
            );
            triggered.push(job.clone());
        }

        for job in &triggered {
            self.persist(job);
        }
        triggered
    }

    /// Records the outcome of a run
    pub fn finish_run(
        &mut self,
        job_id: JobId,
        report: &RunReport,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let job = self
            .jobs
            .get_mut(&job_id)
            .ok_or(SumiError::JobNotFound(job_id))?;

        job.status = report.status;
        job.pages_crawled_in_run = report.pages_indexed;
        tracing::info!(
            "Job {} finished {} at {}: {} indexed, {} skipped, {} failed",
            job_id,
            report.status,
            now,
            report.pages_indexed,
            report.pages_skipped,
            report.pages_failed
        );

        let job = job.clone();
        self.persist(&job);
        Ok(())
    }

    fn start(job: &mut CrawlJob, now: DateTime<Utc>) {
        job.status = JobStatus::Running;
        job.last_run_at = Some(now);
        job.pages_crawled_in_run = 0;
    }

    fn persist(&self, job: &CrawlJob) {
        let Some(storage) = &self.storage else {
            return;
        };
        match storage.lock() {
            Ok(mut guard) => {
                if let Err(e) = guard.save_job(job) {
                    tracing::warn!("Failed to persist job {}: {}", job.id, e);
                }
            }
            Err(_) => tracing::warn!("Storage lock poisoned; job {} not persisted", job.id),
        }
    }
}

fn manual_job_name(seed: &str) -> String {
    const MAX_SEED_CHARS: usize = 50;
    if seed.chars().count() > MAX_SEED_CHARS {
        let head: String = seed.chars().take(MAX_SEED_CHARS).collect();
        format!("Manual crawl - {}...", head)
    } else {
        format!("Manual crawl - {}", seed)
    }
}
