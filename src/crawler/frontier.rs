//! Per-run URL frontier
//!
//! A breadth-first queue of URLs for one crawl job run. Every URL is offered
//! through normalization and the job's limits; a URL is never queued twice and
//! never handed out twice within a run.

use crate::scheduler::JobId;
use crate::url::{extract_domain, normalize_url, DomainScope};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
    pub job_id: JobId,
}

/// Why an offered URL was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InvalidUrl,
    AlreadyVisited,
    AlreadyQueued,
    TooDeep,
    OutOfScope,
    BudgetExhausted,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::InvalidUrl => "invalid URL",
            Self::AlreadyVisited => "already visited",
            Self::AlreadyQueued => "already queued",
            Self::TooDeep => "beyond max depth",
            Self::OutOfScope => "outside job scope",
            Self::BudgetExhausted => "page budget exhausted",
        };
        write!(f, "{}", reason)
    }
}

/// How a handed-out entry ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    /// A document was extracted and indexed
    Indexed,
    /// Fetched but not indexable (non-text, not HTML, disallowed)
    Skipped,
    /// Fetch or indexing failed
    Failed,
}

/// Breadth-first, deduplicating URL queue for one job run
///
/// Handing out an entry moves its URL to the visited set and reserves one
/// unit of the page budget, so concurrent workers never overshoot
/// `max_pages`. Reservations of skipped or failed entries are released.
#[derive(Debug)]
pub struct Frontier {
    job_id: JobId,
    max_depth: u32,
    max_pages: u32,
    scope: DomainScope,
    queue: VecDeque<FrontierEntry>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    in_flight: u32,
    indexed: u32,
    skipped: u32,
    failed: u32,
}

impl Frontier {
    pub fn new(job_id: JobId, max_depth: u32, max_pages: u32, scope: DomainScope) -> Self {
        Self {
            job_id,
            max_depth,
            max_pages,
            scope,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            in_flight: 0,
            indexed: 0,
            skipped: 0,
            failed: 0,
        }
    }

    /// Queues seed URLs at depth 0
    ///
    /// Returns the number of seeds accepted.
    pub fn seed<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter()
            .filter(|url| match self.offer(url.as_ref(), 0) {
                Ok(()) => true,
                Err(reason) => {
                    tracing::warn!("Seed {} rejected: {}", url.as_ref(), reason);
                    false
                }
            })
            .count()
    }

    /// Offers a URL discovered at `depth`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The URL was queued
    /// * `Err(Rejection)` - The URL was not queued, and why
    pub fn offer(&mut self, url: &str, depth: u32) -> Result<(), Rejection> {
        let url = normalize_url(url).map_err(|_| Rejection::InvalidUrl)?;
        let key = url.to_string();

        if self.visited.contains(&key) {
            return Err(Rejection::AlreadyVisited);
        }
        if self.queued.contains(&key) {
            return Err(Rejection::AlreadyQueued);
        }
        if depth > self.max_depth {
            return Err(Rejection::TooDeep);
        }
        let in_scope = extract_domain(&url).map_or(false, |domain| self.scope.allows(&domain));
        if !in_scope {
            return Err(Rejection::OutOfScope);
        }
        if self.indexed >= self.max_pages {
            return Err(Rejection::BudgetExhausted);
        }

        self.queued.insert(key);
        self.queue.push_back(FrontierEntry {
            url,
            depth,
            job_id: self.job_id,
        });
        Ok(())
    }

    /// Hands out the oldest queued entry, if the budget allows
    pub fn next(&mut self) -> Option<FrontierEntry> {
        if self.budget_reserved() {
            return None;
        }

        let entry = self.queue.pop_front()?;
        let key = entry.url.to_string();
        self.queued.remove(&key);
        self.visited.insert(key);
        self.in_flight += 1;
        Some(entry)
    }

    /// Records the end of a handed-out entry
    pub fn mark_visited(&mut self, url: &Url, outcome: VisitOutcome) {
        self.visited.insert(url.to_string());
        self.in_flight = self.in_flight.saturating_sub(1);
        match outcome {
            VisitOutcome::Indexed => self.indexed += 1,
            VisitOutcome::Skipped => self.skipped += 1,
            VisitOutcome::Failed => self.failed += 1,
        }
    }

    /// Marks an additional URL as visited, e.g. the target of a redirect
    pub fn mark_alias(&mut self, url: &Url) {
        let key = url.to_string();
        if self.queued.remove(&key) {
            self.queue.retain(|entry| entry.url.as_str() != key);
        }
        self.visited.insert(key);
    }

    /// Returns true if the URL has been handed out or marked visited
    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Returns true when no more entries will ever be handed out
    ///
    /// This holds once nothing is in flight and either the queue is empty or
    /// the page budget is used up.
    pub fn is_exhausted(&self) -> bool {
        self.in_flight == 0 && (self.queue.is_empty() || self.indexed >= self.max_pages)
    }

    fn budget_reserved(&self) -> bool {
        self.indexed + self.in_flight >= self.max_pages
    }

    pub fn pages_indexed(&self) -> u32 {
        self.indexed
    }

    pub fn pages_skipped(&self) -> u32 {
        self.skipped
    }

    pub fn pages_failed(&self) -> u32 {
        self.failed
    }
}
