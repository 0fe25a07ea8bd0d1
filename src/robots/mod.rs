//! Robots.txt handling module
//!
//! This module fetches, parses and caches robots.txt rules per host. The cache
//! is shared by every crawl run in the process; entries expire after the
//! configured TTL and are refetched lazily on next access.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use crate::url::host_key;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Largest Crawl-delay honored, in seconds; longer values are clamped
pub const MAX_CRAWL_DELAY_SECS: u64 = 120;

/// Process-wide robots.txt cache
///
/// At most one robots.txt fetch is in flight per host. Callers for other hosts
/// never wait on it.
#[derive(Debug)]
pub struct RobotsCache {
    client: Client,
    ttl: chrono::Duration,
    entries: Mutex<HashMap<String, Arc<CachedRobots>>>,
    fetch_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl RobotsCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for robots.txt requests
    /// * `ttl_hours` - How long fetched rules stay fresh
    pub fn new(client: Client, ttl_hours: u64) -> Self {
        // Capped at roughly a century so the conversion cannot overflow
        let ttl_hours = ttl_hours.min(876_000) as i64;
        Self::with_ttl(client, chrono::Duration::hours(ttl_hours))
    }

    /// Creates an empty cache whose entries stay fresh for `ttl`
    pub fn with_ttl(client: Client, ttl: chrono::Duration) -> Self {
        Self {
            client,
            ttl,
            entries: Mutex::new(HashMap::new()),
            fetch_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Checks if a URL may be fetched by the given user agent
    ///
    /// URLs without a host are never allowed.
    pub async fn allowed(&self, url: &Url, user_agent: &str) -> bool {
        match self.rules_for(url).await {
            Some(rules) => rules.content.is_allowed(url.as_str(), user_agent),
            None => false,
        }
    }

    /// Returns the effective delay between requests to the URL's host
    ///
    /// This is the larger of the job's own delay and the host's Crawl-delay,
    /// with the Crawl-delay capped at [`MAX_CRAWL_DELAY_SECS`].
    pub async fn delay_for(&self, url: &Url, user_agent: &str, job_delay_secs: f64) -> Duration {
        let crawl_delay = match self.rules_for(url).await {
            Some(rules) => rules.content.crawl_delay(user_agent).unwrap_or(0.0),
            None => 0.0,
        };
        let cap = Duration::from_secs(MAX_CRAWL_DELAY_SECS);
        let crawl_delay = Duration::try_from_secs_f64(crawl_delay).map_or(cap, |d| d.min(cap));
        let job_delay = Duration::try_from_secs_f64(job_delay_secs).unwrap_or(Duration::ZERO);
        job_delay.max(crawl_delay)
    }

    /// Stores rules for a host directly, replacing any cached entry
    pub fn insert(&self, host: &str, rules: ParsedRobots) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(host.to_string(), Arc::new(CachedRobots::new(rules)));
        }
    }

    /// Number of hosts with cached rules
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if no host has cached rules
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets fresh rules for the URL's host, fetching them if needed
    async fn rules_for(&self, url: &Url) -> Option<Arc<CachedRobots>> {
        let host = host_key(url)?;

        if let Some(entry) = self.fresh_entry(&host) {
            return Some(entry);
        }

        let host_lock = self.fetch_lock(&host)?;
        let _guard = host_lock.lock().await;

        // Another task may have refreshed the entry while we waited
        if let Some(entry) = self.fresh_entry(&host) {
            return Some(entry);
        }

        let rules = self.fetch(url).await;
        let entry = Arc::new(CachedRobots::new(rules));
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(host, entry.clone());
        }
        Some(entry)
    }

    fn fresh_entry(&self, host: &str) -> Option<Arc<CachedRobots>> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(host)
            .filter(|entry| !entry.is_stale(self.ttl))
            .cloned()
    }

    fn fetch_lock(&self, host: &str) -> Option<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self.fetch_locks.lock().ok()?;
        Some(locks.entry(host.to_string()).or_default().clone())
    }

    /// Fetches robots.txt for the URL's origin
    ///
    /// Network errors and non-2xx responses yield an allow-all rule set.
    async fn fetch(&self, url: &Url) -> ParsedRobots {
        let robots_url = match url.join("/robots.txt") {
            Ok(u) => u,
            Err(_) => return ParsedRobots::allow_all(),
        };

        tracing::debug!("Fetching robots.txt: {}", robots_url);

        let response = match self.client.get(robots_url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("robots.txt fetch failed for {}: {}", robots_url, e);
                return ParsedRobots::allow_all();
            }
        };

        if !response.status().is_success() {
            tracing::debug!(
                "robots.txt at {} returned {}, allowing all",
                robots_url,
                response.status()
            );
            return ParsedRobots::allow_all();
        }

        match response.text().await {
            Ok(body) => ParsedRobots::from_content(&body),
            Err(e) => {
                tracing::debug!("robots.txt body unreadable at {}: {}", robots_url, e);
                ParsedRobots::allow_all()
            }
        }
    }
}
