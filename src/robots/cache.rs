//! Robots.txt cache entries with a configurable freshness window

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};

/// Robots rules for one host along with when they were fetched
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a new entry stamped with the current time
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the entry is older than `ttl` at the given instant
    pub fn is_stale_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at > ttl
    }

    /// Checks if the entry is older than `ttl` now
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.is_stale_at(Utc::now(), ttl)
    }
}
