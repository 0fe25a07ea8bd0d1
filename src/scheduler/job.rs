//! Crawl job definitions

use crate::state::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a crawl job
pub type JobId = i64;

/// How often a job runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    /// Runs only when triggered with `run_now`
    Manual,
    /// Every hour
    Hourly,
    /// Every day at `schedule_time` (UTC)
    #[default]
    Daily,
    /// Every seven days at `schedule_time` (UTC)
    Weekly,
}

impl ScheduleType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            _ => None,
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_db_string())
    }
}

impl FromStr for ScheduleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_string(&s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown schedule type '{}'", s))
    }
}

/// What a caller submits to define a crawl job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub seed_urls: Vec<String>,
    #[serde(default)]
    pub schedule_type: ScheduleType,
    /// "HH:MM" in UTC; ignored by manual and hourly jobs
    #[serde(default = "default_schedule_time")]
    pub schedule_time: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Seconds between requests to one host; the crawler default when absent
    #[serde(default)]
    pub delay_seconds: Option<f64>,
    /// Domain patterns (`example.com`, `*.example.com`); empty means any domain
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

fn default_schedule_time() -> String {
    "02:00".to_string()
}

fn default_max_pages() -> u32 {
    100
}

fn default_max_depth() -> u32 {
    3
}

impl JobSpec {
    /// Creates a daily job at 02:00 with 100 pages and depth 3
    pub fn new<S: Into<String>>(name: S, seed_urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            seed_urls,
            schedule_type: ScheduleType::default(),
            schedule_time: default_schedule_time(),
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            delay_seconds: None,
            allowed_domains: Vec::new(),
        }
    }
}

/// A registered crawl job and its run state
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlJob {
    pub id: JobId,
    pub name: String,
    pub seed_urls: Vec<String>,
    pub schedule_type: ScheduleType,
    pub schedule_time: String,
    pub max_pages: u32,
    pub max_depth: u32,
    pub delay_seconds: f64,
    pub allowed_domains: Vec<String>,
    pub status: JobStatus,
    pub last_run_at: Option<DateTime<Utc>>,
    /// None for manual jobs
    pub next_due_at: Option<DateTime<Utc>>,
    pub pages_crawled_in_run: u32,
    pub created_at: DateTime<Utc>,
}

/// Answer to a request to run a job immediately
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunRequest {
    Accepted,
    AlreadyRunning,
    NotFound,
}
