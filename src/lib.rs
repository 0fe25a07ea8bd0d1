//! Sumi-Search: a polite crawl-index-rank search engine
//!
//! This crate discovers web pages on a recurring schedule, extracts structured
//! documents from them, maintains a per-field inverted index, and answers ranked
//! full-text queries using a tunable multi-factor scoring model.

pub mod config;
pub mod crawler;
pub mod engine;
pub mod index;
pub mod query;
pub mod ranking;
pub mod robots;
pub mod scheduler;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Search operations
#[derive(Debug, Error)]
pub enum SumiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] crawler::ExtractionError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Concurrent update of document {document_id} could not be applied")]
    IndexConsistency { document_id: String },

    #[error("Crawl job {0} not found")]
    JobNotFound(scheduler::JobId),

    #[error("Crawl job {0} is already running")]
    JobRunning(scheduler::JobId),

    #[error("Invalid crawl job: {0}")]
    InvalidJob(String),

    #[error("Invalid ranking weights: {0}")]
    InvalidWeights(String),

    #[error("Lock poisoned: {0}")]
    Poisoned(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Sumi-Search operations
pub type Result<T> = std::result::Result<T, SumiError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use engine::SearchEngine;
pub use index::{Document, Field, Indexer};
pub use query::SearchResult;
pub use ranking::RankingWeights;
pub use scheduler::{CrawlJob, JobId, JobSpec, RunRequest, ScheduleType};
pub use state::JobStatus;
pub use url::normalize_url;
