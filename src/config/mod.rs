//! Configuration module for Sumi-Search
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_search::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sumi-search.toml")).unwrap();
//! println!("Crawling with {} workers per job", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FetcherConfig, RobotsConfig, SchedulerConfig, StorageConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, config_digest, load_config, load_config_with_hash, parse_config,
};
pub use validation::{validate, validate_domain_pattern};
