//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - HTML content extraction and link discovery
//! - The per-run URL frontier
//! - Run coordination across a worker pool

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;

pub use coordinator::{Crawler, RunControl, RunReport};
pub use extractor::{extract, ExtractionError};
pub use fetcher::{
    build_http_client, is_text_content_type, FetchError, FetchOutcome, Fetcher, OpenGate,
    RequestGate,
};
pub use frontier::{Frontier, FrontierEntry, Rejection, VisitOutcome};
