//! State module for crawl jobs and hosts
//!
//! # Components
//!
//! - `JobStatus`: lifecycle of a crawl job (idle, running, completed, failed)
//! - `HostThrottle`: per-host request spacing within a crawl run
//! - `DomainState`: the request timeline kept for each host

mod host_throttle;
mod job_status;

// Re-export main types
pub use host_throttle::{DomainState, HostThrottle};
pub use job_status::JobStatus;
