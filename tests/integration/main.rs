//! Integration tests for Sumi-Search
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! engine end-to-end: crawling, indexing, ranking and persistence.

mod crawl_tests;
mod fetch_tests;
mod persistence_tests;
mod robots_tests;
mod search_tests;
mod support;
