//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::index::Document;
use crate::ranking::RankingWeights;
use crate::scheduler::{CrawlJob, JobId};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines the persisted state of the engine: crawl jobs, the
/// document store and the ranking weights. The inverted index itself is not
/// stored; it is rebuilt from the documents.
pub trait Storage {
    // ===== Documents =====

    /// Inserts a document or replaces the one with the same id
    fn save_document(&mut self, document: &Document) -> StorageResult<()>;

    /// Deletes a document; returns true if it existed
    fn delete_document(&mut self, document_id: &str) -> StorageResult<bool>;

    /// Loads every stored document, ordered by id
    fn load_documents(&self) -> StorageResult<Vec<Document>>;

    // ===== Crawl Jobs =====

    /// Inserts a job or replaces the one with the same id
    fn save_job(&mut self, job: &CrawlJob) -> StorageResult<()>;

    /// Deletes a job; returns true if it existed
    fn delete_job(&mut self, job_id: JobId) -> StorageResult<bool>;

    /// Loads every job, ordered by id
    fn load_jobs(&self) -> StorageResult<Vec<CrawlJob>>;

    // ===== Ranking Weights =====

    /// Replaces the stored ranking weights
    fn save_ranking_weights(&mut self, weights: &RankingWeights) -> StorageResult<()>;

    /// Loads stored ranking weights
    ///
    /// Returns None if weights were never saved. Missing names keep their
    /// default values.
    fn load_ranking_weights(&self) -> StorageResult<Option<RankingWeights>>;
}
