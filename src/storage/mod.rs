//! Storage module for persisting engine state
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Crawl job persistence
//! - The document store the index is rebuilt from
//! - Ranking weights

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::SumiError;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Storage shared between the scheduler, the crawler and the engine
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SumiError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SumiError> {
    SqliteStorage::new(path)
}

/// Wraps storage for sharing across tasks
pub fn shared(storage: SqliteStorage) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}
