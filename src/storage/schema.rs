//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Sumi-Search database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Recurring crawl job definitions and their run state
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    seed_urls TEXT NOT NULL,
    schedule_type TEXT NOT NULL,
    schedule_time TEXT NOT NULL,
    max_pages INTEGER NOT NULL,
    max_depth INTEGER NOT NULL,
    delay_seconds REAL NOT NULL,
    allowed_domains TEXT NOT NULL,
    status TEXT NOT NULL,
    last_run_at TEXT,
    next_due_at TEXT,
    pages_crawled_in_run INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Document store, one row per normalized URL
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    meta_description TEXT NOT NULL,
    headings TEXT NOT NULL,
    content TEXT NOT NULL,
    outbound_links TEXT NOT NULL,
    depth INTEGER NOT NULL,
    fetched_at TEXT NOT NULL,
    content_length INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_fetched_at ON documents(fetched_at);

-- Ranking weights by name
CREATE TABLE IF NOT EXISTS ranking_weights (
    name TEXT PRIMARY KEY,
    value REAL NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
