//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! List-valued columns hold JSON arrays; timestamps are RFC 3339 strings.

use crate::index::Document;
use crate::ranking::RankingWeights;
use crate::scheduler::{CrawlJob, JobId, ScheduleType};
use crate::state::JobStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::SumiError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage").finish_non_exhaustive()
    }
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SumiError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SumiError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SumiError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Raw column values of a `documents` row
struct DocumentRow {
    id: String,
    url: String,
    title: String,
    meta_description: String,
    headings: String,
    content: String,
    outbound_links: String,
    depth: u32,
    fetched_at: String,
    content_length: i64,
}

const DOCUMENT_COLUMNS: &str = "id, url, title, meta_description, headings, content, \
     outbound_links, depth, fetched_at, content_length";

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            meta_description: row.get(3)?,
            headings: row.get(4)?,
            content: row.get(5)?,
            outbound_links: row.get(6)?,
            depth: row.get(7)?,
            fetched_at: row.get(8)?,
            content_length: row.get(9)?,
        })
    }

    fn into_document(self) -> StorageResult<Document> {
        Ok(Document {
            id: self.id,
            url: self.url,
            title: self.title,
            meta_description: self.meta_description,
            headings: serde_json::from_str(&self.headings)?,
            content: self.content,
            outbound_links: serde_json::from_str(&self.outbound_links)?,
            depth: self.depth,
            fetched_at: parse_timestamp(&self.fetched_at)?,
            content_length: usize::try_from(self.content_length).map_err(|_| {
                StorageError::CorruptRecord(format!(
                    "negative content_length {}",
                    self.content_length
                ))
            })?,
        })
    }
}

/// Raw column values of a `jobs` row
struct JobRow {
    id: JobId,
    name: String,
    seed_urls: String,
    schedule_type: String,
    schedule_time: String,
    max_pages: u32,
    max_depth: u32,
    delay_seconds: f64,
    allowed_domains: String,
    status: String,
    last_run_at: Option<String>,
    next_due_at: Option<String>,
    pages_crawled_in_run: u32,
    created_at: String,
}

const JOB_COLUMNS: &str = "id, name, seed_urls, schedule_type, schedule_time, max_pages, \
     max_depth, delay_seconds, allowed_domains, status, last_run_at, next_due_at, \
     pages_crawled_in_run, created_at";

impl JobRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            seed_urls: row.get(2)?,
            schedule_type: row.get(3)?,
            schedule_time: row.get(4)?,
            max_pages: row.get(5)?,
            max_depth: row.get(6)?,
            delay_seconds: row.get(7)?,
            allowed_domains: row.get(8)?,
            status: row.get(9)?,
            last_run_at: row.get(10)?,
            next_due_at: row.get(11)?,
            pages_crawled_in_run: row.get(12)?,
            created_at: row.get(13)?,
        })
    }

    fn into_job(self) -> StorageResult<CrawlJob> {
        let schedule_type = ScheduleType::from_db_string(&self.schedule_type).ok_or_else(|| {
            StorageError::CorruptRecord(format!("unknown schedule type '{}'", self.schedule_type))
        })?;
        let status = JobStatus::from_db_string(&self.status).ok_or_else(|| {
            StorageError::CorruptRecord(format!("unknown job status '{}'", self.status))
        })?;

        Ok(CrawlJob {
            id: self.id,
            name: self.name,
            seed_urls: serde_json::from_str(&self.seed_urls)?,
            schedule_type,
            schedule_time: self.schedule_time,
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            delay_seconds: self.delay_seconds,
            allowed_domains: serde_json::from_str(&self.allowed_domains)?,
            status,
            last_run_at: self.last_run_at.as_deref().map(parse_timestamp).transpose()?,
            next_due_at: self.next_due_at.as_deref().map(parse_timestamp).transpose()?,
            pages_crawled_in_run: self.pages_crawled_in_run,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_timestamp(s: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptRecord(format!("bad timestamp '{}': {}", s, e)))
}

impl Storage for SqliteStorage {
    // ===== Documents =====

    fn save_document(&mut self, document: &Document) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO documents
             (id, url, title, meta_description, headings, content, outbound_links,
              depth, fetched_at, content_length)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                document.id,
                document.url,
                document.title,
                document.meta_description,
                serde_json::to_string(&document.headings)?,
                document.content,
                serde_json::to_string(&document.outbound_links)?,
                document.depth,
                document.fetched_at.to_rfc3339(),
                document.content_length as i64,
            ],
        )?;
        Ok(())
    }

    fn delete_document(&mut self, document_id: &str) -> StorageResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1", params![document_id])?;
        Ok(deleted > 0)
    }

    fn load_documents(&self) -> StorageResult<Vec<Document>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM documents ORDER BY id", DOCUMENT_COLUMNS))?;

        let rows = stmt
            .query_map([], DocumentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    // ===== Crawl Jobs =====

    fn save_job(&mut self, job: &CrawlJob) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO jobs
             (id, name, seed_urls, schedule_type, schedule_time, max_pages, max_depth,
              delay_seconds, allowed_domains, status, last_run_at, next_due_at,
              pages_crawled_in_run, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                job.id,
                job.name,
                serde_json::to_string(&job.seed_urls)?,
                job.schedule_type.to_db_string(),
                job.schedule_time,
                job.max_pages,
                job.max_depth,
                job.delay_seconds,
                serde_json::to_string(&job.allowed_domains)?,
                job.status.to_db_string(),
                job.last_run_at.map(|t| t.to_rfc3339()),
                job.next_due_at.map(|t| t.to_rfc3339()),
                job.pages_crawled_in_run,
                job.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_job(&mut self, job_id: JobId) -> StorageResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM jobs WHERE id = ?1", params![job_id])?;
        Ok(deleted > 0)
    }

    fn load_jobs(&self) -> StorageResult<Vec<CrawlJob>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM jobs ORDER BY id", JOB_COLUMNS))?;

        let rows = stmt
            .query_map([], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    // ===== Ranking Weights =====

    fn save_ranking_weights(&mut self, weights: &RankingWeights) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM ranking_weights", [])?;
        for (name, value) in weights.iter() {
            tx.execute(
                "INSERT INTO ranking_weights (name, value) VALUES (?1, ?2)",
                params![name, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn load_ranking_weights(&self) -> StorageResult<Option<RankingWeights>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, value FROM ranking_weights")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut weights = RankingWeights::default();
        for (name, value) in rows {
            if weights.set(&name, value).is_err() {
                tracing::warn!("Ignoring stored ranking weight {} = {}", name, value);
            }
        }
        Ok(Some(weights))
    }
}
