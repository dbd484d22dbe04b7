//! SQLite run manifest
//!
//! Records every crawl run (budget outcome, config hash, terminal state)
//! and every document a content store wrote during the run.

use crate::state::{CrawlCounters, SessionState};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageError, StorageResult, StoredDocument};
use crate::storage::{DocumentKind, DocumentRecord, RunRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, seed_url, status,
     pages_crawled, successful_pages, failed_pages, skipped_pages";

/// SQLite-backed manifest of runs and stored documents
pub struct Manifest {
    conn: Connection,
}

impl Manifest {
    /// Opens or creates a manifest
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(Manifest)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory manifest
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Run Management =====

    /// Starts a new run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    pub fn create_run(&mut self, config_hash: &str, seed_url: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, seed_url, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                now,
                config_hash,
                seed_url,
                SessionState::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Stores the terminal state and final counters of a run
    pub fn finish_run(
        &mut self,
        run_id: i64,
        state: SessionState,
        counters: &CrawlCounters,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_crawled = ?3,
             successful_pages = ?4, failed_pages = ?5, skipped_pages = ?6 WHERE id = ?7",
            params![
                state.to_db_string(),
                now,
                counters.pages_crawled,
                counters.successful_pages,
                counters.failed_pages,
                counters.skipped_pages,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::Manifest(format!("run {} not found", run_id)));
        }
        Ok(())
    }

    pub fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::Manifest(format!("run {} not found", run_id)))
    }

    pub fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    /// All runs, newest first
    pub fn list_runs(&self) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs ORDER BY id DESC", RUN_COLUMNS))?;

        let runs = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    // ===== Document Management =====

    pub fn record_document(&mut self, run_id: i64, document: &StoredDocument) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO documents (run_id, url, kind, path, content_hash, bytes, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                document.url,
                document.kind.to_db_string(),
                document.path.to_string_lossy().into_owned(),
                document.content_hash,
                document.bytes as i64,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn documents_for_run(&self, run_id: i64) -> StorageResult<Vec<DocumentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, url, kind, path, content_hash, bytes, stored_at
             FROM documents WHERE run_id = ?1 ORDER BY id",
        )?;

        let documents = stmt
            .query_map(params![run_id], |row| {
                Ok(DocumentRecord {
                    id: row.get(0)?,
                    run_id: row.get(1)?,
                    url: row.get(2)?,
                    kind: DocumentKind::from_db_string(&row.get::<_, String>(3)?)
                        .unwrap_or(DocumentKind::Page),
                    path: row.get(4)?,
                    content_hash: row.get(5)?,
                    bytes: row.get::<_, i64>(6)? as u64,
                    stored_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(documents)
    }

    // ===== Statistics =====

    /// Counts stored documents, optionally restricted to one kind
    pub fn count_documents(&self, kind: Option<DocumentKind>) -> StorageResult<u64> {
        let count: i64 = match kind {
            Some(kind) => self.conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE kind = ?1",
                params![kind.to_db_string()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    pub fn count_unique_urls(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT url) FROM documents",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Total size of all stored documents in bytes
    pub fn total_bytes(&self) -> StorageResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(bytes), 0) FROM documents",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        seed_url: row.get(4)?,
        status: SessionState::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(SessionState::Running),
        counters: CrawlCounters {
            pages_crawled: row.get(6)?,
            successful_pages: row.get(7)?,
            failed_pages: row.get(8)?,
            skipped_pages: row.get(9)?,
        },
    })
}
