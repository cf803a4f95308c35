//! Storage traits and error types

use crate::crawler::CrawlReport;
use crate::review::Review;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence of review snapshots and crawl runs
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed and records the crawl summary
    fn complete_run(&mut self, run_id: i64, report: &CrawlReport) -> StorageResult<()>;

    // ===== Review Snapshots =====

    /// Replaces the stored snapshot with `review`
    ///
    /// Rows without an ID are skipped, so the review should be synced first.
    fn save_review(&mut self, review: &Review) -> StorageResult<()>;

    /// Loads the stored snapshot; an empty database yields an empty review
    fn load_review(&self) -> StorageResult<Review>;

    // ===== Statistics =====

    fn count_works(&self) -> StorageResult<u64>;

    fn count_citations(&self) -> StorageResult<u64>;
}
