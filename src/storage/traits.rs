//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::CrawlResults;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Run {0} has no saved results")]
    NoResults(i64),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `seed_url` - The URL the crawl starts from
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Results =====

    /// Persists a finished crawl under `run_id`
    ///
    /// Replaces anything previously saved for the run. The run is marked
    /// completed, or interrupted if the crawl was stopped early.
    fn save_results(&mut self, run_id: i64, results: &CrawlResults) -> StorageResult<()>;

    /// Reads back the results saved under `run_id`
    fn load_results(&self, run_id: i64) -> StorageResult<CrawlResults>;

    /// Number of extracted pages saved under `run_id`
    fn count_pages(&self, run_id: i64) -> StorageResult<u64>;
}
