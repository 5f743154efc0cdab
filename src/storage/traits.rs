//! Result cache trait and error types

use crate::check::CompactSnapshot;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Store of finished check outcomes keyed by cache key
///
/// A hit lets the driver re-issue an outcome for another occurrence of the
/// same URL without checking it again.
pub trait ResultCache: Send {
    /// Looks up the outcome stored for a cache key
    fn get(&self, cache_key: &str) -> StorageResult<Option<CompactSnapshot>>;

    /// Stores an outcome, replacing any previous one of the key
    fn put(&mut self, cache_key: &str, snapshot: &CompactSnapshot) -> StorageResult<()>;

    /// Number of stored outcomes
    fn len(&self) -> StorageResult<usize>;

    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Bookkeeping of check runs
pub trait RunLog {
    /// Creates a new run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Marks a run as finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;
}
