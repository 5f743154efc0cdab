//! Storage module for check outcomes
//!
//! This module handles:
//! - The result cache interface and its in-memory implementation
//! - SQLite persistence of outcomes across runs
//! - Run tracking

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryCache;
pub use sqlite::SqliteStorage;
pub use traits::{ResultCache, RunLog, StorageError, StorageResult};

use std::path::Path;

/// Opens the configured result cache
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file, `None` for an in-memory cache
///
/// # Returns
///
/// * `Ok(Box<dyn ResultCache>)` - The cache
/// * `Err(StorageError)` - Failed to open the database
pub fn open_cache(path: Option<&Path>) -> StorageResult<Box<dyn ResultCache>> {
    match path {
        Some(path) => Ok(Box::new(SqliteStorage::new(path)?)),
        None => Ok(Box::new(MemoryCache::new())),
    }
}

/// Represents a check run in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a check run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Interrupted => "interrupted",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "interrupted" => Some(RunStatus::Interrupted),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::sample_snapshot;

    #[test]
    fn test_run_status_round_trip() {
        for status in [RunStatus::Running, RunStatus::Completed, RunStatus::Interrupted] {
            assert_eq!(RunStatus::from_db_string(status.to_db_string()), Some(status));
        }
        assert_eq!(RunStatus::from_db_string("bogus"), None);
    }

    #[test]
    fn test_open_memory_cache() {
        let mut cache = open_cache(None).unwrap();
        cache
            .put("k", &sample_snapshot("http://x.test/", true, "200 OK"))
            .unwrap();
        assert_eq!(cache.len().unwrap(), 1);
        assert!(cache.get("k").unwrap().is_some());
    }
}
