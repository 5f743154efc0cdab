//! Reporter trait and crawl summary
//!
//! This module defines the trait interface for reporters and the summary
//! accumulated over all checked URLs.

use crate::check::CompactSnapshot;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// An invalid URL as listed in reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub url: String,
    pub parent_url: Option<String>,
    pub result: String,
}

/// Summary statistics for a check run
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    // Run metadata
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,
    pub config_hash: String,

    // Overall statistics
    pub total_urls: u64,
    pub valid_urls: u64,
    pub invalid_urls: u64,
    pub extern_urls: u64,
    pub cached_urls: u64,
    pub total_warnings: u64,
    pub downloaded_bytes: u64,

    // Level breakdown (recursion level -> count)
    pub level_breakdown: HashMap<u32, u64>,

    // Warning tag -> count
    pub warnings_by_tag: HashMap<String, u64>,

    // Invalid URLs in check order
    pub errors: Vec<ReportedError>,
}

impl CrawlSummary {
    /// Creates a new empty crawl summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one finished URL
    ///
    /// # Arguments
    ///
    /// * `snapshot` - The outcome of the URL
    /// * `cached` - Whether the outcome was re-issued from the result cache
    pub fn record(&mut self, snapshot: &CompactSnapshot, cached: bool) {
        self.total_urls += 1;
        if snapshot.is_valid() {
            self.valid_urls += 1;
        } else {
            self.invalid_urls += 1;
            self.errors.push(ReportedError {
                url: snapshot
                    .url()
                    .unwrap_or_else(|| snapshot.base_url())
                    .to_string(),
                parent_url: snapshot.parent_url().map(str::to_string),
                result: snapshot.result().to_string(),
            });
        }
        if snapshot.is_extern() {
            self.extern_urls += 1;
        }
        if cached {
            self.cached_urls += 1;
        }
        self.total_warnings += snapshot.warnings().len() as u64;
        for warning in snapshot.warnings() {
            *self
                .warnings_by_tag
                .entry(warning.tag.to_string())
                .or_insert(0) += 1;
        }
        *self.level_breakdown.entry(snapshot.level()).or_insert(0) += 1;
    }

    /// Whether any invalid URL was found
    pub fn has_errors(&self) -> bool {
        self.invalid_urls > 0
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_urls == 0 {
            return 0.0;
        }
        (self.valid_urls as f64 / self.total_urls as f64) * 100.0
    }

    /// Returns the error rate as a percentage
    pub fn error_rate(&self) -> f64 {
        if self.total_urls == 0 {
            return 0.0;
        }
        (self.invalid_urls as f64 / self.total_urls as f64) * 100.0
    }
}

/// Trait for reporters
///
/// Reporters receive every finished URL in the order the checks complete
/// and the final summary once the run is over.
pub trait Reporter: Send {
    /// Reports one finished URL
    fn log_url(&mut self, snapshot: &CompactSnapshot) -> OutputResult<()>;

    /// Reports the end of the run
    fn finish(&mut self, summary: &CrawlSummary) -> OutputResult<()>;
}
