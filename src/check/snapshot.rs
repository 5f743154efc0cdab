//! Immutable outcome of a finished check

use crate::check::diagnostics::Warning;
use crate::check::record::Discovery;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Compact, serializable view of a checked URL
///
/// Produced once per record when its check is over. It is what reporters
/// print and what the result cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactSnapshot {
    pub(crate) valid: bool,
    #[serde(rename = "extern")]
    pub(crate) is_extern: bool,
    pub(crate) result: String,
    pub(crate) warnings: Vec<Warning>,
    pub(crate) name: String,
    pub(crate) title: String,
    pub(crate) parent_url: Option<String>,
    pub(crate) base_ref: Option<String>,
    pub(crate) base_url: String,
    pub(crate) url: Option<String>,
    pub(crate) domain: String,
    pub(crate) checktime: f64,
    pub(crate) dltime: f64,
    pub(crate) size: i64,
    pub(crate) info: Vec<String>,
    pub(crate) line: Option<u32>,
    pub(crate) column: Option<u32>,
    pub(crate) page: Option<u32>,
    pub(crate) cache_url: String,
    pub(crate) content_type: String,
    pub(crate) level: u32,
    pub(crate) modified: Option<DateTime<Utc>>,
}

impl CompactSnapshot {
    /// Re-issues a cached outcome for another occurrence of the same URL
    ///
    /// The outcome fields are kept; the fields describing where the link was
    /// found are taken from `occurrence`.
    pub fn for_occurrence(&self, occurrence: &Discovery) -> Self {
        Self {
            name: occurrence.name.clone(),
            parent_url: occurrence.parent_url.clone(),
            base_ref: occurrence.base_ref.clone(),
            base_url: occurrence.reference.trim().to_string(),
            line: occurrence.line,
            column: occurrence.column,
            page: occurrence.page,
            level: occurrence.level,
            ..self.clone()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_extern(&self) -> bool {
        self.is_extern
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parent_url(&self) -> Option<&str> {
        self.parent_url.as_deref()
    }

    pub fn base_ref(&self) -> Option<&str> {
        self.base_ref.as_deref()
    }

    /// The reference as found, trimmed
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The normalized URL, absent after a syntax fault
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Authority of the URL
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Seconds spent checking
    pub fn checktime(&self) -> f64 {
        self.checktime
    }

    /// Seconds spent downloading, -1 when nothing was downloaded
    pub fn dltime(&self) -> f64 {
        self.dltime
    }

    /// Content size in bytes, -1 when unknown
    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn info(&self) -> &[String] {
        &self.info
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn column(&self) -> Option<u32> {
        self.column
    }

    pub fn page(&self) -> Option<u32> {
        self.page
    }

    pub fn cache_url(&self) -> &str {
        &self.cache_url
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }
}

/// A finished snapshot for tests outside this module
#[cfg(test)]
pub(crate) fn sample_snapshot(url: &str, valid: bool, result: &str) -> CompactSnapshot {
    CompactSnapshot {
        valid,
        is_extern: false,
        result: result.to_string(),
        warnings: Vec::new(),
        name: "B".to_string(),
        title: "b".to_string(),
        parent_url: Some("http://x.test/".to_string()),
        base_ref: None,
        base_url: "/b".to_string(),
        url: Some(url.to_string()),
        domain: "x.test".to_string(),
        checktime: 0.25,
        dltime: -1.0,
        size: -1,
        info: Vec::new(),
        line: Some(3),
        column: Some(7),
        page: None,
        cache_url: url.to_string(),
        content_type: "text/html".to_string(),
        level: 1,
        modified: None,
    }
}
