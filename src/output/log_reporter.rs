//! Per-URL reporting through the log

use crate::check::CompactSnapshot;
use crate::output::traits::{CrawlSummary, OutputResult, Reporter};

/// Writes one log line per checked URL
///
/// Valid URLs are logged at `info` (or `debug` when `errors_only`), invalid
/// ones at `warn`, each followed by its warnings.
#[derive(Debug, Default)]
pub struct LogReporter {
    errors_only: bool,
}

impl LogReporter {
    pub fn new(errors_only: bool) -> Self {
        Self { errors_only }
    }
}

/// One-line description of a checked URL
pub fn describe(snapshot: &CompactSnapshot) -> String {
    let url = snapshot.url().unwrap_or_else(|| snapshot.base_url());
    let mut line = format!("{} [{}]", url, snapshot.result());
    if let Some(parent) = snapshot.parent_url() {
        line.push_str(&format!(" in {}", parent));
        if let (Some(row), Some(column)) = (snapshot.line(), snapshot.column()) {
            line.push_str(&format!(":{}:{}", row, column));
        }
    }
    if snapshot.size() >= 0 {
        line.push_str(&format!(" ({} bytes, {:.3}s)", snapshot.size(), snapshot.checktime()));
    }
    line
}

impl Reporter for LogReporter {
    fn log_url(&mut self, snapshot: &CompactSnapshot) -> OutputResult<()> {
        let line = describe(snapshot);
        if !snapshot.is_valid() {
            tracing::warn!("Invalid: {}", line);
        } else if self.errors_only {
            tracing::debug!("Valid: {}", line);
        } else {
            tracing::info!("Valid: {}", line);
        }
        for warning in snapshot.warnings() {
            tracing::warn!("  {}: {}", warning.tag, warning.message);
        }
        for info in snapshot.info() {
            tracing::debug!("  info: {}", info);
        }
        Ok(())
    }

    fn finish(&mut self, summary: &CrawlSummary) -> OutputResult<()> {
        tracing::info!(
            "Checked {} URLs: {} valid, {} invalid, {} warnings, {} served from cache",
            summary.total_urls,
            summary.valid_urls,
            summary.invalid_urls,
            summary.total_warnings,
            summary.cached_urls
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::sample_snapshot;

    #[test]
    fn test_describe() {
        let snapshot = sample_snapshot("http://x.test/b", false, "404 Not Found");
        assert_eq!(
            describe(&snapshot),
            "http://x.test/b [404 Not Found] in http://x.test/:3:7"
        );
    }

    #[test]
    fn test_log_reporter_never_fails() {
        let mut reporter = LogReporter::new(false);
        let snapshot = sample_snapshot("http://x.test/b", true, "200 OK");
        assert!(reporter.log_url(&snapshot).is_ok());
        assert!(reporter.finish(&CrawlSummary::new()).is_ok());
    }
}
