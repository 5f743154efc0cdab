//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a check run,
//! including statistics, the invalid links and the warning breakdown.

use crate::check::CompactSnapshot;
use crate::output::traits::{CrawlSummary, OutputResult, Reporter};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Invalid links listed before the report is cut short
const MAX_LISTED_ERRORS: usize = 100;

/// Writes the markdown summary to a file when the run finishes
pub struct MarkdownReporter {
    output_path: PathBuf,
}

impl MarkdownReporter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}

impl Reporter for MarkdownReporter {
    fn log_url(&mut self, _snapshot: &CompactSnapshot) -> OutputResult<()> {
        Ok(())
    }

    fn finish(&mut self, summary: &CrawlSummary) -> OutputResult<()> {
        generate_markdown_summary(summary, &self.output_path)?;
        tracing::info!("Summary written to {}", self.output_path.display());
        Ok(())
    }
}

/// Generates a markdown summary from check statistics
///
/// # Arguments
///
/// * `summary` - The run summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Check Link Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    if !summary.config_hash.is_empty() {
        md.push_str(&format!("- **Config Hash**: {}\n", summary.config_hash));
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Checked URLs**: {}\n", summary.total_urls));
    md.push_str(&format!("- **Valid**: {}\n", summary.valid_urls));
    md.push_str(&format!("- **Invalid**: {}\n", summary.invalid_urls));
    md.push_str(&format!("- **Extern**: {}\n", summary.extern_urls));
    md.push_str(&format!("- **From Cache**: {}\n", summary.cached_urls));
    md.push_str(&format!("- **Warnings**: {}\n", summary.total_warnings));
    md.push_str(&format!(
        "- **Downloaded**: {} bytes\n",
        summary.downloaded_bytes
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        summary.success_rate()
    ));

    if !summary.level_breakdown.is_empty() {
        md.push_str("## Level Breakdown\n\n");
        md.push_str("| Level | URLs |\n");
        md.push_str("|-------|------|\n");

        let mut levels: Vec<_> = summary.level_breakdown.iter().collect();
        levels.sort_by_key(|(level, _)| **level);
        for (level, count) in levels {
            md.push_str(&format!("| {} | {} |\n", level, count));
        }
        md.push('\n');
    }

    if !summary.errors.is_empty() {
        md.push_str("## Invalid Links\n\n");
        md.push_str("| URL | Parent | Result |\n");
        md.push_str("|-----|--------|--------|\n");
        for error in summary.errors.iter().take(MAX_LISTED_ERRORS) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                error.url,
                error.parent_url.as_deref().unwrap_or("-"),
                error.result.replace('|', "\\|")
            ));
        }
        if summary.errors.len() > MAX_LISTED_ERRORS {
            md.push_str(&format!(
                "\n... and {} more\n",
                summary.errors.len() - MAX_LISTED_ERRORS
            ));
        }
        md.push('\n');
    }

    if !summary.warnings_by_tag.is_empty() {
        md.push_str("## Warnings\n\n");
        md.push_str("| Tag | Count |\n");
        md.push_str("|-----|-------|\n");

        let mut tags: Vec<_> = summary.warnings_by_tag.iter().collect();
        tags.sort();
        for (tag, count) in tags {
            md.push_str(&format!("| {} | {} |\n", tag, count));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::sample_snapshot;
    use tempfile::TempDir;

    fn create_test_summary() -> CrawlSummary {
        let mut summary = CrawlSummary::new();
        summary.started_at = "2024-01-01T00:00:00Z".to_string();
        summary.finished_at = Some("2024-01-01T00:01:00Z".to_string());
        summary.duration_seconds = Some(60);
        summary.status = "completed".to_string();
        summary.config_hash = "abc123".to_string();
        summary.record(&sample_snapshot("http://x.test/a", true, "200 OK"), false);
        summary.record(&sample_snapshot("http://x.test/b", false, "404 Not Found"), false);
        summary
    }

    #[test]
    fn test_format_markdown_summary() {
        let markdown = format_markdown_summary(&create_test_summary());

        assert!(markdown.contains("# Sumi-Check Link Report"));
        assert!(markdown.contains("- **Checked URLs**: 2\n"));
        assert!(markdown.contains("- **Invalid**: 1\n"));
        assert!(markdown.contains("- **Success Rate**: 50.00%"));
        assert!(markdown.contains("| 1 | 2 |"));
    }

    #[test]
    fn test_markdown_lists_invalid_links() {
        let markdown = format_markdown_summary(&create_test_summary());

        assert!(markdown.contains("## Invalid Links"));
        assert!(markdown.contains("| http://x.test/b | http://x.test/ | 404 Not Found |"));
        assert!(!markdown.contains("| http://x.test/a |"));
    }

    #[test]
    fn test_markdown_without_errors() {
        let mut summary = CrawlSummary::new();
        summary.status = "completed".to_string();
        let markdown = format_markdown_summary(&summary);
        assert!(!markdown.contains("## Invalid Links"));
        assert!(!markdown.contains("## Warnings"));
    }

    #[test]
    fn test_markdown_reporter_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.md");
        let mut reporter = MarkdownReporter::new(&path);
        reporter.finish(&create_test_summary()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Sumi-Check Link Report"));
    }
}
