//! Reporting of check results
//!
//! This module handles:
//! - Logging each finished URL as it completes
//! - Accumulating the run summary
//! - Writing the markdown report

mod log_reporter;
mod markdown;
mod traits;

pub use log_reporter::{describe, LogReporter};
pub use markdown::{format_markdown_summary, generate_markdown_summary, MarkdownReporter};
pub use traits::{CrawlSummary, OutputError, OutputResult, Reporter, ReportedError};
