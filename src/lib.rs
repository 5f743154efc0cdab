//! Sumi-Check: the per-URL check engine of a recursive link checker
//!
//! This crate turns discovered hyperlink references into absolute, normalized
//! URLs, classifies them against the crawl scope, fetches them within strict
//! size bounds, decides whether the crawl may recurse into their content, and
//! freezes the outcome into a compact snapshot for reporting and caching.

pub mod check;
pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Check operations
///
/// Per-URL problems (bad syntax, unreachable hosts, oversized bodies) are not
/// errors at this level: they are recorded on the URL's result. Only failures
/// that stop the crawl driver surface here.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Refusing to check strict extern URL {url}")]
    StrictExtern { url: String },

    #[error("Check interrupted by user")]
    Interrupted,

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid link pattern: {0}")]
    InvalidPattern(String),
}

/// URL syntax errors
///
/// These are the syntax faults of the URL builder. Their display text is the
/// result message recorded on the offending URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("URL is empty")]
    Empty,

    #[error("URL has unparsable domain name: {0}")]
    UnparsableDomain(String),

    #[error("URL host `{0}' has invalid port")]
    InvalidPort(String),

    #[error("URL has empty hostname")]
    EmptyHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

// Re-export commonly used types
pub use check::{CheckContext, CompactSnapshot, Discovery, UrlRecord};
pub use config::Config;
pub use url::{build_url, BuiltUrl, ScopeDecision, UrlParts};
