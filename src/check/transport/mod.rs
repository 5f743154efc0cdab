//! Per-scheme transports
//!
//! A [`Transport`] opens a [`Connection`] for a URL of its scheme. The
//! connection reports content metadata and hands out the body in bounded
//! chunks. Transports are looked up by scheme in a [`TransportRegistry`].

mod file;
mod http;
mod mailto;

pub use file::FileTransport;
pub use http::{build_http_client, HttpTransport};
pub use mailto::MailtoTransport;

use crate::check::fault::CheckFault;
use crate::config::Config;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Schemes that are recognized but never checked
pub const IGNORED_SCHEMES: &[&str] = &[
    "about",
    "callto",
    "chrome",
    "data",
    "irc",
    "javascript",
    "sms",
    "skype",
    "tel",
    "view-source",
];

pub fn is_ignored_scheme(scheme: &str) -> bool {
    IGNORED_SCHEMES.contains(&scheme)
}

/// An open connection to one URL
#[async_trait]
pub trait Connection: Send {
    /// Raw MIME type, possibly with parameters
    fn content_type(&self) -> Option<String>;

    /// Declared body length in bytes
    fn content_length(&self) -> Option<u64>;

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Status line of a successful connection, e.g. `200 OK`
    fn status(&self) -> Option<String> {
        None
    }

    /// Reads at most `max` bytes, `None` at the end of the body
    async fn read_chunk(&mut self, max: usize) -> Result<Option<Vec<u8>>, CheckFault>;
}

/// Connection capabilities of one scheme family
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Opens a connection; failures are connection faults
    async fn open(&self, url: &Url) -> Result<Box<dyn Connection>, CheckFault>;

    /// Whether documents fetched by this transport may be recursed into
    fn allows_recursion(&self) -> bool {
        true
    }

    /// Whether the site's robots policy permits following links of `url`
    async fn allows_robots(&self, _url: &Url) -> bool {
        true
    }
}

/// Transports keyed by URL scheme
#[derive(Default, Clone)]
pub struct TransportRegistry {
    transports: HashMap<String, Arc<dyn Transport>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in http(s), file and mailto transports
    pub fn with_defaults(config: &Config) -> Result<Self, reqwest::Error> {
        let mut registry = Self::new();
        let http: Arc<dyn Transport> = Arc::new(HttpTransport::new(config)?);
        registry.register("http", Arc::clone(&http));
        registry.register("https", http);
        registry.register("file", Arc::new(FileTransport));
        registry.register("mailto", Arc::new(MailtoTransport));
        Ok(registry)
    }

    /// Registers a transport, replacing any previous one of the scheme
    pub fn register(&mut self, scheme: &str, transport: Arc<dyn Transport>) {
        self.transports.insert(scheme.to_lowercase(), transport);
    }

    pub fn for_scheme(&self, scheme: &str) -> Option<Arc<dyn Transport>> {
        self.transports.get(scheme).cloned()
    }
}

/// A connection serving a body held in memory
pub struct MemoryConnection {
    content_type: Option<String>,
    last_modified: Option<DateTime<Utc>>,
    body: Vec<u8>,
    offset: usize,
}

impl MemoryConnection {
    pub fn new(content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            content_type,
            last_modified: None,
            body,
            offset: 0,
        }
    }

    pub fn with_last_modified(mut self, modified: Option<DateTime<Utc>>) -> Self {
        self.last_modified = modified;
        self
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn content_length(&self) -> Option<u64> {
        Some(self.body.len() as u64)
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    async fn read_chunk(&mut self, max: usize) -> Result<Option<Vec<u8>>, CheckFault> {
        if self.offset >= self.body.len() {
            return Ok(None);
        }
        let end = (self.offset + max).min(self.body.len());
        let chunk = self.body[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }
}
