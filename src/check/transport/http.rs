//! HTTP(S) transport built on reqwest

use crate::check::fault::CheckFault;
use crate::check::transport::{Connection, Transport};
use crate::config::{Config, UserAgentConfig};
use crate::robots::{fetch_robots, RobotsCache};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, LAST_MODIFIED};
use reqwest::{redirect::Policy, Client, Response};
use std::time::Duration;
use url::Url;

/// Maximum number of redirects followed by the client
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Transport for `http` and `https` URLs
pub struct HttpTransport {
    client: Client,
    /// robots.txt product token
    agent: String,
    robots: RobotsCache,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.checking.timeout),
        )?;
        Ok(Self::with_client(client, &config.user_agent.crawler_name))
    }

    pub fn with_client(client: Client, agent: &str) -> Self {
        Self {
            client,
            agent: agent.to_string(),
            robots: RobotsCache::new(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn open(&self, url: &Url) -> Result<Box<dyn Connection>, CheckFault> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            tracing::debug!("{} answered {}", url, status);
            return Err(CheckFault::http_status(
                status.as_u16(),
                status.canonical_reason(),
            ));
        }
        if response.url() != url {
            tracing::debug!("{} redirected to {}", url, response.url());
        }
        Ok(Box::new(HttpConnection {
            response,
            pending: Vec::new(),
        }))
    }

    async fn allows_robots(&self, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();
        let robots = match self.robots.get(&origin) {
            Some(robots) => robots,
            None => {
                let rules = fetch_robots(&self.client, url).await;
                self.robots.insert(origin, rules)
            }
        };
        robots.is_allowed(url.as_str(), &self.agent)
    }
}

/// An HTTP response being read
struct HttpConnection {
    response: Response,
    /// Bytes of the last network chunk not yet handed out
    pending: Vec<u8>,
}

#[async_trait]
impl Connection for HttpConnection {
    fn content_type(&self) -> Option<String> {
        self.response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn status(&self) -> Option<String> {
        let status = self.response.status();
        Some(match status.canonical_reason() {
            Some(reason) => format!("{} {}", status.as_u16(), reason),
            None => status.as_u16().to_string(),
        })
    }

    async fn read_chunk(&mut self, max: usize) -> Result<Option<Vec<u8>>, CheckFault> {
        if self.pending.is_empty() {
            match self.response.chunk().await? {
                Some(bytes) => self.pending = bytes.to_vec(),
                None => return Ok(None),
            }
        }
        if self.pending.len() <= max {
            return Ok(Some(std::mem::take(&mut self.pending)));
        }
        let rest = self.pending.split_off(max);
        Ok(Some(std::mem::replace(&mut self.pending, rest)))
    }
}
