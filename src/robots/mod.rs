//! Robots.txt handling module
//!
//! This module fetches, parses and caches robots.txt files. The HTTP
//! transport consults it before the checker recurses into a page.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache, ROBOTS_TTL_HOURS};
pub use parser::ParsedRobots;

use reqwest::{Client, Response, StatusCode};
use url::Url;

/// Robots.txt content past this many bytes is ignored
pub const MAX_ROBOTS_BYTES: usize = 500 * 1024;

/// Fetches the robots.txt governing a URL
///
/// Missing files and most error statuses allow everything; `401` and `403`
/// disallow everything. Network failures allow everything, the page fetch
/// itself reports them.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - Any URL of the site
///
/// # Returns
///
/// The parsed robots.txt policy of the site
pub async fn fetch_robots(client: &Client, url: &Url) -> ParsedRobots {
    fetch_robots_within(client, url, MAX_ROBOTS_BYTES).await
}

async fn fetch_robots_within(client: &Client, url: &Url, max_bytes: usize) -> ParsedRobots {
    let Ok(robots_url) = url.join("/robots.txt") else {
        return ParsedRobots::allow_all();
    };

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Failed to fetch {}: {}", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    match response.status() {
        status if status.is_success() => match read_capped(response, max_bytes).await {
            Ok(content) => {
                tracing::debug!("Fetched {} ({} bytes)", robots_url, content.len());
                ParsedRobots::from_content(&String::from_utf8_lossy(&content))
            }
            Err(e) => {
                tracing::debug!("Failed to read {}: {}", robots_url, e);
                ParsedRobots::allow_all()
            }
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ParsedRobots::disallow_all(),
        _ => ParsedRobots::allow_all(),
    }
}

/// Reads at most `max_bytes` of the body
///
/// A truncated body is cut back to its last complete line.
async fn read_capped(mut response: Response, max_bytes: usize) -> Result<Vec<u8>, reqwest::Error> {
    let mut buffer = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = max_bytes - buffer.len();
        if chunk.len() > room {
            buffer.extend_from_slice(&chunk[..room]);
            let complete = buffer.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
            buffer.truncate(complete);
            tracing::debug!("robots.txt truncated to {} bytes", buffer.len());
            break;
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}
