//! URL handling module for Sumi-Check
//!
//! This module turns raw references into absolute, normalized URLs, decomposes
//! them, detects obfuscated IP hosts and classifies URLs against the crawl
//! scope.

mod build;
mod domain;
mod ip;
mod matcher;
mod normalize;

use serde::{Deserialize, Serialize};
use url::Url;

// Re-export main functions
pub use build::{build_url, BuiltUrl, UrlContext, SCHEMES_REQUIRING_HOST};
pub use domain::intern_pattern;
pub use ip::{obfuscated_ip, parse_ipv4_literal};
pub use matcher::{LinkPatterns, PatternEntry, ScopeDecision};
pub use normalize::{collapse_segments, fix_wayback, has_scheme, percent_decode};

/// Returns the default port of a scheme, 0 when it has none
pub fn default_port(scheme: &str) -> u16 {
    match scheme {
        "http" => 80,
        "https" => 443,
        "ftp" => 21,
        "nntps" => 563,
        _ => 0,
    }
}

/// Decomposed form of a normalized URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlParts {
    pub scheme: String,
    /// `user[:password]`, percent-encoded
    pub userinfo: Option<String>,
    /// Lowercase host, empty for host-less URLs
    pub host: String,
    /// Explicit port, or the scheme default
    pub port: u16,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl UrlParts {
    /// Splits a URL into its parts
    pub fn from_url(url: &Url) -> Self {
        let userinfo = match (url.username(), url.password()) {
            ("", None) => None,
            (user, None) => Some(user.to_string()),
            (user, Some(password)) => Some(format!("{}:{}", user, password)),
        };

        Self {
            scheme: url.scheme().to_string(),
            userinfo,
            host: url.host_str().unwrap_or_default().to_lowercase(),
            port: url
                .port()
                .unwrap_or_else(|| default_port(url.scheme())),
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        }
    }

    /// `userinfo@host:port`, the port omitted when it is the scheme default
    pub fn authority(&self) -> String {
        let mut authority = String::new();
        if let Some(userinfo) = &self.userinfo {
            authority.push_str(userinfo);
            authority.push('@');
        }
        authority.push_str(&self.host);
        if self.port != 0 && self.port != default_port(&self.scheme) {
            authority.push(':');
            authority.push_str(&self.port.to_string());
        }
        authority
    }

    /// Fragment, the anchor checked by the anchor plugin
    pub fn anchor(&self) -> Option<&str> {
        self.fragment.as_deref().filter(|f| !f.is_empty())
    }
}
