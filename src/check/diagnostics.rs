//! Warning, info and result bookkeeping of a URL record

use crate::config::{compile_pattern, IgnoreErrorConfig};
use crate::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Tags of the warnings a check can raise
///
/// The kebab-case names are the values accepted by `ignorewarnings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningTag {
    UrlWhitespace,
    UrlEffectiveUrl,
    UrlObfuscatedIp,
    UrlTooLong,
    UrlContentSizeZero,
    UrlContentTooLarge,
    UrlContentTypeUnparseable,
    UrlErrorGettingContent,
    IgnoreUrl,
    UrlAnchorNotFound,
}

impl WarningTag {
    pub const ALL: [WarningTag; 10] = [
        WarningTag::UrlWhitespace,
        WarningTag::UrlEffectiveUrl,
        WarningTag::UrlObfuscatedIp,
        WarningTag::UrlTooLong,
        WarningTag::UrlContentSizeZero,
        WarningTag::UrlContentTooLarge,
        WarningTag::UrlContentTypeUnparseable,
        WarningTag::UrlErrorGettingContent,
        WarningTag::IgnoreUrl,
        WarningTag::UrlAnchorNotFound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UrlWhitespace => "url-whitespace",
            Self::UrlEffectiveUrl => "url-effective-url",
            Self::UrlObfuscatedIp => "url-obfuscated-ip",
            Self::UrlTooLong => "url-too-long",
            Self::UrlContentSizeZero => "url-content-size-zero",
            Self::UrlContentTooLarge => "url-content-too-large",
            Self::UrlContentTypeUnparseable => "url-content-type-unparseable",
            Self::UrlErrorGettingContent => "url-error-getting-content",
            Self::IgnoreUrl => "ignore-url",
            Self::UrlAnchorNotFound => "url-anchor-not-found",
        }
    }
}

impl fmt::Display for WarningTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WarningTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| format!("Unknown warning tag: '{}'", s))
    }
}

/// A tagged warning message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub tag: WarningTag,
    pub message: String,
}

/// Turns matching invalid results into valid, "Ignored: " prefixed ones
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    url: Regex,
    message: Regex,
}

impl IgnoreRule {
    pub fn from_config(rule: &IgnoreErrorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            url: compile_pattern(&rule.url)?,
            message: compile_pattern(&rule.message)?,
        })
    }

    pub fn matches(&self, url: &str, message: &str) -> bool {
        self.url.is_match(url) && self.message.is_match(message)
    }
}

/// Diagnostics of one record
#[derive(Debug, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    info: Vec<String>,
    result: String,
    valid: bool,
    has_result: bool,
    conflicts: u32,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            warnings: Vec::new(),
            info: Vec::new(),
            result: String::new(),
            valid: true,
            has_result: false,
            conflicts: 0,
        }
    }
}

impl Diagnostics {
    /// Adds a warning unless the same (tag, message) pair is present
    ///
    /// Tags listed in `ignored` are recorded as info instead.
    pub fn add_warning(&mut self, tag: WarningTag, message: String, ignored: &HashSet<WarningTag>) {
        if ignored.contains(&tag) {
            self.add_info(message);
            return;
        }
        let warning = Warning { tag, message };
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Adds an info message unless already present
    pub fn add_info(&mut self, message: String) {
        if !self.info.contains(&message) {
            self.info.push(message);
        }
    }

    /// Stores a result
    ///
    /// A second result without `overwrite` is a conflict: it is logged and
    /// counted, and the new message and validity are stored all the same.
    /// Invalid results matching an ignore rule become valid and get an
    /// `Ignored: ` prefix.
    pub fn set_result(
        &mut self,
        message: String,
        valid: bool,
        overwrite: bool,
        url: &str,
        ignore_rules: &[IgnoreRule],
    ) {
        if self.has_result && !overwrite {
            self.conflicts += 1;
            tracing::warn!(
                "Double result {:?} (previous {:?}) for {}",
                message,
                self.result,
                url
            );
        } else {
            self.has_result = true;
        }
        if message.is_empty() {
            tracing::warn!("Empty result for {}", url);
        }

        self.result = message;
        self.valid = valid;

        if !self.valid {
            if let Some(rule) = ignore_rules
                .iter()
                .find(|rule| rule.matches(url, &self.result))
            {
                tracing::debug!("Ignoring error of {} by rule {:?}", url, rule.url.as_str());
                self.valid = true;
                self.result = format!("Ignored: {}", self.result);
            }
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warning(&self, tag: WarningTag) -> bool {
        self.warnings.iter().any(|w| w.tag == tag)
    }

    pub fn info(&self) -> &[String] {
        &self.info
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn has_result(&self) -> bool {
        self.has_result
    }

    /// Number of results stored on top of an existing one without overwrite
    pub fn result_conflicts(&self) -> u32 {
        self.conflicts
    }
}

/// Title of a URL: the last path segment of the raw reference, else of the
/// normalized URL, else the whole string
pub fn title_of(base_url: &str, url: &str) -> String {
    let source = if !base_url.is_empty() { base_url } else { url };
    match source.rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => name.to_string(),
        _ => source.to_string(),
    }
}
