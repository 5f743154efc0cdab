use crate::config::{compile_pattern, Config, LinkPatternConfig};
use crate::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Scope decision of one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeDecision {
    /// URL lies outside the crawl scope
    pub is_extern: bool,
    /// Extern URL that is only syntax checked
    pub is_strict: bool,
}

impl ScopeDecision {
    pub const INTERN: Self = Self {
        is_extern: false,
        is_strict: false,
    };

    pub const EXTERN: Self = Self {
        is_extern: true,
        is_strict: false,
    };

    pub const EXTERN_STRICT: Self = Self {
        is_extern: true,
        is_strict: true,
    };

    /// Returns true if the URL must not be fetched
    pub fn is_syntax_only(&self) -> bool {
        self.is_extern && self.is_strict
    }
}

/// One compiled entry of the extern or intern list
#[derive(Debug, Clone)]
pub struct PatternEntry {
    regex: Regex,
    negate: bool,
    strict: bool,
}

impl PatternEntry {
    pub fn new(regex: Regex, negate: bool, strict: bool) -> Self {
        Self {
            regex,
            negate,
            strict,
        }
    }

    /// Compiles a configured pattern
    pub fn from_config(entry: &LinkPatternConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            compile_pattern(&entry.pattern)?,
            entry.negate,
            entry.strict,
        ))
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// A regex search anywhere in the URL, inverted by `negate`
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url) != self.negate
    }
}

/// Ordered extern and intern pattern lists of a crawl
///
/// The extern list is fixed at construction. The intern list grows while
/// seeds are added, under its write lock.
#[derive(Debug, Default)]
pub struct LinkPatterns {
    extern_links: Vec<PatternEntry>,
    intern_links: RwLock<Vec<PatternEntry>>,
    check_extern: bool,
}

impl LinkPatterns {
    /// Compiles the configured pattern lists
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let extern_links = config
            .externlinks
            .iter()
            .map(PatternEntry::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        let intern_links = config
            .internlinks
            .iter()
            .map(PatternEntry::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            extern_links,
            intern_links: RwLock::new(intern_links),
            check_extern: config.checking.check_extern,
        })
    }

    /// Appends an intern pattern unless an identical one is already present
    ///
    /// # Returns
    ///
    /// `true` if the pattern was appended
    pub fn add_intern(&self, pattern: &str) -> Result<bool, ConfigError> {
        let mut intern = self
            .intern_links
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if intern.iter().any(|entry| entry.as_str() == pattern) {
            return Ok(false);
        }
        intern.push(PatternEntry::new(compile_pattern(pattern)?, false, false));
        tracing::debug!("Added intern pattern {}", pattern);
        Ok(true)
    }

    /// Current intern pattern sources, in order
    pub fn intern_patterns(&self) -> Vec<String> {
        self.intern_links
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|entry| entry.as_str().to_string())
            .collect()
    }

    /// Classifies a normalized URL
    ///
    /// Extern patterns take precedence over intern patterns, the first
    /// matching entry of a list decides. A URL matching neither list is
    /// extern, and strict unless extern links are checked.
    pub fn classify(&self, url: &str) -> ScopeDecision {
        if url.is_empty() {
            return ScopeDecision::EXTERN_STRICT;
        }

        if let Some(entry) = self.extern_links.iter().find(|e| e.matches(url)) {
            return ScopeDecision {
                is_extern: true,
                is_strict: entry.strict,
            };
        }

        let intern = self
            .intern_links
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if intern.iter().any(|e| e.matches(url)) {
            return ScopeDecision::INTERN;
        }

        if self.check_extern {
            ScopeDecision::EXTERN
        } else {
            ScopeDecision::EXTERN_STRICT
        }
    }
}
