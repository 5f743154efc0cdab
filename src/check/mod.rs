//! Per-URL check engine
//!
//! This module contains everything that happens to one discovered link:
//! - Syntax check and normalization on construction of a [`UrlRecord`]
//! - Connection, bounded download and content decoding
//! - Plugins and the recursion gate
//! - Fault translation and diagnostics bookkeeping
//! - The final [`CompactSnapshot`]

mod content;
mod diagnostics;
mod fault;
mod gate;
mod parser;
mod plugin;
mod record;
mod snapshot;
pub mod transport;

pub use content::{decode, download, parse_content_type, refine_mime, Lazy, READ_CHUNK_BYTES};
pub use diagnostics::{title_of, Diagnostics, IgnoreRule, Warning, WarningTag};
pub use fault::{translate, truncate, CheckFault, FaultKind, Translation, MAX_RESULT_LENGTH};
pub use parser::{parse_document, parseable_kind, DocumentKind, DocumentLink, ParsedDocument};
pub use plugin::{create_plugin, AnchorCheck, Plugin, KNOWN_PLUGINS};
pub use record::{ChildReference, Discovery, UrlRecord};
pub use snapshot::CompactSnapshot;
#[cfg(test)]
pub(crate) use snapshot::sample_snapshot;
pub use transport::{Connection, Transport, TransportRegistry};

use crate::config::Config;
use crate::url::LinkPatterns;
use crate::{CheckError, ConfigError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Crawl-wide state shared by all records
///
/// Everything but the intern patterns and the byte counter is read-only
/// once built.
pub struct CheckContext {
    pub config: Config,
    pub patterns: LinkPatterns,
    pub ignore_rules: Vec<IgnoreRule>,
    pub ignore_warnings: HashSet<WarningTag>,
    pub no_cache: HashSet<FaultKind>,
    pub plugins: Vec<Arc<dyn Plugin>>,
    pub transports: TransportRegistry,
    downloaded_bytes: AtomicU64,
}

impl CheckContext {
    /// Builds the context with the built-in transports
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(CheckContext)` - Ready to check URLs
    /// * `Err(CheckError)` - A pattern, tag or plugin name is invalid, or the
    ///   HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, CheckError> {
        let transports = TransportRegistry::with_defaults(&config)?;
        Self::with_transports(config, transports)
    }

    /// Builds the context with the given transports
    pub fn with_transports(config: Config, transports: TransportRegistry) -> Result<Self, CheckError> {
        let checking = &config.checking;

        let ignore_warnings = checking
            .ignore_warnings
            .iter()
            .map(|tag| tag.parse::<WarningTag>().map_err(ConfigError::Validation))
            .collect::<Result<HashSet<_>, _>>()?;

        let no_cache = checking
            .no_cache_faults
            .iter()
            .map(|name| {
                FaultKind::from_name(name)
                    .ok_or_else(|| ConfigError::Validation(format!("Unknown fault kind: '{}'", name)))
            })
            .collect::<Result<HashSet<_>, _>>()?;

        let plugins = checking
            .enabled_plugins
            .iter()
            .map(|name| {
                create_plugin(name)
                    .ok_or_else(|| ConfigError::Validation(format!("Unknown plugin: '{}'", name)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ignore_rules = config
            .ignoreerrors
            .iter()
            .map(IgnoreRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        let patterns = LinkPatterns::from_config(&config)?;

        Ok(Self {
            config,
            patterns,
            ignore_rules,
            ignore_warnings,
            no_cache,
            plugins,
            transports,
            downloaded_bytes: AtomicU64::new(0),
        })
    }

    /// Whether fragments are part of the cache key
    pub fn anchor_check(&self) -> bool {
        self.plugins
            .iter()
            .any(|plugin| plugin.name() == AnchorCheck::NAME)
    }

    /// Total bytes downloaded so far
    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes.load(Ordering::Relaxed)
    }

    pub fn add_downloaded_bytes(&self, bytes: u64) {
        self.downloaded_bytes.fetch_add(bytes, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_context(config: Config) -> Result<CheckContext, CheckError> {
        CheckContext::with_transports(config, TransportRegistry::new())
    }

    #[test]
    fn test_default_context() {
        let ctx = create_test_context(Config::default()).unwrap();
        assert!(ctx.plugins.is_empty());
        assert!(!ctx.anchor_check());
        assert!(ctx.no_cache.contains(&FaultKind::Timeout));
        assert_eq!(ctx.downloaded_bytes(), 0);
    }

    #[test]
    fn test_anchor_check_enabled() {
        let mut config = Config::default();
        config.checking.enabled_plugins = vec!["AnchorCheck".to_string()];
        let ctx = create_test_context(config).unwrap();
        assert!(ctx.anchor_check());
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut config = Config::default();
        config.checking.ignore_warnings = vec!["no-such-tag".to_string()];
        assert!(matches!(
            create_test_context(config),
            Err(CheckError::Config(ConfigError::Validation(_)))
        ));

        let mut config = Config::default();
        config.checking.enabled_plugins = vec!["Bogus".to_string()];
        assert!(create_test_context(config).is_err());
    }

    #[test]
    fn test_downloaded_bytes_accumulate() {
        let ctx = create_test_context(Config::default()).unwrap();
        ctx.add_downloaded_bytes(10);
        ctx.add_downloaded_bytes(5);
        assert_eq!(ctx.downloaded_bytes(), 15);
    }
}
