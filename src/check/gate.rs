//! Recursion gate
//!
//! Decides whether the content of a checked URL is parsed for child links.

use crate::check::diagnostics::WarningTag;
use crate::check::parser::parseable_kind;
use crate::check::record::UrlRecord;

impl UrlRecord {
    /// Checks whether the crawl may recurse into this URL
    ///
    /// The conditions are evaluated in order and the first failing one
    /// refuses recursion:
    /// 1. the result is valid
    /// 2. the content can be fetched within the download limit
    /// 3. the recursion level is below the limit and the URL is intern
    /// 4. the known size is within the parse limit
    /// 5. the transport allows recursion and the content type is parseable
    /// 6. the robots policy of the site allows following links
    pub async fn allows_recursion(&mut self) -> bool {
        let checking = &self.context().config.checking;
        let max_level = checking.recursion_level;
        let max_parse = checking.max_file_size_parse;

        if !self.is_valid() {
            tracing::debug!("No recursion into {}: invalid", self.cache_key());
            return false;
        }
        if !self.can_get_content() {
            tracing::debug!("No recursion into {}: content not available", self.cache_key());
            return false;
        }
        if max_level >= 0 && i64::from(self.level()) >= i64::from(max_level) {
            tracing::debug!(
                "No recursion into {}: level {} reached the limit",
                self.cache_key(),
                self.level()
            );
            return false;
        }
        if self.scope().is_extern {
            tracing::debug!("No recursion into {}: extern", self.cache_key());
            return false;
        }
        if self.size() >= 0 && self.size() as u64 > max_parse {
            tracing::debug!(
                "No recursion into {}: size {} exceeds the parse limit",
                self.cache_key(),
                self.size()
            );
            return false;
        }

        let Some(transport) = self.transport().cloned() else {
            tracing::debug!("No recursion into {}: no transport", self.cache_key());
            return false;
        };
        if !transport.allows_recursion() {
            tracing::debug!(
                "No recursion into {}: {} transport",
                self.cache_key(),
                transport.name()
            );
            return false;
        }
        if parseable_kind(self.content_type()).is_none() {
            if self.level() == 0 {
                let message = format!(
                    "The URL with content type {} is not parseable.",
                    self.content_type()
                );
                self.add_warning(WarningTag::UrlContentTypeUnparseable, message);
            }
            tracing::debug!(
                "No recursion into {}: content type {:?} not parseable",
                self.cache_key(),
                self.content_type()
            );
            return false;
        }

        let Some(url) = self.url().cloned() else {
            return false;
        };
        if !transport.allows_robots(&url).await {
            tracing::debug!("No recursion into {}: denied by robots.txt", self.cache_key());
            return false;
        }
        true
    }
}
