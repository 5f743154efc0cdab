//! Check plugins
//!
//! Plugins hook into a check after the connection is open and after the
//! content has been parsed. They may add warnings and info to the record.

use crate::check::diagnostics::WarningTag;
use crate::check::parser::{DocumentKind, ParsedDocument};
use crate::check::record::UrlRecord;
use crate::url::percent_decode;
use std::sync::Arc;

/// Names accepted by `enabledplugins`
pub const KNOWN_PLUGINS: &[&str] = &[AnchorCheck::NAME];

/// A check extension
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once the connection is open and the content type is known
    fn on_connection(&self, _record: &mut UrlRecord) {}

    /// Whether [`Plugin::on_content`] should run for this record
    fn wants_content(&self, _record: &UrlRecord) -> bool {
        false
    }

    /// Called with the parsed document of a valid record
    fn on_content(&self, _record: &mut UrlRecord, _document: &ParsedDocument) {}
}

/// Instantiates a plugin by its configured name
pub fn create_plugin(name: &str) -> Option<Arc<dyn Plugin>> {
    match name {
        AnchorCheck::NAME => Some(Arc::new(AnchorCheck)),
        _ => None,
    }
}

/// Checks that the fragment of a URL names an anchor of the HTML page
///
/// Enabling it makes the fragment part of the cache key.
pub struct AnchorCheck;

impl AnchorCheck {
    pub const NAME: &'static str = "AnchorCheck";
}

impl Plugin for AnchorCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn wants_content(&self, record: &UrlRecord) -> bool {
        record.parts().anchor().is_some()
    }

    fn on_content(&self, record: &mut UrlRecord, document: &ParsedDocument) {
        if document.kind != DocumentKind::Html {
            return;
        }
        let Some(anchor) = record.parts().anchor().map(str::to_string) else {
            return;
        };
        if document.anchors.contains(&anchor) || document.anchors.contains(&percent_decode(&anchor))
        {
            tracing::debug!("Anchor {} found in {}", anchor, record.cache_key());
            return;
        }

        let mut available: Vec<&str> = document.anchors.iter().map(String::as_str).collect();
        available.sort_unstable();
        record.add_warning(
            WarningTag::UrlAnchorNotFound,
            format!(
                "Anchor `{}' not found. Available anchors: `{}'.",
                anchor,
                available.join(", ")
            ),
        );
    }
}
