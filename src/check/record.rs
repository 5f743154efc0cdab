//! The per-URL check record
//!
//! A [`UrlRecord`] is created for every discovered link. Construction runs
//! the syntax check and scope classification; [`UrlRecord::check`] then
//! fetches the URL, runs plugins and returns the child links of the content
//! when recursion is allowed.

use crate::check::content::{decode, download, parse_content_type, refine_mime, Lazy};
use crate::check::diagnostics::{title_of, Diagnostics, WarningTag};
use crate::check::fault::{translate, CheckFault, FaultKind};
use crate::check::parser::{parse_document, parseable_kind, ParsedDocument};
use crate::check::snapshot::CompactSnapshot;
use crate::check::transport::{is_ignored_scheme, Connection, Transport};
use crate::check::CheckContext;
use crate::url::{build_url, intern_pattern, ScopeDecision, UrlContext, UrlParts};
use crate::CheckError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// A link occurrence waiting to become a record
///
/// Seeds have level 0 and no parent. Child links found in a document carry
/// their position, name, the document base and the parent's encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// The reference as written
    pub reference: String,
    pub level: u32,
    pub parent_url: Option<String>,
    pub base_ref: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub page: Option<u32>,
    pub name: String,
    /// Text encoding of the document the link was found in
    pub encoding: Option<String>,
    /// Pre-decided scope, skipping classification
    pub scope: Option<ScopeDecision>,
}

impl Discovery {
    /// A seed URL given by the user
    pub fn seed(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }
}

/// A child link returned by a check
pub type ChildReference = Discovery;

/// Check state of one link occurrence
pub struct UrlRecord {
    ctx: Arc<CheckContext>,
    /// The reference, trimmed
    base_url: String,
    base_ref: Option<String>,
    parent_url: Option<String>,
    level: u32,
    line: Option<u32>,
    column: Option<u32>,
    page: Option<u32>,
    name: String,
    encoding: Option<String>,

    url: Option<Url>,
    parts: UrlParts,
    scope: ScopeDecision,
    cache_key: String,
    diagnostics: Diagnostics,
    title: String,

    size: i64,
    dltime: f64,
    checktime: f64,
    content_type: String,
    /// Charset declared by the transport
    content_encoding: Option<String>,
    /// Encoding the text was decoded with
    text_encoding: Option<String>,
    last_modified: Option<DateTime<Utc>>,

    raw: Lazy<Vec<u8>>,
    raw_released: bool,
    text: Lazy<String>,
    document: Lazy<Arc<ParsedDocument>>,

    /// Whether the outcome may enter the result cache
    caching: bool,
    connection: Option<Box<dyn Connection>>,
    transport: Option<Arc<dyn Transport>>,
}

impl UrlRecord {
    /// Creates a record and runs its syntax check
    ///
    /// No network access happens here. A seed also registers the intern
    /// pattern derived from its URL before it is classified.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The shared check context
    /// * `discovery` - The link occurrence
    pub fn new(ctx: Arc<CheckContext>, discovery: Discovery) -> Self {
        let trimmed = discovery.reference.trim().to_string();
        let mut record = Self {
            ctx,
            base_url: trimmed.clone(),
            base_ref: discovery.base_ref.clone(),
            parent_url: discovery.parent_url.clone(),
            level: discovery.level,
            line: discovery.line,
            column: discovery.column,
            page: discovery.page,
            name: discovery.name.clone(),
            encoding: discovery.encoding.clone(),
            url: None,
            parts: UrlParts::default(),
            scope: ScopeDecision::EXTERN_STRICT,
            cache_key: trimmed.clone(),
            diagnostics: Diagnostics::default(),
            title: String::new(),
            size: -1,
            dltime: -1.0,
            checktime: 0.0,
            content_type: String::new(),
            content_encoding: None,
            text_encoding: None,
            last_modified: None,
            raw: Lazy::NotFetched,
            raw_released: false,
            text: Lazy::NotFetched,
            document: Lazy::NotFetched,
            caching: true,
            connection: None,
            transport: None,
        };

        if trimmed != discovery.reference {
            record.add_warning(
                WarningTag::UrlWhitespace,
                format!("Leading or trailing whitespace in URL `{}'.", discovery.reference),
            );
        }

        record.check_syntax();
        record.title = title_of(&record.base_url, record.url_str());

        if record.url.is_some() {
            if record.level == 0 {
                record.add_seed_pattern();
            }
            record.scope = discovery
                .scope
                .unwrap_or_else(|| record.ctx.patterns.classify(record.url_str()));
            if record.scope.is_syntax_only() {
                record.add_info("The URL is outside of the domain filter, checked only syntax.");
                if !record.diagnostics.has_result() {
                    record.set_result("filtered", true, false);
                }
            }
        }

        record.trace_state("created");
        record
    }

    fn check_syntax(&mut self) {
        let context = UrlContext {
            base_ref: self.base_ref.as_deref(),
            parent_url: self.parent_url.as_deref(),
            encoding: self.encoding.as_deref(),
            max_url_length: self.ctx.config.checking.max_url_length,
        };

        match build_url(&self.base_url, &context) {
            Ok(built) => {
                for (tag, message) in &built.warnings {
                    self.add_warning(*tag, message.clone());
                }
                self.cache_key = built.cache_key(self.ctx.anchor_check());
                if built.base_ref.is_some() {
                    self.base_ref = built.base_ref;
                }
                self.parts = built.parts;
                self.url = Some(built.url);
            }
            Err(e) => {
                tracing::debug!("Syntax error in {:?}: {}", self.base_url, e);
                self.set_result(e.to_string(), false, false);
            }
        }
    }

    fn add_seed_pattern(&mut self) {
        let Some(pattern) = self.url.as_ref().and_then(intern_pattern) else {
            return;
        };
        match self.ctx.patterns.add_intern(&pattern) {
            Ok(true) => tracing::debug!("Added intern pattern {}", pattern),
            Ok(false) => {}
            Err(e) => tracing::warn!("Cannot add intern pattern for {}: {}", self.base_url, e),
        }
    }

    /// Whether the record still has to go through [`UrlRecord::check`]
    pub fn needs_check(&self) -> bool {
        self.url.is_some() && !self.scope.is_syntax_only()
    }

    /// Fetches and checks the URL
    ///
    /// Faults are recorded on the record, not returned. The result lists the
    /// child links when the content may be recursed into.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ChildReference>)` - Child links, empty without recursion
    /// * `Err(CheckError::StrictExtern)` - The record is syntax-only
    /// * `Err(CheckError::Interrupted)` - Reading was interrupted
    pub async fn check(&mut self) -> Result<Vec<ChildReference>, CheckError> {
        if self.scope.is_syntax_only() {
            return Err(CheckError::StrictExtern {
                url: self.url_str().to_string(),
            });
        }
        if self.url.is_none() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        self.trace_state("checking");
        let outcome = self.local_check().await;
        self.checktime = start.elapsed().as_secs_f64();
        self.connection = None;
        self.trace_state("checked");
        outcome
    }

    async fn local_check(&mut self) -> Result<Vec<ChildReference>, CheckError> {
        match self.check_connection().await {
            Ok(true) => {}
            Ok(false) => return Ok(Vec::new()),
            Err(fault) => {
                self.record_fault(fault)?;
                return Ok(Vec::new());
            }
        }

        self.set_content_type();
        self.add_size_info();

        let ctx = Arc::clone(&self.ctx);
        for plugin in &ctx.plugins {
            plugin.on_connection(self);
        }

        if !self.diagnostics.has_result() {
            let status = self
                .connection
                .as_ref()
                .and_then(|conn| conn.status())
                .unwrap_or_else(|| "Valid".to_string());
            self.set_result(status, true, false);
        }

        self.check_content().await
    }

    /// Opens the connection
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A connection is open
    /// * `Ok(false)` - The scheme is ignored, a result is set
    /// * `Err(CheckFault)` - The connection failed
    async fn check_connection(&mut self) -> Result<bool, CheckFault> {
        let Some(url) = self.url.clone() else {
            return Ok(false);
        };
        let scheme = url.scheme();

        if is_ignored_scheme(scheme) {
            self.add_warning(
                WarningTag::IgnoreUrl,
                format!("{} URL ignored.", capitalize(scheme)),
            );
            self.set_result("ignored", true, false);
            return Ok(false);
        }

        let transport = self.ctx.transports.for_scheme(scheme).ok_or_else(|| {
            CheckFault::new(
                FaultKind::Unsupported,
                format!("URL scheme `{}' is not supported", scheme),
            )
        })?;
        let connection = transport.open(&url).await?;
        tracing::debug!("Opened {} via {} transport", url, transport.name());
        self.transport = Some(transport);
        self.connection = Some(connection);
        Ok(true)
    }

    /// Records a fault as invalid result
    ///
    /// An interruption is not recorded but handed to the caller.
    fn record_fault(&mut self, fault: CheckFault) -> Result<(), CheckError> {
        if fault.kind == FaultKind::Interrupted {
            return Err(CheckError::Interrupted);
        }
        let translation = translate(&fault, &self.ctx.no_cache);
        if !translation.cacheable {
            self.caching = false;
        }
        self.set_result(translation.message, false, false);
        Ok(())
    }

    fn set_content_type(&mut self) {
        let Some(conn) = self.connection.as_ref() else {
            return;
        };
        let (mime, charset) = conn
            .content_type()
            .map(|raw| parse_content_type(&raw))
            .unwrap_or_default();
        self.content_type = refine_mime(&mime, &self.parts.path);
        self.content_encoding = charset;
        self.last_modified = conn.last_modified();
    }

    fn add_size_info(&mut self) {
        let Some(length) = self.connection.as_ref().and_then(|conn| conn.content_length()) else {
            return;
        };
        self.size = i64::try_from(length).unwrap_or(i64::MAX);
        let max = self.ctx.config.checking.max_file_size_download;
        if length > max {
            self.add_warning(
                WarningTag::UrlContentTooLarge,
                format!("Content size {} is larger than {}.", length, max),
            );
        }
    }

    async fn check_content(&mut self) -> Result<Vec<ChildReference>, CheckError> {
        let ctx = Arc::clone(&self.ctx);
        let wanted: Vec<_> = ctx
            .plugins
            .iter()
            .filter(|plugin| plugin.wants_content(self))
            .collect();
        if !wanted.is_empty() && self.is_valid() && self.can_get_content() {
            if let Some(document) = self.document().await? {
                for plugin in wanted {
                    plugin.on_content(self, &document);
                }
            }
        }

        if !self.allows_recursion().await {
            return Ok(Vec::new());
        }

        let Some(document) = self.document().await? else {
            return Ok(Vec::new());
        };
        if self.size > 0 && self.size as u64 > ctx.config.checking.max_file_size_parse {
            tracing::debug!(
                "No recursion into {}: downloaded size {} exceeds parse limit",
                self.cache_key,
                self.size
            );
            return Ok(Vec::new());
        }
        Ok(self.children(&document))
    }

    fn children(&self, document: &ParsedDocument) -> Vec<ChildReference> {
        let parent = self.url_str().to_string();
        let children: Vec<ChildReference> = document
            .links
            .iter()
            .map(|link| Discovery {
                reference: link.url.clone(),
                level: self.level + 1,
                parent_url: Some(parent.clone()),
                base_ref: document.base.clone(),
                line: link.line,
                column: link.column,
                page: None,
                name: link.name.clone(),
                encoding: self.text_encoding.clone(),
                scope: None,
            })
            .collect();
        tracing::debug!("Found {} links in {}", children.len(), self.cache_key);
        children
    }

    /// Downloads the content once
    async fn fetch_raw(&mut self) -> Result<(), CheckError> {
        if !matches!(self.raw, Lazy::NotFetched) {
            return Ok(());
        }
        let Some(mut conn) = self.connection.take() else {
            self.raw = Lazy::Failed;
            return Ok(());
        };

        let start = Instant::now();
        let max = self.ctx.config.checking.max_file_size_download;
        match download(conn.as_mut(), max).await {
            Ok(data) => {
                self.dltime = start.elapsed().as_secs_f64();
                self.size = data.len() as i64;
                self.ctx.add_downloaded_bytes(data.len() as u64);
                if data.is_empty() {
                    self.add_warning(WarningTag::UrlContentSizeZero, "Content size is zero.");
                }
                self.raw = Lazy::Fetched(data);
                Ok(())
            }
            Err(fault) if fault.kind == FaultKind::Interrupted => Err(CheckError::Interrupted),
            Err(fault) => {
                self.raw = Lazy::Failed;
                self.add_content_warning(&fault);
                Ok(())
            }
        }
    }

    async fn fetch_text(&mut self) -> Result<(), CheckError> {
        if !matches!(self.text, Lazy::NotFetched) {
            return Ok(());
        }
        if self.raw_released {
            self.text = Lazy::Failed;
            return Ok(());
        }
        self.fetch_raw().await?;
        self.text = match self.raw.get() {
            Some(data) => {
                let (text, used) = decode(data, self.content_encoding.as_deref());
                self.text_encoding = Some(used.to_string());
                Lazy::Fetched(text)
            }
            None => Lazy::Failed,
        };
        Ok(())
    }

    /// The parsed document, if the content type is parseable and fetching
    /// and parsing succeeded
    pub async fn document(&mut self) -> Result<Option<Arc<ParsedDocument>>, CheckError> {
        if let Lazy::NotFetched = self.document {
            let Some(kind) = parseable_kind(&self.content_type) else {
                return Ok(None);
            };
            self.fetch_text().await?;
            self.document = match self.text.get().map(|text| parse_document(kind, text)) {
                Some(Ok(document)) => {
                    if let Some(title) = &document.title {
                        self.title = title.clone();
                    }
                    Lazy::Fetched(Arc::new(document))
                }
                Some(Err(fault)) => {
                    self.add_content_warning(&fault);
                    Lazy::Failed
                }
                None => Lazy::Failed,
            };
        }
        Ok(self.document.get().cloned())
    }

    fn add_content_warning(&mut self, fault: &CheckFault) {
        tracing::debug!("Could not get content of {}: {}", self.cache_key, fault);
        self.add_warning(
            WarningTag::UrlErrorGettingContent,
            format!("could not get content: {}", fault.message()),
        );
    }

    /// False once the content is known to exceed the download limit
    pub fn can_get_content(&self) -> bool {
        if self.raw.is_failed() {
            return false;
        }
        let max = self.ctx.config.checking.max_file_size_download;
        !(self.size >= 0 && self.size as u64 > max)
    }

    /// Adds a warning, or an info message when its tag is ignored
    pub fn add_warning(&mut self, tag: WarningTag, message: impl Into<String>) {
        self.diagnostics
            .add_warning(tag, message.into(), &self.ctx.ignore_warnings);
    }

    pub fn add_info(&mut self, message: impl Into<String>) {
        self.diagnostics.add_info(message.into());
    }

    /// Stores the result and releases the downloaded bytes
    pub fn set_result(&mut self, message: impl Into<String>, valid: bool, overwrite: bool) {
        let url = self.url_str().to_string();
        self.diagnostics.set_result(
            message.into(),
            valid,
            overwrite,
            &url,
            &self.ctx.ignore_rules,
        );
        if let Lazy::Fetched(_) = self.raw {
            self.raw = Lazy::NotFetched;
            self.raw_released = true;
        }
    }

    fn trace_state(&self, step: &str) {
        if self.ctx.config.checking.trace {
            tracing::info!(
                "[{}] {} url={:?} scope={:?} valid={} result={:?} size={} type={:?} warnings={}",
                step,
                self.base_url,
                self.url.as_ref().map(Url::as_str),
                self.scope,
                self.diagnostics.is_valid(),
                self.diagnostics.result(),
                self.size,
                self.content_type,
                self.diagnostics.warnings().len()
            );
        } else {
            tracing::trace!("[{}] {} {:?}", step, self.base_url, self.scope);
        }
    }

    /// Freezes the outcome
    pub fn to_snapshot(&self) -> CompactSnapshot {
        CompactSnapshot {
            valid: self.diagnostics.is_valid(),
            is_extern: self.scope.is_extern,
            result: self.diagnostics.result().to_string(),
            warnings: self.diagnostics.warnings().to_vec(),
            name: self.name.clone(),
            title: self.title.clone(),
            parent_url: self.parent_url.clone(),
            base_ref: self.base_ref.clone(),
            base_url: self.base_url.clone(),
            url: self.url.as_ref().map(Url::to_string),
            domain: self.parts.authority(),
            checktime: self.checktime,
            dltime: self.dltime,
            size: self.size,
            info: self.diagnostics.info().to_vec(),
            line: self.line,
            column: self.column,
            page: self.page,
            cache_url: self.cache_key.clone(),
            content_type: self.content_type.clone(),
            level: self.level,
            modified: self.last_modified,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    fn url_str(&self) -> &str {
        self.url.as_ref().map(Url::as_str).unwrap_or_default()
    }

    pub fn parts(&self) -> &UrlParts {
        &self.parts
    }

    pub fn scope(&self) -> ScopeDecision {
        self.scope
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_valid()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_cacheable(&self) -> bool {
        self.caching
    }

    pub(crate) fn context(&self) -> &CheckContext {
        &self.ctx
    }

    pub(crate) fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
