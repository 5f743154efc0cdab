//! Link extraction from fetched documents
//!
//! This module handles parsing content to extract:
//! - Child references with their position and name
//! - The page title and `<base href>` of HTML documents
//! - Anchor targets (`id` and `<a name>`) for the anchor check
//!
//! Supported formats are HTML, CSS, plain URL lists and XML sitemaps.

use crate::check::fault::CheckFault;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::LazyLock;

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).expect("CSS_URL: hardcoded regex is valid")
});

static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+['"]([^'"]+)['"]"#).expect("CSS_IMPORT: hardcoded regex is valid")
});

static REFRESH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*\d+\s*[;,]\s*url\s*=\s*['"]?([^'"]+)"#)
        .expect("REFRESH_URL: hardcoded regex is valid")
});

/// (element, attribute) pairs holding links in HTML
const HTML_LINK_ATTRIBUTES: &[(&str, &str)] = &[
    ("a", "href"),
    ("area", "href"),
    ("link", "href"),
    ("img", "src"),
    ("script", "src"),
    ("iframe", "src"),
    ("frame", "src"),
    ("embed", "src"),
    ("source", "src"),
    ("audio", "src"),
    ("video", "src"),
    ("video", "poster"),
    ("track", "src"),
    ("input", "src"),
    ("object", "data"),
    ("body", "background"),
];

/// Format of a parseable document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Css,
    TextList,
    Sitemap,
    SitemapIndex,
}

/// Looks a MIME type up in the catalog of parseable content
///
/// # Returns
///
/// * `Some(DocumentKind)` - The content can be parsed for links
/// * `None` - The content is not parseable
pub fn parseable_kind(mime: &str) -> Option<DocumentKind> {
    match mime {
        "text/html" | "application/xhtml+xml" | "application/x-httpd-php" => {
            Some(DocumentKind::Html)
        }
        "text/css" => Some(DocumentKind::Css),
        "text/plain+linkchecker" => Some(DocumentKind::TextList),
        "application/xml+sitemap" => Some(DocumentKind::Sitemap),
        "application/xml+sitemapindex" => Some(DocumentKind::SitemapIndex),
        _ => None,
    }
}

/// A link found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    /// The reference as written, entities decoded
    pub url: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Link text or alternative text
    pub name: String,
}

/// Extracted information from a document
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub kind: DocumentKind,

    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Value of the first `<base href>`
    pub base: Option<String>,

    /// All links in document order
    pub links: Vec<DocumentLink>,

    /// Anchor targets of HTML documents
    pub anchors: HashSet<String>,
}

impl ParsedDocument {
    fn empty(kind: DocumentKind) -> Self {
        Self {
            kind,
            title: None,
            base: None,
            links: Vec::new(),
            anchors: HashSet::new(),
        }
    }
}

/// Parses decoded content of a known kind
///
/// # Arguments
///
/// * `kind` - The document format
/// * `text` - The decoded content
///
/// # Returns
///
/// * `Ok(ParsedDocument)` - Successfully parsed document
/// * `Err(CheckFault)` - The content does not have the expected format
pub fn parse_document(kind: DocumentKind, text: &str) -> Result<ParsedDocument, CheckFault> {
    match kind {
        DocumentKind::Html => Ok(parse_html(text)),
        DocumentKind::Css => Ok(parse_css(text)),
        DocumentKind::TextList => Ok(parse_text_list(text)),
        DocumentKind::Sitemap | DocumentKind::SitemapIndex => parse_sitemap(kind, text),
    }
}

fn parse_html(html: &str) -> ParsedDocument {
    let document = Html::parse_document(html);
    let lines = LineIndex::new(html);
    let mut parsed = ParsedDocument::empty(DocumentKind::Html);

    parsed.title = extract_title(&document);
    parsed.base = select_attr(&document, "base[href]", "href")
        .into_iter()
        .next()
        .filter(|href| !href.trim().is_empty());
    parsed.anchors = extract_anchors(&document);

    let Ok(all) = Selector::parse("*") else {
        return parsed;
    };

    let mut cursor = 0;
    for element in document.select(&all) {
        let tag = element.value().name();
        for value in element_links(&element, tag) {
            let (line, column) = match lines.locate(html, &value, cursor) {
                Some((offset, line, column)) => {
                    cursor = offset;
                    (Some(line), Some(column))
                }
                None => (None, None),
            };
            parsed.links.push(DocumentLink {
                url: value,
                line,
                column,
                name: link_name(&element, tag),
            });
        }
    }
    parsed
}

/// Link values of one element, in attribute table order
fn element_links(element: &ElementRef<'_>, tag: &str) -> Vec<String> {
    let mut values: Vec<String> = HTML_LINK_ATTRIBUTES
        .iter()
        .filter(|(name, _)| *name == tag)
        .filter_map(|(_, attr)| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();

    if tag == "meta" {
        let is_refresh = element
            .value()
            .attr("http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case("refresh"));
        if let Some(content) = element.value().attr("content").filter(|_| is_refresh) {
            if let Some(target) = REFRESH_URL.captures(content).and_then(|c| c.get(1)) {
                values.push(target.as_str().trim().to_string());
            }
        }
    }
    values
}

fn link_name(element: &ElementRef<'_>, tag: &str) -> String {
    match tag {
        "a" | "area" => element
            .value()
            .attr("title")
            .map(str::to_string)
            .unwrap_or_else(|| collapse_whitespace(&element.text().collect::<String>())),
        "img" | "input" => element.value().attr("alt").unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_anchors(document: &Html) -> HashSet<String> {
    let mut anchors: HashSet<String> = select_attr(document, "[id]", "id").into_iter().collect();
    anchors.extend(select_attr(document, "a[name]", "name"));
    anchors.remove("");
    anchors
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::to_string)
        .collect()
}

fn parse_css(css: &str) -> ParsedDocument {
    let lines = LineIndex::new(css);
    let mut parsed = ParsedDocument::empty(DocumentKind::Css);

    let mut found: Vec<(usize, &str)> = CSS_URL
        .captures_iter(css)
        .chain(CSS_IMPORT.captures_iter(css))
        .filter_map(|captures| captures.get(1))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    found.sort_by_key(|(offset, _)| *offset);

    for (offset, value) in found {
        let (line, column) = lines.position(css, offset);
        parsed.links.push(DocumentLink {
            url: value.to_string(),
            line: Some(line),
            column: Some(column),
            name: String::new(),
        });
    }
    parsed
}

fn parse_text_list(text: &str) -> ParsedDocument {
    let mut parsed = ParsedDocument::empty(DocumentKind::TextList);
    for (number, line) in text.lines().enumerate() {
        let value = line.trim();
        if value.is_empty() || value.starts_with('#') {
            continue;
        }
        let column = line.len() - line.trim_start().len() + 1;
        parsed.links.push(DocumentLink {
            url: value.to_string(),
            line: Some(number as u32 + 1),
            column: Some(column as u32),
            name: String::new(),
        });
    }
    parsed
}

/// Reads `<loc>` entries of a urlset or sitemap index
///
/// Entries without a parseable absolute location are skipped, malformed
/// XML is a content fault.
fn parse_sitemap(kind: DocumentKind, xml: &str) -> Result<ParsedDocument, CheckFault> {
    let mut parsed = ParsedDocument::empty(kind);
    for entity in SiteMapReader::new(Cursor::new(xml.as_bytes())) {
        let location = match entity {
            SiteMapEntity::Url(entry) => entry.loc.get_url(),
            SiteMapEntity::SiteMap(entry) => entry.loc.get_url(),
            SiteMapEntity::Err(e) => return Err(CheckFault::content(e)),
        };
        if let Some(url) = location {
            parsed.links.push(DocumentLink {
                url: url.to_string(),
                line: None,
                column: None,
                name: String::new(),
            });
        }
    }
    Ok(parsed)
}

/// Byte offsets of line starts, for 1-based line and column lookup
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    /// Line and column (in characters) of a byte offset
    fn position(&self, text: &str, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line - 1];
        let column = text[start..offset].chars().count() + 1;
        (line as u32, column as u32)
    }

    /// Finds `value` at or after `from` and returns its offset and position
    ///
    /// Parsed attribute values are entity decoded, so values that differ
    /// from their source text are not found.
    fn locate(&self, text: &str, value: &str, from: usize) -> Option<(usize, u32, u32)> {
        let offset = from + text.get(from..)?.find(value)?;
        let (line, column) = self.position(text, offset);
        Some((offset, line, column))
    }
}
