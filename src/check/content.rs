//! Bounded download, content type detection and text decoding

use crate::check::fault::CheckFault;
use crate::check::transport::Connection;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::bytes::Regex;
use std::sync::LazyLock;

/// Size of a single read from a connection
pub const READ_CHUNK_BYTES: usize = 16 * 1024;

/// Number of leading bytes searched for a `<meta charset>` declaration
const SNIFF_BYTES: usize = 1024;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([a-z0-9_\-:.]+)"#)
        .expect("META_CHARSET: hardcoded regex is valid")
});

/// A value computed on first use
///
/// A failed computation is remembered so that it is not retried.
#[derive(Debug, Clone, Default)]
pub enum Lazy<T> {
    #[default]
    NotFetched,
    Fetched(T),
    Failed,
}

impl<T> Lazy<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Lazy::Fetched(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Lazy::Failed)
    }
}

/// Reads the whole body of a connection
///
/// Reading stops with a size limit fault as soon as the next chunk would
/// push the buffer past `max_bytes`; the partial data is dropped.
///
/// # Arguments
///
/// * `conn` - The open connection
/// * `max_bytes` - Download cap in bytes
///
/// # Returns
///
/// * `Ok(Vec<u8>)` - The complete body, never longer than `max_bytes`
/// * `Err(CheckFault)` - A read failure or the size limit fault
pub async fn download(conn: &mut dyn Connection, max_bytes: u64) -> Result<Vec<u8>, CheckFault> {
    let mut buffer = Vec::new();
    while let Some(chunk) = conn.read_chunk(READ_CHUNK_BYTES).await? {
        if (buffer.len() + chunk.len()) as u64 > max_bytes {
            tracing::debug!(
                "Download aborted after {} bytes, cap is {}",
                buffer.len(),
                max_bytes
            );
            return Err(CheckFault::size_limit());
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}

/// Splits a raw `Content-Type` value into the lowercase MIME type and the
/// `charset` parameter, if any
pub fn parse_content_type(raw: &str) -> (String, Option<String>) {
    let mut pieces = raw.split(';');
    let mime = pieces
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let charset = pieces.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_string())
    });
    (mime, charset)
}

/// Refines a MIME type by the file name of the URL path
///
/// XML files named like sitemaps become sitemap types and `.urls` files
/// become plain URL lists.
pub fn refine_mime(mime: &str, path: &str) -> String {
    let filename = path.rsplit('/').next().unwrap_or_default().to_ascii_lowercase();
    let is_xml = matches!(mime, "application/xml" | "text/xml");

    if is_xml && (filename.starts_with("sitemap_index") || filename.starts_with("sitemapindex")) {
        return "application/xml+sitemapindex".to_string();
    }
    if is_xml && filename.starts_with("sitemap") {
        return "application/xml+sitemap".to_string();
    }
    if filename.ends_with(".urls") && (mime.is_empty() || mime == "text/plain") {
        return "text/plain+linkchecker".to_string();
    }
    mime.to_string()
}

/// Decodes fetched bytes into text
///
/// The declared charset wins, then a byte order mark, then a `<meta
/// charset>` near the top of the document. Undeclared content is UTF-8 when
/// it is valid UTF-8 and windows-1252 otherwise.
///
/// # Returns
///
/// The decoded text and the name of the encoding used
pub fn decode(data: &[u8], declared: Option<&str>) -> (String, &'static str) {
    let declared = declared.and_then(|label| Encoding::for_label(label.as_bytes()));
    let encoding = declared
        .or_else(|| Encoding::for_bom(data).map(|(encoding, _)| encoding))
        .or_else(|| sniff_meta_charset(data));

    if let Some(encoding) = encoding {
        let (text, used, _) = encoding.decode(data);
        return (text.into_owned(), used.name());
    }

    match std::str::from_utf8(data) {
        Ok(text) => (text.to_string(), UTF_8.name()),
        Err(_) => {
            let (text, used, _) = WINDOWS_1252.decode(data);
            (text.into_owned(), used.name())
        }
    }
}

fn sniff_meta_charset(data: &[u8]) -> Option<&'static Encoding> {
    let head = &data[..data.len().min(SNIFF_BYTES)];
    let label = META_CHARSET.captures(head)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::fault::FaultKind;
    use crate::check::transport::MemoryConnection;

    #[tokio::test]
    async fn test_download_within_cap() {
        let mut conn = MemoryConnection::new(None, vec![b'x'; 40_000]);
        let body = download(&mut conn, 40_000).await.unwrap();
        assert_eq!(body.len(), 40_000);
    }

    #[tokio::test]
    async fn test_download_over_cap_fails() {
        let mut conn = MemoryConnection::new(None, vec![b'x'; 40_001]);
        let fault = download(&mut conn, 40_000).await.err().unwrap();
        assert_eq!(fault.kind, FaultKind::SizeLimit);
        assert_eq!(fault.message(), "SizeLimit: File size too large");
    }

    #[tokio::test]
    async fn test_download_empty_body() {
        let mut conn = MemoryConnection::new(None, Vec::new());
        assert!(download(&mut conn, 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_parse_content_type() {
        assert_eq!(
            parse_content_type("Text/HTML; charset=\"ISO-8859-1\""),
            ("text/html".to_string(), Some("ISO-8859-1".to_string()))
        );
        assert_eq!(parse_content_type("text/css"), ("text/css".to_string(), None));
        assert_eq!(parse_content_type(""), (String::new(), None));
    }

    #[test]
    fn test_refine_mime() {
        assert_eq!(
            refine_mime("application/xml", "/sitemap.xml"),
            "application/xml+sitemap"
        );
        assert_eq!(
            refine_mime("text/xml", "/sitemap_index.xml"),
            "application/xml+sitemapindex"
        );
        assert_eq!(refine_mime("application/xml", "/feed.xml"), "application/xml");
        assert_eq!(refine_mime("text/plain", "/list.urls"), "text/plain+linkchecker");
        assert_eq!(refine_mime("text/html", "/index.html"), "text/html");
    }

    #[test]
    fn test_decode_declared_charset() {
        let (text, used) = decode(b"caf\xe9", Some("iso-8859-1"));
        assert_eq!(text, "café");
        assert_eq!(used, "windows-1252");
    }

    #[test]
    fn test_decode_meta_charset() {
        let html = b"<html><head><meta charset=\"windows-1252\"></head>\xe9</html>";
        let (text, used) = decode(html, None);
        assert!(text.contains('é'));
        assert_eq!(used, "windows-1252");
    }

    #[test]
    fn test_decode_fallbacks() {
        assert_eq!(decode("héllo".as_bytes(), None), ("héllo".to_string(), "UTF-8"));
        assert_eq!(decode(b"h\xe9llo", None), ("héllo".to_string(), "windows-1252"));
        assert_eq!(decode(b"\xef\xbb\xbfbom", None), ("bom".to_string(), "UTF-8"));
    }
}
