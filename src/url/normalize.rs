use crate::UrlError;
use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use url::{ParseError, Url};

static WAYBACK_SLASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(https?)(:|%3[aA])/([^/])").expect("WAYBACK_SLASH: hardcoded regex is valid")
});

/// Parses a reference, optionally joined against a base URL
///
/// Percent-encoding, IDNA host encoding and dot-segment removal happen here.
/// Query strings are encoded with the declared document encoding; unknown
/// encoding labels fall back to UTF-8.
pub fn parse_reference(
    reference: &str,
    base: Option<&Url>,
    encoding: Option<&str>,
) -> Result<Url, UrlError> {
    let encoding = encoding
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8);
    let encode = encoder(move |s: &str| encoding.encode(s).0);

    let mut options = Url::options().base_url(base);
    if encoding != UTF_8 {
        options = options.encoding_override(Some(&encode));
    }
    options
        .parse(reference)
        .map_err(|e| map_parse_error(e, reference))
}

/// Turns a scheme-less reference without any context into a URL
///
/// `www.` hosts become `http://`, `ftp.` hosts become `ftp://`, anything
/// else is taken as a local path relative to the working directory.
pub fn guess_url(reference: &str, encoding: Option<&str>) -> Result<Url, UrlError> {
    let lower = reference.to_ascii_lowercase();
    if lower.starts_with("www.") {
        return parse_reference(&format!("http://{}", reference), None, encoding);
    }
    if lower.starts_with("ftp.") {
        return parse_reference(&format!("ftp://{}", reference), None, encoding);
    }

    let cwd = std::env::current_dir()
        .map_err(|e| UrlError::Malformed(format!("{}: {}", reference, e)))?;
    let path = cwd.join(reference);
    Url::from_file_path(&path)
        .map_err(|_| UrlError::Malformed(format!("{}: not a valid local path", reference)))
}

/// Returns true when the reference starts with a URL scheme
pub fn has_scheme(reference: &str) -> bool {
    match reference.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Collapses redundant path segments
///
/// Runs of slashes shrink to one, `.` segments vanish and `..` removes the
/// preceding segment. A trailing slash is preserved.
pub fn collapse_segments(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    let mut trailing_slash = path.ends_with('/');

    let pieces: Vec<&str> = path.split('/').collect();
    let last = pieces.len() - 1;
    for (i, segment) in pieces.into_iter().enumerate() {
        match segment {
            "" => continue,
            "." => {
                if i == last {
                    trailing_slash = true;
                }
            }
            ".." => {
                segments.pop();
                if i == last {
                    trailing_slash = true;
                }
            }
            _ => segments.push(segment),
        }
    }

    let mut result = String::with_capacity(path.len());
    if absolute {
        result.push('/');
    }
    result.push_str(&segments.join("/"));
    if trailing_slash && !segments.is_empty() {
        result.push('/');
    }
    result
}

/// Restores the second slash of `http://` embedded in web archive paths
///
/// Segment collapsing turns `/web/2020/http://example.com/` into
/// `/web/2020/http:/example.com/`; this undoes that.
pub fn fix_wayback(path: &str) -> Cow<'_, str> {
    WAYBACK_SLASH.replace_all(path, "$1$2//$3")
}

/// Decodes `%XX` escapes, keeping malformed escapes as they are
pub fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let high = (bytes[i + 1] as char).to_digit(16);
            let low = (bytes[i + 2] as char).to_digit(16);
            if let (Some(high), Some(low)) = (high, low) {
                out.push((high * 16 + low) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Extracts the literal host text of an absolute reference
///
/// Userinfo and port are stripped, case is kept. Returns `None` for relative
/// references and references without an authority.
pub fn raw_host(reference: &str) -> Option<&str> {
    let (_, rest) = reference.split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host_port = authority
        .rsplit_once('@')
        .map(|(_, h)| h)
        .unwrap_or(authority);

    if host_port.starts_with('[') {
        let close = host_port.find(']')?;
        return Some(&host_port[..=close]);
    }
    Some(
        host_port
            .split_once(':')
            .map(|(h, _)| h)
            .unwrap_or(host_port),
    )
}

fn map_parse_error(error: ParseError, reference: &str) -> UrlError {
    match error {
        ParseError::EmptyHost => UrlError::EmptyHost,
        ParseError::IdnaError | ParseError::InvalidDomainCharacter => {
            UrlError::UnparsableDomain(raw_host(reference).unwrap_or(reference).to_string())
        }
        ParseError::InvalidPort => {
            UrlError::InvalidPort(raw_host(reference).unwrap_or(reference).to_string())
        }
        other => UrlError::Malformed(format!("{}: {}", reference, other)),
    }
}

/// Pins a closure to the higher-ranked signature the url crate expects
fn encoder<F>(f: F) -> F
where
    F: for<'s> Fn(&'s str) -> Cow<'s, [u8]>,
{
    f
}
