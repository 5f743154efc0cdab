use crate::check::WarningTag;
use crate::url::ip::obfuscated_ip;
use crate::url::normalize::{
    collapse_segments, fix_wayback, guess_url, has_scheme, parse_reference, raw_host,
};
use crate::url::{default_port, UrlParts};
use crate::UrlError;
use url::Url;

/// Schemes whose URLs must name a host
pub const SCHEMES_REQUIRING_HOST: &[&str] = &["http", "https", "ftp"];

/// Document context a reference was found in
#[derive(Debug, Clone, Copy)]
pub struct UrlContext<'a> {
    /// Value of a `<base href>` in the parent document
    pub base_ref: Option<&'a str>,
    /// URL of the document containing the reference
    pub parent_url: Option<&'a str>,
    /// Declared text encoding of the parent document
    pub encoding: Option<&'a str>,
    /// Longer URLs get a warning
    pub max_url_length: usize,
}

impl Default for UrlContext<'_> {
    fn default() -> Self {
        Self {
            base_ref: None,
            parent_url: None,
            encoding: None,
            max_url_length: 2000,
        }
    }
}

/// Outcome of building one URL
#[derive(Debug, Clone)]
pub struct BuiltUrl {
    /// Absolute, normalized URL
    pub url: Url,
    /// Decomposition of `url`
    pub parts: UrlParts,
    /// Base reference made absolute, if one was given
    pub base_ref: Option<String>,
    /// Warnings raised while building, in order
    pub warnings: Vec<(WarningTag, String)>,
}

impl BuiltUrl {
    /// The URL used to deduplicate fetches
    ///
    /// The fragment is dropped unless fragments matter to the check.
    pub fn cache_key(&self, keep_fragment: bool) -> String {
        if keep_fragment {
            self.url.to_string()
        } else {
            let mut url = self.url.clone();
            url.set_fragment(None);
            url.to_string()
        }
    }
}

/// Builds an absolute, normalized URL out of a trimmed reference
///
/// Resolution order: the base reference (itself resolved against the
/// parent when it has no scheme), then the parent URL without its fragment,
/// then the reference on its own. Scheme-less references without any context
/// are guessed. No network access happens here.
///
/// # Arguments
///
/// * `reference` - The reference, already trimmed
/// * `ctx` - Document context of the reference
///
/// # Returns
///
/// * `Ok(BuiltUrl)` - The URL with any warnings raised on the way
/// * `Err(UrlError)` - A syntax fault
pub fn build_url(reference: &str, ctx: &UrlContext<'_>) -> Result<BuiltUrl, UrlError> {
    if reference.is_empty() && ctx.parent_url.is_none() && ctx.base_ref.is_none() {
        return Err(UrlError::Empty);
    }

    let parent = match ctx.parent_url {
        Some(parent) => {
            let mut parent = parse_reference(parent, None, None)?;
            parent.set_fragment(None);
            Some(parent)
        }
        None => None,
    };

    let base = match ctx.base_ref {
        Some(base_ref) if base_ref.contains(':') => Some(parse_reference(base_ref, None, None)?),
        Some(base_ref) => Some(parse_reference(base_ref, parent.as_ref(), None)?),
        None => parent,
    };

    let mut url = match &base {
        Some(base) => parse_reference(reference, Some(base), ctx.encoding)?,
        None if has_scheme(reference) => parse_reference(reference, None, ctx.encoding)?,
        None => guess_url(reference, ctx.encoding)?,
    };

    let parsed = url.to_string();
    let mut warnings = Vec::new();

    if !url.cannot_be_a_base() {
        let path = url.path().to_string();
        let collapsed = collapse_segments(&path);
        let fixed = if url.scheme().starts_with("feed") {
            collapsed
        } else {
            fix_wayback(&collapsed).into_owned()
        };
        if fixed != path {
            url.set_path(&fixed);
        }
    }

    if SCHEMES_REQUIRING_HOST.contains(&url.scheme()) {
        if url.host_str().map_or(true, str::is_empty) {
            return Err(UrlError::EmptyHost);
        }
        let source = host_source(reference, ctx);
        if let Some(ip) = raw_host(source).and_then(obfuscated_ip) {
            let canonical = ip.to_string();
            if url.host_str() != Some(canonical.as_str()) {
                url.set_host(Some(&canonical))
                    .map_err(|e| UrlError::Malformed(format!("{}: {}", reference, e)))?;
            }
            warnings.push((
                WarningTag::UrlObfuscatedIp,
                format!("URL {} has obfuscated IP address {}", source, ip),
            ));
        }
    }

    let default = default_port(url.scheme());
    if default != 0 && url.port() == Some(default) {
        url.set_port(None)
            .map_err(|_| UrlError::InvalidPort(url.host_str().unwrap_or_default().to_string()))?;
    }

    if url.as_str() != parsed {
        warnings.push((
            WarningTag::UrlEffectiveUrl,
            format!("Effective URL {}.", url),
        ));
    }

    let length = url.as_str().len();
    if length > ctx.max_url_length && url.scheme() != "data" {
        warnings.push((
            WarningTag::UrlTooLong,
            format!(
                "URL length {} is longer than {}.",
                length, ctx.max_url_length
            ),
        ));
    }

    Ok(BuiltUrl {
        parts: UrlParts::from_url(&url),
        url,
        base_ref: base_ref_string(ctx.base_ref, &base),
        warnings,
    })
}

/// The text whose literal host ends up in the resolved URL
///
/// References without an authority take their host from the base reference,
/// or from the parent when the base is relative or missing.
fn host_source<'a>(reference: &'a str, ctx: &UrlContext<'a>) -> &'a str {
    if raw_host(reference).is_some() || reference.starts_with("//") {
        return reference;
    }
    ctx.base_ref
        .filter(|base_ref| raw_host(base_ref).is_some())
        .or(ctx.parent_url)
        .unwrap_or(reference)
}

fn base_ref_string(base_ref: Option<&str>, resolved: &Option<Url>) -> Option<String> {
    base_ref?;
    resolved.as_ref().map(Url::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(reference: &str) -> BuiltUrl {
        build_url(reference, &UrlContext::default()).unwrap()
    }

    fn tags(built: &BuiltUrl) -> Vec<WarningTag> {
        built.warnings.iter().map(|(tag, _)| *tag).collect()
    }

    #[test]
    fn test_absolute_url_normalized() {
        let built = build("http://Example.com:80/a/../b");
        assert_eq!(built.url.as_str(), "http://example.com/b");
        assert_eq!(built.parts.host, "example.com");
        assert_eq!(built.parts.port, 80);
        assert_eq!(built.parts.path, "/b");
        assert!(built.warnings.is_empty());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for raw in [
            "http://Example.com:80/a/../b",
            "https://x.test/dir//sub/./page.html?q=1#frag",
            "http://x.test/web/2020/http://y.test/",
            "ftp://ftp.example.com/pub/",
            "mailto:someone@example.com",
        ] {
            let first = build(raw);
            let second = build(first.url.as_str());
            assert_eq!(first.url, second.url, "not a fixed point: {}", raw);
            assert!(second.warnings.is_empty(), "warnings for {}", second.url);
        }
    }

    #[test]
    fn test_relative_against_parent() {
        let ctx = UrlContext {
            parent_url: Some("http://x.test/dir/page.html#top"),
            ..UrlContext::default()
        };
        let built = build_url("foo.html", &ctx).unwrap();
        assert_eq!(built.url.as_str(), "http://x.test/dir/foo.html");
        assert!(built.warnings.is_empty());
    }

    #[test]
    fn test_empty_reference_resolves_to_parent() {
        let ctx = UrlContext {
            parent_url: Some("http://x.test/dir/page.html#top"),
            ..UrlContext::default()
        };
        let built = build_url("", &ctx).unwrap();
        assert_eq!(built.url.as_str(), "http://x.test/dir/page.html");
    }

    #[test]
    fn test_empty_reference_without_parent() {
        assert_eq!(
            build_url("", &UrlContext::default()).unwrap_err(),
            UrlError::Empty
        );
    }

    #[test]
    fn test_relative_base_ref_joined_against_parent() {
        let ctx = UrlContext {
            base_ref: Some("/other/"),
            parent_url: Some("http://x.test/dir/page.html"),
            ..UrlContext::default()
        };
        let built = build_url("foo.html", &ctx).unwrap();
        assert_eq!(built.url.as_str(), "http://x.test/other/foo.html");
        assert_eq!(built.base_ref.as_deref(), Some("http://x.test/other/"));
    }

    #[test]
    fn test_absolute_base_ref() {
        let ctx = UrlContext {
            base_ref: Some("https://cdn.test/assets/"),
            parent_url: Some("http://x.test/dir/page.html"),
            ..UrlContext::default()
        };
        let built = build_url("app.css", &ctx).unwrap();
        assert_eq!(built.url.as_str(), "https://cdn.test/assets/app.css");
    }

    #[test]
    fn test_effective_url_warning_for_collapsed_slashes() {
        let built = build("http://x.test/a//b");
        assert_eq!(built.url.as_str(), "http://x.test/a/b");
        assert_eq!(tags(&built), vec![WarningTag::UrlEffectiveUrl]);
        assert_eq!(built.warnings[0].1, "Effective URL http://x.test/a/b.");
    }

    #[test]
    fn test_wayback_path_preserved() {
        let built = build("http://archive.test/web/2020/http://example.com/");
        assert_eq!(
            built.url.as_str(),
            "http://archive.test/web/2020/http://example.com/"
        );
        assert!(built.warnings.is_empty());
    }

    #[test]
    fn test_obfuscated_ip() {
        let built = build("http://0x7f.1/x");
        assert_eq!(built.url.as_str(), "http://127.0.0.1/x");
        assert_eq!(tags(&built), vec![WarningTag::UrlObfuscatedIp]);
        assert_eq!(
            built.warnings[0].1,
            "URL http://0x7f.1/x has obfuscated IP address 127.0.0.1"
        );
    }

    #[test]
    fn test_obfuscated_ip_of_base_ref() {
        let ctx = UrlContext {
            base_ref: Some("http://0x7f.1/docs/"),
            parent_url: Some("http://x.test/page.html"),
            ..UrlContext::default()
        };
        let built = build_url("a.html", &ctx).unwrap();
        assert_eq!(built.url.as_str(), "http://127.0.0.1/docs/a.html");
        assert_eq!(tags(&built), vec![WarningTag::UrlObfuscatedIp]);
        assert_eq!(
            built.warnings[0].1,
            "URL http://0x7f.1/docs/ has obfuscated IP address 127.0.0.1"
        );
    }

    #[test]
    fn test_relative_base_ref_uses_parent_host() {
        let ctx = UrlContext {
            base_ref: Some("/docs/"),
            parent_url: Some("http://x.test/page.html"),
            ..UrlContext::default()
        };
        let built = build_url("a.html", &ctx).unwrap();
        assert!(built.warnings.is_empty());
    }

    #[test]
    fn test_plain_ip_not_obfuscated() {
        let built = build("http://127.0.0.1/x");
        assert!(built.warnings.is_empty());
    }

    #[test]
    fn test_default_port_of_non_special_scheme_dropped() {
        let built = build("nntps://news.test:563/group");
        assert_eq!(built.url.as_str(), "nntps://news.test/group");
        assert_eq!(built.parts.port, 563);
    }

    #[test]
    fn test_non_default_port_kept() {
        let built = build("http://x.test:8080/");
        assert_eq!(built.url.as_str(), "http://x.test:8080/");
        assert_eq!(built.parts.authority(), "x.test:8080");
    }

    #[test]
    fn test_too_long_warning() {
        let ctx = UrlContext {
            max_url_length: 30,
            ..UrlContext::default()
        };
        let at_limit = format!("http://x.test/{}", "a".repeat(16));
        assert_eq!(at_limit.len(), 30);
        assert!(build_url(&at_limit, &ctx).unwrap().warnings.is_empty());

        let over = format!("http://x.test/{}", "a".repeat(17));
        let built = build_url(&over, &ctx).unwrap();
        assert_eq!(tags(&built), vec![WarningTag::UrlTooLong]);
        assert_eq!(built.warnings[0].1, "URL length 31 is longer than 30.");
    }

    #[test]
    fn test_data_url_never_too_long() {
        let ctx = UrlContext {
            max_url_length: 10,
            ..UrlContext::default()
        };
        let built = build_url("data:text/plain,hello%20world", &ctx).unwrap();
        assert!(built.warnings.is_empty());
    }

    #[test]
    fn test_syntax_faults() {
        let ctx = UrlContext::default();
        assert_eq!(build_url("http://", &ctx).unwrap_err(), UrlError::EmptyHost);
        assert_eq!(
            build_url("http://x.test:port/", &ctx).unwrap_err(),
            UrlError::InvalidPort("x.test".to_string())
        );
    }

    #[test]
    fn test_cache_key() {
        let built = build("http://x.test/page.html#section");
        assert_eq!(built.cache_key(false), "http://x.test/page.html");
        assert_eq!(built.cache_key(true), "http://x.test/page.html#section");
    }

    #[test]
    fn test_scheme_guessing() {
        assert_eq!(build("www.x.test").url.as_str(), "http://www.x.test/");
        assert_eq!(build("index.html").url.scheme(), "file");
    }
}
