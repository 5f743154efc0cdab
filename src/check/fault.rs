//! Fault kinds raised while checking a URL and their translation into
//! result messages

use crate::UrlError;
use std::collections::HashSet;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result messages longer than this are truncated
pub const MAX_RESULT_LENGTH: usize = 240;

/// Raw OS error number of a bad file descriptor (EBADF)
const EBADF: i32 = 9;

/// Every kind of fault a check can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    Syntax,
    Connection,
    Timeout,
    HostNotFound,
    BadHostname,
    SizeLimit,
    Http,
    Io,
    BadDescriptor,
    Content,
    Unsupported,
    Interrupted,
}

/// Table row of a fault kind
#[derive(Debug, Clone, Copy)]
pub struct FaultSpec {
    /// Name used in result messages and in `nocachefaults`
    pub name: &'static str,
    /// Whether an outcome caused by this kind may be cached
    pub cacheable: bool,
}

impl FaultKind {
    pub const ALL: [FaultKind; 12] = [
        FaultKind::Syntax,
        FaultKind::Connection,
        FaultKind::Timeout,
        FaultKind::HostNotFound,
        FaultKind::BadHostname,
        FaultKind::SizeLimit,
        FaultKind::Http,
        FaultKind::Io,
        FaultKind::BadDescriptor,
        FaultKind::Content,
        FaultKind::Unsupported,
        FaultKind::Interrupted,
    ];

    pub fn spec(self) -> FaultSpec {
        let (name, cacheable) = match self {
            Self::Syntax => ("Syntax", true),
            Self::Connection => ("Connection", true),
            Self::Timeout => ("Timeout", true),
            Self::HostNotFound => ("HostNotFound", true),
            Self::BadHostname => ("BadHostname", true),
            Self::SizeLimit => ("SizeLimit", true),
            Self::Http => ("Http", true),
            Self::Io => ("Io", true),
            Self::BadDescriptor => ("BadDescriptor", false),
            Self::Content => ("Content", true),
            Self::Unsupported => ("Unsupported", true),
            Self::Interrupted => ("Interrupted", false),
        };
        FaultSpec { name, cacheable }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Kinds raised by a transport while connecting or reading
    pub fn is_connection(self) -> bool {
        !matches!(self, Self::Syntax | Self::Content | Self::Interrupted)
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fault raised while checking one URL
#[derive(Debug, Clone, Error)]
#[error("{}", self.message())]
pub struct CheckFault {
    pub kind: FaultKind,
    pub detail: Option<String>,
}

impl CheckFault {
    pub fn new(kind: FaultKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            kind,
            detail: (!detail.is_empty()).then_some(detail),
        }
    }

    pub fn bare(kind: FaultKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn host_not_found() -> Self {
        Self::new(FaultKind::HostNotFound, "Hostname not found")
    }

    pub fn bad_hostname(host: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            FaultKind::BadHostname,
            format!("Bad hostname `{}': {}", host, detail),
        )
    }

    pub fn size_limit() -> Self {
        Self::new(FaultKind::SizeLimit, "File size too large")
    }

    /// An HTTP error status, e.g. `404 Not Found`
    pub fn http_status(code: u16, reason: Option<&str>) -> Self {
        match reason {
            Some(reason) => Self::new(FaultKind::Http, format!("{} {}", code, reason)),
            None => Self::new(FaultKind::Http, code.to_string()),
        }
    }

    pub fn content(detail: impl fmt::Display) -> Self {
        Self::new(FaultKind::Content, detail.to_string())
    }

    /// Result message of this fault, before truncation
    ///
    /// Host lookup faults and HTTP statuses carry a complete sentence and are
    /// reported without the kind name.
    pub fn message(&self) -> String {
        match (self.kind, &self.detail) {
            (FaultKind::HostNotFound | FaultKind::BadHostname | FaultKind::Http, Some(detail)) => {
                detail.clone()
            }
            (kind, Some(detail)) => format!("{}: {}", kind, detail),
            (kind, None) => kind.name().to_string(),
        }
    }
}

/// A fault translated into a result message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub message: String,
    /// False when the outcome must not enter the result cache
    pub cacheable: bool,
}

/// Translates a fault into its result message and cache eligibility
///
/// Kinds in `no_cache`, kinds the table marks uncacheable and faults
/// without detail make the outcome uncacheable.
pub fn translate(fault: &CheckFault, no_cache: &HashSet<FaultKind>) -> Translation {
    let cacheable =
        fault.kind.spec().cacheable && !no_cache.contains(&fault.kind) && fault.detail.is_some();
    Translation {
        message: truncate(&fault.message(), MAX_RESULT_LENGTH),
        cacheable,
    }
}

/// Truncates to `max` characters, ending in `...` when shortened
pub fn truncate(message: &str, max: usize) -> String {
    if message.chars().count() <= max {
        return message.to_string();
    }
    let mut truncated: String = message.chars().take(max.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

impl From<io::Error> for CheckFault {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::Interrupted {
            return Self::new(FaultKind::Interrupted, error.to_string());
        }
        if error.raw_os_error() == Some(EBADF) {
            return Self::new(FaultKind::BadDescriptor, error.to_string());
        }
        match error.kind() {
            io::ErrorKind::TimedOut => Self::new(FaultKind::Timeout, error.to_string()),
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe => Self::new(FaultKind::Connection, error.to_string()),
            _ => Self::new(FaultKind::Io, error.to_string()),
        }
    }
}

impl From<reqwest::Error> for CheckFault {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::new(FaultKind::Timeout, error.to_string());
        }
        if let Some(status) = error.status() {
            return Self::http_status(status.as_u16(), status.canonical_reason());
        }
        if let Some(io_error) = find_io_error(&error) {
            if io_error.kind() == io::ErrorKind::Interrupted {
                return Self::new(FaultKind::Interrupted, io_error.to_string());
            }
        }
        let chain = error_chain(&error);
        if error.is_connect() {
            if is_dns_failure(&chain) {
                return Self::host_not_found();
            }
            return Self::new(FaultKind::Connection, chain);
        }
        if error.is_builder() {
            if let Some(host) = error.url().and_then(|u| u.host_str()) {
                return Self::bad_hostname(host, chain);
            }
        }
        if error.is_body() || error.is_decode() {
            return Self::new(FaultKind::Io, chain);
        }
        Self::new(FaultKind::Connection, chain)
    }
}

impl From<UrlError> for CheckFault {
    fn from(error: UrlError) -> Self {
        Self::new(FaultKind::Syntax, error.to_string())
    }
}

/// Joins an error and all its sources into one line
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn find_io_error<'a>(error: &'a (dyn StdError + 'static)) -> Option<&'a io::Error> {
    let mut source: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error);
        }
        source = cause.source();
    }
    None
}

fn is_dns_failure(chain: &str) -> bool {
    let chain = chain.to_lowercase();
    chain.contains("dns error")
        || chain.contains("failed to lookup address")
        || chain.contains("name or service not known")
        || chain.contains("no such host")
        || chain.contains("nodename nor servname")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_cache_default() -> HashSet<FaultKind> {
        [FaultKind::Timeout].into_iter().collect()
    }

    #[test]
    fn test_names_round_trip() {
        for kind in FaultKind::ALL {
            assert_eq!(FaultKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(FaultKind::from_name("Gremlins"), None);
    }

    #[test]
    fn test_size_limit_is_connection_fault() {
        assert!(FaultKind::SizeLimit.is_connection());
        assert!(FaultKind::Timeout.is_connection());
        assert!(!FaultKind::Syntax.is_connection());
        assert!(!FaultKind::Content.is_connection());
    }

    #[test]
    fn test_generic_message() {
        let fault = CheckFault::new(FaultKind::Connection, "connection refused");
        let translation = translate(&fault, &no_cache_default());
        assert_eq!(translation.message, "Connection: connection refused");
        assert!(translation.cacheable);
    }

    #[test]
    fn test_specialized_messages() {
        assert_eq!(
            translate(&CheckFault::host_not_found(), &HashSet::new()).message,
            "Hostname not found"
        );
        assert_eq!(
            translate(&CheckFault::bad_hostname("bad_host", "invalid label"), &HashSet::new())
                .message,
            "Bad hostname `bad_host': invalid label"
        );
        assert_eq!(
            translate(&CheckFault::http_status(404, Some("Not Found")), &HashSet::new()).message,
            "404 Not Found"
        );
    }

    #[test]
    fn test_truncated_to_240() {
        let fault = CheckFault::new(FaultKind::Io, "x".repeat(500));
        let message = translate(&fault, &HashSet::new()).message;
        assert_eq!(message.chars().count(), 240);
        assert!(message.starts_with("Io: xxx"));
        assert!(message.ends_with("..."));

        let exact = CheckFault::new(FaultKind::Io, "y".repeat(236));
        let message = translate(&exact, &HashSet::new()).message;
        assert_eq!(message.chars().count(), 240);
        assert!(!message.ends_with("..."));
    }

    #[test]
    fn test_no_cache_kinds() {
        let timeout = CheckFault::new(FaultKind::Timeout, "operation timed out");
        assert!(!translate(&timeout, &no_cache_default()).cacheable);
        assert!(translate(&timeout, &HashSet::new()).cacheable);
    }

    #[test]
    fn test_bad_descriptor_never_cached() {
        let fault = CheckFault::from(io::Error::from_raw_os_error(EBADF));
        assert_eq!(fault.kind, FaultKind::BadDescriptor);
        assert!(!translate(&fault, &HashSet::new()).cacheable);
    }

    #[test]
    fn test_fault_without_detail_not_cached() {
        let fault = CheckFault::bare(FaultKind::Connection);
        let translation = translate(&fault, &HashSet::new());
        assert_eq!(translation.message, "Connection");
        assert!(!translation.cacheable);
    }

    #[test]
    fn test_io_error_kinds() {
        let interrupted = io::Error::new(io::ErrorKind::Interrupted, "ctrl-c");
        assert_eq!(CheckFault::from(interrupted).kind, FaultKind::Interrupted);

        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(CheckFault::from(refused).kind, FaultKind::Connection);

        let missing = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let fault = CheckFault::from(missing);
        assert_eq!(fault.kind, FaultKind::Io);
        assert_eq!(fault.message(), "Io: no such file");
    }

    #[test]
    fn test_url_error_is_syntax() {
        let fault = CheckFault::from(UrlError::EmptyHost);
        assert_eq!(fault.kind, FaultKind::Syntax);
        assert_eq!(fault.message(), "Syntax: URL has empty hostname");
    }
}
