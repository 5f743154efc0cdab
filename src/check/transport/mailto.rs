//! `mailto:` transport, a syntax check of the addresses

use crate::check::fault::{CheckFault, FaultKind};
use crate::check::transport::{Connection, MemoryConnection, Transport};
use crate::url::percent_decode;
use async_trait::async_trait;
use url::Url;

/// Transport for `mailto:` URLs
///
/// Opening validates every address without contacting any mail server.
/// The connection has no content.
pub struct MailtoTransport;

#[async_trait]
impl Transport for MailtoTransport {
    fn name(&self) -> &'static str {
        "mailto"
    }

    async fn open(&self, url: &Url) -> Result<Box<dyn Connection>, CheckFault> {
        let addresses = addresses(url);
        if addresses.is_empty() {
            return Err(CheckFault::new(
                FaultKind::Syntax,
                format!("No mail addresses found in `{}'.", url),
            ));
        }
        for address in &addresses {
            check_address(address)?;
        }
        tracing::debug!("Mail addresses {:?} are syntactically valid", addresses);
        Ok(Box::new(MemoryConnection::new(None, Vec::new())))
    }

    fn allows_recursion(&self) -> bool {
        false
    }
}

/// Collects the addresses of the path and of `to`, `cc` and `bcc` headers
fn addresses(url: &Url) -> Vec<String> {
    let mut found: Vec<String> = url
        .path()
        .split(',')
        .map(|a| percent_decode(a.trim()))
        .filter(|a| !a.is_empty())
        .collect();
    for (key, value) in url.query_pairs() {
        if matches!(key.to_ascii_lowercase().as_str(), "to" | "cc" | "bcc") {
            found.extend(
                value
                    .split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty()),
            );
        }
    }
    found
}

fn check_address(address: &str) -> Result<(), CheckFault> {
    let Some((local, domain)) = address.rsplit_once('@') else {
        return Err(CheckFault::new(
            FaultKind::Syntax,
            format!("Missing `@' in mail address `{}'.", address),
        ));
    };
    if local.is_empty() {
        return Err(CheckFault::new(
            FaultKind::Syntax,
            format!("Missing local part of mail address `{}'.", address),
        ));
    }
    if domain.is_empty() || !domain.contains('.') || domain.starts_with('.') {
        return Err(CheckFault::new(
            FaultKind::Syntax,
            format!("Invalid domain part of mail address `{}'.", address),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open(url: &str) -> Result<Box<dyn Connection>, CheckFault> {
        MailtoTransport.open(&Url::parse(url).unwrap()).await
    }

    #[tokio::test]
    async fn test_valid_addresses() {
        assert!(open("mailto:someone@example.com").await.is_ok());
        assert!(open("mailto:a@example.com,b@example.org?cc=c@example.net")
            .await
            .is_ok());
        assert!(open("mailto:John%20Doe@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_addresses() {
        let fault = open("mailto:someone").await.err().unwrap();
        assert_eq!(fault.kind, FaultKind::Syntax);
        assert_eq!(
            fault.message(),
            "Syntax: Missing `@' in mail address `someone'."
        );

        assert!(open("mailto:@example.com").await.is_err());
        assert!(open("mailto:someone@localhost").await.is_err());
        assert!(open("mailto:").await.is_err());
        assert!(open("mailto:ok@example.com?to=broken").await.is_err());
    }

    #[test]
    fn test_no_recursion() {
        assert!(!MailtoTransport.allows_recursion());
    }
}
