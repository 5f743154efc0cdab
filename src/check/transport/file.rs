//! Local `file://` transport

use crate::check::fault::{CheckFault, FaultKind};
use crate::check::transport::{Connection, MemoryConnection, Transport};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use url::Url;

/// Transport for local files and directories
///
/// Directories are served as an HTML listing so that recursion descends
/// into them.
pub struct FileTransport;

#[async_trait]
impl Transport for FileTransport {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn open(&self, url: &Url) -> Result<Box<dyn Connection>, CheckFault> {
        let path = url
            .to_file_path()
            .map_err(|_| CheckFault::new(FaultKind::Io, format!("{} is not a local path", url)))?;
        let metadata = tokio::fs::metadata(&path).await?;
        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        if metadata.is_dir() {
            let listing = directory_listing(url, &path).await?;
            return Ok(Box::new(
                MemoryConnection::new(Some("text/html".to_string()), listing.into_bytes())
                    .with_last_modified(modified),
            ));
        }

        let file = File::open(&path).await?;
        Ok(Box::new(FileConnection {
            file,
            content_type: guess_mime(&path).map(str::to_string),
            length: metadata.len(),
            modified,
        }))
    }
}

struct FileConnection {
    file: File,
    content_type: Option<String>,
    length: u64,
    modified: Option<DateTime<Utc>>,
}

#[async_trait]
impl Connection for FileConnection {
    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn content_length(&self) -> Option<u64> {
        Some(self.length)
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    async fn read_chunk(&mut self, max: usize) -> Result<Option<Vec<u8>>, CheckFault> {
        let mut buf = vec![0u8; max];
        let n = self.file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

/// Guesses a MIME type from the file extension
pub fn guess_mime(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "html" | "htm" | "shtml" => "text/html",
        "xhtml" | "xht" => "application/xhtml+xml",
        "php" => "application/x-httpd-php",
        "css" => "text/css",
        "txt" => "text/plain",
        "urls" => "text/plain+linkchecker",
        "xml" => "application/xml",
        "json" => "application/json",
        "js" => "application/javascript",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

/// Renders a directory as an HTML page linking each entry
async fn directory_listing(url: &Url, path: &Path) -> Result<String, CheckFault> {
    let mut base = url.clone();
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }

    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await?.is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let mut html = format!(
        "<html><head><title>{}</title></head><body>\n",
        escape_html(&path.display().to_string())
    );
    for name in names {
        let href = base
            .join(&name)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| name.clone());
        html.push_str(&format!(
            "<a href=\"{}\">{}</a>\n",
            escape_html(&href),
            escape_html(&name)
        ));
    }
    html.push_str("</body></html>\n");
    Ok(html)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
