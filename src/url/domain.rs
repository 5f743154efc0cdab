use url::Url;

/// Derives the intern pattern of a seed URL
///
/// For `http(s)` the pattern accepts both schemes, an optional `www.` prefix
/// and everything below the directory of the seed's path:
/// `http://www.example.com:8080/docs/index.html` gives
/// `^https?://(www\.|)example\.com:8080/docs`. For `file` URLs the pattern
/// covers the seed's directory. Other schemes derive no pattern.
///
/// # Arguments
///
/// * `url` - The normalized seed URL
///
/// # Returns
///
/// * `Some(String)` - Regular expression source for the intern list
/// * `None` - The scheme has no notion of a containing site
pub fn intern_pattern(url: &Url) -> Option<String> {
    match url.scheme() {
        "http" | "https" => {
            let host = url.host_str()?.to_lowercase();
            let host = host.strip_prefix("www.").unwrap_or(&host);
            if host.is_empty() {
                return None;
            }
            let authority = match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            Some(format!(
                r"^https?://(www\.|){}{}",
                regex::escape(&authority),
                regex::escape(&directory_of(url.path()))
            ))
        }
        "file" => Some(format!(
            "^file://{}",
            regex::escape(&directory_of(url.path()))
        )),
        _ => None,
    }
}

/// Drops the last path segment, keeping the slash when the path ends in one
fn directory_of(path: &str) -> String {
    let path = path.split(';').next().unwrap_or(path);
    let mut dir = match path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    };
    if path.ends_with('/') {
        dir.push('/');
    }
    dir
}
