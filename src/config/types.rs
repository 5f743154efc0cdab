use serde::Deserialize;

/// Main configuration structure for Sumi-Check
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub checking: CheckingConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    /// Ordered extern patterns; the first match wins
    pub externlinks: Vec<LinkPatternConfig>,
    /// Ordered intern patterns; consulted only when no extern pattern matches
    pub internlinks: Vec<LinkPatternConfig>,
    /// Ordered (url, message) regex pairs turning matching errors into valid results
    pub ignoreerrors: Vec<IgnoreErrorConfig>,
}

/// Checking behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckingConfig {
    /// Maximum recursion depth from seed URLs, -1 for unbounded
    #[serde(rename = "recursionlevel")]
    pub recursion_level: i32,

    /// Maximum number of bytes downloaded per URL
    #[serde(rename = "maxfilesizedownload")]
    pub max_file_size_download: u64,

    /// Maximum content size (bytes) still parsed for child links
    #[serde(rename = "maxfilesizeparse")]
    pub max_file_size_parse: u64,

    /// Whether extern URLs are fetched (true) or only syntax checked (false)
    #[serde(rename = "checkextern")]
    pub check_extern: bool,

    /// URLs longer than this get a warning
    #[serde(rename = "maxurllength")]
    pub max_url_length: usize,

    /// Number of URLs checked concurrently
    pub threads: u32,

    /// Dump per-URL check state into the log
    pub trace: bool,

    /// Transport timeout in seconds
    pub timeout: u64,

    /// Warning tags downgraded to info messages
    #[serde(rename = "ignorewarnings")]
    pub ignore_warnings: Vec<String>,

    /// Fault kinds whose outcome must not be cached
    #[serde(rename = "nocachefaults")]
    pub no_cache_faults: Vec<String>,

    /// Enabled plugin names
    #[serde(rename = "enabledplugins")]
    pub enabled_plugins: Vec<String>,
}

impl Default for CheckingConfig {
    fn default() -> Self {
        Self {
            recursion_level: -1,
            max_file_size_download: 5 * 1024 * 1024,
            max_file_size_parse: 1024 * 1024,
            check_extern: false,
            max_url_length: 2000,
            threads: 10,
            trace: false,
            timeout: 60,
            ignore_warnings: Vec::new(),
            no_cache_faults: vec!["Timeout".to_string()],
            enabled_plugins: Vec::new(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the robots.txt product token
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiCheck".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/sumi-check".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the markdown report, if one should be written
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,

    /// Path of the SQLite result cache, if results should persist across runs
    #[serde(rename = "cache-path")]
    pub cache_path: Option<String>,
}

/// One entry of the extern or intern pattern list
#[derive(Debug, Clone, Deserialize)]
pub struct LinkPatternConfig {
    /// Regular expression searched for in the normalized URL
    pub pattern: String,

    /// Invert the match
    #[serde(default)]
    pub negate: bool,

    /// Extern matches with this flag are only syntax checked
    #[serde(default)]
    pub strict: bool,
}

/// One ignore rule for invalid results
#[derive(Debug, Clone, Deserialize)]
pub struct IgnoreErrorConfig {
    /// Regular expression searched for in the URL
    pub url: String,

    /// Regular expression searched for in the result message
    #[serde(default = "match_any")]
    pub message: String,
}

fn match_any() -> String {
    ".*".to_string()
}
