use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads, parses and validates a checker configuration file
///
/// Options missing from the file keep their defaults, so an empty file is a
/// valid configuration.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(
        "Loaded {} extern and {} intern patterns from {}",
        config.externlinks.len(),
        config.internlinks.len(),
        path.display()
    );
    Ok(config)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a hex-encoded SHA-256 hash of the configuration file content
///
/// Logged at startup so that reports can be traced back to the exact
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&content)))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let config_content = r#"
[checking]
recursionlevel = 2
maxfilesizedownload = 1000
maxfilesizeparse = 500
checkextern = true
ignorewarnings = ["url-whitespace"]
enabledplugins = ["AnchorCheck"]

[user-agent]
crawler-name = "TestChecker"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
summary-path = "./report.md"

[[externlinks]]
pattern = "^https?://ads\\."
strict = true

[[internlinks]]
pattern = "^https://docs\\.example\\.com/"

[[ignoreerrors]]
url = "^https://flaky\\."
message = "Timeout"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.checking.recursion_level, 2);
        assert_eq!(config.checking.max_file_size_download, 1000);
        assert_eq!(config.checking.max_file_size_parse, 500);
        assert!(config.checking.check_extern);
        assert_eq!(config.user_agent.crawler_name, "TestChecker");
        assert_eq!(config.output.summary_path.as_deref(), Some("./report.md"));
        assert_eq!(config.externlinks.len(), 1);
        assert!(config.externlinks[0].strict);
        assert!(!config.externlinks[0].negate);
        assert_eq!(config.internlinks.len(), 1);
        assert_eq!(config.ignoreerrors[0].message, "Timeout");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.checking.recursion_level, -1);
        assert_eq!(config.checking.max_url_length, 2000);
        assert_eq!(config.checking.no_cache_faults, vec!["Timeout".to_string()]);
        assert!(!config.checking.check_extern);
        assert!(config.externlinks.is_empty());
    }

    #[test]
    fn test_ignore_rule_message_defaults_to_any() {
        let config = parse_config(
            r#"
[[ignoreerrors]]
url = "example"
"#,
        )
        .unwrap();
        assert_eq!(config.ignoreerrors[0].message, ".*");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/sumi-check.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_bad_pattern() {
        let file = create_temp_config(
            r#"
[[externlinks]]
pattern = "(unclosed"
"#,
        );
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }

    #[test]
    fn test_config_hash_is_stable_and_content_sensitive() {
        let file1 = create_temp_config("[checking]\nthreads = 4\n");
        let file2 = create_temp_config("[checking]\nthreads = 5\n");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        assert_eq!(hash1, compute_config_hash(file1.path()).unwrap());
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, compute_config_hash(file2.path()).unwrap());
    }
}
