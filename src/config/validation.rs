use crate::check::{FaultKind, WarningTag, KNOWN_PLUGINS};
use crate::config::types::{CheckingConfig, Config, LinkPatternConfig, UserAgentConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_checking_config(&config.checking)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_link_patterns("externlinks", &config.externlinks)?;
    validate_link_patterns("internlinks", &config.internlinks)?;
    for rule in &config.ignoreerrors {
        compile_pattern(&rule.url)?;
        compile_pattern(&rule.message)?;
    }
    Ok(())
}

/// Compiles a configured regular expression
pub fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}

/// Validates checking configuration
fn validate_checking_config(config: &CheckingConfig) -> Result<(), ConfigError> {
    if config.recursion_level < -1 {
        return Err(ConfigError::Validation(format!(
            "recursionlevel must be -1 (unbounded) or >= 0, got {}",
            config.recursion_level
        )));
    }

    if config.threads < 1 || config.threads > 100 {
        return Err(ConfigError::Validation(format!(
            "threads must be between 1 and 100, got {}",
            config.threads
        )));
    }

    if config.max_file_size_download == 0 {
        return Err(ConfigError::Validation(
            "maxfilesizedownload must be > 0".to_string(),
        ));
    }

    if config.max_url_length == 0 {
        return Err(ConfigError::Validation(
            "maxurllength must be > 0".to_string(),
        ));
    }

    if config.timeout == 0 {
        return Err(ConfigError::Validation("timeout must be > 0".to_string()));
    }

    for tag in &config.ignore_warnings {
        tag.parse::<WarningTag>().map_err(ConfigError::Validation)?;
    }

    for name in &config.no_cache_faults {
        if FaultKind::from_name(name).is_none() {
            return Err(ConfigError::Validation(format!(
                "Unknown fault kind in nocachefaults: '{}'",
                name
            )));
        }
    }

    for plugin in &config.enabled_plugins {
        if !KNOWN_PLUGINS.contains(&plugin.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown plugin '{}', known plugins: {}",
                plugin,
                KNOWN_PLUGINS.join(", ")
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // The crawler name doubles as the robots.txt product token
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates that every pattern of a link list compiles
fn validate_link_patterns(list: &str, entries: &[LinkPatternConfig]) -> Result<(), ConfigError> {
    for entry in entries {
        if entry.pattern.is_empty() {
            return Err(ConfigError::InvalidPattern(format!(
                "{} contains an empty pattern",
                list
            )));
        }
        compile_pattern(&entry.pattern)?;
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
