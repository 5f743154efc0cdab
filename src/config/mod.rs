//! Configuration module for Sumi-Check
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_check::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sumi-check.toml")).unwrap();
//! println!("Recursion level: {}", config.checking.recursion_level);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CheckingConfig, Config, IgnoreErrorConfig, LinkPatternConfig, OutputConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{compile_pattern, validate};
