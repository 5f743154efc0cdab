//! Sumi-Check main entry point
//!
//! This is the command-line interface for the Sumi-Check link checker.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use sumi_check::config::{load_config_with_hash, validate, Config};
use sumi_check::crawler::run_check;
use sumi_check::storage::{ResultCache, SqliteStorage};
use sumi_check::CheckError;
use tracing_subscriber::EnvFilter;

/// Sumi-Check: a recursive link checker
///
/// Sumi-Check checks the given URLs and, recursively, every link found in
/// their content that stays within the crawl scope. Extern links are checked
/// without recursion, or only syntax-checked when configured as strict.
#[derive(Parser, Debug)]
#[command(name = "sumi-check")]
#[command(version = "1.0.0")]
#[command(about = "A recursive link checker", long_about = None)]
struct Cli {
    /// URLs to start checking from
    #[arg(value_name = "URL", required_unless_present_any = ["dry_run", "stats"])]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum recursion depth, -1 for unbounded
    #[arg(short, long, allow_negative_numbers = true)]
    recursion_level: Option<i32>,

    /// Check extern URLs instead of only syntax-checking them
    #[arg(long)]
    check_extern: bool,

    /// Log the state of every URL at each check step
    #[arg(long)]
    trace: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report invalid URLs
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be checked without checking
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the results of the latest run and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

/// Exit code when an invalid link was found
const EXIT_INVALID: u8 = 1;

/// Exit code when the run was interrupted
const EXIT_INTERRUPTED: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default(), String::new()),
    };

    if let Some(level) = cli.recursion_level {
        config.checking.recursion_level = level;
    }
    if cli.check_extern {
        config.checking.check_extern = true;
    }
    if cli.trace {
        config.checking.trace = true;
    }
    validate(&config).context("Invalid command line options")?;

    if cli.dry_run {
        handle_dry_run(&config, &cli.urls);
        return Ok(ExitCode::SUCCESS);
    }
    if cli.stats {
        handle_stats(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match run_check(config, &config_hash, &cli.urls, cli.quiet, shutdown).await {
        Ok(summary) if summary.has_errors() => Ok(ExitCode::from(EXIT_INVALID)),
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(CheckError::Interrupted) => {
            tracing::warn!("Check interrupted");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        Err(e) => Err(e).context("Check failed"),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Invalid URLs are logged at warn
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_check=info,warn"),
            1 => EnvFilter::new("sumi_check=debug,info"),
            2 => EnvFilter::new("sumi_check=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, urls: &[String]) {
    let checking = &config.checking;
    println!("=== Sumi-Check Dry Run ===\n");

    println!("Checking:");
    println!("  Recursion level: {}", checking.recursion_level);
    println!("  Check extern: {}", checking.check_extern);
    println!("  Threads: {}", checking.threads);
    println!("  Timeout: {}s", checking.timeout);
    println!("  Max download size: {} bytes", checking.max_file_size_download);
    println!("  Max parse size: {} bytes", checking.max_file_size_parse);
    println!("  Plugins: {}", checking.enabled_plugins.join(", "));

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    if let Some(path) = &config.output.summary_path {
        println!("  Summary: {}", path);
    }
    if let Some(path) = &config.output.cache_path {
        println!("  Cache: {}", path);
    }

    println!("\nExtern patterns ({}):", config.externlinks.len());
    for entry in &config.externlinks {
        println!(
            "  - {}{}{}",
            entry.pattern,
            if entry.negate { " (negated)" } else { "" },
            if entry.strict { " (strict)" } else { "" }
        );
    }
    println!("\nIntern patterns ({}):", config.internlinks.len());
    for entry in &config.internlinks {
        println!("  - {}", entry.pattern);
    }

    println!("\nConfiguration is valid");
    println!("Would start checking {} URL(s)", urls.len());
    for url in urls {
        println!("  * {}", url);
    }
}

/// Handles the --stats mode: counts the cached results
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(path) = &config.output.cache_path else {
        println!("No cache-path configured");
        return Ok(());
    };
    println!("Database: {}\n", path);

    let storage = SqliteStorage::new(Path::new(path))?;
    println!("Cached results: {}", storage.len()?);
    println!("Invalid results: {}", storage.count_invalid()?);

    Ok(())
}
