//! Check driver - main crawl orchestration logic
//!
//! This module contains the main loop that coordinates a check run:
//! - Building records for discovered references on the driver task
//! - Serving repeated cache keys from the result cache
//! - Running checks on a bounded pool of worker tasks
//! - Queueing the child references of finished checks
//! - Handling interrupts and reporting

use crate::check::{CheckContext, CompactSnapshot, Discovery, UrlRecord};
use crate::config::Config;
use crate::crawler::scheduler::Scheduler;
use crate::output::{CrawlSummary, LogReporter, MarkdownReporter, Reporter};
use crate::storage::{open_cache, ResultCache, RunLog, RunStatus, SqliteStorage};
use crate::CheckError;
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Finished records log a progress line every this many URLs
const PROGRESS_INTERVAL: u64 = 100;

type WorkerOutput = (UrlRecord, Result<Vec<Discovery>, CheckError>);

/// Main check driver
pub struct Checker {
    ctx: Arc<CheckContext>,
    scheduler: Scheduler,
    cache: Box<dyn ResultCache>,
    reporters: Vec<Box<dyn Reporter>>,

    /// Cache keys being checked, with the occurrences waiting for them
    in_flight: HashMap<String, Vec<Discovery>>,

    workers: JoinSet<WorkerOutput>,
    summary: CrawlSummary,
}

impl Checker {
    /// Creates a new driver
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared check context
    /// * `seeds` - Start references, checked at level 0
    /// * `cache` - Result cache for repeated URLs
    /// * `reporters` - Receivers of every finished URL
    pub fn new(
        ctx: Arc<CheckContext>,
        seeds: &[String],
        cache: Box<dyn ResultCache>,
        reporters: Vec<Box<dyn Reporter>>,
    ) -> Self {
        let threads = ctx.config.checking.threads as usize;
        let seeds = seeds.iter().map(|seed| Discovery::seed(seed.as_str())).collect();
        Self {
            ctx,
            scheduler: Scheduler::new(threads, seeds),
            cache,
            reporters,
            in_flight: HashMap::new(),
            workers: JoinSet::new(),
            summary: CrawlSummary::new(),
        }
    }

    /// Tags the summary with the hash of the configuration file
    pub fn with_config_hash(mut self, config_hash: &str) -> Self {
        self.summary.config_hash = config_hash.to_string();
        self
    }

    /// The summary accumulated so far
    pub fn summary(&self) -> &CrawlSummary {
        &self.summary
    }

    /// Runs the check until the queue is empty and all workers are done
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every reachable reference was checked
    /// * `Err(CheckError)` - A check was interrupted, a worker failed, or
    ///   the cache or a reporter failed
    pub async fn run(&mut self) -> Result<(), CheckError> {
        self.summary.started_at = Utc::now().to_rfc3339();
        self.summary.status = RunStatus::Running.to_db_string().to_string();
        tracing::info!(
            "Starting check of {} seed(s) with {} worker(s)",
            self.scheduler.frontier_size(),
            self.scheduler.available_slots()
        );

        loop {
            while let Some(discovery) = self.scheduler.pop() {
                self.dispatch(discovery).await?;
            }

            let Some(joined) = self.workers.join_next().await else {
                break;
            };
            let (record, result) = match joined {
                Ok(output) => output,
                Err(e) => {
                    self.workers.abort_all();
                    return Err(CheckError::Worker(e.to_string()));
                }
            };
            match result {
                Ok(children) => self.complete(record, children)?,
                Err(e) => {
                    tracing::warn!("Stopping check at {}: {}", record.cache_key(), e);
                    self.workers.abort_all();
                    return Err(e);
                }
            }
        }

        tracing::info!("Queue is empty, check complete");
        Ok(())
    }

    /// Closes the run and hands the summary to the reporters
    ///
    /// Workers still running after an interruption are aborted.
    pub fn finish(&mut self, status: RunStatus) -> Result<CrawlSummary, CheckError> {
        self.workers.abort_all();
        let finished = Utc::now();
        self.summary.status = status.to_db_string().to_string();
        self.summary.downloaded_bytes = self.ctx.downloaded_bytes();
        if let Ok(started) = self.summary.started_at.parse::<chrono::DateTime<Utc>>() {
            self.summary.duration_seconds = Some((finished - started).num_seconds().max(0) as u64);
        }
        self.summary.finished_at = Some(finished.to_rfc3339());

        for reporter in &mut self.reporters {
            reporter.finish(&self.summary)?;
        }
        Ok(self.summary.clone())
    }

    /// Builds the record of one occurrence and starts its check if needed
    async fn dispatch(&mut self, discovery: Discovery) -> Result<(), CheckError> {
        let mut record = UrlRecord::new(Arc::clone(&self.ctx), discovery.clone());
        if !record.needs_check() {
            return self.report(&record.to_snapshot(), false);
        }

        let key = record.cache_key().to_string();
        if let Some(cached) = self.cache.get(&key)? {
            tracing::debug!("Cache hit for {}", key);
            return self.report(&cached.for_occurrence(&discovery), true);
        }
        if let Some(waiting) = self.in_flight.get_mut(&key) {
            tracing::debug!("{} is already being checked", key);
            waiting.push(discovery);
            return Ok(());
        }

        let permit = self
            .scheduler
            .acquire()
            .await
            .ok_or_else(|| CheckError::Worker("worker pool closed".to_string()))?;
        self.in_flight.insert(key, Vec::new());
        self.workers.spawn(async move {
            let _permit = permit;
            let result = record.check().await;
            (record, result)
        });
        Ok(())
    }

    /// Reports a finished check and queues what it discovered
    fn complete(&mut self, record: UrlRecord, children: Vec<Discovery>) -> Result<(), CheckError> {
        let snapshot = record.to_snapshot();
        let key = record.cache_key().to_string();
        let waiting = self.in_flight.remove(&key).unwrap_or_default();

        self.report(&snapshot, false)?;
        if record.is_cacheable() {
            self.cache.put(&key, &snapshot)?;
            for occurrence in &waiting {
                self.report(&snapshot.for_occurrence(occurrence), true)?;
            }
        } else {
            // Uncacheable outcomes are checked again for every occurrence
            for occurrence in waiting {
                self.scheduler.push(occurrence);
            }
        }

        tracing::debug!("{} discovered {} link(s)", key, children.len());
        for child in children {
            self.scheduler.push(child);
        }
        Ok(())
    }

    fn report(&mut self, snapshot: &CompactSnapshot, cached: bool) -> Result<(), CheckError> {
        self.summary.record(snapshot, cached);
        for reporter in &mut self.reporters {
            reporter.log_url(snapshot)?;
        }

        if self.summary.total_urls % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Progress: {} URLs checked, {} invalid, {} queued, {} in flight",
                self.summary.total_urls,
                self.summary.invalid_urls,
                self.scheduler.frontier_size(),
                self.in_flight.len()
            );
        }
        Ok(())
    }
}

/// Runs a complete check from a configuration
///
/// Opens the result cache and the run log named by the configuration,
/// checks every seed recursively and writes the reports. Results of the
/// previous run are discarded first; the database keeps the results of the
/// latest run and the history of all runs. The run stops early when
/// `shutdown` completes.
///
/// # Arguments
///
/// * `config` - A validated configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
/// * `seeds` - Start URLs
/// * `errors_only` - Only log invalid URLs at info level
/// * `shutdown` - Resolves when the run should be interrupted
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - The run completed
/// * `Err(CheckError)` - The run was interrupted or failed
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_check::config::load_config_with_hash;
/// use sumi_check::crawler::run_check;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("linkcheck.toml"))?;
/// let seeds = vec!["https://example.com/".to_string()];
/// let summary = run_check(config, &hash, &seeds, false, std::future::pending()).await?;
/// println!("{} invalid links", summary.invalid_urls);
/// # Ok(())
/// # }
/// ```
pub async fn run_check(
    config: Config,
    config_hash: &str,
    seeds: &[String],
    errors_only: bool,
    shutdown: impl Future<Output = ()>,
) -> Result<CrawlSummary, CheckError> {
    let cache_path = config.output.cache_path.as_ref().map(PathBuf::from);
    let summary_path = config.output.summary_path.clone();

    let mut runs = match &cache_path {
        Some(path) => Some(SqliteStorage::new(path)?),
        None => None,
    };
    let run_id = match runs.as_mut() {
        Some(runs) => {
            let cleared = runs.clear_results()?;
            tracing::debug!("Discarded {} results of the previous run", cleared);
            Some(runs.create_run(config_hash)?)
        }
        None => None,
    };

    let cache = open_cache(cache_path.as_deref())?;
    let mut reporters: Vec<Box<dyn Reporter>> = vec![Box::new(LogReporter::new(errors_only))];
    if let Some(path) = summary_path {
        reporters.push(Box::new(MarkdownReporter::new(path)));
    }

    let ctx = Arc::new(CheckContext::new(config)?);
    let mut checker = Checker::new(ctx, seeds, cache, reporters).with_config_hash(config_hash);

    let outcome = tokio::select! {
        result = checker.run() => result,
        _ = shutdown => {
            tracing::warn!("Interrupted, stopping workers");
            Err(CheckError::Interrupted)
        }
    };

    let status = if outcome.is_ok() {
        RunStatus::Completed
    } else {
        RunStatus::Interrupted
    };
    if let (Some(runs), Some(run_id)) = (runs.as_mut(), run_id) {
        runs.finish_run(run_id, status)?;
    }
    let summary = checker.finish(status)?;
    outcome.map(|()| summary)
}
