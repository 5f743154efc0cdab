//! Crawl driver
//!
//! This module runs checks over a whole site:
//! - Queueing discovered references, shallowest first
//! - Bounding the number of checks in flight
//! - Deduplicating by cache key and reporting every occurrence

mod coordinator;
mod scheduler;

pub use coordinator::{run_check, Checker};
pub use scheduler::{QueuedCheck, Scheduler};
