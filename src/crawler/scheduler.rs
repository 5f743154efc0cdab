//! Scheduler for the check queue
//!
//! This module handles:
//! - Priority queue of discovered references, shallowest level first
//! - First-in first-out order within a level
//! - Global concurrency limiting via a semaphore

use crate::check::Discovery;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A discovered reference waiting to be checked
#[derive(Debug, Clone)]
pub struct QueuedCheck {
    pub discovery: Discovery,

    /// Insertion order, breaks ties within a level
    seq: u64,
}

// Lower levels pop first from the max-heap, then earlier insertions
impl Ord for QueuedCheck {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .discovery
            .level
            .cmp(&self.discovery.level)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedCheck {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedCheck {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedCheck {}

/// Scheduler manages the queue and the number of checks in flight
pub struct Scheduler {
    /// Global semaphore for limiting concurrent checks
    semaphore: Arc<Semaphore>,

    frontier: BinaryHeap<QueuedCheck>,

    next_seq: u64,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `threads` - Maximum number of checks in flight, at least one
    /// * `seeds` - Initial references to check
    pub fn new(threads: usize, seeds: Vec<Discovery>) -> Self {
        let mut scheduler = Self {
            semaphore: Arc::new(Semaphore::new(threads.max(1))),
            frontier: BinaryHeap::new(),
            next_seq: 0,
        };
        for seed in seeds {
            scheduler.push(seed);
        }
        scheduler
    }

    /// Adds a reference to the queue
    pub fn push(&mut self, discovery: Discovery) {
        self.frontier.push(QueuedCheck {
            discovery,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// Takes the next reference to check
    pub fn pop(&mut self) -> Option<Discovery> {
        self.frontier.pop().map(|queued| queued.discovery)
    }

    /// Waits for a free worker slot
    ///
    /// The slot is released when the returned permit is dropped.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).acquire_owned().await.ok()
    }

    /// Number of free worker slots
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Returns the number of references in the queue
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    /// Returns whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }
}
