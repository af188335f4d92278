//! Queue-wide job statistics
//!
//! This module provides [`QueueStats`] for lock-free accounting of job
//! lifecycles and [`StatsSnapshot`] for serialisable point-in-time reads.

use crate::core::CompletionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of the queue's counters
///
/// Snapshots are plain data: cloneable, comparable, and serialisable for
/// export to monitoring pipelines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// When this snapshot was taken
    pub captured_at: DateTime<Utc>,

    /// Number of jobs accepted by `submit` or `execute`
    pub jobs_submitted: u64,

    /// Number of jobs that completed with a value
    pub jobs_succeeded: u64,

    /// Number of jobs that completed with an error
    pub jobs_failed: u64,

    /// Number of jobs that panicked during execution
    pub jobs_panicked: u64,

    /// Number of jobs resolved as cancelled, whether or not they started
    pub jobs_cancelled: u64,

    /// Number of internal faults the dispatcher recovered from
    pub dispatcher_recoveries: u64,

    /// Jobs waiting in the queue when the snapshot was taken
    pub pending_count: usize,

    /// Jobs executing when the snapshot was taken
    pub in_flight: usize,
}

impl StatsSnapshot {
    /// Returns the total number of jobs that reached a terminal state
    pub fn jobs_resolved(&self) -> u64 {
        self.jobs_succeeded + self.jobs_failed + self.jobs_panicked + self.jobs_cancelled
    }

    /// Returns the success rate as a percentage (0.0 to 100.0)
    ///
    /// Cancelled jobs are not counted for or against the rate.
    pub fn success_rate(&self) -> f64 {
        let executed = self.jobs_succeeded + self.jobs_failed + self.jobs_panicked;
        if executed == 0 {
            100.0
        } else {
            (self.jobs_succeeded as f64 / executed as f64) * 100.0
        }
    }

    /// Returns the failure rate as a percentage (0.0 to 100.0)
    pub fn failure_rate(&self) -> f64 {
        100.0 - self.success_rate()
    }
}

/// Thread-safe statistics tracker for the job queue
///
/// All counters are monotonic and updated with relaxed atomics; reads never
/// block job execution.
#[derive(Debug, Default)]
pub struct QueueStats {
    jobs_submitted: AtomicU64,
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_panicked: AtomicU64,
    jobs_cancelled: AtomicU64,
    dispatcher_recoveries: AtomicU64,
}

impl QueueStats {
    /// Creates a new statistics tracker with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a job submission
    pub(crate) fn record_submission(&self) {
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a job reaching the given terminal state
    pub(crate) fn record_completion(&self, kind: CompletionKind) {
        let counter = match kind {
            CompletionKind::Succeeded => &self.jobs_succeeded,
            CompletionKind::Failed => &self.jobs_failed,
            CompletionKind::Panicked => &self.jobs_panicked,
            CompletionKind::Cancelled => &self.jobs_cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an internal dispatcher fault that was caught and survived
    pub(crate) fn record_dispatcher_recovery(&self) {
        self.dispatcher_recoveries.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of jobs submitted
    pub fn jobs_submitted(&self) -> u64 {
        self.jobs_submitted.load(Ordering::Relaxed)
    }

    /// Returns the number of jobs that succeeded
    pub fn jobs_succeeded(&self) -> u64 {
        self.jobs_succeeded.load(Ordering::Relaxed)
    }

    /// Returns the number of jobs that failed
    pub fn jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Relaxed)
    }

    /// Returns the number of jobs that panicked
    pub fn jobs_panicked(&self) -> u64 {
        self.jobs_panicked.load(Ordering::Relaxed)
    }

    /// Returns the number of jobs resolved as cancelled
    pub fn jobs_cancelled(&self) -> u64 {
        self.jobs_cancelled.load(Ordering::Relaxed)
    }

    /// Returns the number of dispatcher recoveries
    pub fn dispatcher_recoveries(&self) -> u64 {
        self.dispatcher_recoveries.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of the current statistics
    ///
    /// # Arguments
    ///
    /// * `pending_count` - Current queue depth to include in the snapshot
    /// * `in_flight` - Current number of executing jobs to include
    pub fn snapshot(&self, pending_count: usize, in_flight: usize) -> StatsSnapshot {
        StatsSnapshot {
            captured_at: Utc::now(),
            jobs_submitted: self.jobs_submitted(),
            jobs_succeeded: self.jobs_succeeded(),
            jobs_failed: self.jobs_failed(),
            jobs_panicked: self.jobs_panicked(),
            jobs_cancelled: self.jobs_cancelled(),
            dispatcher_recoveries: self.dispatcher_recoveries(),
            pending_count,
            in_flight,
        }
    }
}
