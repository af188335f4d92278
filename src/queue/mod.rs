//! Pending job queue
//!
//! An unbounded FIFO holding submitted jobs until the dispatcher admits
//! them. Built on a crossbeam channel so enqueue never blocks and dequeue
//! can wait with a timeout, which is what lets the dispatcher wake up to
//! observe shutdown.
//!
//! Closing the queue rejects further enqueues while leaving already queued
//! jobs readable, so shutdown can drain and resolve them.

use crate::core::Job;
use crossbeam_channel::{self as channel, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Errors from pending queue operations
#[derive(Debug)]
pub enum QueueError {
    /// Queue is closed and not accepting new jobs
    Closed(JobHolder),
    /// Queue is empty (nothing to dequeue within the allowed wait)
    Empty,
    /// Queue is closed and fully drained
    Disconnected,
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::Closed(_) => write!(f, "queue is closed"),
            QueueError::Empty => write!(f, "queue is empty"),
            QueueError::Disconnected => write!(f, "queue is disconnected"),
        }
    }
}

impl std::error::Error for QueueError {}

/// A holder for jobs in error cases to allow recovery
///
/// This wrapper returns the job back to the caller when an enqueue fails,
/// so the caller can resolve it instead of losing it.
#[derive(Debug)]
pub struct JobHolder {
    job: Option<Job>,
}

impl JobHolder {
    /// Creates a new holder with the given job
    pub fn new(job: Job) -> Self {
        Self { job: Some(job) }
    }

    /// Takes the job out of the holder
    pub fn take(mut self) -> Option<Job> {
        self.job.take()
    }
}

/// Result type for queue operations
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Unbounded FIFO queue of pending jobs
///
/// Jobs come out in exactly the order they went in. The queue holds both
/// channel ends itself, so `Disconnected` is only ever reported through the
/// explicit closed flag once the backlog is drained.
pub struct PendingQueue {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    closed: AtomicBool,
}

impl PendingQueue {
    /// Creates a new open, empty queue
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            sender,
            receiver,
            closed: AtomicBool::new(false),
        }
    }

    /// Appends a job to the tail of the queue
    ///
    /// Never blocks. Fails with [`QueueError::Closed`] once the queue has
    /// been closed, handing the job back for the caller to resolve.
    pub fn enqueue(&self, job: Job) -> QueueResult<()> {
        if self.is_closed() {
            return Err(QueueError::Closed(JobHolder::new(job)));
        }
        self.sender
            .send(job)
            .map_err(|e| QueueError::Closed(JobHolder::new(e.0)))
    }

    /// Removes the oldest job without blocking
    pub fn try_dequeue(&self) -> QueueResult<Job> {
        self.receiver.try_recv().map_err(|e| match e {
            TryRecvError::Empty => QueueError::Empty,
            TryRecvError::Disconnected => QueueError::Disconnected,
        })
    }

    /// Removes the oldest job, waiting up to `timeout` for one to arrive
    ///
    /// Returns [`QueueError::Empty`] if the wait expires with the queue
    /// still open, and [`QueueError::Disconnected`] once the queue is both
    /// closed and drained.
    pub fn dequeue_timeout(&self, timeout: Duration) -> QueueResult<Job> {
        // Check if closed first
        if self.is_closed() && self.is_empty() {
            return Err(QueueError::Disconnected);
        }

        match self.receiver.recv_timeout(timeout) {
            Ok(job) => Ok(job),
            Err(channel::RecvTimeoutError::Timeout) => {
                // On timeout, check if closed
                if self.is_closed() && self.is_empty() {
                    Err(QueueError::Disconnected)
                } else {
                    Err(QueueError::Empty)
                }
            }
            Err(channel::RecvTimeoutError::Disconnected) => Err(QueueError::Disconnected),
        }
    }

    /// Closes the queue to further enqueues
    ///
    /// Already queued jobs remain dequeueable until drained.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Returns true if the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of jobs currently queued
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns true if no jobs are queued
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new()
    }
}
