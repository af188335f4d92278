//! Job queue facade and configuration

use crate::core::{
    CancellationReason, CancellationToken, CompletionHandle, CompletionKind, Job, JobError, Result,
};
use crate::queue::{PendingQueue, QueueError};
use crate::system::dispatcher::Dispatcher;
use crate::system::limiter::ConcurrencyLimiter;
use crate::system::stats::{QueueStats, StatsSnapshot};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Configuration for a job queue
#[derive(Clone, Debug)]
pub struct JobQueueConfig {
    /// Maximum number of concurrently running jobs (0 = number of CPUs).
    ///
    /// Values below 1 are clamped to 1 rather than rejected.
    pub capacity: usize,
    /// Dispatcher poll interval for checking new jobs and shutdown state.
    /// Default: 100ms
    ///
    /// Shorter intervals improve responsiveness but increase CPU usage.
    /// Longer intervals reduce CPU usage but increase shutdown latency.
    pub poll_interval: Duration,
    /// Thread name prefix for the dispatcher and job threads
    pub thread_name_prefix: String,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            capacity: num_cpus::get(),
            poll_interval: Duration::from_millis(100),
            thread_name_prefix: "job".to_string(),
        }
    }
}

impl JobQueueConfig {
    /// Create a new configuration with the specified concurrency capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: if capacity == 0 {
                num_cpus::get()
            } else {
                capacity
            },
            ..Default::default()
        }
    }

    /// Set the dispatcher poll interval.
    ///
    /// This controls how frequently the dispatcher checks for new jobs and
    /// shutdown signals while idle.
    ///
    /// # Panics
    ///
    /// Panics if interval is zero.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll interval must be non-zero");
        self.poll_interval = interval;
        self
    }

    /// Set the thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// A queue that runs submitted jobs on background threads, at most
/// `capacity` at a time
///
/// Construction starts the dispatcher thread; jobs submitted afterwards are
/// admitted in FIFO order and each runs on its own named thread. The typed
/// outcome of every job travels through the [`CompletionHandle`] returned at
/// submission.
///
/// # Shutdown Mechanism
///
/// [`shutdown()`](JobQueue::shutdown) stops admissions, cancels the
/// queue-wide token, resolves still-pending jobs as cancelled without
/// running them, and waits up to a caller-chosen timeout for in-flight jobs
/// to finish. Dropping the queue performs the same shutdown if it was never
/// requested explicitly.
///
/// # Example
///
/// ```
/// use job_queue_system::prelude::*;
/// use std::time::Duration;
///
/// # fn main() -> Result<()> {
/// let queue = JobQueue::with_capacity(2)?;
///
/// let handle = queue.execute(|_token| Ok(2 + 2))?;
/// assert_eq!(handle.wait(), JobOutcome::Succeeded(4));
///
/// queue.shutdown(Duration::from_secs(1))?;
/// # Ok(())
/// # }
/// ```
pub struct JobQueue {
    config: JobQueueConfig,
    queue: Arc<PendingQueue>,
    limiter: Arc<ConcurrencyLimiter>,
    token: CancellationToken,
    shutdown_requested: AtomicBool,
    dispatcher: Mutex<Option<Dispatcher>>,
    stats: Arc<QueueStats>,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("config", &self.config)
            .field("pending_count", &self.queue.len())
            .field("in_flight", &self.limiter.in_flight())
            .field(
                "shutdown_requested",
                &self.shutdown_requested.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl JobQueue {
    /// Create a job queue with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(JobQueueConfig::default())
    }

    /// Create a job queue with the specified concurrency capacity
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(JobQueueConfig::new(capacity))
    }

    /// Create a job queue with custom configuration
    ///
    /// The dispatcher thread is started before this returns, so the queue
    /// accepts work immediately. The only construction error is a failure to
    /// spawn that thread.
    pub fn with_config(config: JobQueueConfig) -> Result<Self> {
        let queue = Arc::new(PendingQueue::new());
        let limiter = Arc::new(ConcurrencyLimiter::new(config.capacity));
        let token = CancellationToken::new();
        let stats = Arc::new(QueueStats::new());

        let dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            Arc::clone(&limiter),
            token.clone(),
            Arc::clone(&stats),
            config.poll_interval,
            config.thread_name_prefix.clone(),
        )?;

        Ok(Self {
            config,
            queue,
            limiter,
            token,
            shutdown_requested: AtomicBool::new(false),
            dispatcher: Mutex::new(Some(dispatcher)),
            stats,
        })
    }

    /// Submit a job and get a handle to its typed outcome
    ///
    /// The work closure receives the job's cancellation token and should
    /// check it at convenient points to honour cancellation. Its return
    /// value maps onto the handle's outcome: `Ok(value)` resolves
    /// `Succeeded(value)`, a cancellation error resolves `Cancelled`, any
    /// other error resolves `Failed`, and a panic is captured and resolved
    /// as `Failed` with the panic payload.
    ///
    /// Dropping the returned handle does not affect the job; it runs to
    /// resolution either way.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::ShuttingDown`] once shutdown has been requested.
    ///
    /// # Example
    ///
    /// ```
    /// use job_queue_system::prelude::*;
    /// use std::time::Duration;
    ///
    /// # fn main() -> Result<()> {
    /// let queue = JobQueue::with_capacity(2)?;
    ///
    /// let handle = queue.submit("report-7", "build the weekly report", |token| {
    ///     for _ in 0..5 {
    ///         token.check()?;
    ///         std::thread::sleep(Duration::from_millis(1));
    ///     }
    ///     Ok("report ready")
    /// })?;
    ///
    /// assert_eq!(handle.wait(), JobOutcome::Succeeded("report ready"));
    /// queue.shutdown(Duration::from_secs(1))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn submit<T, F>(
        &self,
        id: impl Into<String>,
        description: impl Into<String>,
        work: F,
    ) -> Result<CompletionHandle<T>>
    where
        T: Send + Clone + 'static,
        F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
    {
        if self.shutdown_requested.load(Ordering::Acquire) {
            return Err(JobError::shutting_down(self.queue.len()));
        }

        // Each job gets a child token so it can be cancelled alone while
        // queue-wide shutdown still reaches it through the parent.
        let job_token = self.token.child();
        let (job, handle) = Job::new(id, description, job_token, work);

        match self.queue.enqueue(job) {
            Ok(()) => {
                self.stats.record_submission();
                // A concurrent shutdown can finish its drain between the
                // flag check above and this enqueue; drain again so every
                // accepted job still resolves.
                if self.shutdown_requested.load(Ordering::Acquire) {
                    self.resolve_pending_as_cancelled();
                }
                Ok(handle)
            }
            Err(QueueError::Closed(holder)) => {
                if let Some(job) = holder.take() {
                    job.resolve_cancelled();
                }
                Err(JobError::shutting_down(self.queue.len()))
            }
            Err(_) => Err(JobError::other("pending queue rejected the job")),
        }
    }

    /// Submit a closure under a generated UUID job id
    pub fn execute<T, F>(&self, work: F) -> Result<CompletionHandle<T>>
    where
        T: Send + Clone + 'static,
        F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
    {
        self.submit(Uuid::new_v4().to_string(), String::new(), work)
    }

    /// Get the concurrency capacity
    pub fn capacity(&self) -> usize {
        self.limiter.capacity()
    }

    /// Get the number of jobs waiting to be dispatched (approximate)
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Get the number of jobs currently executing (approximate)
    pub fn in_flight(&self) -> usize {
        self.limiter.in_flight()
    }

    /// Check whether shutdown has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Get the total number of jobs accepted by [`submit()`](JobQueue::submit)
    pub fn total_jobs_submitted(&self) -> u64 {
        self.stats.jobs_submitted()
    }

    /// Capture a point-in-time snapshot of the queue's counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats
            .snapshot(self.queue.len(), self.limiter.in_flight())
    }

    /// Shut the queue down
    ///
    /// # Graceful Shutdown
    ///
    /// 1. Stops accepting new submissions
    /// 2. Cancels the queue-wide token, which every job token descends from
    /// 3. Closes the pending queue and stops the dispatcher
    /// 4. Resolves every still-pending job as cancelled without running it
    /// 5. Waits up to `timeout` for in-flight jobs to finish
    ///
    /// Cancellation is cooperative; an in-flight job that never checks its
    /// token keeps its thread beyond the timeout, which is logged as a
    /// warning rather than treated as an error.
    ///
    /// # Thread Safety
    ///
    /// This method uses interior mutability and can be called from `&self`.
    /// Multiple concurrent calls are safe - only the first will perform the
    /// shutdown, others will return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Join`] if the dispatcher thread itself panicked.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        if self.shutdown_requested.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        log::debug!(
            "shutting down job queue '{}' ({} pending, {} in flight)",
            self.config.thread_name_prefix,
            self.queue.len(),
            self.limiter.in_flight()
        );

        self.token.cancel_with_reason(CancellationReason::Shutdown);
        self.queue.close();
        // Wake a dispatcher blocked on slot acquisition so it can observe
        // the cancelled token
        self.limiter.interrupt();

        let dispatcher = self.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            dispatcher.join()?;
        }

        // The dispatcher is gone; everything left in the queue resolves as
        // cancelled without running
        self.resolve_pending_as_cancelled();

        if !self.limiter.wait_idle(timeout) {
            log::warn!(
                "job queue '{}' shutdown timed out with {} jobs still in flight",
                self.config.thread_name_prefix,
                self.limiter.in_flight()
            );
        }

        Ok(())
    }

    /// Dequeue everything still pending and resolve it as cancelled
    fn resolve_pending_as_cancelled(&self) {
        while let Ok(job) = self.queue.try_dequeue() {
            if job.resolve_cancelled() {
                self.stats.record_completion(CompletionKind::Cancelled);
            }
        }
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        const DROP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

        // Only attempt shutdown if never requested to avoid redundant work
        if !self.shutdown_requested.load(Ordering::Acquire) {
            if let Err(e) = self.shutdown(DROP_SHUTDOWN_TIMEOUT) {
                log::error!(
                    "failed to shut down job queue '{}' during drop: {}",
                    self.config.thread_name_prefix,
                    e
                );
            }
        }
    }
}
