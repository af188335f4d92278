//! Completion tracking for submitted jobs
//!
//! Every submitted job owns a write-once completion slot. The job's
//! execution context resolves the slot exactly once with the terminal
//! outcome, and the [`CompletionHandle`] returned at submission lets any
//! number of observers read that outcome, blocking or not.

use crate::core::cancellation::CancellationToken;
use crate::core::error::{JobError, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Terminal state of a job
///
/// A job resolves to exactly one of these, exactly once:
///
/// - `Succeeded` carries the value returned by the work function
/// - `Failed` carries the error the work function returned (or the panic
///   it raised, as [`JobError::Panicked`])
/// - `Cancelled` means the work function either never ran or observed its
///   cancellation token and stopped early
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome<T> {
    /// The job ran to completion and produced a value
    Succeeded(T),
    /// The job ran and reported an error
    Failed(JobError),
    /// The job was cancelled before or during execution
    Cancelled,
}

impl<T> JobOutcome<T> {
    /// Returns true if the job produced a value
    pub fn is_succeeded(&self) -> bool {
        matches!(self, JobOutcome::Succeeded(_))
    }

    /// Returns true if the job reported an error
    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed(_))
    }

    /// Returns true if the job was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobOutcome::Cancelled)
    }

    /// Converts the outcome into a `Result`, mapping cancellation to
    /// [`JobError::Cancelled`]
    pub fn into_result(self) -> Result<T> {
        match self {
            JobOutcome::Succeeded(value) => Ok(value),
            JobOutcome::Failed(err) => Err(err),
            JobOutcome::Cancelled => Err(JobError::cancelled("job was cancelled")),
        }
    }
}

/// Write-once slot holding a job's terminal outcome
///
/// The first `resolve` wins; later attempts are no-ops. Observers block on
/// the condvar until the slot is filled.
pub(crate) struct CompletionSlot<T> {
    state: Mutex<Option<JobOutcome<T>>>,
    condvar: Condvar,
}

impl<T> CompletionSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(None),
            condvar: Condvar::new(),
        }
    }

    /// Stores the outcome if the slot is still empty
    ///
    /// Returns true if this call resolved the slot, false if it was
    /// already resolved. All waiting observers are woken on success.
    pub(crate) fn resolve(&self, outcome: JobOutcome<T>) -> bool {
        let mut state = self.state.lock();
        if state.is_some() {
            return false;
        }
        *state = Some(outcome);
        self.condvar.notify_all();
        true
    }

    /// Blocks until the slot is resolved, then returns a clone of the outcome
    pub(crate) fn wait(&self) -> JobOutcome<T>
    where
        T: Clone,
    {
        let mut state = self.state.lock();
        loop {
            if let Some(outcome) = state.as_ref() {
                return outcome.clone();
            }
            self.condvar.wait(&mut state);
        }
    }

    /// Blocks up to `timeout` for the slot to be resolved
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Option<JobOutcome<T>>
    where
        T: Clone,
    {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.is_none() {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.condvar.wait_for(&mut state, deadline - now);
        }
        state.as_ref().cloned()
    }

    /// Returns the outcome if already resolved, without blocking
    pub(crate) fn try_outcome(&self) -> Option<JobOutcome<T>>
    where
        T: Clone,
    {
        self.state.lock().as_ref().cloned()
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.state.lock().is_some()
    }
}

/// Type-erased view of a completion slot
///
/// Lets untyped code (the pending queue, the dispatcher, drop guards)
/// resolve a job as cancelled without knowing its value type.
pub(crate) trait CompletionCell: Send + Sync {
    /// Resolves the slot to `Cancelled` if still unresolved
    fn resolve_cancelled(&self) -> bool;

    /// Returns true if the slot has been resolved
    fn is_resolved(&self) -> bool;
}

impl<T: Send> CompletionCell for CompletionSlot<T> {
    fn resolve_cancelled(&self) -> bool {
        self.resolve(JobOutcome::Cancelled)
    }

    fn is_resolved(&self) -> bool {
        CompletionSlot::is_resolved(self)
    }
}

/// A cloneable handle to a submitted job's outcome
///
/// Returned by [`JobQueue::submit()`](crate::JobQueue::submit). The handle
/// can be cloned freely and sent to other threads; every clone observes the
/// same write-once outcome, so repeated reads always agree.
///
/// Reading the outcome is the caller's choice. A job whose handle is never
/// read still runs (or is cancelled) normally, and its error is only
/// recorded in the queue statistics and logs.
///
/// The handle also carries the job's own cancellation token, so a single
/// job can be cancelled via [`cancel()`](Self::cancel) without affecting
/// the rest of the queue.
///
/// # Example
///
/// ```rust
/// use job_queue_system::JobQueue;
///
/// let queue = JobQueue::with_capacity(2).expect("Failed to create job queue");
/// let handle = queue.execute(|_token| Ok(21 * 2)).expect("Failed to submit job");
///
/// let outcome = handle.wait();
/// assert_eq!(outcome.into_result().unwrap(), 42);
/// ```
pub struct CompletionHandle<T> {
    job_id: String,
    slot: Arc<CompletionSlot<T>>,
    token: CancellationToken,
}

impl<T> Clone for CompletionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            job_id: self.job_id.clone(),
            slot: Arc::clone(&self.slot),
            token: self.token.clone(),
        }
    }
}

impl<T> std::fmt::Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("job_id", &self.job_id)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl<T> CompletionHandle<T> {
    pub(crate) fn new(
        job_id: impl Into<String>,
        slot: Arc<CompletionSlot<T>>,
        token: CancellationToken,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            slot,
            token,
        }
    }

    /// Get the ID of the job this handle observes
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Blocks until the job reaches a terminal state
    ///
    /// Safe to call from any number of threads and any number of times;
    /// every call returns the same outcome.
    pub fn wait(&self) -> JobOutcome<T>
    where
        T: Clone,
    {
        self.slot.wait()
    }

    /// Blocks up to `timeout` for the job to reach a terminal state
    ///
    /// Returns `None` if the job is still unresolved when the timeout
    /// expires. A later call can still succeed.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<JobOutcome<T>>
    where
        T: Clone,
    {
        self.slot.wait_timeout(timeout)
    }

    /// Returns the outcome if the job already finished, without blocking
    pub fn try_outcome(&self) -> Option<JobOutcome<T>>
    where
        T: Clone,
    {
        self.slot.try_outcome()
    }

    /// Returns true if the job has reached a terminal state
    pub fn is_resolved(&self) -> bool {
        self.slot.is_resolved()
    }

    /// Request cancellation of this job
    ///
    /// Cooperative: a pending job is resolved as cancelled instead of being
    /// started, while a running job stops at its next token check. The
    /// outcome observed through this handle will be
    /// [`JobOutcome::Cancelled`] in either case.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true if cancellation has been requested for this job
    pub fn is_cancellation_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}
