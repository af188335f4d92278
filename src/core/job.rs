//! Job representation and execution

use crate::core::cancellation::CancellationToken;
use crate::core::completion::{CompletionCell, CompletionHandle, CompletionSlot, JobOutcome};
use crate::core::error::Result;
use crate::JobError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Terminal classification of a finished job, used for statistics and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompletionKind {
    /// The work function returned a value
    Succeeded,
    /// The work function returned an error
    Failed,
    /// The work function panicked
    Panicked,
    /// The job never ran, or its work observed cancellation
    Cancelled,
}

/// Extracts a readable message from a panic payload
pub(crate) fn panic_message(panic_info: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// A unit of work waiting in the queue
///
/// The work closure and its result type are erased at construction so the
/// queue and dispatcher handle every job uniformly. The typed result only
/// travels through the [`CompletionHandle`] returned to the submitter.
///
/// Every constructed job resolves its completion slot exactly once: running
/// it resolves with the work's outcome, [`resolve_cancelled`](Self::resolve_cancelled)
/// resolves without running, and dropping an unresolved job resolves it as
/// cancelled as a last resort.
pub(crate) struct Job {
    id: String,
    description: String,
    submitted_at: DateTime<Utc>,
    token: CancellationToken,
    runner: Option<Box<dyn FnOnce(&CancellationToken) -> CompletionKind + Send>>,
    completion: Arc<dyn CompletionCell>,
}

impl Job {
    /// Create a job from a work closure, returning the job and the
    /// submitter's handle to its outcome
    pub(crate) fn new<T, F>(
        id: impl Into<String>,
        description: impl Into<String>,
        token: CancellationToken,
        work: F,
    ) -> (Self, CompletionHandle<T>)
    where
        T: Send + Clone + 'static,
        F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
    {
        let id = id.into();
        let slot = Arc::new(CompletionSlot::new());
        let handle = CompletionHandle::new(id.clone(), Arc::clone(&slot), token.clone());

        let runner_slot = Arc::clone(&slot);
        let runner = Box::new(move |token: &CancellationToken| -> CompletionKind {
            if token.is_cancelled() {
                runner_slot.resolve(JobOutcome::Cancelled);
                return CompletionKind::Cancelled;
            }

            // Execute the work with panic protection
            match catch_unwind(AssertUnwindSafe(|| work(token))) {
                Ok(Ok(value)) => {
                    runner_slot.resolve(JobOutcome::Succeeded(value));
                    CompletionKind::Succeeded
                }
                Ok(Err(err)) if err.is_cancelled() => {
                    // The work observed its token and stopped early
                    runner_slot.resolve(JobOutcome::Cancelled);
                    CompletionKind::Cancelled
                }
                Ok(Err(err)) => {
                    runner_slot.resolve(JobOutcome::Failed(err));
                    CompletionKind::Failed
                }
                Err(panic_info) => {
                    let message = panic_message(panic_info);
                    runner_slot.resolve(JobOutcome::Failed(JobError::panicked(message)));
                    CompletionKind::Panicked
                }
            }
        });

        let job = Self {
            id,
            description: description.into(),
            submitted_at: Utc::now(),
            token,
            runner: Some(runner),
            completion: slot,
        };
        (job, handle)
    }

    /// Get the job ID
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Get the job description
    pub(crate) fn description(&self) -> &str {
        &self.description
    }

    /// Get the submission timestamp
    pub(crate) fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Get this job's cancellation token
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Execute the job to its terminal state
    ///
    /// Checks the token, runs the work under panic protection, and resolves
    /// the completion slot with the mapped outcome.
    pub(crate) fn run(mut self) -> CompletionKind {
        match self.runner.take() {
            Some(runner) => runner(&self.token),
            None => {
                log::warn!("Job '{}' executed twice, ignoring", self.id);
                CompletionKind::Cancelled
            }
        }
    }

    /// Resolve this job as cancelled without running it
    ///
    /// Returns true if this call resolved the completion slot.
    pub(crate) fn resolve_cancelled(&self) -> bool {
        self.completion.resolve_cancelled()
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        // A job that falls out of every code path must still resolve,
        // or handle observers would block forever.
        if self.runner.is_some() && !self.completion.is_resolved() {
            self.completion.resolve_cancelled();
            log::warn!(
                "Job '{}' dropped without running, resolved as cancelled",
                self.id
            );
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("submitted_at", &self.submitted_at)
            .field("cancelled", &self.token.is_cancelled())
            .field("resolved", &self.completion.is_resolved())
            .finish()
    }
}
