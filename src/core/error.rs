//! Error types for the job queue system

/// Result type for job queue operations
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors that can occur in the job queue system
///
/// All variants are cloneable so a job's terminal error can be handed to
/// every observer of its completion handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum JobError {
    /// Job was cancelled with reason
    #[error("Job cancelled: {reason}")]
    Cancelled {
        /// Reason for cancellation
        reason: String,
    },

    /// Job execution failed
    #[error("Job execution failed: {message}")]
    ExecutionFailed {
        /// Error message
        message: String,
    },

    /// Job panicked during execution
    #[error("Job panicked: {message}")]
    Panicked {
        /// Panic message
        message: String,
    },

    /// Job queue is shutting down with job count
    #[error("Job queue is shutting down ({pending_jobs} jobs pending)")]
    ShuttingDown {
        /// Number of pending jobs
        pending_jobs: usize,
    },

    /// Failed to spawn a thread with details
    #[error("Failed to spawn thread '{thread_name}': {message}")]
    Spawn {
        /// Name of the thread that failed to spawn
        thread_name: String,
        /// Error message
        message: String,
    },

    /// Failed to join a thread
    #[error("Failed to join thread '{thread_name}': {message}")]
    Join {
        /// Name of the thread that failed to join
        thread_name: String,
        /// Error message
        message: String,
    },

    /// General error
    #[error("{0}")]
    Other(String),
}

impl JobError {
    /// Create a cancelled error
    pub fn cancelled(reason: impl Into<String>) -> Self {
        JobError::Cancelled {
            reason: reason.into(),
        }
    }

    /// Create an execution failed error
    pub fn execution_failed(message: impl Into<String>) -> Self {
        JobError::ExecutionFailed {
            message: message.into(),
        }
    }

    /// Create a panicked error
    pub fn panicked(message: impl Into<String>) -> Self {
        JobError::Panicked {
            message: message.into(),
        }
    }

    /// Create a shutting down error
    pub fn shutting_down(pending_jobs: usize) -> Self {
        JobError::ShuttingDown { pending_jobs }
    }

    /// Create a spawn error
    pub fn spawn(thread_name: impl Into<String>, message: impl Into<String>) -> Self {
        JobError::Spawn {
            thread_name: thread_name.into(),
            message: message.into(),
        }
    }

    /// Create a join error
    pub fn join(thread_name: impl Into<String>, message: impl Into<String>) -> Self {
        JobError::Join {
            thread_name: thread_name.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        JobError::Other(msg.into())
    }

    /// Returns true if this error reports a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = JobError::cancelled("shutdown requested");
        assert!(matches!(err, JobError::Cancelled { .. }));
        assert!(err.is_cancelled());

        let err = JobError::shutting_down(12);
        assert!(matches!(err, JobError::ShuttingDown { .. }));
        assert!(!err.is_cancelled());

        let err = JobError::execution_failed("division by zero");
        assert!(matches!(err, JobError::ExecutionFailed { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = JobError::shutting_down(3);
        assert_eq!(
            err.to_string(),
            "Job queue is shutting down (3 jobs pending)"
        );

        let err = JobError::panicked("index out of bounds");
        assert_eq!(err.to_string(), "Job panicked: index out of bounds");

        let err = JobError::spawn("job-dispatcher", "resource exhausted");
        assert_eq!(
            err.to_string(),
            "Failed to spawn thread 'job-dispatcher': resource exhausted"
        );
    }

    #[test]
    fn test_error_equality() {
        let a = JobError::cancelled("manual");
        let b = JobError::cancelled("manual");
        assert_eq!(a, b);
        assert_eq!(a.clone(), b);

        let c = JobError::cancelled("shutdown");
        assert_ne!(a, c);
    }
}
