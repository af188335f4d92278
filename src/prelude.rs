//! Convenient re-exports for common types

pub use crate::core::{
    CancellationReason, CancellationToken, CompletionHandle, JobError, JobOutcome, Result,
};
pub use crate::system::{JobQueue, JobQueueConfig, StatsSnapshot};
