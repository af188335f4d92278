//! Core types for the job queue system

pub mod cancellation;
pub mod completion;
pub mod error;
pub(crate) mod job;

pub use cancellation::{CancellationReason, CancellationToken};
pub use completion::{CompletionHandle, JobOutcome};
pub use error::{JobError, Result};
pub(crate) use job::{panic_message, CompletionKind, Job};
