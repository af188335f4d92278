//! # Job Queue System
//!
//! A bounded-concurrency background job queue with typed completion handles,
//! cooperative cancellation, and graceful shutdown.
//!
//! ## Features
//!
//! - **Bounded Concurrency**: At most a configured number of jobs run at once
//! - **Completion Handles**: Every submission returns a typed handle to the job's outcome
//! - **Cooperative Cancellation**: Hierarchical tokens cancel one job or the whole queue
//! - **Graceful Shutdown**: Pending jobs resolve as cancelled, in-flight jobs get a grace period
//! - **Panic Isolation**: A panicking job resolves its own handle instead of poisoning the queue
//! - **Queue Statistics**: Atomic counters with a serializable point-in-time snapshot
//!
//! ## Quick Start
//!
//! ```rust
//! use job_queue_system::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! // Create a queue that runs at most 4 jobs concurrently
//! let queue = JobQueue::with_capacity(4)?;
//!
//! // Submit jobs and keep their completion handles
//! let mut handles = Vec::new();
//! for i in 0..10 {
//!     handles.push(queue.execute(move |_token| Ok(i * i))?);
//! }
//!
//! // Every handle resolves with its job's typed outcome
//! for (i, handle) in (0..10).zip(handles) {
//!     assert_eq!(handle.wait(), JobOutcome::Succeeded(i * i));
//! }
//!
//! // Shutdown gracefully
//! queue.shutdown(Duration::from_secs(1))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use job_queue_system::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let config = JobQueueConfig::new(8)
//!     .with_poll_interval(Duration::from_millis(20))
//!     .with_thread_name_prefix("render");
//!
//! let queue = JobQueue::with_config(config)?;
//! # queue.shutdown(Duration::from_secs(1))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Cancellation
//!
//! Every job receives a [`CancellationToken`] and decides for itself how
//! often to look at it. Cancelling a handle stops one job; shutting the
//! queue down cancels every token at once.
//!
//! ```rust
//! use job_queue_system::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let queue = JobQueue::with_capacity(2)?;
//!
//! let handle = queue.submit("long-import", "import a large archive", |token| -> Result<()> {
//!     loop {
//!         token.check()?;
//!         std::thread::sleep(Duration::from_millis(10));
//!     }
//! })?;
//!
//! handle.cancel();
//! assert_eq!(handle.wait(), JobOutcome::Cancelled);
//! # queue.shutdown(Duration::from_secs(1))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Statistics
//!
//! ```rust
//! use job_queue_system::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! # let queue = JobQueue::with_capacity(2)?;
//! # for _ in 0..10 {
//! #     queue.execute(|_token| Ok(()))?.wait();
//! # }
//! let stats = queue.stats();
//! println!(
//!     "{} submitted, {} succeeded ({:.0}% success)",
//!     stats.jobs_submitted,
//!     stats.jobs_succeeded,
//!     stats.success_rate()
//! );
//! # queue.shutdown(Duration::from_secs(1))?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod prelude;
pub mod system;

mod queue;

pub use crate::core::{
    CancellationReason, CancellationToken, CompletionHandle, JobError, JobOutcome, Result,
};
pub use crate::system::{ConcurrencyLimiter, JobQueue, JobQueueConfig, SlotPermit, StatsSnapshot};
