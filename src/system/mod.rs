//! Job queue system: facade, concurrency limiter, and statistics

pub mod job_queue;
pub mod limiter;
pub mod stats;

pub(crate) mod dispatcher;

pub use job_queue::{JobQueue, JobQueueConfig};
pub use limiter::{ConcurrencyLimiter, SlotPermit};
pub use stats::{QueueStats, StatsSnapshot};
