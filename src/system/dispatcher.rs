//! Dispatcher thread implementation
//!
//! One long-lived thread pulls jobs off the pending queue in FIFO order,
//! waits for an execution slot, and launches each admitted job on its own
//! named thread. The dispatcher itself never executes job code; a fault in
//! its own control logic is caught, counted, and survived.

use crate::core::{panic_message, CancellationToken, CompletionKind, Job, JobError, Result};
use crate::queue::{PendingQueue, QueueError};
use crate::system::limiter::ConcurrencyLimiter;
use crate::system::stats::QueueStats;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// The background thread that moves jobs from the queue into execution
///
/// Exits when the shutdown token is cancelled or the queue reports itself
/// closed and drained. Jobs it launches are not joined; their slot permits
/// account for them instead.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    thread: Option<thread::JoinHandle<()>>,
    name: String,
}

impl Dispatcher {
    /// Spawn the dispatcher thread
    ///
    /// # Arguments
    ///
    /// * `queue` - Pending queue to draw jobs from
    /// * `limiter` - Gate enforcing the concurrency cap
    /// * `token` - Queue-wide shutdown token
    /// * `stats` - Shared counters updated as jobs resolve
    /// * `poll_interval` - Upper bound between shutdown checks while idle
    /// * `thread_name_prefix` - Prefix for the dispatcher and job threads
    pub(crate) fn new(
        queue: Arc<PendingQueue>,
        limiter: Arc<ConcurrencyLimiter>,
        token: CancellationToken,
        stats: Arc<QueueStats>,
        poll_interval: Duration,
        thread_name_prefix: String,
    ) -> Result<Self> {
        let name = format!("{}-dispatcher", thread_name_prefix);
        let thread_name = name.clone();

        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                Self::run(queue, limiter, token, stats, poll_interval, thread_name_prefix);
            })
            .map_err(|e| JobError::spawn(thread_name, e.to_string()))?;

        Ok(Self {
            thread: Some(thread),
            name,
        })
    }

    /// Join the dispatcher thread
    ///
    /// Returns [`JobError::Join`] if the thread ended with a panic that
    /// escaped its recovery net.
    pub(crate) fn join(mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|panic_info| JobError::join(self.name.as_str(), panic_message(panic_info)))?;
        }
        Ok(())
    }

    /// Main dispatcher loop
    ///
    /// Jobs are admitted strictly in dequeue order; the loop blocks at most
    /// `poll_interval` at a time so cancellation is always observed.
    fn run(
        queue: Arc<PendingQueue>,
        limiter: Arc<ConcurrencyLimiter>,
        token: CancellationToken,
        stats: Arc<QueueStats>,
        poll_interval: Duration,
        thread_name_prefix: String,
    ) {
        log::debug!("dispatcher started");
        let mut launched: u64 = 0;

        loop {
            if token.is_cancelled() {
                break;
            }

            match queue.dequeue_timeout(poll_interval) {
                Ok(job) => {
                    let dispatched = catch_unwind(AssertUnwindSafe(|| {
                        Self::dispatch(
                            job,
                            &limiter,
                            &token,
                            &stats,
                            poll_interval,
                            &thread_name_prefix,
                            &mut launched,
                        )
                    }));

                    match dispatched {
                        Ok(true) => continue,
                        // Shutdown observed while waiting for a slot
                        Ok(false) => break,
                        Err(panic_info) => {
                            // The dropped job resolves itself as cancelled
                            stats.record_dispatcher_recovery();
                            log::error!(
                                "dispatcher recovered from internal panic: {}",
                                panic_message(panic_info)
                            );
                            continue;
                        }
                    }
                }
                Err(QueueError::Empty) => {
                    // No job available within timeout, continue polling
                    continue;
                }
                Err(QueueError::Disconnected) => {
                    // Queue closed and drained, shutdown
                    break;
                }
                Err(QueueError::Closed(_)) => {
                    // Dequeue paths never report Closed
                    break;
                }
            }
        }

        log::debug!("dispatcher stopped after launching {} jobs", launched);
    }

    /// Admit one dequeued job and launch it on its own thread
    ///
    /// Returns false when shutdown was observed while waiting for a slot,
    /// telling the loop to exit.
    fn dispatch(
        job: Job,
        limiter: &Arc<ConcurrencyLimiter>,
        token: &CancellationToken,
        stats: &Arc<QueueStats>,
        poll_interval: Duration,
        thread_name_prefix: &str,
        launched: &mut u64,
    ) -> bool {
        // A job cancelled while queued is resolved without admission
        if job.token().is_cancelled() {
            if job.resolve_cancelled() {
                stats.record_completion(CompletionKind::Cancelled);
            }
            log::debug!("job '{}' cancelled before admission", job.id());
            return true;
        }

        let permit = match limiter.acquire(token, poll_interval) {
            Some(permit) => permit,
            None => {
                if job.resolve_cancelled() {
                    stats.record_completion(CompletionKind::Cancelled);
                }
                log::debug!(
                    "job '{}' cancelled while waiting for an execution slot",
                    job.id()
                );
                return false;
            }
        };

        *launched += 1;
        let thread_name = format!("{}-{}", thread_name_prefix, launched);
        let job_id = job.id().to_string();
        let stats_clone = Arc::clone(stats);

        let spawn_result = thread::Builder::new().name(thread_name.clone()).spawn(move || {
            // The permit lives for the whole job execution; dropping it
            // when this thread ends is what frees the slot.
            let _permit = permit;
            let id = job.id().to_string();

            let kind = job.run();
            stats_clone.record_completion(kind);

            match kind {
                CompletionKind::Succeeded => log::debug!("job '{}' succeeded", id),
                CompletionKind::Failed => log::warn!("job '{}' failed", id),
                CompletionKind::Panicked => log::error!("job '{}' panicked", id),
                CompletionKind::Cancelled => {
                    log::debug!("job '{}' cancelled during execution", id)
                }
            }
        });

        if let Err(e) = spawn_result {
            // The unspawned closure is dropped with the job inside it; the
            // job's drop guard resolves its handle as cancelled.
            stats.record_completion(CompletionKind::Cancelled);
            log::error!(
                "failed to spawn thread '{}' for job '{}': {}",
                thread_name,
                job_id,
                e
            );
        }

        true
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            // Use a timeout to prevent Drop from hanging indefinitely
            const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

            let start = std::time::Instant::now();
            loop {
                if thread.is_finished() {
                    if let Err(panic_info) = thread.join() {
                        log::error!(
                            "dispatcher '{}' panicked during shutdown: {}",
                            self.name,
                            panic_message(panic_info)
                        );
                    }
                    break;
                }

                if start.elapsed() >= JOIN_TIMEOUT {
                    log::warn!(
                        "dispatcher '{}' did not finish within {}s timeout during drop, thread may be leaked",
                        self.name,
                        JOIN_TIMEOUT.as_secs()
                    );
                    break;
                }

                // Small sleep to avoid busy-waiting
                thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JobOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const POLL: Duration = Duration::from_millis(10);

    struct Harness {
        queue: Arc<PendingQueue>,
        limiter: Arc<ConcurrencyLimiter>,
        token: CancellationToken,
        stats: Arc<QueueStats>,
        dispatcher: Dispatcher,
    }

    fn start(capacity: usize) -> Harness {
        let queue = Arc::new(PendingQueue::new());
        let limiter = Arc::new(ConcurrencyLimiter::new(capacity));
        let token = CancellationToken::new();
        let stats = Arc::new(QueueStats::new());

        let dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            Arc::clone(&limiter),
            token.clone(),
            Arc::clone(&stats),
            POLL,
            "test".to_string(),
        )
        .expect("Failed to spawn dispatcher");

        Harness {
            queue,
            limiter,
            token,
            stats,
            dispatcher,
        }
    }

    #[test]
    fn test_dispatcher_executes_queued_jobs() {
        let harness = start(2);
        let counter = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for i in 0..5 {
            let counter_clone = Arc::clone(&counter);
            let (job, handle) =
                Job::new(format!("job-{}", i), "", harness.token.child(), move |_| {
                    counter_clone.fetch_add(1, Ordering::SeqCst);
                    Ok(i)
                });
            harness.queue.enqueue(job).unwrap();
            handles.push(handle);
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.wait(), JobOutcome::Succeeded(i));
        }

        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(harness.stats.jobs_succeeded(), 5);

        harness.queue.close();
        harness.dispatcher.join().expect("Failed to join dispatcher");
    }

    #[test]
    fn test_dispatcher_respects_concurrency_cap() {
        let harness = start(1);
        let current = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for i in 0..4 {
            let current_clone = Arc::clone(&current);
            let max_clone = Arc::clone(&max_seen);
            let (job, handle) =
                Job::new(format!("job-{}", i), "", harness.token.child(), move |_| {
                    let now = current_clone.fetch_add(1, Ordering::SeqCst) + 1;
                    max_clone.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(30));
                    current_clone.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                });
            harness.queue.enqueue(job).unwrap();
            handles.push(handle);
        }

        for handle in handles {
            assert!(handle.wait().is_succeeded());
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(harness.limiter.in_flight(), 0);

        harness.queue.close();
        harness.dispatcher.join().expect("Failed to join dispatcher");
    }

    #[test]
    fn test_dispatcher_skips_cancelled_job() {
        let harness = start(2);
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);

        let job_token = harness.token.child();
        let (job, handle) = Job::new("doomed", "", job_token.clone(), move |_| {
            ran_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        job_token.cancel();
        harness.queue.enqueue(job).unwrap();

        assert_eq!(handle.wait(), JobOutcome::Cancelled);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(harness.stats.jobs_cancelled(), 1);

        harness.queue.close();
        harness.dispatcher.join().expect("Failed to join dispatcher");
    }

    #[test]
    fn test_dispatcher_exits_on_cancellation() {
        let harness = start(1);

        harness.token.cancel();
        harness
            .dispatcher
            .join()
            .expect("dispatcher should exit cleanly after cancellation");
    }

    #[test]
    fn test_dispatcher_survives_job_panic() {
        let harness = start(1);

        let (bad_job, bad_handle) =
            Job::new("panics", "", harness.token.child(), |_| -> Result<()> {
                panic!("intentional panic for testing");
            });
        let (good_job, good_handle) =
            Job::new("fine", "", harness.token.child(), |_| Ok("still running"));

        harness.queue.enqueue(bad_job).unwrap();
        harness.queue.enqueue(good_job).unwrap();

        assert!(bad_handle.wait().is_failed());
        assert_eq!(good_handle.wait(), JobOutcome::Succeeded("still running"));

        assert_eq!(harness.stats.jobs_panicked(), 1);
        assert_eq!(harness.stats.jobs_succeeded(), 1);

        harness.queue.close();
        harness.dispatcher.join().expect("Failed to join dispatcher");
    }
}
