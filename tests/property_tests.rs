//! Property-based tests for job_queue_system using proptest

use job_queue_system::prelude::*;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn fast_queue(capacity: usize) -> JobQueue {
    let config = JobQueueConfig::new(capacity).with_poll_interval(Duration::from_millis(10));
    JobQueue::with_config(config).expect("Failed to create job queue")
}

// ============================================================================
// JobQueueConfig Tests
// ============================================================================

proptest! {
    /// Positive capacities pass through the config unchanged
    #[test]
    fn test_config_positive_capacity(capacity in 1usize..64) {
        let config = JobQueueConfig::new(capacity);
        assert_eq!(config.capacity, capacity);
    }

    /// Builder methods keep every configured field
    #[test]
    fn test_config_builders(
        capacity in 1usize..16,
        poll_ms in 1u64..500,
        prefix in "[a-z]{3,10}"
    ) {
        let config = JobQueueConfig::new(capacity)
            .with_poll_interval(Duration::from_millis(poll_ms))
            .with_thread_name_prefix(&prefix);

        assert_eq!(config.capacity, capacity);
        assert_eq!(config.poll_interval, Duration::from_millis(poll_ms));
        assert_eq!(config.thread_name_prefix, prefix);
    }
}

#[test]
fn test_config_zero_capacity_uses_cpu_count() {
    let config = JobQueueConfig::new(0);
    assert_eq!(config.capacity, num_cpus::get());
}

// ============================================================================
// Queue Creation Tests
// ============================================================================

proptest! {
    /// A queue can be created at any reasonable capacity
    #[test]
    fn test_queue_creation(capacity in 1usize..16) {
        let queue = fast_queue(capacity);

        assert_eq!(queue.capacity(), capacity);
        assert_eq!(queue.pending_count(), 0);
        assert_eq!(queue.in_flight(), 0);
        assert!(!queue.is_shutting_down());

        queue.shutdown(Duration::from_secs(1)).unwrap();
    }
}

// ============================================================================
// Execution & Accounting Tests
// ============================================================================

proptest! {
    /// Every submitted job runs exactly once and resolves with its own value
    #[test]
    fn test_all_jobs_resolve(job_count in 1usize..30, capacity in 1usize..5) {
        let queue = fast_queue(capacity);
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..job_count {
            let counter_clone = Arc::clone(&counter);
            let handle = queue.execute(move |_token| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                Ok(i)
            }).unwrap();
            handles.push(handle);
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.wait(), JobOutcome::Succeeded(i));
        }
        assert_eq!(counter.load(Ordering::SeqCst), job_count);

        queue.shutdown(Duration::from_secs(5)).unwrap();

        let stats = queue.stats();
        assert_eq!(stats.jobs_submitted, job_count as u64);
        assert_eq!(stats.jobs_succeeded, job_count as u64);
        assert_eq!(stats.jobs_resolved(), job_count as u64);
    }

    /// Failures land on their own handles without disturbing other jobs
    #[test]
    fn test_mixed_outcome_accounting(
        outcomes in prop::collection::vec(any::<bool>(), 1..25)
    ) {
        let queue = fast_queue(2);

        let mut handles = Vec::new();
        for (i, should_succeed) in outcomes.iter().enumerate() {
            let should_succeed = *should_succeed;
            let handle = queue.submit(format!("mix-{}", i), "", move |_token| {
                if should_succeed {
                    Ok(i)
                } else {
                    Err(JobError::execution_failed("expected failure"))
                }
            }).unwrap();
            handles.push(handle);
        }

        let mut succeeded = 0u64;
        let mut failed = 0u64;
        for (handle, should_succeed) in handles.into_iter().zip(&outcomes) {
            match handle.wait() {
                JobOutcome::Succeeded(_) => {
                    assert!(*should_succeed);
                    succeeded += 1;
                }
                JobOutcome::Failed(JobError::ExecutionFailed { .. }) => {
                    assert!(!*should_succeed);
                    failed += 1;
                }
                other => panic!("Unexpected outcome: {:?}", other),
            }
        }

        queue.shutdown(Duration::from_secs(5)).unwrap();

        let stats = queue.stats();
        assert_eq!(stats.jobs_succeeded, succeeded);
        assert_eq!(stats.jobs_failed, failed);
    }
}

// ============================================================================
// Panic Isolation Tests
// ============================================================================

proptest! {
    /// The queue keeps working however many jobs panic
    #[test]
    fn test_panic_isolation(panic_count in 1usize..8, success_count in 1usize..8) {
        let queue = fast_queue(2);

        let mut panickers = Vec::new();
        for _ in 0..panic_count {
            let handle = queue.execute(|_token| -> Result<()> {
                panic!("intentional panic for testing");
            }).unwrap();
            panickers.push(handle);
        }
        for handle in panickers {
            assert!(handle.wait().is_failed());
        }

        let counter = Arc::new(AtomicUsize::new(0));
        let mut successes = Vec::new();
        for _ in 0..success_count {
            let counter_clone = Arc::clone(&counter);
            let handle = queue.execute(move |_token| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }).unwrap();
            successes.push(handle);
        }
        for handle in successes {
            assert!(handle.wait().is_succeeded());
        }
        assert_eq!(counter.load(Ordering::SeqCst), success_count);

        queue.shutdown(Duration::from_secs(5)).unwrap();
        assert_eq!(queue.stats().jobs_panicked, panic_count as u64);
    }
}

// ============================================================================
// Cancellation & Shutdown Safety Tests
// ============================================================================

proptest! {
    /// Every handle resolves no matter which jobs get cancelled
    #[test]
    fn test_every_handle_resolves_under_cancellation(
        cancel_mask in prop::collection::vec(any::<bool>(), 1..20)
    ) {
        let queue = fast_queue(1);

        let mut handles = Vec::new();
        for i in 0..cancel_mask.len() {
            let handle = queue.submit(format!("maybe-{}", i), "", move |token| {
                token.check()?;
                Ok(i)
            }).unwrap();
            handles.push(handle);
        }

        for (handle, cancel) in handles.iter().zip(&cancel_mask) {
            if *cancel {
                handle.cancel();
            }
        }

        for (handle, cancel) in handles.iter().zip(&cancel_mask) {
            let outcome = handle
                .wait_timeout(Duration::from_secs(10))
                .expect("Every job must resolve");
            if *cancel {
                // The job may already have run when the cancel arrived
                assert!(outcome.is_succeeded() || outcome.is_cancelled());
            } else {
                assert!(
                    outcome.is_succeeded(),
                    "Uncancelled job must succeed, got: {:?}",
                    outcome
                );
            }
        }

        queue.shutdown(Duration::from_secs(5)).unwrap();
    }

    /// Shutdown returns cleanly from any state and stays idempotent
    #[test]
    fn test_shutdown_always_safe(capacity in 1usize..6, job_count in 0usize..15) {
        let queue = fast_queue(capacity);

        for i in 0..job_count {
            let _ = queue.execute(move |_token| Ok(i));
        }

        queue.shutdown(Duration::from_secs(5)).unwrap();
        queue.shutdown(Duration::from_secs(5)).unwrap();

        assert!(queue.is_shutting_down());
        assert!(matches!(
            queue.execute(|_token| Ok(())),
            Err(JobError::ShuttingDown { .. })
        ));
        assert_eq!(queue.stats().jobs_resolved(), job_count as u64);
    }

    /// Dropping a queue with queued work never hangs or leaves a handle open
    #[test]
    fn test_drop_always_safe(job_count in 0usize..15) {
        let mut handles = Vec::new();
        {
            let queue = fast_queue(1);
            for i in 0..job_count {
                handles.push(queue.execute(move |_token| Ok(i)).unwrap());
            }
        }

        for handle in handles {
            assert!(handle.try_outcome().is_some(), "Drop must resolve every handle");
        }
    }
}
