//! Concurrency limiter gating job execution
//!
//! The limiter is the single point that enforces the queue's concurrency
//! cap. Admission takes a [`SlotPermit`]; the permit releases its slot when
//! dropped, so every exit path of a job (success, error, panic,
//! cancellation) gives the slot back exactly once.

use crate::core::CancellationToken;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counting gate that caps how many jobs execute at once
///
/// The capacity is fixed at construction and never below one. Waiters block
/// on a condvar and re-check their cancellation token at least once per
/// poll interval, so a shutdown is observed promptly even without a wakeup.
///
/// # Example
///
/// ```rust
/// use job_queue_system::{CancellationToken, ConcurrencyLimiter};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let limiter = Arc::new(ConcurrencyLimiter::new(2));
/// let token = CancellationToken::new();
///
/// let first = limiter.acquire(&token, Duration::from_millis(10)).unwrap();
/// let _second = limiter.acquire(&token, Duration::from_millis(10)).unwrap();
/// assert_eq!(limiter.in_flight(), 2);
/// assert!(limiter.try_acquire().is_none());
///
/// drop(first);
/// assert_eq!(limiter.in_flight(), 1);
/// ```
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    capacity: usize,
    in_flight: Mutex<usize>,
    changed: Condvar,
}

impl ConcurrencyLimiter {
    /// Create a limiter with the given capacity
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            in_flight: Mutex::new(0),
            changed: Condvar::new(),
        }
    }

    /// Acquire an execution slot, blocking while the limiter is full
    ///
    /// Returns `None` instead of a permit once `token` is cancelled. The
    /// token is re-checked on every wakeup and at least once per
    /// `poll_interval`.
    pub fn acquire(
        self: &Arc<Self>,
        token: &CancellationToken,
        poll_interval: Duration,
    ) -> Option<SlotPermit> {
        let mut in_flight = self.in_flight.lock();
        loop {
            if token.is_cancelled() {
                return None;
            }
            if *in_flight < self.capacity {
                *in_flight += 1;
                return Some(SlotPermit {
                    limiter: Arc::clone(self),
                });
            }
            self.changed.wait_for(&mut in_flight, poll_interval);
        }
    }

    /// Acquire an execution slot without blocking
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotPermit> {
        let mut in_flight = self.in_flight.lock();
        if *in_flight < self.capacity {
            *in_flight += 1;
            Some(SlotPermit {
                limiter: Arc::clone(self),
            })
        } else {
            None
        }
    }

    /// Return a slot to the limiter and wake all waiters
    fn release(&self) {
        let mut in_flight = self.in_flight.lock();
        debug_assert!(*in_flight > 0, "release without matching acquire");
        *in_flight = in_flight.saturating_sub(1);
        self.changed.notify_all();
    }

    /// Wake all waiters so they re-check their cancellation tokens
    pub fn interrupt(&self) {
        // Taking the lock orders this wakeup after any wait in progress
        let _in_flight = self.in_flight.lock();
        self.changed.notify_all();
    }

    /// Block until no job holds a slot, up to `timeout`
    ///
    /// Returns true if the limiter went idle in time.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut in_flight = self.in_flight.lock();
        while *in_flight > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.changed.wait_for(&mut in_flight, deadline - now);
        }
        true
    }

    /// Number of slots currently held
    pub fn in_flight(&self) -> usize {
        *self.in_flight.lock()
    }

    /// Maximum number of concurrently held slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently free
    pub fn available(&self) -> usize {
        self.capacity - *self.in_flight.lock()
    }
}

/// RAII permit for one execution slot
///
/// Dropping the permit releases the slot. Permits are handed to the thread
/// that executes the job, so the slot is returned when the job finishes no
/// matter how it finishes.
#[derive(Debug)]
#[must_use = "dropping the permit releases the slot immediately"]
pub struct SlotPermit {
    limiter: Arc<ConcurrencyLimiter>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
