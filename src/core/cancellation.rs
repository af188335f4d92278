//! Cooperative cancellation signals
//!
//! The queue holds one root token and hands every submitted job a child of
//! it. Cancelling the root (shutdown) reaches every job; cancelling a
//! single child stops one job and nothing else. Cancellation only raises a
//! flag; work must check its token to actually stop.
//!
//! # Example
//!
//! ```rust
//! use job_queue_system::CancellationToken;
//!
//! let root = CancellationToken::new();
//! let job_a = root.child();
//! let job_b = root.child();
//!
//! job_a.cancel();
//! assert!(job_a.is_cancelled());
//! assert!(!job_b.is_cancelled());
//!
//! root.cancel();
//! assert!(job_b.is_cancelled());
//! ```

use crate::core::Result;
use crate::JobError;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Why a token was cancelled
///
/// Recorded once, by whichever cancellation arrives first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancellationReason {
    /// Cancelled through [`CancellationToken::cancel`] or a handle's `cancel`
    Manual,
    /// Cancelled because the owning queue is shutting down
    Shutdown,
    /// Cancelled because an ancestor token was cancelled
    ParentCancelled,
    /// Caller-supplied reason
    Custom(String),
}

impl std::fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationReason::Manual => f.write_str("cancelled by caller"),
            CancellationReason::Shutdown => f.write_str("queue shutting down"),
            CancellationReason::ParentCancelled => f.write_str("parent token cancelled"),
            CancellationReason::Custom(msg) => f.write_str(msg),
        }
    }
}

/// Shared state behind a token and all of its clones
struct TokenState {
    flag: AtomicBool,
    // Set exactly once, by the cancellation that flips `flag`
    why: RwLock<Option<CancellationReason>>,
    // Weak so an abandoned child does not keep the tree alive
    descendants: RwLock<Vec<Weak<TokenState>>>,
}

impl TokenState {
    fn fresh() -> Arc<Self> {
        Arc::new(Self {
            flag: AtomicBool::new(false),
            why: RwLock::new(None),
            descendants: RwLock::new(Vec::new()),
        })
    }
}

/// A cloneable cancellation signal shared between a job and its caller
///
/// Clones observe the same flag. [`child`](Self::child) builds a one-way
/// hierarchy: cancelling a parent cancels all its descendants, while a
/// descendant can be cancelled without touching the parent. There is no way
/// to un-cancel a token.
///
/// # Example
///
/// ```rust
/// use job_queue_system::CancellationToken;
/// use std::thread;
/// use std::time::Duration;
///
/// let token = CancellationToken::new();
/// let watcher = token.clone();
///
/// let worker = thread::spawn(move || {
///     while !watcher.is_cancelled() {
///         thread::sleep(Duration::from_millis(10));
///     }
///     "stopped"
/// });
///
/// thread::sleep(Duration::from_millis(50));
/// token.cancel();
/// assert_eq!(worker.join().unwrap(), "stopped");
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

impl CancellationToken {
    /// Create an uncancelled token with no parent
    pub fn new() -> Self {
        Self {
            state: TokenState::fresh(),
        }
    }

    /// Derive a child token
    ///
    /// The child is cancelled whenever this token is cancelled, now or
    /// later. A child born under an already-cancelled parent starts out
    /// cancelled.
    pub fn child(&self) -> Self {
        let child = Self {
            state: TokenState::fresh(),
        };
        self.state
            .descendants
            .write()
            .push(Arc::downgrade(&child.state));

        // Cover the race with a cancel that ran before the registration
        if self.is_cancelled() {
            child.cancel_with_reason(CancellationReason::ParentCancelled);
        }
        child
    }

    /// Cancel with [`CancellationReason::Manual`]
    pub fn cancel(&self) {
        self.cancel_with_reason(CancellationReason::Manual);
    }

    /// Cancel this token and every descendant, recording `reason`
    ///
    /// Idempotent; only the first cancellation records its reason.
    /// Descendants see [`CancellationReason::ParentCancelled`] rather than
    /// the original reason.
    pub fn cancel_with_reason(&self, reason: CancellationReason) {
        if self.state.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.state.why.write() = Some(reason);

        // Snapshot the live children before propagating, so no lock is
        // held while descendants run their own propagation
        let children: Vec<Arc<TokenState>> = self
            .state
            .descendants
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for state in children {
            CancellationToken { state }
                .cancel_with_reason(CancellationReason::ParentCancelled);
        }
    }

    /// Whether cancellation has been requested
    ///
    /// Lock-free; cheap enough for tight work loops.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.state.flag.load(Ordering::Acquire)
    }

    /// The recorded reason, or `None` while uncancelled
    pub fn reason(&self) -> Option<CancellationReason> {
        self.state.why.read().clone()
    }

    /// `Err(JobError::Cancelled)` if cancelled, `Ok(())` otherwise
    ///
    /// Lets work closures honour cancellation with a plain `?`:
    ///
    /// ```rust
    /// use job_queue_system::{CancellationToken, JobError};
    ///
    /// fn copy_chunks(token: &CancellationToken) -> Result<(), JobError> {
    ///     for _chunk in 0..64 {
    ///         token.check()?;
    ///         // copy one chunk
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            let reason = self
                .reason()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            Err(JobError::cancelled(reason))
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert_eq!(token.reason(), None);
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_cancel_is_sticky_and_idempotent() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some(CancellationReason::Manual));
        assert!(token.check().is_err());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();

        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some(CancellationReason::Manual));
    }

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        token.cancel_with_reason(CancellationReason::Shutdown);
        token.cancel_with_reason(CancellationReason::Custom("too late".into()));

        assert_eq!(token.reason(), Some(CancellationReason::Shutdown));
    }

    #[test]
    fn test_parent_cancel_reaches_all_descendants() {
        let root = CancellationToken::new();
        let mid = root.child();
        let leaf_a = mid.child();
        let leaf_b = mid.child();

        root.cancel_with_reason(CancellationReason::Shutdown);

        assert_eq!(root.reason(), Some(CancellationReason::Shutdown));
        for descendant in [&mid, &leaf_a, &leaf_b] {
            assert!(descendant.is_cancelled());
            assert_eq!(
                descendant.reason(),
                Some(CancellationReason::ParentCancelled)
            );
        }
    }

    #[test]
    fn test_child_cancel_leaves_parent_and_sibling_alone() {
        let root = CancellationToken::new();
        let victim = root.child();
        let sibling = root.child();

        victim.cancel();

        assert!(victim.is_cancelled());
        assert!(!root.is_cancelled());
        assert!(!sibling.is_cancelled());
    }

    #[test]
    fn test_child_of_cancelled_parent_is_born_cancelled() {
        let root = CancellationToken::new();
        root.cancel();

        let child = root.child();
        assert!(child.is_cancelled());
        assert_eq!(child.reason(), Some(CancellationReason::ParentCancelled));
    }

    #[test]
    fn test_check_error_carries_reason_text() {
        let token = CancellationToken::new();
        token.cancel_with_reason(CancellationReason::Custom("operator abort".into()));

        let err = token.check().expect_err("cancelled token must fail check");
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("operator abort"));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            CancellationReason::Manual.to_string(),
            "cancelled by caller"
        );
        assert_eq!(
            CancellationReason::Shutdown.to_string(),
            "queue shutting down"
        );
        assert_eq!(
            CancellationReason::ParentCancelled.to_string(),
            "parent token cancelled"
        );
        assert_eq!(
            CancellationReason::Custom("drive unplugged".into()).to_string(),
            "drive unplugged"
        );
    }

    #[test]
    fn test_cancel_observed_across_threads() {
        let token = CancellationToken::new();
        let observer = token.clone();

        let worker = thread::spawn(move || {
            for _ in 0..500 {
                if observer.is_cancelled() {
                    return true;
                }
                thread::sleep(Duration::from_millis(5));
            }
            false
        });

        thread::sleep(Duration::from_millis(30));
        token.cancel();
        assert!(worker.join().unwrap());
    }

    #[test]
    fn test_children_created_concurrently_all_cancel() {
        let root = Arc::new(CancellationToken::new());

        let spawners: Vec<_> = (0..8)
            .map(|_| {
                let root = Arc::clone(&root);
                thread::spawn(move || root.child())
            })
            .collect();
        let children: Vec<CancellationToken> =
            spawners.into_iter().map(|s| s.join().unwrap()).collect();

        root.cancel();
        for child in children {
            assert!(child.is_cancelled());
        }
    }
}
