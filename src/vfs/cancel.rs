/*!
 * Cancellation
 * Cooperative cancellation for long-running tree operations
 *
 * Checked between directory entries by remove_all, walk and
 * directory_size. Work done before cancellation is left in place.
 */

#[cfg(test)]
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::types::{FsError, FsResult};

/// Shared cancellation flag (lock-free, clone to hand out)
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    /// Checks that pass before the token cancels itself
    #[cfg(test)]
    budget: Option<Arc<AtomicUsize>>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that lets `checks` checks pass, then trips
    #[cfg(test)]
    pub(crate) fn cancel_after(checks: usize) -> Self {
        Self {
            budget: Some(Arc::new(AtomicUsize::new(checks))),
            ..Self::default()
        }
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation was requested
    #[inline]
    pub fn check(&self, op: &str, path: &str) -> FsResult<()> {
        #[cfg(test)]
        if let Some(budget) = &self.budget {
            let spent = budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_err();
            if spent {
                self.cancel();
            }
        }
        if self.is_cancelled() {
            let path = if path.is_empty() { "." } else { path };
            return Err(FsError::Cancelled(format!("{} {}", op, path)));
        }
        Ok(())
    }
}
