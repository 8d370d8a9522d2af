//! Cooperative cancellation for in-flight captures.
//!
//! A [`CancellationSource`] hands out [`CancellationToken`]s that a worker
//! checks before applying its result. Dropping the source does not cancel;
//! use [`CancelOnDrop`] when every exit path must cancel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable, thread-safe view of a cancellation flag.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether both tokens observe the same source.
    pub fn same_source(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// The control side of a cancellation flag.
#[derive(Debug, Default)]
pub struct CancellationSource {
    cancelled: Arc<AtomicBool>,
}

impl CancellationSource {
    /// Create a new source with an uncancelled flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a token observing this source.
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Owns a source and cancels it when dropped.
#[derive(Debug, Default)]
pub struct CancelOnDrop {
    source: CancellationSource,
}

impl CancelOnDrop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.source.token()
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.source.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_observed_by_all_tokens() {
        let source = CancellationSource::new();
        let a = source.token();
        let b = a.clone();
        assert!(!a.is_cancelled());
        source.cancel();
        source.cancel();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert!(a.same_source(&b));
    }

    #[test]
    fn test_guard_cancels_on_drop() {
        let guard = CancelOnDrop::new();
        let token = guard.token();
        assert!(!token.is_cancelled());
        drop(guard);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_tokens_from_different_sources() {
        let a = CancellationSource::new().token();
        let b = CancellationSource::new().token();
        assert!(!a.same_source(&b));
    }
}
