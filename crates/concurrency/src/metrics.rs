//! Instrumentation hooks for the owning cache manager
//!
//! The coordinator itself stores no metrics. The owning cache manager
//! may register a [`TermObserver`] at construction to be notified of
//! term queries; the hook is purely observational and its absence (or a
//! no-op implementation) never affects coordination behavior.

use std::sync::atomic::{AtomicU64, Ordering};
use termcache_core::Term;

/// Receiver for term-query notifications.
///
/// Implementations must be cheap and non-blocking: `on_term_read` runs
/// inline on the cache's read path.
pub trait TermObserver: Send + Sync {
    /// Called after each [`crate::TransactionManager::term`] query with
    /// the term that was returned.
    fn on_term_read(&self, term: Term);
}

/// Atomic counters over term queries, usable as a [`TermObserver`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use termcache_concurrency::{TermReadStats, TransactionManager};
///
/// let stats = Arc::new(TermReadStats::new());
/// let manager = TransactionManager::new(Some(stats.clone()));
///
/// let term = manager.term();
/// assert_eq!(stats.term_reads(), 1);
/// assert_eq!(stats.last_term(), term);
/// ```
#[derive(Debug, Default)]
pub struct TermReadStats {
    term_reads: AtomicU64,
    last_term: AtomicU64,
}

impl TermReadStats {
    /// Create zeroed stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of term queries observed so far.
    pub fn term_reads(&self) -> u64 {
        self.term_reads.load(Ordering::Relaxed)
    }

    /// Highest term seen by any observed query.
    ///
    /// [`Term::INVALID`] until the first query is observed.
    pub fn last_term(&self) -> Term {
        Term::from_u64(self.last_term.load(Ordering::Relaxed))
    }
}

impl TermObserver for TermReadStats {
    fn on_term_read(&self, term: Term) {
        self.term_reads.fetch_add(1, Ordering::Relaxed);
        // fetch_max keeps the recorded term monotonic even when
        // concurrent readers report out of order.
        self.last_term.fetch_max(term.as_u64(), Ordering::Relaxed);
    }
}
