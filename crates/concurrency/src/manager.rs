//! Transaction manager coordinating term advancement
//!
//! Process-wide coordinator for the shared query cache. It serializes
//! term advancement with the minimum necessary synchronization: one
//! 128-bit atomic word (see [`crate::state`]) mutated only through
//! compare-and-swap retry loops. There are no locks anywhere, so no
//! operation can block, and `term()` is a single acquire load callable
//! from any thread at any instant.
//!
//! # Concurrency Model
//!
//! - `begin`/`end` spin through bounded CAS retries under contention;
//!   they never sleep and never take a lock.
//! - A write transaction whose `end` advances the term publishes with
//!   release ordering; any thread that then observes the advanced term
//!   via an acquire load also observes every cache mutation the writer
//!   published before ending.
//! - Two concurrently open writers are not ordered against each other
//!   here; serializing their cache mutations is the storage layer's job.
//!
//! # Contract
//!
//! Every `begin` must be matched by exactly one `end`, including on all
//! caller error paths (use [`TransactionManager::begin_guarded`] to make
//! that automatic). Double-end and end-without-begin are programming
//! errors, trapped by debug assertions and undefined in release builds.

use crate::metrics::TermObserver;
use crate::state::{Counters, State};
use crate::transaction::{Transaction, TransactionGuard};
use portable_atomic::{AtomicU128, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Cache-line aligned holder for the shared word, so the hottest atomic
/// in the subsystem never false-shares with neighboring fields.
#[repr(align(64))]
struct AlignedState(AtomicU128);

/// Process-wide term/epoch transaction coordinator.
///
/// Constructed once at cache-subsystem startup and shared (by reference
/// or `Arc`) with every cache consumer. All state lives in a single
/// atomically-updated composite word: three open-transaction counters
/// plus the current term.
///
/// # Examples
///
/// ```
/// use termcache_concurrency::{Transaction, TransactionManager};
///
/// let manager = TransactionManager::new(None);
/// let mut tx = Transaction::new();
///
/// manager.begin(&mut tx, false); // write transaction
/// let write_term = tx.term();
/// manager.end(&mut tx);
///
/// // The epoch closed behind the writer, so the term moved past it.
/// assert!(manager.term() > write_term);
/// ```
pub struct TransactionManager {
    state: AlignedState,
    /// Owning cache manager's instrumentation hook; absence never
    /// changes behavior.
    observer: Option<Arc<dyn TermObserver>>,
}

impl TransactionManager {
    /// Create a coordinator with no open transactions.
    ///
    /// `observer` is the owning cache manager's metrics handle; pass
    /// `None` where no instrumentation is wanted (e.g. unit tests).
    pub fn new(observer: Option<Arc<dyn TermObserver>>) -> Self {
        TransactionManager {
            state: AlignedState(AtomicU128::new(State::initial().pack())),
            observer,
        }
    }

    /// Open a transaction against the cache.
    ///
    /// `tx` must be in its empty state (never begun, or already ended).
    /// On return `tx` carries the term in effect for this transaction,
    /// fixed for its lifetime.
    ///
    /// Read-only transactions pay nothing on the common writer-free
    /// path. A reader that observes a concurrently open writer, and
    /// every writer, is marked sensitive: the current epoch cannot close
    /// until it ends.
    pub fn begin(&self, tx: &mut Transaction, read_only: bool) {
        debug_assert!(!tx.is_active(), "begin called on a live transaction");

        let mut current = self.state.0.load(Ordering::Acquire);
        loop {
            // Recompute the whole transition from the fresh snapshot on
            // every retry; a stale sensitivity decision is wrong once a
            // writer has raced in.
            let snapshot = State::unpack(current);
            let outcome = snapshot.begin(read_only);
            match self.state.0.compare_exchange_weak(
                current,
                outcome.next.pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if outcome.next.term != snapshot.term {
                        trace!(term = outcome.next.term.as_u64(), "write epoch opened");
                    }
                    tx.activate(outcome.next.term, read_only, outcome.sensitive);
                    return;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Close a transaction previously opened with [`begin`].
    ///
    /// Applies the retroactive sensitivity check: a transaction that was
    /// not sensitive at begin but whose lifetime was overlapped by a
    /// still-open write epoch is accounted before the epoch may close.
    /// The last sensitive transaction out advances the term, ending the
    /// epoch. `tx` is reset to its empty state on return.
    ///
    /// [`begin`]: TransactionManager::begin
    pub fn end(&self, tx: &mut Transaction) {
        debug_assert!(
            tx.is_active(),
            "end called on a transaction that was never begun"
        );

        let read_only = tx.is_read_only();
        let mut current = self.state.0.load(Ordering::Acquire);
        loop {
            // The retroactive check must be redone against the latest
            // snapshot each retry; the term may have advanced further.
            let snapshot = State::unpack(current);
            let sensitive = tx.is_sensitive() || snapshot.overlaps_write_epoch(tx.term());
            let next = snapshot.end(read_only, sensitive);
            match self.state.0.compare_exchange_weak(
                current,
                next.pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if next.term != snapshot.term {
                        trace!(term = next.term.as_u64(), "write epoch closed");
                    }
                    tx.reset();
                    return;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Open a transaction that ends automatically when the returned
    /// guard drops.
    pub fn begin_guarded(&self, read_only: bool) -> TransactionGuard<'_> {
        TransactionGuard::begin(self, read_only)
    }

    /// Current cache-validity term.
    ///
    /// A single acquire load: lock-free, non-blocking, callable from any
    /// thread. Cache storage compares entry tags against this value to
    /// decide whether a previously-read value is still trustworthy. The
    /// owning manager's observer, if any, is notified of the read.
    pub fn term(&self) -> termcache_core::Term {
        let term = self.snapshot().term;
        if let Some(observer) = &self.observer {
            observer.on_term_read(term);
        }
        term
    }

    /// Current open-transaction counters, for diagnostics and tests.
    pub fn counters(&self) -> Counters {
        self.snapshot().counters
    }

    fn snapshot(&self) -> State {
        State::unpack(self.state.0.load(Ordering::Acquire))
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.snapshot();
        f.debug_struct("TransactionManager")
            .field("term", &state.term)
            .field("counters", &state.counters)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::TermReadStats;
    use static_assertions::const_assert_eq;
    use termcache_core::Term;

    // Shared word plus padding must occupy exactly one cache line.
    const_assert_eq!(std::mem::size_of::<AlignedState>(), 64);
    const_assert_eq!(std::mem::align_of::<AlignedState>(), 64);

    #[test]
    fn fresh_manager_has_even_term_and_zero_counters() {
        let manager = TransactionManager::new(None);
        assert_eq!(manager.term(), Term::FIRST);
        assert!(!manager.term().write_epoch_open());
        assert_eq!(manager.counters(), Counters::default());
    }

    #[test]
    fn serial_write_transaction_bumps_term_twice() {
        // Scenario: single writer, no concurrency.
        let manager = TransactionManager::new(None);
        let before = manager.term();

        let mut tx = Transaction::new();
        manager.begin(&mut tx, false);
        assert!(tx.is_sensitive());
        assert_eq!(tx.term(), before.next());
        assert!(tx.term().write_epoch_open());
        assert_eq!(manager.counters().open_writes, 1);
        assert_eq!(manager.counters().open_sensitive, 1);

        manager.end(&mut tx);
        assert!(!tx.is_active());
        assert_eq!(manager.counters(), Counters::default());
        assert_eq!(manager.term(), before.next().next());
    }

    #[test]
    fn reader_overlapped_by_writer_is_retroactively_sensitive() {
        // Scenario: reader begins first, writer begins while the reader
        // is still open. The reader was not sensitive at begin but must
        // be accounted before the epoch may close.
        let manager = TransactionManager::new(None);
        let initial = manager.term();

        let mut reader = Transaction::new();
        manager.begin(&mut reader, true);
        assert!(!reader.is_sensitive());
        assert_eq!(reader.term(), initial);

        let mut writer = Transaction::new();
        manager.begin(&mut writer, false);
        assert_eq!(writer.term(), initial.next());
        assert_eq!(manager.counters().open_sensitive, 2);

        manager.end(&mut reader);
        assert_eq!(manager.counters().open_reads, 0);
        assert_eq!(manager.counters().open_sensitive, 1);
        // Reader leaving did not close the epoch.
        assert!(manager.term().write_epoch_open());

        manager.end(&mut writer);
        assert_eq!(manager.counters(), Counters::default());
        assert_eq!(manager.term(), initial.next().next());
    }

    #[test]
    fn reader_beginning_during_epoch_is_sensitive_immediately() {
        let manager = TransactionManager::new(None);

        let mut writer = Transaction::new();
        manager.begin(&mut writer, false);

        let mut reader = Transaction::new();
        manager.begin(&mut reader, true);
        assert!(reader.is_sensitive());
        assert_eq!(reader.term(), writer.term());
        assert_eq!(manager.counters().open_sensitive, 2);

        manager.end(&mut writer);
        assert!(manager.term().write_epoch_open(), "reader still holds the epoch");
        manager.end(&mut reader);
        assert!(!manager.term().write_epoch_open());
        assert_eq!(manager.counters(), Counters::default());
    }

    #[test]
    fn readers_alone_never_advance_the_term() {
        let manager = TransactionManager::new(None);
        let initial = manager.term();

        let mut open = Vec::new();
        for _ in 0..8 {
            let mut tx = Transaction::new();
            manager.begin(&mut tx, true);
            assert!(!tx.is_sensitive());
            open.push(tx);
        }
        for tx in open.iter_mut().rev() {
            manager.end(tx);
        }

        assert_eq!(manager.term(), initial);
        assert_eq!(manager.counters(), Counters::default());
    }

    #[test]
    fn transaction_value_is_reusable_after_end() {
        let manager = TransactionManager::new(None);
        let mut tx = Transaction::new();

        manager.begin(&mut tx, true);
        manager.end(&mut tx);
        manager.begin(&mut tx, false);
        assert!(tx.is_sensitive());
        manager.end(&mut tx);

        assert_eq!(manager.counters(), Counters::default());
    }

    #[test]
    fn observer_sees_term_reads() {
        let stats = Arc::new(TermReadStats::new());
        let manager = TransactionManager::new(Some(stats.clone()));

        let t1 = manager.term();
        let t2 = manager.term();
        assert_eq!(t1, t2);
        assert_eq!(stats.term_reads(), 2);
        assert_eq!(stats.last_term(), t2);
    }

    #[test]
    fn absent_observer_changes_nothing() {
        let observed = Arc::new(TermReadStats::new());
        let with = TransactionManager::new(Some(observed));
        let without = TransactionManager::new(None);

        for manager in [&with, &without] {
            let mut tx = Transaction::new();
            manager.begin(&mut tx, false);
            manager.end(&mut tx);
        }
        assert_eq!(with.term(), without.term());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "never begun")]
    fn ending_an_empty_transaction_traps() {
        let manager = TransactionManager::new(None);
        let mut tx = Transaction::new();
        manager.end(&mut tx);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "live transaction")]
    fn double_begin_traps() {
        let manager = TransactionManager::new(None);
        let mut tx = Transaction::new();
        manager.begin(&mut tx, true);
        manager.begin(&mut tx, true);
    }
}
