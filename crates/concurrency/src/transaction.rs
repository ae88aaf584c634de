//! Per-call-site transaction bookkeeping
//!
//! A [`Transaction`] is a small value owned by the caller's stack frame
//! for the duration of one cache interaction. It carries no behavior of
//! its own; [`crate::TransactionManager::begin`] populates it and
//! [`crate::TransactionManager::end`] consumes and resets it. Threading
//! the bookkeeping through caller code this way avoids any lookup table
//! keyed by thread or transaction id.
//!
//! [`TransactionGuard`] wraps a transaction so that `end` runs on drop,
//! covering every early-return and panic path of the caller.

use crate::manager::TransactionManager;
use termcache_core::Term;

/// Bookkeeping for one open cache transaction.
///
/// Empty (default) value has `term == Term::INVALID` and both flags
/// false; `begin` writes the populated fields and `end` resets them.
/// Callers read but never mutate the fields between begin and end.
///
/// # Examples
///
/// ```
/// use termcache_concurrency::{Transaction, TransactionManager};
///
/// let manager = TransactionManager::new(None);
/// let mut tx = Transaction::new();
/// assert!(!tx.is_active());
///
/// manager.begin(&mut tx, true);
/// assert!(tx.is_active());
/// assert!(tx.is_read_only());
///
/// manager.end(&mut tx);
/// assert!(!tx.is_active());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    read_only: bool,
    sensitive: bool,
    term: Term,
}

impl Transaction {
    /// Create an empty, inactive transaction.
    pub const fn new() -> Self {
        Transaction {
            read_only: false,
            sensitive: false,
            term: Term::INVALID,
        }
    }

    /// Whether this transaction is currently open (begun, not yet ended).
    pub fn is_active(&self) -> bool {
        self.term.is_valid()
    }

    /// Whether this transaction was begun read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether this transaction was marked sensitive at begin.
    ///
    /// A transaction can additionally become retroactively sensitive at
    /// `end` time; that decision is made against the coordinator state
    /// current at `end` and is not reflected here.
    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    /// The term observed when this transaction began.
    ///
    /// Fixed for the lifetime of the transaction; [`Term::INVALID`]
    /// while inactive.
    pub fn term(&self) -> Term {
        self.term
    }

    pub(crate) fn activate(&mut self, term: Term, read_only: bool, sensitive: bool) {
        debug_assert!(term.is_valid(), "begin produced the sentinel term");
        self.term = term;
        self.read_only = read_only;
        self.sensitive = sensitive;
    }

    pub(crate) fn reset(&mut self) {
        *self = Transaction::new();
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Transaction::new()
    }
}

/// RAII wrapper that ends its transaction on drop.
///
/// `end` must run on all caller error and abort paths; holding a guard
/// makes that automatic.
///
/// # Examples
///
/// ```
/// use termcache_concurrency::TransactionManager;
///
/// let manager = TransactionManager::new(None);
/// {
///     let guard = manager.begin_guarded(true);
///     let _observed = guard.term();
///     // ... cache work; the transaction ends when `guard` drops ...
/// }
/// assert_eq!(manager.counters().open_reads, 0);
/// ```
#[derive(Debug)]
pub struct TransactionGuard<'a> {
    manager: &'a TransactionManager,
    tx: Transaction,
}

impl<'a> TransactionGuard<'a> {
    pub(crate) fn begin(manager: &'a TransactionManager, read_only: bool) -> Self {
        let mut tx = Transaction::new();
        manager.begin(&mut tx, read_only);
        TransactionGuard { manager, tx }
    }

    /// The term observed when the guarded transaction began.
    pub fn term(&self) -> Term {
        self.tx.term()
    }

    /// Whether the guarded transaction is read-only.
    pub fn is_read_only(&self) -> bool {
        self.tx.is_read_only()
    }

    /// Whether the guarded transaction was marked sensitive at begin.
    pub fn is_sensitive(&self) -> bool {
        self.tx.is_sensitive()
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        self.manager.end(&mut self.tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_transaction_is_inactive() {
        let tx = Transaction::new();
        assert!(!tx.is_active());
        assert!(!tx.is_read_only());
        assert!(!tx.is_sensitive());
        assert_eq!(tx.term(), Term::INVALID);
        assert_eq!(tx, Transaction::default());
    }

    #[test]
    fn activate_then_reset_restores_empty_value() {
        let mut tx = Transaction::new();
        tx.activate(Term::FIRST, true, false);
        assert!(tx.is_active());
        assert!(tx.is_read_only());

        tx.reset();
        assert_eq!(tx, Transaction::new());
    }

    #[test]
    fn guard_ends_transaction_on_drop() {
        let manager = TransactionManager::new(None);
        {
            let guard = manager.begin_guarded(false);
            assert!(guard.is_sensitive());
            assert_eq!(manager.counters().open_writes, 1);
        }
        assert_eq!(manager.counters().open_writes, 0);
        assert_eq!(manager.counters().open_sensitive, 0);
    }

    #[test]
    fn guard_ends_transaction_on_panic_unwind() {
        let manager = TransactionManager::new(None);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = manager.begin_guarded(true);
            panic!("caller abort path");
        }));
        assert!(result.is_err());
        assert_eq!(manager.counters().open_reads, 0);
    }
}
