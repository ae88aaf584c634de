//! Concurrency layer for the shared query cache
//!
//! This crate implements the term/epoch transaction coordinator that lets
//! cache consumers cheaply decide "has the cache been structurally
//! invalidated by a write since I last observed it?" without per-entry
//! locking:
//! - [`TransactionManager`]: lock-free begin/end bookkeeping over a single
//!   atomic state word
//! - [`Transaction`]: per-call-site bookkeeping value, owned by the
//!   caller's stack frame
//! - [`Term`] queries that are a single atomic load, callable from any
//!   thread at any time
//!
//! All mutation goes through compare-and-swap retry loops; no operation
//! ever blocks or sleeps.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod metrics;
pub mod state;
pub mod transaction;

pub use manager::TransactionManager;
pub use metrics::{TermObserver, TermReadStats};
pub use state::{Counters, State};
pub use transaction::{Transaction, TransactionGuard};

// Re-export the term type from core for convenience
pub use termcache_core::Term;
