//! # Termcache
//!
//! Term-based transaction coordination for a shared, concurrently-accessed
//! query cache inside a database server.
//!
//! Multiple threads run read-only and read-write transactions against the
//! same cache. The coordinator lets any cache consumer cheaply determine
//! whether the cache has been structurally invalidated by a write since it
//! last looked, without taking a lock per cache entry: entries are tagged
//! with the [`Term`] at which they were stored, and a tag older than the
//! current term marks the entry possibly stale.
//!
//! ## Quick Start
//!
//! ```
//! use termcache::prelude::*;
//!
//! let manager = TransactionManager::new(None);
//!
//! // Read path: free unless a writer is concurrently open.
//! let mut tx = Transaction::new();
//! manager.begin(&mut tx, true);
//! let observed = tx.term();
//! // ... look up cache entries, trusting tags >= `observed` ...
//! manager.end(&mut tx);
//!
//! // Write path: always opens (or joins) a sensitive epoch.
//! let guard = manager.begin_guarded(false);
//! // ... mutate cache content ...
//! drop(guard); // epoch closes, term advances
//!
//! assert!(manager.term() > observed);
//! ```
//!
//! ## Guarantees
//!
//! - [`TransactionManager::term`] is a single atomic load: lock-free,
//!   non-blocking, callable from any thread at any time.
//! - The term sequence any thread observes is monotonically non-decreasing.
//! - A thread that observes an advanced term also observes all cache
//!   mutations the finishing writer published before ending.
//! - `begin`/`end` never block or sleep; contention costs bounded CAS
//!   retries only.

#![warn(missing_docs)]

pub mod prelude;

// Coordinator surface
pub use termcache_concurrency::{
    Counters, State, TermObserver, TermReadStats, Transaction, TransactionGuard,
    TransactionManager,
};

// Core types
pub use termcache_core::Term;
