//! Convenient imports for termcache.
//!
//! Re-exports the commonly used types so callers can get started with a
//! single import:
//!
//! ```
//! use termcache::prelude::*;
//!
//! let manager = TransactionManager::new(None);
//! let mut tx = Transaction::new();
//! manager.begin(&mut tx, true);
//! manager.end(&mut tx);
//! ```

// Coordinator
pub use crate::{Transaction, TransactionGuard, TransactionManager};

// Instrumentation
pub use crate::{TermObserver, TermReadStats};

// Core types
pub use crate::{Counters, Term};
