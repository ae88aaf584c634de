//! Core types for the termcache subsystem
//!
//! This crate defines the vocabulary shared by the coordinator and its
//! consumers:
//! - [`Term`]: the monotonically increasing cache-validity epoch

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod term;

pub use term::Term;
