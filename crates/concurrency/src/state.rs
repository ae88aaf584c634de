//! Packed coordinator state and its pure transitions
//!
//! The coordinator's entire shared state is one 128-bit word holding the
//! current term and three open-transaction counters, updated atomically
//! as a unit. This module owns the word layout and the side-effect-free
//! "compute next state from current state" functions; the CAS retry
//! loops in [`crate::manager`] do nothing but feed fresh snapshots into
//! these transitions, so the transition logic is unit-testable without
//! touching an atomic.
//!
//! # Word Layout
//!
//! ```text
//! bits   0..64    term            (u64)
//! bits  64..80    open_reads      (u16)
//! bits  80..96    open_writes     (u16)
//! bits  96..112   open_sensitive  (u16)
//! bits 112..128   reserved, always zero
//! ```
//!
//! Counters are 16-bit: up to 65 535 concurrently open transactions per
//! class, which is far beyond any realistic thread count. Underflow and
//! overflow are contract violations checked by debug assertions.
//!
//! # Invariants
//!
//! - `term` is monotonically non-decreasing across transitions.
//! - `term` changes only while `open_sensitive` transitions to or from
//!   zero, so `term` is odd exactly while a write epoch is open.
//! - Counters never go negative (callers pair every begin with one end).

use termcache_core::Term;

const READS_SHIFT: u32 = 64;
const WRITES_SHIFT: u32 = 80;
const SENSITIVE_SHIFT: u32 = 96;

/// Open-transaction counters, updated atomically alongside the term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    /// Currently active read-only transactions.
    pub open_reads: u16,
    /// Currently active write transactions.
    pub open_writes: u16,
    /// Currently active transactions (of either kind) that must be
    /// accounted for before the term may advance again.
    pub open_sensitive: u16,
}

/// One snapshot of the coordinator's shared word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    /// Current cache-validity term.
    pub term: Term,
    /// Open-transaction counters.
    pub counters: Counters,
}

/// Result of applying a begin transition to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeginOutcome {
    /// The state to install via CAS.
    pub next: State,
    /// Whether the new transaction is sensitive.
    pub sensitive: bool,
}

impl State {
    /// Initial coordinator state: no open transactions, term at
    /// [`Term::FIRST`].
    pub fn initial() -> Self {
        State {
            term: Term::FIRST,
            counters: Counters::default(),
        }
    }

    /// Serialize into the 128-bit word layout documented at module level.
    pub fn pack(self) -> u128 {
        (self.term.as_u64() as u128)
            | ((self.counters.open_reads as u128) << READS_SHIFT)
            | ((self.counters.open_writes as u128) << WRITES_SHIFT)
            | ((self.counters.open_sensitive as u128) << SENSITIVE_SHIFT)
    }

    /// Deserialize from the 128-bit word layout.
    pub fn unpack(word: u128) -> Self {
        State {
            term: Term::from_u64(word as u64),
            counters: Counters {
                open_reads: (word >> READS_SHIFT) as u16,
                open_writes: (word >> WRITES_SHIFT) as u16,
                open_sensitive: (word >> SENSITIVE_SHIFT) as u16,
            },
        }
    }

    /// Compute the state after a new transaction begins.
    ///
    /// Read-only transactions are free unless a writer is concurrently
    /// open: no term bump, no sensitive accounting. A reader that races
    /// an open writer is marked sensitive immediately, so the epoch
    /// cannot close underneath it.
    ///
    /// Write transactions are always sensitive. The first writer of a
    /// fresh epoch (snapshot has `open_sensitive == 0`) advances the
    /// term to odd and retroactively counts every currently open reader
    /// as sensitive (`open_sensitive = open_reads + 1`); a writer
    /// joining an epoch that is still draining adds only itself.
    ///
    /// The outcome is valid only against the exact snapshot it was
    /// computed from; on CAS failure the caller must recompute from the
    /// fresh snapshot rather than carry over a stale decision.
    #[must_use]
    pub fn begin(mut self, read_only: bool) -> BeginOutcome {
        if read_only {
            let sensitive = self.counters.open_writes > 0;
            self.counters.open_reads += 1;
            if sensitive {
                self.counters.open_sensitive += 1;
            }
            BeginOutcome {
                next: self,
                sensitive,
            }
        } else {
            if self.counters.open_sensitive == 0 {
                // Fresh epoch: term goes odd, and every open reader is
                // retroactively on the hook for closing it.
                self.term = self.term.next();
                self.counters.open_sensitive = self.counters.open_reads + 1;
            } else {
                self.counters.open_sensitive += 1;
            }
            self.counters.open_writes += 1;
            BeginOutcome {
                next: self,
                sensitive: true,
            }
        }
    }

    /// Compute the state after a transaction ends.
    ///
    /// `sensitive` must be the transaction's final sensitivity, i.e. the
    /// flag recorded at begin OR the retroactive check
    /// ([`State::overlaps_write_epoch`]) against this same snapshot. The
    /// last sensitive transaction to leave closes the epoch by advancing
    /// the term back to even.
    #[must_use]
    pub fn end(mut self, read_only: bool, sensitive: bool) -> State {
        if read_only {
            debug_assert!(
                self.counters.open_reads > 0,
                "ending a read transaction that was never begun"
            );
            self.counters.open_reads -= 1;
        } else {
            debug_assert!(
                self.counters.open_writes > 0,
                "ending a write transaction that was never begun"
            );
            self.counters.open_writes -= 1;
        }
        if sensitive {
            debug_assert!(
                self.counters.open_sensitive > 0,
                "sensitive count underflow"
            );
            self.counters.open_sensitive -= 1;
            if self.counters.open_sensitive == 0 {
                self.term = self.term.next();
            }
        }
        self
    }

    /// Retroactive sensitivity check for a transaction that recorded
    /// `observed` at begin.
    ///
    /// True when a write epoch is currently open (odd term) and the term
    /// has advanced past the transaction's recorded one, meaning a
    /// writer began after this transaction did and counted it into the
    /// epoch. A transaction that began inside the epoch (`term ==
    /// observed`) with no writer open was never counted and stays
    /// non-sensitive.
    pub fn overlaps_write_epoch(&self, observed: Term) -> bool {
        self.term.write_epoch_open() && self.term > observed
    }
}
