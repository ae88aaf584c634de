//! Cache-validity terms
//!
//! A term identifies a window of cache validity. Cache entries are tagged
//! with the term at which they were stored; once the coordinator's term
//! advances past that tag, the entry is possibly stale.
//!
//! The low bit carries epoch state: an odd term means a write epoch is
//! currently open, an even term means no sensitive transaction remains.
//! The coordinator bumps the term exactly when the open-sensitive count
//! transitions to or from zero, which is what keeps the parity meaningful.

use serde::{Deserialize, Serialize};

/// A cache-validity term.
///
/// Terms are totally ordered and monotonically non-decreasing for the
/// lifetime of the process. `Term::INVALID` (zero) is reserved as the
/// "no transaction open" sentinel and is never handed out by the
/// coordinator; live terms start at [`Term::FIRST`].
///
/// # Examples
///
/// ```
/// use termcache_core::Term;
///
/// let tagged = Term::FIRST;
/// let current = tagged.next().next();
/// assert!(current > tagged); // entry tagged at `tagged` is possibly stale
/// assert!(!Term::INVALID.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Term(u64);

impl Term {
    /// Sentinel marking a `Transaction` as not currently active.
    pub const INVALID: Term = Term(0);

    /// First term a freshly constructed coordinator hands out.
    ///
    /// Even (no write epoch open) and distinct from [`Term::INVALID`],
    /// so every term recorded by a live transaction is valid.
    pub const FIRST: Term = Term(2);

    /// Reconstruct a term from its raw representation.
    ///
    /// Used when reading term tags back from cache entries or packed
    /// coordinator state.
    pub const fn from_u64(raw: u64) -> Self {
        Term(raw)
    }

    /// Raw representation, suitable for tagging cache entries.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether this is a real term (not the sentinel).
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Whether a write epoch is open at this term.
    ///
    /// The coordinator toggles the low bit when an epoch opens (first
    /// writer of a fresh epoch) and when it closes (last sensitive
    /// transaction ends), so parity is the epoch-open signal.
    pub const fn write_epoch_open(self) -> bool {
        self.0 & 1 == 1
    }

    /// The successor term.
    #[must_use]
    pub const fn next(self) -> Term {
        Term(self.0 + 1)
    }
}

impl Default for Term {
    fn default() -> Self {
        Term::INVALID
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sentinel_is_not_valid() {
        assert!(!Term::INVALID.is_valid());
        assert!(Term::FIRST.is_valid());
        assert_eq!(Term::default(), Term::INVALID);
    }

    #[test]
    fn first_term_has_no_open_epoch() {
        assert!(!Term::FIRST.write_epoch_open());
        assert!(Term::FIRST.next().write_epoch_open());
    }

    #[test]
    fn ordering_follows_raw_value() {
        assert!(Term::FIRST < Term::FIRST.next());
        assert!(Term::INVALID < Term::FIRST);
    }

    #[test]
    fn serde_roundtrip() {
        let term = Term::from_u64(41);
        let json = serde_json::to_string(&term).unwrap();
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(back, term);
    }

    proptest! {
        #[test]
        fn raw_roundtrip(raw in any::<u64>()) {
            prop_assert_eq!(Term::from_u64(raw).as_u64(), raw);
        }

        #[test]
        fn parity_flips_on_next(raw in 0u64..u64::MAX) {
            let term = Term::from_u64(raw);
            prop_assert_ne!(term.write_epoch_open(), term.next().write_epoch_open());
        }
    }
}
