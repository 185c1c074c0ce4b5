//! Filters, Approximate Membership Queries (AMQs), that support deletion.

#[cfg(all(feature = "rand", feature = "succinct", feature = "num-traits"))]
mod bucket;

pub mod compat;

#[cfg(all(feature = "rand", feature = "succinct", feature = "num-traits"))]
pub mod cuckoofilter;

#[cfg(all(feature = "fixedbitset", feature = "succinct", feature = "num-traits"))]
pub mod quotientfilter;

#[cfg(all(feature = "fixedbitset", feature = "succinct", feature = "num-traits"))]
pub mod slot;

use std::error::Error;
use std::fmt::{self, Debug};
use std::hash::Hash;

/// A filter is a set-like data structure, that keeps track of elements it has seen without
/// the need to store them. Looking up values has a certain false positive rate, but a false
/// negative rate of 0%.
///
/// This kind of lookup is also referred to as Approximate Membership Queries (AMQs).
///
/// The filters of this crate also support deletion. Since only fingerprints are stored, different
/// elements may collide. Deleting an element that was never added may remove a colliding element,
/// so only delete elements that you know were added before. Even then, filters that store a
/// collision only once (`QuotientFilter`) forget all colliding elements on deletion, which results
/// in false negatives. Filters that keep one entry per insertion (`CuckooFilter`) are not
/// affected.
pub trait Filter<T>
where
    T: Hash + ?Sized,
{
    /// Error type that may occur during insertion.
    type InsertErr: Debug;

    /// Clear state of the filter, so that it behaves like a fresh one.
    fn clear(&mut self);

    /// Insert new element into the filter.
    ///
    /// On success, the element is represented by the filter afterwards. The returned flag reports
    /// whether a new entry was stored (`true`) or the element was already represented and the
    /// filter was left untouched (`false`).
    ///
    /// The method may return an error if the filter cannot accommodate the element. When this
    /// happens, the filter is not altered.
    fn insert(&mut self, obj: &T) -> Result<bool, Self::InsertErr>;

    /// Remove one entry of the element from the filter.
    ///
    /// Returns `true` if an entry was removed, `false` if the element was not found in which
    /// case the filter was not modified.
    fn delete(&mut self, obj: &T) -> bool;

    /// Check if filters is empty, i.e. contains no elements.
    fn is_empty(&self) -> bool;

    /// Return number of entries stored in the filter.
    fn len(&self) -> usize;

    /// Guess if the given element was added to the filter.
    fn query(&self, obj: &T) -> bool;
}

/// Error signaling that filter parameters are out of range, so no filter was created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamsError {
    /// Number of cuckoo filter buckets is not a power of 2 or smaller than 2.
    NBuckets(usize),

    /// Cuckoo filter fingerprint size is not within `2..=64` bits.
    LFingerprint(usize),

    /// Number of quotient bits is 0 or too large to address slots.
    BitsQuotient(usize),

    /// Number of remainder bits is not within `1..=64`.
    BitsRemainder(usize),

    /// Quotient and remainder do not fit into a single 64 bit hash.
    TooManyBits {
        /// Number of quotient bits.
        bits_quotient: usize,
        /// Number of remainder bits.
        bits_remainder: usize,
    },

    /// False positive rate is not within `(0, 1)`.
    FalsePositiveRate(f64),

    /// Number of expected elements is 0.
    ExpectedElements(usize),

    /// Table would not fit into memory.
    TableSize,
}

impl fmt::Display for ParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NBuckets(n) => write!(
                f,
                "n_buckets ({}) must be a power of 2 and greater or equal than 2",
                n
            ),
            Self::LFingerprint(l) => write!(
                f,
                "l_fingerprint ({}) must be greater than 1 and less or equal than 64",
                l
            ),
            Self::BitsQuotient(q) => write!(
                f,
                "bits_quotient ({}) must be greater than 0 and smaller than {}",
                q,
                usize::BITS
            ),
            Self::BitsRemainder(r) => write!(
                f,
                "bits_remainder ({}) must be greater than 0 and smaller or equal than 64",
                r
            ),
            Self::TooManyBits {
                bits_quotient,
                bits_remainder,
            } => write!(
                f,
                "bits_remainder ({}) + bits_quotient ({}) must be smaller or equal than 64",
                bits_remainder, bits_quotient
            ),
            Self::FalsePositiveRate(p) => write!(
                f,
                "false_positive_rate ({}) must be greater than 0 and smaller than 1",
                p
            ),
            Self::ExpectedElements(n) => {
                write!(f, "expected_elements ({}) must be at least 1", n)
            }
            Self::TableSize => write!(f, "Table size too large"),
        }
    }
}

impl Error for ParamsError {}
