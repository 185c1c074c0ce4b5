//! QuotientFilter implementation.
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use fixedbitset::FixedBitSet;
use succinct::{IntVec, IntVecMut, IntVector};

use crate::filters::slot::Slot;
use crate::filters::{Filter, ParamsError};
use crate::hash_utils::{BuildHasherSeeded, hash_with, low_bits_mask};
use crate::helpers::all_zero_intvector;
use crate::sizing::{
    quotient_bits, quotient_capacity, quotient_false_positive_rate, quotient_total_size,
    remainder_bits,
};

/// Error that signals that the QuotientFilter is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotientFilterFull;

impl fmt::Display for QuotientFilterFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuotientFilter is full")
    }
}

impl std::error::Error for QuotientFilterFull {}

/// A QuotientFilter is a set-like data structure, that keeps track of elements it has seen without
/// the need to store them. Looking up values has a certain false positive rate, but a false
/// negative rate of 0%. Elements can be removed again, see "Deletion" for the effect on colliding
/// elements.
///
/// # Examples
/// ```
/// use amqfilters::filters::Filter;
/// use amqfilters::filters::quotientfilter::QuotientFilter;
///
/// // set up filter
/// let bits_quotient = 16;
/// let bits_remainder = 5;
/// let mut filter = QuotientFilter::with_params(bits_quotient, bits_remainder);
///
/// // add some data
/// filter.insert(&"my super long string").unwrap();
///
/// // later
/// assert!(filter.query(&"my super long string"));
/// assert!(!filter.query(&"another super long string"));
///
/// // and gone again
/// assert!(filter.delete(&"my super long string"));
/// assert!(!filter.query(&"my super long string"));
/// ```
///
/// # Applications
/// - as a pre-filter for more expensive lookups, e.g. in combination with a real set, map or
///   database, so the final false positive rate is 0%
/// - when elements must be removable and lookups should touch a single, contiguous memory area
///
/// # How It Works
///
/// ## Setup
/// There are `2^bits_quotient` slots, initial empty. For every slot, we store `bits_remainder` as
/// fingerprint information, a `is_continuation` bit, a `is_occupied` bit and a `is_shifted` bit.
///
/// ```text
/// bits_quotient  = 3
/// bits_remainder = 4
///
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// |  position       ||   0 |   1 |   2 |   3 |   4 |   5 |   6 |   7 |
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// | is_occupied     ||     |     |     |     |     |     |     |     |
/// | is_continuation ||     |     |     |     |     |     |     |     |
/// | is_shifted      ||     |     |     |     |     |     |     |     |
/// | remainder       || 0x0 | 0x0 | 0x0 | 0x0 | 0x0 | 0x0 | 0x0 | 0x0 |
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// ```
///
/// ## Insertion
/// Elements are hashed to 64 bits. The lowest `bits_remainder` bits form the remainder, the next
/// `bits_quotient` bits the quotient. The quotient is the canonical slot of the remainder.
///
/// All remainders sharing a quotient are stored next to each other, sorted ascending. This is
/// called a "run". The canonical slot of a run is marked by `is_occupied`, even if the run had to
/// be moved to later slots. Content that is not stored in its canonical slot has `is_shifted`,
/// every slot of a run except the first one has `is_continuation`. A sequence of runs without a
/// gap is called a "cluster":
///
/// ```text
/// quotient/remainder = 2/0x2, 2/0x6, 2/0xe, 3/0x1, 7/0x2
///
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// | position        ||   0 |   1 |   2 |   3 |   4 |   5 |   6 |   7 |
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// | is_occupied     ||     |     |   X |   X |     |     |     |   X |
/// | is_continuation ||     |     |     |   X |   X |     |     |     |
/// | is_shifted      ||     |     |     |   X |   X |   X |     |     |
/// | remainder       || 0x0 | 0x0 | 0x2 | 0x6 | 0xe | 0x1 | 0x0 | 0x2 |
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// | run             ||            [===============] [===]       [===]|
/// | cluster         ||            [=====================]       [===]|
/// +-----------------++-----------------------------------------------|
/// ```
///
/// To insert, the run of the quotient is located by walking back to the start of the cluster and
/// then forward, skipping one run per occupied slot. The remainder is placed at its sorted
/// position within the run and everything behind it is shifted one slot to the right, up to the
/// next empty slot. The entire array works like a ring-buffer and operations can over- and
/// underflow:
///
/// ```text
/// quotient/remainder = 7/0x3
///
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// | position        ||   0 |   1 |   2 |   3 |   4 |   5 |   6 |   7 |
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// | is_occupied     ||     |     |   X |   X |     |     |     |   X |
/// | is_continuation ||   X |     |     |   X |   X |     |     |     |
/// | is_shifted      ||   X |     |     |   X |   X |   X |     |     |
/// | remainder       || 0x3 | 0x0 | 0x2 | 0x6 | 0xe | 0x1 | 0x0 | 0x2 |
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// | run             ||====]       [===============] [===]       [====|
/// | cluster         ||====]       [=====================]       [====|
/// +-----------------++-----------------------------------------------|
/// ```
///
/// Inserting a remainder that is already part of its run does not change the filter, the filter
/// has set semantics.
///
/// ## Lookup
/// The lookup locates the run like the insertion does and checks if it contains the remainder.
///
/// ## Deletion
/// The remainder is removed from its run and the rest of the cluster is shifted one slot to the
/// left, up to an empty slot or a slot that holds content at its canonical position. Shifted
/// content that reaches its canonical slot loses `is_shifted`. If the first remainder of a run is
/// removed, its successor becomes the new start of the run. If the run becomes empty, the
/// canonical slot is no longer `is_occupied`:
///
/// ```text
/// delete quotient/remainder = 2/0x2
///
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// | position        ||   0 |   1 |   2 |   3 |   4 |   5 |   6 |   7 |
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// | is_occupied     ||     |     |   X |   X |     |     |     |   X |
/// | is_continuation ||   X |     |     |   X |     |     |     |     |
/// | is_shifted      ||   X |     |     |   X |   X |     |     |     |
/// | remainder       || 0x3 | 0x0 | 0x6 | 0xe | 0x1 | 0x0 | 0x0 | 0x2 |
/// +-----------------++-----+-----+-----+-----+-----+-----+-----+-----+
/// | run             ||====]       [=========] [===]             [====|
/// | cluster         ||====]       [===============]             [====|
/// +-----------------++-----------------------------------------------|
/// ```
///
/// Different elements may share quotient and remainder. Since every pair is stored only once,
/// inserting the second element is a no-op and deleting either of them removes the pair. The
/// other element is reported as absent afterwards, i.e. deletion can produce false negatives. The
/// chance of this shrinks with `bits_quotient + bits_remainder`. Use the `CuckooFilter` if
/// colliding elements must survive deletions.
///
/// # See Also
/// - `std::collections::HashSet`: has a false positive rate of 0%, but also needs to store all
///   elements
/// - `amqfilters::filters::cuckoofilter::CuckooFilter`: also supports deletion, with multiset
///   semantics
///
/// # References
/// - ["Don’t Thrash: How to Cache your Hash on Flash" (short version), Michael A. Bender and others, 2012](http://static.usenix.org/events/hotstorage11/tech/final_files/Bender.pdf)
/// - ["Don’t Thrash: How to Cache your Hash on Flash" (long version), Michael A. Bender and others, 2012](https://www.vldb.org/pvldb/vol5/p1627_michaelabender_vldb2012.pdf)
/// - [Wikipedia: Quotient Filter](https://en.wikipedia.org/wiki/Quotient_filter)
#[derive(Clone)]
pub struct QuotientFilter<T, B = BuildHasherSeeded>
where
    T: Hash + ?Sized,
    B: BuildHasher + Clone + Eq,
{
    is_occupied: FixedBitSet,
    is_continuation: FixedBitSet,
    is_shifted: FixedBitSet,
    remainders: IntVector<u64>,
    bits_quotient: usize,
    capacity: usize,
    false_positive_rate: f64,
    buildhasher: B,
    n_elements: usize,
    phantom: PhantomData<fn() -> T>,
}

impl<T> QuotientFilter<T>
where
    T: Hash + ?Sized,
{
    /// Create new quotient filter with:
    ///
    /// - `bits_quotient`: number of bits used for a quotient, aka `2^bits_quotient` slots will be
    ///   allocated
    /// - `bits_remainder`: number of bits used for the remainder, so every slot will require
    ///   `bits_remainder + 3` bits of storage
    ///
    /// and a default hasher.
    ///
    /// Panics if the parameters are not in range, especially if
    /// `bits_quotient + bits_remainder > 64`.
    pub fn with_params(bits_quotient: usize, bits_remainder: usize) -> Self {
        let buildhasher = BuildHasherSeeded::default();
        Self::with_params_and_hash(bits_quotient, bits_remainder, buildhasher)
    }

    /// Create new quotient filter that holds `expected_elements` with a false positive rate of
    /// at most `false_positive_rate`.
    ///
    /// Panics if the parameters are not in range.
    pub fn with_properties(expected_elements: usize, false_positive_rate: f64) -> Self {
        let buildhasher = BuildHasherSeeded::default();
        Self::with_properties_and_hash(expected_elements, false_positive_rate, buildhasher)
    }
}

impl<T, B> QuotientFilter<T, B>
where
    T: Hash + ?Sized,
    B: BuildHasher + Clone + Eq,
{
    /// Same as `with_params` but with specific `BuildHasher`.
    pub fn with_params_and_hash(
        bits_quotient: usize,
        bits_remainder: usize,
        buildhasher: B,
    ) -> Self {
        match Self::try_with_params_and_hash(bits_quotient, bits_remainder, buildhasher) {
            Ok(filter) => filter,
            Err(e) => panic!("{}", e),
        }
    }

    /// Same as `with_params_and_hash` but reports invalid parameters as error.
    pub fn try_with_params_and_hash(
        bits_quotient: usize,
        bits_remainder: usize,
        buildhasher: B,
    ) -> Result<Self, ParamsError> {
        if (bits_remainder == 0) || (bits_remainder > 64) {
            return Err(ParamsError::BitsRemainder(bits_remainder));
        }
        if (bits_quotient == 0) || (bits_quotient >= usize::BITS as usize) {
            return Err(ParamsError::BitsQuotient(bits_quotient));
        }
        if bits_remainder + bits_quotient > 64 {
            return Err(ParamsError::TooManyBits {
                bits_quotient,
                bits_remainder,
            });
        }

        let len = 1usize << bits_quotient;
        len.checked_mul(bits_remainder + 3)
            .ok_or(ParamsError::TableSize)?;

        let capacity = quotient_capacity(len);
        Ok(Self {
            is_occupied: FixedBitSet::with_capacity(len),
            is_continuation: FixedBitSet::with_capacity(len),
            is_shifted: FixedBitSet::with_capacity(len),
            remainders: all_zero_intvector(bits_remainder, len),
            bits_quotient,
            capacity,
            false_positive_rate: quotient_false_positive_rate(
                capacity,
                bits_quotient + bits_remainder,
            ),
            buildhasher,
            n_elements: 0,
            phantom: PhantomData,
        })
    }

    /// Same as `with_properties` but with specific `BuildHasher`.
    pub fn with_properties_and_hash(
        expected_elements: usize,
        false_positive_rate: f64,
        buildhasher: B,
    ) -> Self {
        match Self::try_with_properties_and_hash(
            expected_elements,
            false_positive_rate,
            buildhasher,
        ) {
            Ok(filter) => filter,
            Err(e) => panic!("{}", e),
        }
    }

    /// Same as `with_properties_and_hash` but reports invalid parameters as error.
    pub fn try_with_properties_and_hash(
        expected_elements: usize,
        false_positive_rate: f64,
        buildhasher: B,
    ) -> Result<Self, ParamsError> {
        if expected_elements < 1 {
            return Err(ParamsError::ExpectedElements(expected_elements));
        }
        if !((false_positive_rate > 0.) && (false_positive_rate < 1.)) {
            return Err(ParamsError::FalsePositiveRate(false_positive_rate));
        }

        let bits_quotient = quotient_bits(expected_elements);
        let bits_remainder = remainder_bits(expected_elements, bits_quotient, false_positive_rate);
        let mut filter = Self::try_with_params_and_hash(bits_quotient, bits_remainder, buildhasher)?;
        filter.capacity = expected_elements;
        filter.false_positive_rate = false_positive_rate;
        Ok(filter)
    }

    /// Number of bits used for addressing slots.
    pub fn bits_quotient(&self) -> usize {
        self.bits_quotient
    }

    /// Number of bits stored as fingeprint information.
    pub fn bits_remainder(&self) -> usize {
        self.remainders.element_bits()
    }

    /// Number of slots, `2^bits_quotient`.
    pub fn n_slots(&self) -> usize {
        self.is_occupied.len()
    }

    /// Number of elements the filter is rated for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// False positive rate at the rated capacity.
    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }

    /// Table size in bytes, every slot requires `bits_remainder + 3` bits.
    pub fn total_size(&self) -> usize {
        quotient_total_size(self.bits_quotient, self.bits_remainder())
    }

    /// Get `BuildHasher`.
    pub fn buildhasher(&self) -> &B {
        &self.buildhasher
    }

    /// Get content of slot at `pos`.
    ///
    /// Panics if `pos >= n_slots()`.
    pub fn slot(&self, pos: usize) -> Slot {
        Slot {
            remainder: self.remainders.get(pos as u64),
            is_occupied: self.is_occupied[pos],
            is_continuation: self.is_continuation[pos],
            is_shifted: self.is_shifted[pos],
        }
    }

    /// Iterate over all slots, starting at position 0.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        (0..self.n_slots()).map(move |pos| self.slot(pos))
    }

    fn calc_quotient_remainder(&self, obj: &T) -> (usize, u64) {
        let bits_remainder = self.bits_remainder();
        let fingerprint = hash_with(&self.buildhasher, obj);
        let remainder = fingerprint & low_bits_mask(bits_remainder);
        let quotient = (fingerprint >> bits_remainder) & low_bits_mask(self.bits_quotient);
        (quotient as usize, remainder)
    }

    fn decr(&self, pos: &mut usize) {
        *pos = if *pos == 0 {
            self.n_slots() - 1
        } else {
            *pos - 1
        };
    }

    fn incr(&self, pos: &mut usize) {
        *pos = if *pos == self.n_slots() - 1 {
            0
        } else {
            *pos + 1
        }
    }

    /// Store content of `slot` at `pos`. `is_occupied` stays with the position and is not touched.
    fn set_content(&mut self, pos: usize, slot: &Slot) {
        self.remainders.set(pos as u64, slot.remainder);
        self.is_continuation.set(pos, slot.is_continuation);
        self.is_shifted.set(pos, slot.is_shifted);
    }

    /// Position at which the run of `quotient` starts, or would start if `quotient` is not
    /// occupied yet.
    fn run_start(&self, quotient: usize) -> usize {
        // walk back to find the beginning of the cluster
        let mut b = quotient;
        while self.is_shifted[b] {
            self.decr(&mut b);
        }

        // walk forward to find the actual start of the run
        let mut s = b;
        while b != quotient {
            // invariant: `s` points to first slot of the run of `b`

            // skip all elements in the current run
            loop {
                self.incr(&mut s);
                if !self.is_continuation[s] {
                    break;
                }
            }

            // find the next occupied canonical slot
            loop {
                self.incr(&mut b);
                if self.is_occupied[b] || (b == quotient) {
                    break;
                }
            }
        }
        s
    }

    /// Locate the run of `quotient`. The run covers `len` slots starting at `start`, i.e. the
    /// half-open, wrapping interval `[start, start + len)`. `len` is 0 if `quotient` is not
    /// occupied.
    fn scan(&self, quotient: usize) -> (usize, usize) {
        if !self.is_occupied[quotient] {
            return (quotient, 0);
        }

        let start = self.run_start(quotient);
        let mut len = 1;
        let mut pos = start;
        self.incr(&mut pos);
        while (len < self.n_slots()) && self.is_continuation[pos] {
            len += 1;
            self.incr(&mut pos);
        }
        (start, len)
    }

    /// Search `remainder` within the run `[start, start + len)`.
    ///
    /// Returns if it was found, and the position and run offset where it is stored or where it
    /// would have to be inserted.
    fn search_run(&self, start: usize, len: usize, remainder: u64) -> (bool, usize, usize) {
        let mut pos = start;
        for offset in 0..len {
            let r = self.remainders.get(pos as u64);
            if r == remainder {
                return (true, pos, offset);
            }
            if r > remainder {
                // remainders are sorted within run
                return (false, pos, offset);
            }
            self.incr(&mut pos);
        }
        (false, pos, len)
    }

    fn insert_qr(&mut self, quotient: usize, remainder: u64) -> Result<bool, QuotientFilterFull> {
        // fast-path: canonical slot is free
        if self.slot(quotient).is_empty() {
            self.remainders.set(quotient as u64, remainder);
            self.is_occupied.set(quotient, true);
            self.n_elements += 1;
            return Ok(true);
        }

        let run_exists = self.is_occupied[quotient];
        let (start, len) = if run_exists {
            self.scan(quotient)
        } else {
            (self.run_start(quotient), 0)
        };
        let (present, position, offset) = self.search_run(start, len, remainder);

        // early exit if the element is already present
        if present {
            return Ok(false);
        }

        // error out if there is no space left
        if self.n_elements == self.n_slots() {
            return Err(QuotientFilterFull);
        }

        let mut is_continuation = false;
        if run_exists {
            if offset == 0 {
                // old start of run becomes a continuation
                self.is_continuation.set(start, true);
            } else {
                is_continuation = true;
            }
        }
        let slot = Slot {
            remainder,
            is_occupied: false,
            is_continuation,
            is_shifted: position != quotient,
        };
        self.insert_and_shift_right(position, slot);

        // mark canonical slot as occupied
        self.is_occupied.set(quotient, true);

        self.n_elements += 1;
        Ok(true)
    }

    /// Write `slot` to `position` and push existing content to the right, up to the next empty
    /// slot. There must be at least one empty slot.
    fn insert_and_shift_right(&mut self, mut position: usize, slot: Slot) {
        let mut current = slot;
        loop {
            let next = self.slot(position);
            self.set_content(position, &current);
            if next.is_empty() {
                break;
            }

            current = Slot {
                is_shifted: true,
                ..next
            };
            self.incr(&mut position);
        }
    }

    fn query_qr(&self, quotient: usize, remainder: u64) -> bool {
        let (start, len) = self.scan(quotient);
        let (present, _position, _offset) = self.search_run(start, len, remainder);
        present
    }

    fn delete_qr(&mut self, quotient: usize, remainder: u64) -> bool {
        let (start, len) = self.scan(quotient);
        let (present, position, _offset) = self.search_run(start, len, remainder);
        if !present {
            return false;
        }

        let is_run_start = !self.is_continuation[position];
        self.remove_and_shift_left(position, quotient, is_run_start);

        if len == 1 {
            self.is_occupied.set(quotient, false);
        }

        self.n_elements -= 1;
        true
    }

    /// Remove content at `position` and pull the rest of the cluster one slot to the left.
    fn remove_and_shift_left(&mut self, position: usize, quotient: usize, is_run_start: bool) {
        let mut hole = position;
        let mut next = position;
        self.incr(&mut next);

        // canonical slot of the content that is moved
        let mut canonical = quotient;
        let mut first = true;

        while next != position {
            let slot = self.slot(next);

            // stop at the end of the cluster
            if slot.is_empty() || !slot.is_shifted {
                break;
            }

            let mut is_continuation = slot.is_continuation;
            if !slot.is_continuation {
                // start of the next run, which belongs to the next occupied slot
                loop {
                    self.incr(&mut canonical);
                    if self.is_occupied[canonical] {
                        break;
                    }
                }
            } else if first && is_run_start {
                // successor becomes the new start of the run
                is_continuation = false;
            }

            let moved = Slot {
                remainder: slot.remainder,
                is_occupied: false,
                is_continuation,
                is_shifted: hole != canonical,
            };
            self.set_content(hole, &moved);

            first = false;
            hole = next;
            self.incr(&mut next);
        }

        self.set_content(hole, &Slot::default());
    }
}

impl<T, B> Filter<T> for QuotientFilter<T, B>
where
    T: Hash + ?Sized,
    B: BuildHasher + Clone + Eq,
{
    type InsertErr = QuotientFilterFull;

    fn clear(&mut self) {
        self.is_occupied.clear();
        self.is_continuation.clear();
        self.is_shifted.clear();
        self.remainders = all_zero_intvector(self.bits_remainder(), self.n_slots());
        self.n_elements = 0;
    }

    /// Insert new element into the filter.
    ///
    /// Returns `Ok(false)` if the element (or an element with the same quotient and remainder)
    /// is already part of the filter, in which case the filter is not modified. Fails if all
    /// slots are in use.
    fn insert(&mut self, obj: &T) -> Result<bool, Self::InsertErr> {
        let (quotient, remainder) = self.calc_quotient_remainder(obj);
        self.insert_qr(quotient, remainder)
    }

    fn delete(&mut self, obj: &T) -> bool {
        let (quotient, remainder) = self.calc_quotient_remainder(obj);
        self.delete_qr(quotient, remainder)
    }

    fn is_empty(&self) -> bool {
        self.n_elements == 0
    }

    /// Return number of distinct quotient/remainder pairs in the filter.
    fn len(&self) -> usize {
        self.n_elements
    }

    fn query(&self, obj: &T) -> bool {
        let (quotient, remainder) = self.calc_quotient_remainder(obj);
        self.query_qr(quotient, remainder)
    }
}

impl<T, B> fmt::Debug for QuotientFilter<T, B>
where
    T: Hash + ?Sized,
    B: BuildHasher + Clone + Eq,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QuotientFilter {{ bits_quotient: {}, bits_remainder: {}, n_elements: {} }}",
            self.bits_quotient,
            self.bits_remainder(),
            self.n_elements
        )
    }
}
