//! CuckooFilter implementation.
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use rand::Rng;

use crate::filters::bucket::{BucketTable, EMPTY};
use crate::filters::{Filter, ParamsError};
use crate::hash_utils::{BuildHasherSeeded, fingerprint, hash_with};
use crate::sizing::{
    CUCKOO_BUCKETSIZE, cuckoo_capacity, cuckoo_false_positive_rate, cuckoo_fingerprint_bits,
    cuckoo_n_buckets, cuckoo_total_size,
};

const MAX_NUM_KICKS: usize = 500; // mentioned in paper

/// Fingerprint size used when none is given.
pub const DEFAULT_L_FINGERPRINT: usize = 8;

/// Error struct used to signal that a `CuckooFilter` is full, i.e. that a value cannot be inserted
/// because the implementation was unable to find a free bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuckooFilterFull;

impl fmt::Display for CuckooFilterFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CuckooFilter is full")
    }
}

impl std::error::Error for CuckooFilterFull {}

/// A CuckooFilter is a set-like data structure, that keeps track of elements it has seen without
/// the need to store them. Looking up values has a certain false positive rate, but a false
/// negative rate of 0%. Unlike a BloomFilter, elements can be removed again. Also, it is
/// "Practically Better Than Bloom" (see paper).
///
/// # Examples
/// ```
/// use amqfilters::filters::Filter;
/// use amqfilters::filters::cuckoofilter::CuckooFilter;
/// use amqfilters::rand::SeedableRng;
/// use rand_chacha::ChaChaRng;
///
/// // set up filter
/// let false_positive_rate = 0.02;  // = 2%
/// let expected_elements = 1000;
/// let rng = ChaChaRng::from_seed([0; 32]);
/// let mut filter = CuckooFilter::with_properties(false_positive_rate, expected_elements, rng);
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
/// Note that the filter is specific to `T`, so the following will not compile:
///
/// ```compile_fail
/// use amqfilters::filters::Filter;
/// use amqfilters::filters::cuckoofilter::CuckooFilter;
/// use amqfilters::rand::SeedableRng;
/// use rand_chacha::ChaChaRng;
///
/// let rng = ChaChaRng::from_seed([0; 32]);
/// let mut filter = CuckooFilter::with_properties(0.02, 1000, rng);
///
/// filter.insert(&1u32).unwrap();
/// filter.insert(&"a string").unwrap();
/// ```
///
/// # Applications
/// - as a pre-filter for more expensive lookups, e.g. in combination with a real set, map or
///   database, so the final false positive rate is 0%
/// - same as BloomFilter, but when elements have to be removed as well
///
/// # How It Works
///
/// ## Setup
/// The filter is created by a table of `m` buckets, each bucket having 4 slots. Every slot can
/// hold `p` bits, all set to 0 in the beginning.
///
/// ```text
/// m = 4
/// p = 4
///
/// +-----+-----+-----+-----+
/// | 0x0 | 0x0 | 0x0 | 0x0 |
/// +-----+-----+-----+-----+
/// | 0x0 | 0x0 | 0x0 | 0x0 |
/// +-----+-----+-----+-----+
/// | 0x0 | 0x0 | 0x0 | 0x0 |
/// +-----+-----+-----+-----+
/// | 0x0 | 0x0 | 0x0 | 0x0 |
/// +-----+-----+-----+-----+
/// ```
///
/// ## Insertion
/// During the insertion, the element is hashed to 64 bits. The lowest `p` bits form the
/// fingerprint `f(x)`, the following bits address the first bucket `h_1(x)`. The second bucket is
/// the XOR of the first one and the hashed fingerprint. That way, you can switch between the 2
/// buckets by XORing with the hashed fingerprint, without knowing the original element.
///
/// The 2 hash functions address 2 candidate buckets. If one has a free slot, the fingerprint will
/// be added there and we are done.
///
/// ```text
/// f(x)   = 0x3
/// h_1(x) = 0x0
/// h_2(x) = h_1(x) ^ (h(f(x)) & 0x3) = 0x0 ^ 0x3 = 0x3
///
/// +-----+-----+-----+-----+       +-----+-----+-----+-----+
/// |[0x0]| 0x0 | 0x0 | 0x0 |       | 0x3 | 0x0 | 0x0 | 0x0 |
/// +-----+-----+-----+-----+       +-----+-----+-----+-----+
/// | 0x0 | 0x0 | 0x0 | 0x0 |       | 0x0 | 0x0 | 0x0 | 0x0 |
/// +-----+-----+-----+-----+  ==>  +-----+-----+-----+-----+
/// | 0x0 | 0x0 | 0x0 | 0x0 |       | 0x0 | 0x0 | 0x0 | 0x0 |
/// +-----+-----+-----+-----+       +-----+-----+-----+-----+
/// |[0x0]| 0x0 | 0x0 | 0x0 |       | 0x0 | 0x0 | 0x0 | 0x0 |
/// +-----+-----+-----+-----+       +-----+-----+-----+-----+
/// ```
///
/// If none of the 2 candidate buckets has a free slot, the algorithm tries to relocate existing
/// fingerprints to their alternative bucket. The bucket to start with and the fingerprint to
/// relocate are chosen randomly. After 500 relocations, the insertion gives up and all
/// relocations are undone, so a failed insertion does not alter the filter.
///
/// ## Lookup
/// Hash functions are calculated as shown above and if one of the buckets contains the
/// fingerprint, the element may be in the filter.
///
/// ## Deletion
/// One slot of the 2 candidate buckets that holds the fingerprint is freed. Different elements
/// may share a fingerprint and a bucket. Every insertion stores its own entry, so deleting one of
/// two inserted colliding elements keeps the other one. Deleting an element that was never
/// inserted however may remove the entry of a colliding element, so only delete elements that
/// were inserted before.
///
/// # Implementation
/// This implementation uses one large bit-vector to pack all fingerprints to be as space-efficient
/// as possible. So even odd fingerprints sizes like 5 result in optimal memory consumption. The
/// fingerprint 0 marks a free slot, elements with an all-zero fingerprint are stored as 1.
///
/// # See Also
/// - `std::collections::HashSet`: has a false positive rate of 0%, but also needs to store all
///   elements
/// - `amqfilters::filters::quotientfilter::QuotientFilter`: also supports deletion, keeps all
///   fingerprints of an element close together
///
/// # References
/// - [Probabilistic Filters By Example](https://bdupras.github.io/filter-tutorial/)
/// - ["Cuckoo Filter: Practically Better Than Bloom", Bin Fan, David G. Andersen, Michael
///   Kaminsky, Michael D. Mitzenmacher, 2014](https://www.cs.cmu.edu/~dga/papers/cuckoo-conext2014.pdf).
#[derive(Clone)]
pub struct CuckooFilter<T, R, B = BuildHasherSeeded>
where
    T: Hash + ?Sized,
    R: Rng,
    B: BuildHasher + Clone + Eq,
{
    table: BucketTable,
    n_elements: usize,
    buildhasher: B,
    n_buckets: usize,
    l_fingerprint: usize,
    capacity: usize,
    rng: R,
    phantom: PhantomData<fn() -> T>,
}

impl<T, R> CuckooFilter<T, R>
where
    T: Hash + ?Sized,
    R: Rng,
{
    /// Create new CuckooFilter with:
    ///
    /// - `rng`: random number generator used for certain random actions
    /// - `n_buckets`: number of buckets, must be a power of 2 and at least 2
    /// - `l_fingerprint`: size of the fingerprint in bits, must be within `2..=64`
    ///
    /// The BuildHasher is set to `BuildHasherSeeded` with seed 0.
    ///
    /// Panics if the parameters are not in range.
    pub fn with_params(rng: R, n_buckets: usize, l_fingerprint: usize) -> Self {
        let bh = BuildHasherSeeded::default();
        Self::with_params_and_hash(rng, n_buckets, l_fingerprint, bh)
    }

    /// Create new CuckooFilter that is able to hold `expected_elements` elements:
    ///
    /// - `expected_elements`: number of expected elements to be added to the filter
    /// - `l_fingerprint`: size of the fingerprint in bits, must be within `2..=64`, see
    ///   [`DEFAULT_L_FINGERPRINT`]
    /// - `rng`: random number generator used for certain random actions
    ///
    /// Panics if the parameters are not in range.
    pub fn with_capacity(expected_elements: usize, l_fingerprint: usize, rng: R) -> Self {
        let bh = BuildHasherSeeded::default();
        Self::with_capacity_and_hash(expected_elements, l_fingerprint, rng, bh)
    }

    /// Construct new cuckoofilter with properties:
    ///
    /// - `false_positive_rate`: false positive lookup rate
    /// - `expected_elements`: number of expected elements to be added to the filter
    /// - `rng`: random number generator used for certain random actions
    ///
    /// Panics if the parameters are not in range.
    pub fn with_properties(false_positive_rate: f64, expected_elements: usize, rng: R) -> Self {
        let bh = BuildHasherSeeded::default();
        Self::with_properties_and_hash(false_positive_rate, expected_elements, rng, bh)
    }
}

impl<T, R, B> CuckooFilter<T, R, B>
where
    T: Hash + ?Sized,
    R: Rng,
    B: BuildHasher + Clone + Eq,
{
    /// Same as `with_params` but with specific `BuildHasher`, used for fingerprint creation and
    /// fingerprint hashing.
    pub fn with_params_and_hash(rng: R, n_buckets: usize, l_fingerprint: usize, bh: B) -> Self {
        match Self::try_with_params_and_hash(rng, n_buckets, l_fingerprint, bh) {
            Ok(filter) => filter,
            Err(e) => panic!("{}", e),
        }
    }

    /// Same as `with_params_and_hash` but reports invalid parameters as error.
    pub fn try_with_params_and_hash(
        rng: R,
        n_buckets: usize,
        l_fingerprint: usize,
        bh: B,
    ) -> Result<Self, ParamsError> {
        if !n_buckets.is_power_of_two() || (n_buckets < 2) {
            return Err(ParamsError::NBuckets(n_buckets));
        }
        if (l_fingerprint <= 1) || (l_fingerprint > 64) {
            return Err(ParamsError::LFingerprint(l_fingerprint));
        }
        n_buckets
            .checked_mul(CUCKOO_BUCKETSIZE)
            .and_then(|x| x.checked_mul(l_fingerprint))
            .ok_or(ParamsError::TableSize)?;

        Ok(Self {
            table: BucketTable::new(n_buckets, l_fingerprint),
            n_elements: 0,
            buildhasher: bh,
            n_buckets,
            l_fingerprint,
            capacity: cuckoo_capacity(n_buckets),
            rng,
            phantom: PhantomData,
        })
    }

    /// Same as `with_capacity` but with specific `BuildHasher`.
    pub fn with_capacity_and_hash(
        expected_elements: usize,
        l_fingerprint: usize,
        rng: R,
        bh: B,
    ) -> Self {
        match Self::try_with_capacity_and_hash(expected_elements, l_fingerprint, rng, bh) {
            Ok(filter) => filter,
            Err(e) => panic!("{}", e),
        }
    }

    /// Same as `with_capacity_and_hash` but reports invalid parameters as error.
    pub fn try_with_capacity_and_hash(
        expected_elements: usize,
        l_fingerprint: usize,
        rng: R,
        bh: B,
    ) -> Result<Self, ParamsError> {
        if expected_elements < 1 {
            return Err(ParamsError::ExpectedElements(expected_elements));
        }

        let n_buckets = cuckoo_n_buckets(expected_elements);
        let mut filter = Self::try_with_params_and_hash(rng, n_buckets, l_fingerprint, bh)?;
        filter.capacity = expected_elements;
        Ok(filter)
    }

    /// Same as `with_properties` but with specific `BuildHasher`.
    pub fn with_properties_and_hash(
        false_positive_rate: f64,
        expected_elements: usize,
        rng: R,
        bh: B,
    ) -> Self {
        match Self::try_with_properties_and_hash(false_positive_rate, expected_elements, rng, bh)
        {
            Ok(filter) => filter,
            Err(e) => panic!("{}", e),
        }
    }

    /// Same as `with_properties_and_hash` but reports invalid parameters as error.
    pub fn try_with_properties_and_hash(
        false_positive_rate: f64,
        expected_elements: usize,
        rng: R,
        bh: B,
    ) -> Result<Self, ParamsError> {
        if expected_elements < 1 {
            return Err(ParamsError::ExpectedElements(expected_elements));
        }
        if !((false_positive_rate > 0.) && (false_positive_rate < 1.)) {
            return Err(ParamsError::FalsePositiveRate(false_positive_rate));
        }

        let l_fingerprint = cuckoo_fingerprint_bits(false_positive_rate);
        Self::try_with_capacity_and_hash(expected_elements, l_fingerprint, rng, bh)
    }

    /// Number of entries stored in a bucket.
    pub fn bucketsize(&self) -> usize {
        CUCKOO_BUCKETSIZE
    }

    /// Number of buckets used by the CuckooFilter.
    pub fn n_buckets(&self) -> usize {
        self.n_buckets
    }

    /// Size of the used fingerprint in bits
    pub fn l_fingerprint(&self) -> usize {
        self.l_fingerprint
    }

    /// Number of elements the filter is rated for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Upper bound of the false positive rate, `2 * bucketsize / 2^l_fingerprint`.
    pub fn false_positive_rate(&self) -> f64 {
        cuckoo_false_positive_rate(self.l_fingerprint)
    }

    /// Table size in bytes, with fingerprints rounded up to whole bytes.
    pub fn total_size(&self) -> usize {
        cuckoo_total_size(self.n_buckets, self.l_fingerprint)
    }

    /// Get `BuildHasher`.
    pub fn buildhasher(&self) -> &B {
        &self.buildhasher
    }

    /// Insert element only if it is not already part of the filter.
    ///
    /// Returns `Ok(false)` without modifying the filter if the element (or an element with the
    /// same fingerprint and buckets) was found, `Ok(true)` if it was inserted.
    pub fn insert_unique(&mut self, obj: &T) -> Result<bool, CuckooFilterFull> {
        if self.query(obj) {
            return Ok(false);
        }
        self.insert(obj)
    }

    fn start(&self, t: &T) -> (u64, usize, usize) {
        let h = hash_with(&self.buildhasher, t);

        // don't produce 0, since this is used as "free"-slot value
        let f = match fingerprint(h, self.l_fingerprint) {
            EMPTY => 1,
            f => f,
        };

        // bits above the fingerprint; the rotation keeps bits usable if `l_fingerprint` is large
        let i1 = (h.rotate_right(self.l_fingerprint as u32) as usize) & (self.n_buckets - 1);
        let i2 = self.alt_index(i1, f);
        (f, i1, i2)
    }

    fn alt_index(&self, i: usize, f: u64) -> usize {
        i ^ ((hash_with(&self.buildhasher, &f) as usize) & (self.n_buckets - 1))
    }

    fn insert_internal(
        &mut self,
        mut f: u64,
        i1: usize,
        i2: usize,
        log: &mut Vec<(u64, u64)>,
    ) -> Result<bool, CuckooFilterFull> {
        if self.table.write(i1, f) || self.table.write(i2, f) {
            self.n_elements += 1;
            return Ok(true);
        }

        // cannot write to obvious buckets => relocate
        let mut i = if self.rng.random_bool(0.5) { i1 } else { i2 };

        for _ in 0..MAX_NUM_KICKS {
            let e = self.rng.random_range(0..CUCKOO_BUCKETSIZE);

            // swap table entry and f
            let (x, evicted) = self.table.swap(i, e, f);
            log.push((x, evicted));
            f = evicted;

            i = self.alt_index(i, f);
            if self.table.write(i, f) {
                self.n_elements += 1;
                return Ok(true);
            }
        }

        // no space left => fail
        Err(CuckooFilterFull)
    }

    fn restore_state(&mut self, log: &[(u64, u64)]) {
        for (pos, data) in log.iter().rev().cloned() {
            self.table.restore(pos, data);
        }
    }
}

impl<T, R, B> Filter<T> for CuckooFilter<T, R, B>
where
    T: Hash + ?Sized,
    R: Rng,
    B: BuildHasher + Clone + Eq,
{
    type InsertErr = CuckooFilterFull;

    fn clear(&mut self) {
        self.n_elements = 0;
        self.table.clear();
    }

    /// Insert new element into filter.
    ///
    /// The method may return an error if it was unable to find a free bucket. This means the
    /// filter is full and you should not add any additional elements to it. When this happens,
    /// `len` was not increased and the filter content was not altered.
    ///
    /// Inserting the same element multiple times is supported, every insertion occupies one
    /// slot. Keep in mind that after `2 * bucketsize` times, the filter will return
    /// `Err(CuckooFilterFull)`. Use [`insert_unique`](Self::insert_unique) to avoid duplicates.
    /// This function always reports `Ok(true)` in case of success.
    fn insert(&mut self, obj: &T) -> Result<bool, Self::InsertErr> {
        let (f, i1, i2) = self.start(obj);
        let mut log: Vec<(u64, u64)> = vec![];
        let result = self.insert_internal(f, i1, i2, &mut log);
        if result.is_err() {
            self.restore_state(&log);
        }
        result
    }

    /// Remove element from the filter.
    ///
    /// Returns `true` if element was in the filter, `false` if it was not in which case the
    /// operation did not modify the filter.
    fn delete(&mut self, obj: &T) -> bool {
        let (f, i1, i2) = self.start(obj);

        if self.table.remove(i1, f) || self.table.remove(i2, f) {
            self.n_elements -= 1;
            return true;
        }
        false
    }

    fn is_empty(&self) -> bool {
        self.n_elements == 0
    }

    /// Return exact number of entries in the filter.
    fn len(&self) -> usize {
        self.n_elements
    }

    fn query(&self, obj: &T) -> bool {
        let (f, i1, i2) = self.start(obj);
        self.table.contains(i1, f) || self.table.contains(i2, f)
    }
}

impl<T, R, B> fmt::Debug for CuckooFilter<T, R, B>
where
    T: Hash + ?Sized,
    R: Rng,
    B: BuildHasher + Clone + Eq,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CuckooFilter {{ n_buckets: {}, l_fingerprint: {}, n_elements: {} }}",
            self.n_buckets, self.l_fingerprint, self.n_elements
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{CuckooFilter, CuckooFilterFull};
    use crate::{
        filters::{Filter, ParamsError},
        hash_utils::BuildHasherSeeded,
        test_util::{NotSend, assert_send},
    };
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    fn rng() -> ChaChaRng {
        ChaChaRng::from_seed([0; 32])
    }

    #[test]
    #[should_panic(expected = "n_buckets (0) must be a power of 2 and greater or equal than 2")]
    fn new_panics_n_buckets_0() {
        CuckooFilter::<u64, ChaChaRng>::with_params(rng(), 0, 8);
    }

    #[test]
    #[should_panic(expected = "n_buckets (1) must be a power of 2 and greater or equal than 2")]
    fn new_panics_n_buckets_1() {
        CuckooFilter::<u64, ChaChaRng>::with_params(rng(), 1, 8);
    }

    #[test]
    #[should_panic(expected = "n_buckets (5) must be a power of 2 and greater or equal than 2")]
    fn new_panics_n_buckets_5() {
        CuckooFilter::<u64, ChaChaRng>::with_params(rng(), 5, 8);
    }

    #[test]
    #[should_panic(expected = "l_fingerprint (0) must be greater than 1 and less or equal than 64")]
    fn new_panics_l_fingerprint_0() {
        CuckooFilter::<u64, ChaChaRng>::with_params(rng(), 16, 0);
    }

    #[test]
    #[should_panic(expected = "l_fingerprint (1) must be greater than 1 and less or equal than 64")]
    fn new_panics_l_fingerprint_1() {
        CuckooFilter::<u64, ChaChaRng>::with_params(rng(), 16, 1);
    }

    #[test]
    #[should_panic(
        expected = "l_fingerprint (65) must be greater than 1 and less or equal than 64"
    )]
    fn new_panics_l_fingerprint_65() {
        CuckooFilter::<u64, ChaChaRng>::with_params(rng(), 16, 65);
    }

    #[test]
    #[should_panic(expected = "Table size too large")]
    fn new_panics_table_size_overflow() {
        CuckooFilter::<u64, ChaChaRng>::with_params(
            rng(),
            (((usize::MAX as u128) + 1) / 8) as usize,
            64,
        );
    }

    #[test]
    fn try_new_reports_error() {
        let err = CuckooFilter::<u64, ChaChaRng>::try_with_params_and_hash(
            rng(),
            6,
            8,
            BuildHasherSeeded::default(),
        )
        .unwrap_err();
        assert_eq!(err, ParamsError::NBuckets(6));

        let err = CuckooFilter::<u64, ChaChaRng>::try_with_properties_and_hash(
            1.5,
            100,
            rng(),
            BuildHasherSeeded::default(),
        )
        .unwrap_err();
        assert_eq!(err, ParamsError::FalsePositiveRate(1.5));
    }

    #[test]
    fn getter() {
        let cf = CuckooFilter::<u64, ChaChaRng>::with_params(rng(), 512, 8);
        assert_eq!(cf.bucketsize(), 4);
        assert_eq!(cf.n_buckets(), 512);
        assert_eq!(cf.l_fingerprint(), 8);
        assert_eq!(cf.capacity(), 1945);
        assert_eq!(cf.false_positive_rate(), 0.03125);
        assert_eq!(cf.total_size(), 2048);
        assert_eq!(cf.buildhasher(), &BuildHasherSeeded::new(0));
    }

    #[test]
    fn with_capacity() {
        let cf = CuckooFilter::<u64, ChaChaRng>::with_capacity(100, 8, rng());
        assert_eq!(cf.n_buckets(), 32);
        assert_eq!(cf.capacity(), 100);

        let cf = CuckooFilter::<u64, ChaChaRng>::with_capacity(1000, 8, rng());
        assert_eq!(cf.n_buckets(), 512);
        assert_eq!(cf.capacity(), 1000);
    }

    #[test]
    fn with_properties() {
        let cf = CuckooFilter::<u64, ChaChaRng>::with_properties(0.03, 100, rng());
        assert_eq!(cf.n_buckets(), 32);
        assert_eq!(cf.l_fingerprint(), 9);
        assert_eq!(cf.capacity(), 100);
        assert_eq!(cf.false_positive_rate(), 0.015625);
        assert_eq!(cf.total_size(), 256);
    }

    #[test]
    #[should_panic(expected = "expected_elements (0) must be at least 1")]
    fn with_properties_panics_expected_elements_0() {
        CuckooFilter::<u64, ChaChaRng>::with_properties(0.02, 0, rng());
    }

    #[test]
    #[should_panic(expected = "false_positive_rate (0) must be greater than 0 and smaller than 1")]
    fn with_properties_panics_false_positive_rate_0() {
        CuckooFilter::<u64, ChaChaRng>::with_properties(0., 1000, rng());
    }

    #[test]
    #[should_panic(expected = "false_positive_rate (1) must be greater than 0 and smaller than 1")]
    fn with_properties_panics_false_positive_rate_1() {
        CuckooFilter::<u64, ChaChaRng>::with_properties(1., 1000, rng());
    }

    #[test]
    fn is_empty() {
        let cf = CuckooFilter::<u64, ChaChaRng>::with_params(rng(), 16, 8);
        assert!(cf.is_empty());
        assert_eq!(cf.len(), 0);
    }

    #[test]
    fn alt_index_is_symmetric() {
        for l_fingerprint in 4..=64 {
            let cf = CuckooFilter::<[u8], ChaChaRng>::with_capacity(1000, l_fingerprint, rng());
            let (f, i, j) = cf.start(b"Hello World");
            assert_ne!(f, 0);
            assert!(i < cf.n_buckets());
            assert!(j < cf.n_buckets());
            assert_eq!(cf.alt_index(i, f), j, "l_fingerprint={}", l_fingerprint);
            assert_eq!(cf.alt_index(j, f), i, "l_fingerprint={}", l_fingerprint);
        }
    }

    #[test]
    fn fingerprint_never_empty() {
        let cf = CuckooFilter::<u64, ChaChaRng>::with_params(rng(), 16, 2);
        for i in 0..1000 {
            let (f, _, _) = cf.start(&i);
            assert!((1..4).contains(&f));
        }
    }

    #[test]
    fn insert() {
        let mut cf = CuckooFilter::with_params(rng(), 16, 8);
        assert!(cf.insert(&13).unwrap());
        assert!(!cf.is_empty());
        assert_eq!(cf.len(), 1);
        assert!(cf.query(&13));
        assert!(!cf.query(&42));
    }

    #[test]
    fn double_insert() {
        let mut cf = CuckooFilter::with_params(rng(), 16, 8);
        assert!(cf.insert(&13).unwrap());
        assert!(cf.insert(&13).unwrap());
        assert_eq!(cf.len(), 2);
        assert!(cf.query(&13));

        // every insertion needs its own deletion
        assert!(cf.delete(&13));
        assert!(cf.query(&13));
        assert!(cf.delete(&13));
        assert!(!cf.query(&13));
    }

    #[test]
    fn insert_unique() {
        let mut cf = CuckooFilter::with_params(rng(), 16, 8);
        assert!(cf.insert_unique(&13).unwrap());
        assert!(!cf.insert_unique(&13).unwrap());
        assert_eq!(cf.len(), 1);

        assert!(cf.delete(&13));
        assert!(!cf.query(&13));
        assert!(cf.is_empty());
    }

    #[test]
    fn hello_world() {
        let mut cf = CuckooFilter::<[u8], _>::with_capacity(1000, 8, rng());
        assert!(cf.insert(b"Hello World").unwrap());
        assert!(cf.insert(b"A").unwrap());
        assert!(cf.query(b"Hello World"));
        assert!(cf.query(b"A"));
        assert!(cf.delete(b"A"));
        assert!(!cf.query(b"A"));
        assert!(cf.query(b"Hello World"));
    }

    #[test]
    fn delete() {
        let mut cf = CuckooFilter::with_params(rng(), 16, 8);
        cf.insert(&13).unwrap();
        cf.insert(&42).unwrap();
        assert!(cf.query(&13));
        assert!(cf.query(&42));
        assert_eq!(cf.len(), 2);

        assert!(cf.delete(&13));
        assert!(!cf.query(&13));
        assert!(cf.query(&42));
        assert_eq!(cf.len(), 1);

        assert!(!cf.delete(&13));
        assert_eq!(cf.len(), 1);
    }

    #[test]
    fn delete_colliding_element() {
        let mut cf = CuckooFilter::<u64, ChaChaRng>::with_params(rng(), 16, 4);
        let x = 0;
        let y = (1..).find(|y| cf.start(y) == cf.start(&x)).unwrap();

        assert!(cf.insert(&x).unwrap());
        assert!(cf.insert(&y).unwrap());
        assert_eq!(cf.len(), 2);

        // every insertion owns an entry, so `y` survives
        assert!(cf.delete(&x));
        assert!(cf.query(&y));
        assert_eq!(cf.len(), 1);

        assert!(cf.delete(&y));
        assert!(!cf.query(&y));
        assert!(cf.is_empty());
    }

    #[test]
    fn clear() {
        let mut cf = CuckooFilter::with_params(rng(), 16, 8);

        cf.insert(&1).unwrap();
        cf.clear();
        assert!(!cf.query(&1));
        assert!(cf.is_empty());

        cf.insert(&1).unwrap();
        assert!(cf.query(&1));
    }

    #[test]
    fn full() {
        // 2 buckets => 8 slots in total, the 9th element can never fit
        let mut cf = CuckooFilter::with_params(rng(), 2, 8);

        let mut inserted = vec![];
        let mut failed = false;
        for i in 0..9 {
            match cf.insert(&i) {
                Ok(true) => inserted.push(i),
                Ok(false) => unreachable!(),
                Err(CuckooFilterFull) => failed = true,
            }
        }
        assert!(failed);
        assert!(inserted.len() <= 8);
        assert_eq!(cf.len(), inserted.len());
        for i in &inserted {
            assert!(cf.query(i));
        }
    }

    #[test]
    fn same_element_saturates_both_buckets() {
        let mut cf = CuckooFilter::<[u8], _>::with_capacity(100, 8, rng());
        let elem = b"Hello World";
        let (_, i1, i2) = cf.start(elem);
        let slots = if i1 == i2 { 4 } else { 8 };

        for _ in 0..slots {
            assert!(cf.insert(elem).unwrap());
        }
        assert_eq!(cf.table.bucket_len(i1), 4);
        assert_eq!(cf.table.bucket_len(i2), 4);
        assert!(cf.insert(elem).is_err());
        assert_eq!(cf.len(), slots);
    }

    #[test]
    fn failed_insert_does_not_alter_filter() {
        let mut cf = CuckooFilter::with_params(rng(), 16, 8);
        let probes: Vec<u64> = (0..2000).collect();

        let mut obj = 0u64;
        loop {
            let before: Vec<bool> = probes.iter().map(|p| cf.query(p)).collect();
            let len_before = cf.len();
            if cf.insert(&obj).is_err() {
                let after: Vec<bool> = probes.iter().map(|p| cf.query(p)).collect();
                assert_eq!(before, after);
                assert_eq!(cf.len(), len_before);
                break;
            }
            obj += 1;
        }

        // no false negatives for anything that made it in
        for i in 0..obj {
            assert!(cf.query(&i), "lost {} after failed insertion", i);
        }
        assert_eq!(cf.len(), obj as usize);
        assert!(cf.len() <= 64);
    }

    #[test]
    fn debug() {
        let cf = CuckooFilter::<u64, ChaChaRng>::with_params(rng(), 16, 8);
        assert_eq!(
            format!("{:?}", cf),
            "CuckooFilter { n_buckets: 16, l_fingerprint: 8, n_elements: 0 }"
        );
    }

    #[test]
    fn clone() {
        let mut cf1 = CuckooFilter::with_params(rng(), 16, 8);
        cf1.insert(&13).unwrap();
        assert!(cf1.query(&13));

        let cf2 = cf1.clone();
        cf1.insert(&42).unwrap();
        assert!(cf2.query(&13));
        assert!(!cf2.query(&42));
    }

    #[test]
    fn insert_unsized() {
        let mut cf = CuckooFilter::with_params(rng(), 16, 8);
        assert!(cf.insert("test1").unwrap());
        assert!(!cf.is_empty());
        assert_eq!(cf.len(), 1);
        assert!(cf.query("test1"));
        assert!(!cf.query("test2"));
    }

    #[test]
    fn seeds_change_placement() {
        let cf1 = CuckooFilter::<u64, ChaChaRng>::with_params_and_hash(
            rng(),
            1024,
            16,
            BuildHasherSeeded::new(0),
        );
        let cf2 = CuckooFilter::<u64, ChaChaRng>::with_params_and_hash(
            rng(),
            1024,
            16,
            BuildHasherSeeded::new(1),
        );
        let differ = (0..100u64).filter(|i| cf1.start(i) != cf2.start(i)).count();
        assert!(differ > 90);
    }

    #[test]
    fn send() {
        let cf = CuckooFilter::<NotSend, _>::with_params(rng(), 16, 8);
        assert_send(&cf);
    }
}
