//! Bucket table of the cuckoo filter.
use succinct::{IntVec, IntVecMut, IntVector};

use crate::helpers::all_zero_intvector;
use crate::sizing::CUCKOO_BUCKETSIZE;

/// Fingerprint value that marks a free entry.
pub(crate) const EMPTY: u64 = 0;

/// `n_buckets` buckets of `CUCKOO_BUCKETSIZE` fingerprints each, packed into a single bit vector.
///
/// Entries within a bucket are interchangeable. An entry holding `EMPTY` is free, so stored
/// fingerprints are never 0.
#[derive(Clone, Debug)]
pub(crate) struct BucketTable {
    table: IntVector<u64>,
    n_buckets: usize,
}

impl BucketTable {
    pub(crate) fn new(n_buckets: usize, l_fingerprint: usize) -> Self {
        let table_size = n_buckets
            .checked_mul(CUCKOO_BUCKETSIZE)
            .expect("Table size too large");
        Self {
            table: all_zero_intvector(l_fingerprint, table_size),
            n_buckets,
        }
    }

    fn offset(i: usize) -> u64 {
        (i * CUCKOO_BUCKETSIZE) as u64
    }

    /// Store `f` in a free entry of bucket `i`. Returns `false` if the bucket is full.
    pub(crate) fn write(&mut self, i: usize, f: u64) -> bool {
        let offset = Self::offset(i);
        for x in offset..(offset + CUCKOO_BUCKETSIZE as u64) {
            if self.table.get(x) == EMPTY {
                self.table.set(x, f);
                return true;
            }
        }
        false
    }

    pub(crate) fn contains(&self, i: usize, f: u64) -> bool {
        let offset = Self::offset(i);
        (offset..(offset + CUCKOO_BUCKETSIZE as u64)).any(|x| self.table.get(x) == f)
    }

    /// Free one entry of bucket `i` holding `f`. Returns `false` if there is none.
    pub(crate) fn remove(&mut self, i: usize, f: u64) -> bool {
        let offset = Self::offset(i);
        for x in offset..(offset + CUCKOO_BUCKETSIZE as u64) {
            if self.table.get(x) == f {
                self.table.set(x, EMPTY);
                return true;
            }
        }
        false
    }

    /// Replace entry `e` of bucket `i` with `f`, returns the table position and the previous
    /// fingerprint.
    pub(crate) fn swap(&mut self, i: usize, e: usize, f: u64) -> (u64, u64) {
        let x = Self::offset(i) + e as u64;
        let old = self.table.get(x);
        self.table.set(x, f);
        (x, old)
    }

    /// Raw write at a table position, used to undo `swap`.
    pub(crate) fn restore(&mut self, x: u64, f: u64) {
        self.table.set(x, f);
    }

    /// Number of used entries in bucket `i`.
    #[cfg(test)]
    pub(crate) fn bucket_len(&self, i: usize) -> usize {
        let offset = Self::offset(i);
        (offset..(offset + CUCKOO_BUCKETSIZE as u64))
            .filter(|x| self.table.get(*x) != EMPTY)
            .count()
    }

    pub(crate) fn clear(&mut self) {
        let element_bits = self.table.element_bits();
        self.table = all_zero_intvector(element_bits, self.n_buckets * CUCKOO_BUCKETSIZE);
    }
}
