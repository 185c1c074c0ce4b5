//! Hash-related utils.
//!
//! Both filters reduce an element to a single 64 bit hash and carve their indices and
//! fingerprints out of that value.
use std::collections::hash_map::DefaultHasher;
use std::hash::{BuildHasher, Hash, Hasher};

/// BuildHasher that takes a seed.
///
/// Hashers built from the same seed are identical, so results are stable for the lifetime of a
/// filter. Different seeds behave like independent hash functions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildHasherSeeded {
    seed: usize,
}

impl BuildHasherSeeded {
    /// Create new BuildHasherSeeded with given seed.
    pub fn new(seed: usize) -> Self {
        Self { seed }
    }

    /// Seed used to initialize every hasher.
    pub fn seed(&self) -> usize {
        self.seed
    }
}

impl BuildHasher for BuildHasherSeeded {
    type Hasher = DefaultHasher;

    fn build_hasher(&self) -> DefaultHasher {
        let mut h = DefaultHasher::default();
        h.write_usize(self.seed);
        h
    }
}

/// Hash `obj` to 64 bits using a fresh hasher from `buildhasher`.
pub fn hash_with<T, B>(buildhasher: &B, obj: &T) -> u64
where
    T: Hash + ?Sized,
    B: BuildHasher,
{
    let mut hasher = buildhasher.build_hasher();
    obj.hash(&mut hasher);
    hasher.finish()
}

/// Bit mask covering the lowest `width` bits, `width` must be `<= 64`.
pub fn low_bits_mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Extract a fingerprint of `width` bits, i.e. the lowest `width` bits of `hash`.
pub fn fingerprint(hash: u64, width: usize) -> u64 {
    hash & low_bits_mask(width)
}
