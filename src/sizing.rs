//! Sizing functions shared by the filters.
//!
//! These translate a target capacity and an acceptable false positive rate into table
//! dimensions. All functions are pure; validation of their inputs happens in the filter
//! constructors.

/// Number of fingerprints per cuckoo filter bucket.
pub const CUCKOO_BUCKETSIZE: usize = 4;

/// Fraction of cuckoo filter entries that is expected to be usable before insertion fails.
pub const CUCKOO_LOAD_FACTOR: f64 = 0.95;

/// Fraction of quotient filter slots filled at the rated capacity.
pub const QUOTIENT_LOAD_FACTOR: f64 = 0.65;

/// Smallest power of 2 that is `>= i`, but at least 2.
pub fn next_power_of_two(i: usize) -> usize {
    i.max(2).next_power_of_two()
}

/// Number of cuckoo buckets required to hold `expected_elements`:
/// `nextPowerOf2(ceil(n / (loadFactor * 4)))`.
pub fn cuckoo_n_buckets(expected_elements: usize) -> usize {
    let per_bucket = CUCKOO_LOAD_FACTOR * (CUCKOO_BUCKETSIZE as f64);
    next_power_of_two(((expected_elements as f64) / per_bucket).ceil() as usize)
}

/// Number of elements a cuckoo filter with `n_buckets` buckets is rated for:
/// `floor(m * 4 * loadFactor)`.
pub fn cuckoo_capacity(n_buckets: usize) -> usize {
    ((n_buckets as f64) * (CUCKOO_BUCKETSIZE as f64) * CUCKOO_LOAD_FACTOR).floor() as usize
}

/// Fingerprint size in bits required for `false_positive_rate`: `ceil(log2(2 * 4 / e))`.
pub fn cuckoo_fingerprint_bits(false_positive_rate: f64) -> usize {
    (2.0 * (CUCKOO_BUCKETSIZE as f64) / false_positive_rate)
        .log2()
        .ceil() as usize
}

/// Upper bound of the cuckoo filter false positive rate: `2 * 4 / 2^p`.
pub fn cuckoo_false_positive_rate(l_fingerprint: usize) -> f64 {
    2.0 * (CUCKOO_BUCKETSIZE as f64) / 2f64.powi(l_fingerprint as i32)
}

/// Table size in bytes when every fingerprint is rounded up to whole bytes:
/// `m * 4 * ceil(p / 8)`.
pub fn cuckoo_total_size(n_buckets: usize, l_fingerprint: usize) -> usize {
    n_buckets * CUCKOO_BUCKETSIZE * l_fingerprint.div_ceil(8)
}

/// Number of quotient bits required to hold `expected_elements`: `ceil(log2(n / loadFactor))`.
pub fn quotient_bits(expected_elements: usize) -> usize {
    ((expected_elements as f64) / QUOTIENT_LOAD_FACTOR)
        .log2()
        .ceil()
        .max(1.) as usize
}

/// Number of elements a quotient filter with `n_slots` slots is rated for:
/// `floor(m * loadFactor)`.
pub fn quotient_capacity(n_slots: usize) -> usize {
    ((n_slots as f64) * QUOTIENT_LOAD_FACTOR).floor() as usize
}

/// Minimal remainder size in bits so that `expected_elements` stored in `2^bits_quotient` slots
/// result in a false positive rate of at most `false_positive_rate`:
/// `ceil(log2(-n / (2^q * ln(1 - e))))`, at least 1.
pub fn remainder_bits(
    expected_elements: usize,
    bits_quotient: usize,
    false_positive_rate: f64,
) -> usize {
    let slots = 2f64.powi(bits_quotient as i32);
    let bits = (-(expected_elements as f64) / (slots * (-false_positive_rate).ln_1p()))
        .log2()
        .ceil();
    if bits < 1. { 1 } else { bits as usize }
}

/// Estimated quotient filter false positive rate for `n` elements and `bits_hash = q + r`
/// significant hash bits: `n / 2^(q + r)`.
pub fn quotient_false_positive_rate(n: usize, bits_hash: usize) -> f64 {
    (n as f64) / 2f64.powi(bits_hash as i32)
}

/// Table size in bytes of a quotient filter, every slot uses `r + 3` bits: `ceil(m * (r + 3) / 8)`.
pub fn quotient_total_size(bits_quotient: usize, bits_remainder: usize) -> usize {
    ((1usize << bits_quotient) * (bits_remainder + 3)).div_ceil(8)
}
