use std::mem;

use num_traits::Zero;
use succinct::IntVector;
use succinct::storage::BlockType;

/// Quicker all-zero initialization of an IntVector that holds at least `len` elements.
pub(crate) fn all_zero_intvector<T>(element_bits: usize, len: usize) -> IntVector<T>
where
    T: BlockType + Zero,
{
    let n_blocks = {
        let block_bits = mem::size_of::<T>() * 8;
        let bits = element_bits
            .checked_mul(len)
            .expect("Table size too large");
        bits.div_ceil(block_bits)
    };
    IntVector::block_with_fill(element_bits, n_blocks, T::zero())
}
