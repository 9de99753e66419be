//! Chunk Codec
//!
//! Splits a payload into fixed-size blocks and joins them back.
//!
//! Blocks are zero-copy [`Bytes`] slices of the input. Every block holds
//! exactly `block_size` bytes except the last, which holds the remainder.
//! An empty payload yields no blocks at all.

use bytes::Bytes;

/// Number of blocks `len` bytes occupy at `block_size`
pub fn block_count(len: usize, block_size: usize) -> usize {
    assert!(block_size > 0, "block_size must be positive");
    len.div_ceil(block_size)
}

/// Split `data` into ordered blocks of at most `block_size` bytes
pub fn split(data: &Bytes, block_size: usize) -> Vec<Bytes> {
    let count = block_count(data.len(), block_size);
    let mut blocks = Vec::with_capacity(count);

    for i in 0..count {
        let start = i * block_size;
        let end = (start + block_size).min(data.len());
        blocks.push(data.slice(start..end));
    }

    blocks
}

/// Concatenate blocks in order
pub fn join<I, B>(blocks: I) -> Vec<u8>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut out = Vec::new();
    for block in blocks {
        out.extend_from_slice(block.as_ref());
    }
    out
}
