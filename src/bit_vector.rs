//! Succinct bit vector with constant-time rank and select.
//!
//! Rank9-style directory: one `(absolute, relative)` pair of words per 512-bit
//! block plus a select sample for every 512th one-bit. The directory is part of
//! the serialized form, so a mapped vector answers queries with no preprocessing.
//!
//! ```text
//! num_bits: u64 | num_ones: u64
//! words:    [u64; ceil(num_bits / 64)]
//! blocks:   [(abs: u64, rel: u64); ceil(num_bits / 512) + 1]
//! samples:  [u32; ceil(num_ones / 512)], zero-padded to 8 bytes
//! ```
//!
//! `rel` packs the cumulative popcount of words `0..j` for `j = 1..8` in 9-bit
//! fields. The trailing block is a sentinel whose `abs` equals `num_ones`.

use std::fmt;

use crate::error::{CdatError, Result};
use crate::format::{read_u32, read_u64, write_le};

const WORD_BITS: usize = 64;
const BLOCK_BITS: usize = 512;
const WORDS_PER_BLOCK: usize = BLOCK_BITS / WORD_BITS;
const SELECT_SAMPLE: usize = 512;
const PREAMBLE: usize = 16;

/// Builds a bit vector bit by bit, then serializes it with its directory.
#[derive(Debug, Clone, Default)]
pub struct BitVectorBuilder {
    words: Vec<u64>,
    len: usize,
}

impl BitVectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder holding `len` zero bits.
    pub fn with_len(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, bit: bool) {
        if self.len % WORD_BITS == 0 {
            self.words.push(0);
        }
        if bit {
            self.words[self.len / WORD_BITS] |= 1u64 << (self.len % WORD_BITS);
        }
        self.len += 1;
    }

    pub fn set(&mut self, pos: usize, bit: bool) {
        assert!(pos < self.len, "bit {} out of range for length {}", pos, self.len);
        let mask = 1u64 << (pos % WORD_BITS);
        if bit {
            self.words[pos / WORD_BITS] |= mask;
        } else {
            self.words[pos / WORD_BITS] &= !mask;
        }
    }

    /// Appends the serialized vector (payload and directory) to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let num_ones: usize = self.words.iter().map(|w| w.count_ones() as usize).sum();
        let start = out.len();

        write_le(out, self.len as u64, 8);
        write_le(out, num_ones as u64, 8);
        for &word in &self.words {
            write_le(out, word, 8);
        }

        let num_blocks = self.len.div_ceil(BLOCK_BITS);
        let mut samples: Vec<u32> = Vec::with_capacity(num_ones.div_ceil(SELECT_SAMPLE));
        let mut next_sample = 0u64;
        let mut abs = 0u64;
        for b in 0..num_blocks {
            let mut rel = 0u64;
            let mut cum = 0u64;
            for j in 0..WORDS_PER_BLOCK {
                if j > 0 {
                    rel |= cum << (9 * (j - 1));
                }
                let word = self.words.get(b * WORDS_PER_BLOCK + j).copied().unwrap_or(0);
                cum += u64::from(word.count_ones());
            }
            let block_end = abs + cum;
            while next_sample < block_end {
                samples.push(b as u32);
                next_sample += SELECT_SAMPLE as u64;
            }
            write_le(out, abs, 8);
            write_le(out, rel, 8);
            abs = block_end;
        }
        // Sentinel block.
        write_le(out, abs, 8);
        write_le(out, 0, 8);

        for &s in &samples {
            write_le(out, u64::from(s), 4);
        }
        if samples.len() % 2 == 1 {
            write_le(out, 0, 4);
        }

        debug_assert_eq!(out.len() - start, serialized_len(self.len, num_ones));
    }

    pub fn build(&self) -> BitVector<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        let num_ones = read_u64(&out, 8) as usize;
        BitVector {
            data: out,
            num_bits: self.len,
            num_ones,
        }
    }
}

fn serialized_len(num_bits: usize, num_ones: usize) -> usize {
    let words = num_bits.div_ceil(WORD_BITS).saturating_mul(8);
    let blocks = (num_bits.div_ceil(BLOCK_BITS) + 1).saturating_mul(16);
    let samples = num_ones.div_ceil(SELECT_SAMPLE).saturating_mul(4);
    PREAMBLE
        .saturating_add(words)
        .saturating_add(blocks)
        .saturating_add(samples.div_ceil(8).saturating_mul(8))
}

/// Immutable rank/select bit vector over its serialized bytes.
///
/// `D` is any byte container: `Vec<u8>` when owned, `&[u8]` when projected over
/// a mapped region.
#[derive(Clone)]
pub struct BitVector<D = Vec<u8>> {
    data: D,
    num_bits: usize,
    num_ones: usize,
}

impl<D: AsRef<[u8]>> fmt::Debug for BitVector<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitVector")
            .field("len", &self.num_bits)
            .field("ones", &self.num_ones)
            .finish()
    }
}

impl<'a> BitVector<&'a [u8]> {
    /// View over bytes that were already validated by `from_bytes`.
    #[inline]
    pub(crate) fn view(data: &'a [u8], num_bits: usize, num_ones: usize) -> Self {
        debug_assert!(data.len() >= serialized_len(num_bits, num_ones));
        Self {
            data,
            num_bits,
            num_ones,
        }
    }
}

impl<D: AsRef<[u8]>> BitVector<D> {
    /// Number of bytes a serialized vector with these counts occupies.
    pub fn serialized_len(num_bits: usize, num_ones: usize) -> usize {
        serialized_len(num_bits, num_ones)
    }

    /// Validates a serialized vector and wraps it without copying.
    pub fn from_bytes(data: D) -> Result<Self> {
        let bytes = data.as_ref();
        if bytes.len() < PREAMBLE {
            return Err(CdatError::Truncated {
                needed: PREAMBLE,
                available: bytes.len(),
            });
        }
        let num_bits = usize::try_from(read_u64(bytes, 0))
            .map_err(|_| CdatError::corrupt("bit vector length overflows usize"))?;
        let num_ones = usize::try_from(read_u64(bytes, 8))
            .map_err(|_| CdatError::corrupt("bit vector popcount overflows usize"))?;
        if num_ones > num_bits {
            return Err(CdatError::corrupt(format!(
                "bit vector claims {} ones in {} bits",
                num_ones, num_bits
            )));
        }
        let needed = serialized_len(num_bits, num_ones);
        if bytes.len() < needed {
            return Err(CdatError::Truncated {
                needed,
                available: bytes.len(),
            });
        }

        let bv = Self {
            data,
            num_bits,
            num_ones,
        };
        if bv.block_abs(bv.num_blocks()) != num_ones as u64 {
            return Err(CdatError::corrupt("bit vector rank directory sentinel mismatch"));
        }
        Ok(bv)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.num_bits
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_bits == 0
    }

    #[inline]
    pub fn num_ones(&self) -> usize {
        self.num_ones
    }

    /// Serialized bytes of this vector.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data.as_ref()[..serialized_len(self.num_bits, self.num_ones)]
    }

    pub fn size_in_bytes(&self) -> usize {
        serialized_len(self.num_bits, self.num_ones)
    }

    #[inline]
    fn num_blocks(&self) -> usize {
        self.num_bits.div_ceil(BLOCK_BITS)
    }

    #[inline]
    fn blocks_at(&self) -> usize {
        PREAMBLE + self.num_bits.div_ceil(WORD_BITS) * 8
    }

    #[inline]
    fn samples_at(&self) -> usize {
        self.blocks_at() + (self.num_blocks() + 1) * 16
    }

    #[inline]
    fn word(&self, idx: usize) -> u64 {
        if idx >= self.num_bits.div_ceil(WORD_BITS) {
            return 0;
        }
        read_u64(self.data.as_ref(), PREAMBLE + idx * 8)
    }

    #[inline]
    fn block_abs(&self, block: usize) -> u64 {
        read_u64(self.data.as_ref(), self.blocks_at() + block * 16)
    }

    #[inline]
    fn block_rel(&self, block: usize) -> u64 {
        read_u64(self.data.as_ref(), self.blocks_at() + block * 16 + 8)
    }

    #[inline]
    fn sample(&self, idx: usize) -> usize {
        read_u32(self.data.as_ref(), self.samples_at() + idx * 4) as usize
    }

    /// Returns the bit at `pos`, or `None` past the end.
    pub fn get(&self, pos: usize) -> Option<bool> {
        (pos < self.num_bits).then(|| self.bit(pos))
    }

    #[inline]
    pub(crate) fn bit(&self, pos: usize) -> bool {
        debug_assert!(pos < self.num_bits);
        (self.word(pos / WORD_BITS) >> (pos % WORD_BITS)) & 1 == 1
    }

    /// Number of one-bits in `[0, pos)`. Fails if `pos > len`.
    pub fn rank1(&self, pos: usize) -> Result<usize> {
        if pos > self.num_bits {
            return Err(CdatError::OutOfRange {
                pos,
                len: self.num_bits,
            });
        }
        Ok(self.rank1_unchecked(pos))
    }

    #[inline]
    pub(crate) fn rank1_unchecked(&self, pos: usize) -> usize {
        let block = pos / BLOCK_BITS;
        let word_in_block = (pos % BLOCK_BITS) / WORD_BITS;
        let mut rank = self.block_abs(block) + rel_field(self.block_rel(block), word_in_block);
        let bit = pos % WORD_BITS;
        if bit != 0 {
            let word = self.word(block * WORDS_PER_BLOCK + word_in_block);
            rank += u64::from((word & ((1u64 << bit) - 1)).count_ones());
        }
        rank as usize
    }

    /// Position of the `k`-th one-bit (0-indexed). Fails with `NotFound` if
    /// fewer than `k + 1` bits are set.
    pub fn select1(&self, k: usize) -> Result<usize> {
        if k >= self.num_ones {
            return Err(CdatError::NotFound);
        }
        Ok(self.select1_unchecked(k))
    }

    pub(crate) fn select1_unchecked(&self, k: usize) -> usize {
        debug_assert!(k < self.num_ones);
        let target = k as u64;
        let s = k / SELECT_SAMPLE;
        let num_samples = self.num_ones.div_ceil(SELECT_SAMPLE);

        // Smallest block boundary `i` with abs[i] > k; the one-bit lives in i - 1.
        // Samples are clamped so a damaged directory cannot index past the end.
        let mut left = (self.sample(s) + 1).min(self.num_blocks());
        let mut right = if s + 1 < num_samples {
            (self.sample(s + 1) + 1).min(self.num_blocks())
        } else {
            self.num_blocks()
        };
        while left < right {
            let mid = left + (right - left) / 2;
            if self.block_abs(mid) > target {
                right = mid;
            } else {
                left = mid + 1;
            }
        }
        let block = left.saturating_sub(1);

        let mut rem = target.saturating_sub(self.block_abs(block));
        let rel = self.block_rel(block);
        let mut j = 0;
        while j + 1 < WORDS_PER_BLOCK && rel_field(rel, j + 1) <= rem {
            j += 1;
        }
        rem = rem.saturating_sub(rel_field(rel, j));

        let word = self.word(block * WORDS_PER_BLOCK + j);
        block * BLOCK_BITS + j * WORD_BITS + select_in_word(word, rem.min(64) as u32)
    }
}

#[inline]
fn rel_field(rel: u64, j: usize) -> u64 {
    if j == 0 {
        0
    } else {
        (rel >> (9 * (j - 1))) & 0x1FF
    }
}

#[inline]
fn select_in_word(mut word: u64, k: u32) -> usize {
    for _ in 0..k {
        if word == 0 {
            break;
        }
        word &= word - 1;
    }
    word.trailing_zeros() as usize
}
