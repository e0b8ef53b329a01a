//! Binary layout of a serialized dictionary.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Header (48 bytes)                           │
//! │  magic: [u8; 4] = "CDAT"                    │
//! │  version: u32 = 1                           │
//! │  width: u32 (7 | 8 | 15 | 16)               │
//! │  alphabet_size: u32                         │
//! │  num_keys: u64                              │
//! │  num_nodes: u64                             │
//! │  num_units: u64                             │
//! │  max_length: u32                            │
//! │  header_crc32: u32                          │
//! ├─────────────────────────────────────────────┤
//! │ Units     num_units * UNIT_BYTES            │
//! │ Parents   num_units * UNIT_BYTES            │
//! │ Siblings  num_units * 2                     │
//! │   [first child label, next sibling delta]   │
//! ├─────────────────────────────────────────────┤
//! │ Occupied bit vector (num_units bits)        │
//! │ Terminal bit vector (num_units bits)        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! A sibling delta of zero marks the last child of its parent; the first
//! child label is meaningful only on slots with a non-zero base.
//!
//! Every integer is little-endian. Section sizes follow from the header alone,
//! so a region can be validated without scanning its payload.

use std::ops::Range;

use crate::bit_vector::BitVector;
use crate::error::{CdatError, Result};
use crate::unit::CodeWidth;

/// Magic bytes identifying a dictionary file.
pub const MAGIC: [u8; 4] = *b"CDAT";

/// Current format version.
pub const VERSION: u32 = 1;

/// Header size in bytes (fixed).
pub const HEADER_SIZE: usize = 48;

/// Bytes per slot in the sibling section.
pub(crate) const SIBLING_BYTES: usize = 2;

#[inline]
pub(crate) fn read_le(bytes: &[u8], at: usize, width: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(&bytes[at..at + width]);
    u64::from_le_bytes(buf)
}

#[inline]
pub(crate) fn read_u32(bytes: &[u8], at: usize) -> u32 {
    read_le(bytes, at, 4) as u32
}

#[inline]
pub(crate) fn read_u64(bytes: &[u8], at: usize) -> u64 {
    read_le(bytes, at, 8)
}

#[inline]
pub(crate) fn write_le(out: &mut Vec<u8>, value: u64, width: usize) {
    out.extend_from_slice(&value.to_le_bytes()[..width]);
}

/// Dictionary header parsed from bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub width: CodeWidth,
    pub alphabet_size: u32,
    pub num_keys: u64,
    pub num_nodes: u64,
    pub num_units: u64,
    pub max_length: u32,
}

impl Header {
    /// Serialize header to bytes. CRC32 covers the first 44 bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.width.tag().to_le_bytes());
        buf[12..16].copy_from_slice(&self.alphabet_size.to_le_bytes());
        buf[16..24].copy_from_slice(&self.num_keys.to_le_bytes());
        buf[24..32].copy_from_slice(&self.num_nodes.to_le_bytes());
        buf[32..40].copy_from_slice(&self.num_units.to_le_bytes());
        buf[40..44].copy_from_slice(&self.max_length.to_le_bytes());
        let crc = crc32fast::hash(&buf[..44]);
        buf[44..48].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Parse and check magic, checksum, version and width tag.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(CdatError::Truncated {
                needed: HEADER_SIZE,
                available: data.len(),
            });
        }
        if data[0..4] != MAGIC {
            return Err(CdatError::InvalidMagic);
        }
        if read_u32(data, 44) != crc32fast::hash(&data[..44]) {
            return Err(CdatError::HeaderChecksum);
        }

        let version = read_u32(data, 4);
        if version != VERSION {
            return Err(CdatError::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }
        let tag = read_u32(data, 8);
        let width = CodeWidth::from_tag(tag).ok_or(CdatError::UnknownWidth(tag))?;

        Ok(Header {
            version,
            width,
            alphabet_size: read_u32(data, 12),
            num_keys: read_u64(data, 16),
            num_nodes: read_u64(data, 24),
            num_units: read_u64(data, 32),
            max_length: read_u32(data, 40),
        })
    }
}

/// Byte ranges of every section, derived from a validated header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    pub units: Range<usize>,
    pub parents: Range<usize>,
    pub siblings: Range<usize>,
    pub occupied: Range<usize>,
    pub terminals: Range<usize>,
}

fn to_usize(value: u64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| CdatError::corrupt(format!("{} {} overflows usize", what, value)))
}

fn section(start: usize, len: usize) -> Range<usize> {
    start..start.saturating_add(len)
}

impl Layout {
    pub fn compute(header: &Header, unit_bytes: usize) -> Result<Self> {
        let num_units = to_usize(header.num_units, "num_units")?;
        let num_nodes = to_usize(header.num_nodes, "num_nodes")?;
        let num_keys = to_usize(header.num_keys, "num_keys")?;
        if num_nodes > num_units || num_keys > num_nodes {
            return Err(CdatError::corrupt(format!(
                "inconsistent counts: keys={} nodes={} units={}",
                num_keys, num_nodes, num_units
            )));
        }

        let array_len = num_units
            .checked_mul(unit_bytes)
            .ok_or_else(|| CdatError::corrupt("unit array size overflows"))?;
        let units = section(HEADER_SIZE, array_len);
        let parents = section(units.end, array_len);
        let siblings_len = num_units
            .checked_mul(SIBLING_BYTES)
            .ok_or_else(|| CdatError::corrupt("sibling array size overflows"))?;
        let siblings = section(parents.end, siblings_len);
        let occupied = section(
            siblings.end,
            BitVector::<&[u8]>::serialized_len(num_units, num_nodes),
        );
        let terminals = section(
            occupied.end,
            BitVector::<&[u8]>::serialized_len(num_units, num_keys),
        );

        Ok(Layout {
            units,
            parents,
            siblings,
            occupied,
            terminals,
        })
    }

    /// Total bytes the dictionary occupies, header included.
    pub fn total_len(&self) -> usize {
        self.terminals.end
    }
}

/// Reads the code-width tag of a serialized dictionary without touching its
/// payload.
pub fn read_width(data: &[u8]) -> Result<CodeWidth> {
    Ok(Header::from_bytes(data)?.width)
}

/// Reads the code-width tag from a dictionary file, reading only its header.
pub fn read_width_from_file(path: impl AsRef<std::path::Path>) -> Result<CodeWidth> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; HEADER_SIZE];
    let mut filled = 0;
    while filled < HEADER_SIZE {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    read_width(&buf[..filled])
}
