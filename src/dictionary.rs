//! Immutable double-array dictionary over serialized bytes.
//!
//! A [`Dictionary`] never deserializes: every query reads the packed units and
//! bit vectors straight out of its byte container. Owned (`Vec<u8>`),
//! borrowed (`&[u8]`) and memory-mapped (`memmap2::Mmap`) storage share one
//! code path, so full load and zero-copy projection answer identically.

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::marker::PhantomData;
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, warn};

use crate::bit_vector::BitVector;
use crate::builder::TrieBuilder;
use crate::encoder::CompactEncoder;
use crate::error::{CdatError, Result};
use crate::format::{read_le, Header, Layout, SIBLING_BYTES};
use crate::iter::{PredictiveIter, PrefixIter};
use crate::unit::{CodeUnit, CodeWidth, Unit15, Unit16, Unit7, Unit8};

/// Compact trie dictionary mapping each key to a dense id in `[0, num_keys)`.
///
/// `D` is the byte storage, `U` the code-unit layout. Ids are the rank of a
/// key's terminal slot among all terminal slots, so they are dense and
/// deterministic but follow array order rather than key order.
pub struct Dictionary<D = Vec<u8>, U = Unit8> {
    data: D,
    header: Header,
    layout: Layout,
    num_keys: usize,
    num_nodes: usize,
    num_units: usize,
    max_length: usize,
    _unit: PhantomData<U>,
}

/// Dictionary with 7-bit labels (ASCII keys).
pub type Dictionary7<D = Vec<u8>> = Dictionary<D, Unit7>;
/// Dictionary with 8-bit labels.
pub type Dictionary8<D = Vec<u8>> = Dictionary<D, Unit8>;
/// Dictionary with a 15-bit label field.
pub type Dictionary15<D = Vec<u8>> = Dictionary<D, Unit15>;
/// Dictionary with a 16-bit label field.
pub type Dictionary16<D = Vec<u8>> = Dictionary<D, Unit16>;

impl<U: CodeUnit> Dictionary<Vec<u8>, U> {
    /// Builds a dictionary from sorted, duplicate-free keys.
    ///
    /// Fails with an [`InvalidInput`](crate::ErrorKind::InvalidInput) error on
    /// unsorted or repeated keys, on a byte outside the `U` alphabet, or when
    /// the trie does not fit the unit's base field. Nothing is produced on
    /// failure.
    pub fn build<I, K>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let trie = TrieBuilder::build(U::WIDTH, keys)?;
        let bytes = CompactEncoder::<U>::encode(&trie)?;
        Self::new(bytes)
    }

    /// Reads a whole dictionary file into owned memory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let dict = Self::new(bytes)?;
        debug!(path = %path.display(), bytes = dict.memory_in_bytes(), "loaded dictionary");
        Ok(dict)
    }
}

impl<U: CodeUnit> Dictionary<Mmap, U> {
    /// Maps a dictionary file read-only. Queries read the mapping directly.
    pub fn open_mmap(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: Read-only mmap. The file must not be truncated while mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        let dict = Self::new(mmap)?;
        debug!(path = %path.display(), bytes = dict.memory_in_bytes(), "mapped dictionary");
        Ok(dict)
    }
}

impl<D: AsRef<[u8]>, U: CodeUnit> Dictionary<D, U> {
    /// Interprets `data` as a serialized dictionary without copying.
    ///
    /// Checks the header (magic, checksum, version, width), that every
    /// declared section fits in `data`, and the bit vector preambles. Trailing
    /// bytes after the dictionary are ignored.
    pub fn new(data: D) -> Result<Self> {
        match Self::validate(data.as_ref()) {
            Ok((header, layout)) => Ok(Self {
                data,
                num_keys: header.num_keys as usize,
                num_nodes: header.num_nodes as usize,
                num_units: header.num_units as usize,
                max_length: header.max_length as usize,
                header,
                layout,
                _unit: PhantomData,
            }),
            Err(e) => {
                warn!(error = %e, width = %U::WIDTH, "rejected dictionary region");
                Err(e)
            }
        }
    }

    fn validate(bytes: &[u8]) -> Result<(Header, Layout)> {
        let header = Header::from_bytes(bytes)?;
        if header.width != U::WIDTH {
            return Err(CdatError::WidthMismatch {
                expected: U::WIDTH,
                found: header.width,
            });
        }
        let layout = Layout::compute(&header, U::UNIT_BYTES)?;
        if bytes.len() < layout.total_len() {
            return Err(CdatError::Truncated {
                needed: layout.total_len(),
                available: bytes.len(),
            });
        }

        let units = header.num_units as usize;
        let occupied = BitVector::from_bytes(&bytes[layout.occupied.clone()])?;
        if occupied.len() != units || occupied.num_ones() as u64 != header.num_nodes {
            return Err(CdatError::corrupt("occupied bit vector disagrees with header"));
        }
        let terminals = BitVector::from_bytes(&bytes[layout.terminals.clone()])?;
        if terminals.len() != units || terminals.num_ones() as u64 != header.num_keys {
            return Err(CdatError::corrupt("terminal bit vector disagrees with header"));
        }
        if units > 0 && !occupied.bit(0) {
            return Err(CdatError::corrupt("root slot is not occupied"));
        }
        Ok((header, layout))
    }

    /// Serialized bytes of the dictionary, header included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data.as_ref()[..self.layout.total_len()]
    }

    pub fn into_inner(self) -> D {
        self.data
    }

    /// Writes the serialized form to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(self.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Writes the serialized form to a file at `path`, replacing it.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.write_to(std::io::BufWriter::new(File::create(path)?))?;
        debug!(path = %path.display(), bytes = self.memory_in_bytes(), "saved dictionary");
        Ok(())
    }

    #[inline]
    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    #[inline]
    pub fn num_units(&self) -> usize {
        self.num_units
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_keys == 0
    }

    /// Bytes occupied by the serialized dictionary.
    pub fn memory_in_bytes(&self) -> usize {
        self.layout.total_len()
    }

    /// Number of distinct byte values used as labels.
    pub fn alphabet_size(&self) -> usize {
        self.header.alphabet_size as usize
    }

    /// Length of the longest key.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn width(&self) -> CodeWidth {
        U::WIDTH
    }
}

// =============================================================================
// Raw slot access
// =============================================================================

impl<D: AsRef<[u8]>, U: CodeUnit> Dictionary<D, U> {
    #[inline]
    pub(crate) fn unit(&self, slot: usize) -> u64 {
        debug_assert!(slot < self.num_units);
        read_le(
            self.data.as_ref(),
            self.layout.units.start + slot * U::UNIT_BYTES,
            U::UNIT_BYTES,
        )
    }

    #[inline]
    fn parent(&self, slot: usize) -> usize {
        let raw = read_le(
            self.data.as_ref(),
            self.layout.parents.start + slot * U::UNIT_BYTES,
            U::UNIT_BYTES,
        );
        usize::try_from(raw).unwrap_or(usize::MAX)
    }

    #[inline]
    fn occupied(&self) -> BitVector<&[u8]> {
        BitVector::view(
            &self.data.as_ref()[self.layout.occupied.clone()],
            self.num_units,
            self.num_nodes,
        )
    }

    #[inline]
    fn terminals(&self) -> BitVector<&[u8]> {
        BitVector::view(
            &self.data.as_ref()[self.layout.terminals.clone()],
            self.num_units,
            self.num_keys,
        )
    }

    /// Root slot, or `None` for an empty dictionary.
    #[inline]
    pub(crate) fn root(&self) -> Option<usize> {
        (self.num_units > 0).then_some(0)
    }

    /// Base of `slot`, or `None` for a leaf.
    #[inline]
    pub(crate) fn base(&self, slot: usize) -> Option<usize> {
        match U::base(self.unit(slot)) {
            0 => None,
            base => usize::try_from(base).ok(),
        }
    }

    /// Slot of the child of `slot` labeled `label`.
    #[inline]
    pub(crate) fn child(&self, slot: usize, label: u8) -> Option<usize> {
        let next = self.base(slot)?.checked_add(usize::from(label))?;
        self.owns(next, label).then_some(next)
    }

    /// Whether `slot` is a real node carrying `label`. Because bases are
    /// unique, a matching label identifies the parent too.
    #[inline]
    pub(crate) fn owns(&self, slot: usize, label: u8) -> bool {
        slot < self.num_units
            && self.occupied().bit(slot)
            && U::label(self.unit(slot)) == u32::from(label)
    }

    #[inline]
    pub(crate) fn is_terminal(&self, slot: usize) -> bool {
        U::is_terminal(self.unit(slot))
    }

    #[inline]
    pub(crate) fn id_of(&self, slot: usize) -> u64 {
        self.terminals().rank1_unchecked(slot) as u64
    }

    /// `(first child label, next sibling delta)` of `slot`. Out-of-range
    /// slots read as a childless last sibling.
    #[inline]
    pub(crate) fn sibling_entry(&self, slot: usize) -> (u8, u8) {
        if slot >= self.num_units {
            return (0, 0);
        }
        let at = self.layout.siblings.start + slot * SIBLING_BYTES;
        let bytes = self.data.as_ref();
        (bytes[at], bytes[at + 1])
    }
}

// =============================================================================
// Queries
// =============================================================================

impl<D: AsRef<[u8]>, U: CodeUnit> Dictionary<D, U> {
    /// Id of `key`, or `None` if it is not in the dictionary.
    pub fn lookup(&self, key: impl AsRef<[u8]>) -> Option<u64> {
        let key = key.as_ref();
        if key.len() > self.max_length {
            return None;
        }
        let mut slot = self.root()?;
        for &byte in key {
            slot = self.child(slot, byte)?;
        }
        self.is_terminal(slot).then(|| self.id_of(slot))
    }

    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.lookup(key).is_some()
    }

    /// Key with the given id, or `None` if `id >= num_keys()`.
    pub fn decode(&self, id: u64) -> Option<Vec<u8>> {
        let mut key = Vec::with_capacity(self.max_length);
        self.decode_into(id, &mut key).then_some(key)
    }

    /// Writes the key with the given id into `key`, replacing its contents.
    /// Returns `false` and leaves `key` empty if the id is out of range.
    pub fn decode_into(&self, id: u64, key: &mut Vec<u8>) -> bool {
        key.clear();
        if id >= self.num_keys as u64 {
            return false;
        }
        let mut slot = self.terminals().select1_unchecked(id as usize);
        while slot != 0 {
            // Walks longer than the longest key only happen on damaged bytes.
            if slot >= self.num_units || key.len() >= self.max_length {
                key.clear();
                return false;
            }
            let Ok(label) = u8::try_from(U::label(self.unit(slot))) else {
                key.clear();
                return false;
            };
            key.push(label);
            slot = self.parent(slot);
        }
        key.reverse();
        true
    }

    /// Keys that are prefixes of `query`, shortest first.
    pub fn prefix_iter(&self, query: impl AsRef<[u8]>) -> PrefixIter<'_, D, U> {
        PrefixIter::new(self, query.as_ref())
    }

    /// Keys starting with `query`, in lexicographic order.
    pub fn predictive_iter(&self, query: impl AsRef<[u8]>) -> PredictiveIter<'_, D, U> {
        PredictiveIter::new(self, query.as_ref())
    }

    /// Every key in lexicographic order.
    pub fn enumerate(&self) -> PredictiveIter<'_, D, U> {
        PredictiveIter::new(self, &[])
    }

    /// Alias of [`enumerate`](Self::enumerate).
    pub fn iter(&self) -> PredictiveIter<'_, D, U> {
        self.enumerate()
    }

    /// Calls `f(id, key)` for every key that is a prefix of `query`.
    pub fn prefix_search<F>(&self, query: impl AsRef<[u8]>, mut f: F)
    where
        F: FnMut(u64, &[u8]),
    {
        let mut it = self.prefix_iter(query);
        while it.advance() {
            f(it.id(), it.key());
        }
    }

    /// Calls `f(id, key)` for every key starting with `query`.
    pub fn predictive_search<F>(&self, query: impl AsRef<[u8]>, mut f: F)
    where
        F: FnMut(u64, &[u8]),
    {
        let mut it = self.predictive_iter(query);
        while it.advance() {
            f(it.id(), it.key());
        }
    }

    /// Calls `f(id, key)` for every key.
    pub fn enumerate_with<F>(&self, f: F)
    where
        F: FnMut(u64, &[u8]),
    {
        self.predictive_search(b"", f)
    }
}

impl<D: AsRef<[u8]>, U: CodeUnit> fmt::Debug for Dictionary<D, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dictionary")
            .field("width", &U::WIDTH)
            .field("num_keys", &self.num_keys)
            .field("num_nodes", &self.num_nodes)
            .field("num_units", &self.num_units)
            .field("bytes", &self.memory_in_bytes())
            .finish()
    }
}

impl<D: AsRef<[u8]> + Clone, U: CodeUnit> Clone for Dictionary<D, U> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            header: self.header,
            layout: self.layout.clone(),
            num_keys: self.num_keys,
            num_nodes: self.num_nodes,
            num_units: self.num_units,
            max_length: self.max_length,
            _unit: PhantomData,
        }
    }
}
