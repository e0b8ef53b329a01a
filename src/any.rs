//! Width-erased dictionary for files whose variant is only known at runtime.

use std::fmt;
use std::path::Path;

use memmap2::Mmap;

use crate::dictionary::{Dictionary15, Dictionary16, Dictionary7, Dictionary8};
use crate::error::Result;
use crate::format::read_width;
use crate::unit::CodeWidth;

/// Construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildConfig {
    /// Label width of the code units.
    pub width: CodeWidth,
}

impl BuildConfig {
    pub fn new(width: CodeWidth) -> Self {
        Self { width }
    }
}

/// One of the four specialized dictionaries, selected by the stored width tag.
pub enum AnyDictionary<D = Vec<u8>> {
    W7(Dictionary7<D>),
    W8(Dictionary8<D>),
    W15(Dictionary15<D>),
    W16(Dictionary16<D>),
}

type BoxedIter<'a> = Box<dyn Iterator<Item = (Vec<u8>, u64)> + 'a>;

macro_rules! dispatch {
    ($self:expr, $d:ident => $body:expr) => {
        match $self {
            AnyDictionary::W7($d) => $body,
            AnyDictionary::W8($d) => $body,
            AnyDictionary::W15($d) => $body,
            AnyDictionary::W16($d) => $body,
        }
    };
}

impl AnyDictionary<Vec<u8>> {
    /// Builds a dictionary of the configured width.
    pub fn build<I, K>(keys: I, config: &BuildConfig) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        Ok(match config.width {
            CodeWidth::W7 => AnyDictionary::W7(Dictionary7::build(keys)?),
            CodeWidth::W8 => AnyDictionary::W8(Dictionary8::build(keys)?),
            CodeWidth::W15 => AnyDictionary::W15(Dictionary15::build(keys)?),
            CodeWidth::W16 => AnyDictionary::W16(Dictionary16::build(keys)?),
        })
    }

    /// Reads a whole dictionary file of any width into owned memory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(std::fs::read(path)?)
    }
}

impl AnyDictionary<Mmap> {
    /// Maps a dictionary file of any width read-only.
    pub fn open_mmap(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        // SAFETY: Read-only mmap. The file must not be truncated while mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::new(mmap)
    }
}

impl<D: AsRef<[u8]>> AnyDictionary<D> {
    /// Reads the width tag from `data` and projects the matching variant.
    pub fn new(data: D) -> Result<Self> {
        Ok(match read_width(data.as_ref())? {
            CodeWidth::W7 => AnyDictionary::W7(Dictionary7::new(data)?),
            CodeWidth::W8 => AnyDictionary::W8(Dictionary8::new(data)?),
            CodeWidth::W15 => AnyDictionary::W15(Dictionary15::new(data)?),
            CodeWidth::W16 => AnyDictionary::W16(Dictionary16::new(data)?),
        })
    }

    pub fn width(&self) -> CodeWidth {
        dispatch!(self, d => d.width())
    }

    pub fn num_keys(&self) -> usize {
        dispatch!(self, d => d.num_keys())
    }

    pub fn num_nodes(&self) -> usize {
        dispatch!(self, d => d.num_nodes())
    }

    pub fn num_units(&self) -> usize {
        dispatch!(self, d => d.num_units())
    }

    pub fn is_empty(&self) -> bool {
        dispatch!(self, d => d.is_empty())
    }

    pub fn memory_in_bytes(&self) -> usize {
        dispatch!(self, d => d.memory_in_bytes())
    }

    pub fn alphabet_size(&self) -> usize {
        dispatch!(self, d => d.alphabet_size())
    }

    pub fn max_length(&self) -> usize {
        dispatch!(self, d => d.max_length())
    }

    pub fn as_bytes(&self) -> &[u8] {
        dispatch!(self, d => d.as_bytes())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        dispatch!(self, d => d.save(path))
    }

    pub fn lookup(&self, key: impl AsRef<[u8]>) -> Option<u64> {
        dispatch!(self, d => d.lookup(key))
    }

    pub fn decode(&self, id: u64) -> Option<Vec<u8>> {
        dispatch!(self, d => d.decode(id))
    }

    pub fn decode_into(&self, id: u64, key: &mut Vec<u8>) -> bool {
        dispatch!(self, d => d.decode_into(id, key))
    }

    pub fn prefix_search<F: FnMut(u64, &[u8])>(&self, query: impl AsRef<[u8]>, f: F) {
        dispatch!(self, d => d.prefix_search(query, f))
    }

    pub fn predictive_search<F: FnMut(u64, &[u8])>(&self, query: impl AsRef<[u8]>, f: F) {
        dispatch!(self, d => d.predictive_search(query, f))
    }

    pub fn enumerate_with<F: FnMut(u64, &[u8])>(&self, f: F) {
        dispatch!(self, d => d.enumerate_with(f))
    }

    /// Boxed predictive cursor over whichever variant is stored.
    pub fn predictive_iter(&self, query: impl AsRef<[u8]>) -> BoxedIter<'_> {
        dispatch!(self, d => Box::new(d.predictive_iter(query)) as BoxedIter<'_>)
    }

    pub fn prefix_iter(&self, query: impl AsRef<[u8]>) -> BoxedIter<'_> {
        dispatch!(self, d => Box::new(d.prefix_iter(query)) as BoxedIter<'_>)
    }
}

impl<D: AsRef<[u8]>> fmt::Debug for AnyDictionary<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, d => fmt::Debug::fmt(d, f))
    }
}

impl<D: AsRef<[u8]> + Clone> Clone for AnyDictionary<D> {
    fn clone(&self) -> Self {
        match self {
            AnyDictionary::W7(d) => AnyDictionary::W7(d.clone()),
            AnyDictionary::W8(d) => AnyDictionary::W8(d.clone()),
            AnyDictionary::W15(d) => AnyDictionary::W15(d.clone()),
            AnyDictionary::W16(d) => AnyDictionary::W16(d.clone()),
        }
    }
}
