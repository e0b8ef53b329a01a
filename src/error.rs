use thiserror::Error;

use crate::unit::CodeWidth;

/// Classifies dictionary errors for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Construction input was rejected (ordering, duplicates, alphabet, capacity)
    InvalidInput,
    /// The requested bit, id or key does not exist
    NotFound,
    /// Serialized bytes are damaged, truncated or of another format/variant
    CorruptOrIncompatible,
    /// File open/read/write failure
    Io,
}

/// Dictionary error types
#[derive(Error, Debug)]
pub enum CdatError {
    #[error("keys are not sorted: key at index {index} is smaller than its predecessor")]
    Unsorted { index: usize },

    #[error("duplicate key at index {index}")]
    Duplicate { index: usize },

    #[error("key at index {index} contains byte {byte:#04x} outside the {width} alphabet")]
    LabelOutOfRange {
        index: usize,
        byte: u8,
        width: CodeWidth,
    },

    #[error("trie does not fit {width} units: base offset {needed} is too large")]
    CapacityExceeded { width: CodeWidth, needed: u64 },

    #[error("not found")]
    NotFound,

    #[error("position {pos} is out of range for length {len}")]
    OutOfRange { pos: usize, len: usize },

    #[error("invalid magic bytes in dictionary header")]
    InvalidMagic,

    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("code width mismatch: expected {expected}, found {found}")]
    WidthMismatch { expected: CodeWidth, found: CodeWidth },

    #[error("unknown code width tag {0}")]
    UnknownWidth(u32),

    #[error("dictionary header checksum mismatch")]
    HeaderChecksum,

    #[error("truncated dictionary: need {needed} bytes, region has {available}")]
    Truncated { needed: usize, available: usize },

    #[error("corrupt dictionary: {reason}")]
    Corrupt { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CdatError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        CdatError::Corrupt {
            reason: reason.into(),
        }
    }

    /// Returns the error class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CdatError::Unsorted { .. }
            | CdatError::Duplicate { .. }
            | CdatError::LabelOutOfRange { .. }
            | CdatError::CapacityExceeded { .. } => ErrorKind::InvalidInput,
            CdatError::NotFound | CdatError::OutOfRange { .. } => ErrorKind::NotFound,
            CdatError::InvalidMagic
            | CdatError::VersionMismatch { .. }
            | CdatError::WidthMismatch { .. }
            | CdatError::UnknownWidth(_)
            | CdatError::HeaderChecksum
            | CdatError::Truncated { .. }
            | CdatError::Corrupt { .. } => ErrorKind::CorruptOrIncompatible,
            CdatError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, CdatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_errors_are_invalid_input() {
        let errs = [
            CdatError::Unsorted { index: 3 },
            CdatError::Duplicate { index: 1 },
            CdatError::LabelOutOfRange {
                index: 0,
                byte: 0xE3,
                width: CodeWidth::W7,
            },
            CdatError::CapacityExceeded {
                width: CodeWidth::W8,
                needed: 1 << 30,
            },
        ];
        for err in &errs {
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{}", err);
        }
    }

    #[test]
    fn test_load_errors_are_corrupt_or_incompatible() {
        let err = CdatError::VersionMismatch {
            expected: 1,
            found: 9,
        };
        assert_eq!(err.kind(), ErrorKind::CorruptOrIncompatible);
        let err = CdatError::Truncated {
            needed: 128,
            available: 12,
        };
        assert_eq!(err.kind(), ErrorKind::CorruptOrIncompatible);
        assert!(matches!(
            CdatError::corrupt("bad").kind(),
            ErrorKind::CorruptOrIncompatible
        ));
    }

    #[test]
    fn test_display_includes_details() {
        let err = CdatError::LabelOutOfRange {
            index: 7,
            byte: 0xC3,
            width: CodeWidth::W7,
        };
        let display = format!("{}", err);
        assert!(display.contains("index 7"), "got: {}", display);
        assert!(display.contains("0xc3"), "got: {}", display);
        assert!(display.contains("7-bit"), "got: {}", display);
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: CdatError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
