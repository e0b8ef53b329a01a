//! Code-unit layouts for the packed double array.
//!
//! A unit packs `[base | label | terminal]` into the fewest whole bytes:
//!
//! ```text
//!  msb                                              lsb
//! ┌──────────────────────────┬────────────────┬──────────┐
//! │ base (40 bits)           │ label (L bits) │ terminal │
//! └──────────────────────────┴────────────────┴──────────┘
//! ```
//!
//! | Variant | Label bits | Unit bytes |
//! |---------|-----------:|-----------:|
//! | `Unit7` | 7          | 6          |
//! | `Unit8` | 8          | 7          |
//! | `Unit15`| 15         | 7          |
//! | `Unit16`| 16         | 8          |
//!
//! The base field is the same for every width, so the width only trades
//! alphabet against unit size; it never limits how many keys fit.
//!
//! A base of zero marks a leaf: the root occupies slot 0, so no child block can
//! start there.

use std::fmt;
use std::str::FromStr;

/// Runtime tag naming one of the unit layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CodeWidth {
    W7,
    #[default]
    W8,
    W15,
    W16,
}

impl CodeWidth {
    pub const ALL: [CodeWidth; 4] = [CodeWidth::W7, CodeWidth::W8, CodeWidth::W15, CodeWidth::W16];

    /// Numeric tag stored in the serialized header.
    pub const fn tag(self) -> u32 {
        match self {
            CodeWidth::W7 => 7,
            CodeWidth::W8 => 8,
            CodeWidth::W15 => 15,
            CodeWidth::W16 => 16,
        }
    }

    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            7 => Some(CodeWidth::W7),
            8 => Some(CodeWidth::W8),
            15 => Some(CodeWidth::W15),
            16 => Some(CodeWidth::W16),
            _ => None,
        }
    }

    /// Largest key byte this width can label.
    pub const fn max_byte(self) -> u8 {
        match self {
            CodeWidth::W7 => 0x7F,
            _ => 0xFF,
        }
    }
}

impl fmt::Display for CodeWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.tag())
    }
}

impl FromStr for CodeWidth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches("-bit");
        trimmed
            .parse::<u32>()
            .ok()
            .and_then(CodeWidth::from_tag)
            .ok_or_else(|| format!("unsupported code width '{}' (expected 7, 8, 15 or 16)", s))
    }
}

/// Bits of the base field in every layout. Also bounds slot indices, which
/// the parent array stores in `UNIT_BYTES`.
pub const BASE_BITS: u32 = 40;

/// Compile-time unit layout. Implemented by the four zero-sized markers.
pub trait CodeUnit: Copy + Default + fmt::Debug + Send + Sync + 'static {
    const WIDTH: CodeWidth;
    const LABEL_BITS: u32;

    const UNIT_BYTES: usize = ((BASE_BITS + Self::LABEL_BITS + 1 + 7) / 8) as usize;
    const MAX_LABEL: u32 = (1 << Self::LABEL_BITS) - 1;
    const MAX_BASE: u64 = (1u64 << BASE_BITS) - 1;

    #[inline]
    fn pack(base: u64, label: u32, terminal: bool) -> u64 {
        debug_assert!(base <= Self::MAX_BASE);
        debug_assert!(label <= Self::MAX_LABEL);
        (base << (Self::LABEL_BITS + 1)) | (u64::from(label) << 1) | u64::from(terminal)
    }

    #[inline]
    fn base(raw: u64) -> u64 {
        raw >> (Self::LABEL_BITS + 1)
    }

    #[inline]
    fn label(raw: u64) -> u32 {
        ((raw >> 1) & u64::from(Self::MAX_LABEL)) as u32
    }

    #[inline]
    fn is_terminal(raw: u64) -> bool {
        raw & 1 == 1
    }
}

macro_rules! code_unit {
    ($(#[$doc:meta])* $name:ident, $width:expr, $label_bits:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl CodeUnit for $name {
            const WIDTH: CodeWidth = $width;
            const LABEL_BITS: u32 = $label_bits;
        }
    };
}

code_unit!(
    /// 7-bit labels in 48-bit units (ASCII keys only).
    Unit7, CodeWidth::W7, 7
);
code_unit!(
    /// 8-bit labels in 56-bit units.
    Unit8, CodeWidth::W8, 8
);
code_unit!(
    /// 15-bit label field in 56-bit units.
    Unit15, CodeWidth::W15, 15
);
code_unit!(
    /// 16-bit label field in 64-bit units.
    Unit16, CodeWidth::W16, 16
);
