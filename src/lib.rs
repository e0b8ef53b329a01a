//! # cdat-rs
//!
//! A compact, static string dictionary built on a double-array trie.
//!
//! Keys are byte strings; each key maps to a dense id in `[0, num_keys)`.
//! The dictionary answers exact lookup, id-to-key decoding, common-prefix
//! search and predictive search, and serializes to a flat, little-endian byte
//! layout that can be queried in place from a memory map.
//!
//! ## Example
//!
//! ```rust
//! use cdat_rs::Dictionary8;
//!
//! let keys = ["Mac", "MacBook", "MacBook_Air", "Mac_Pro", "iMac"];
//! let dict = Dictionary8::build(keys).unwrap();
//!
//! let id = dict.lookup("Mac_Pro").unwrap();
//! assert_eq!(dict.decode(id).unwrap(), b"Mac_Pro");
//! assert_eq!(dict.lookup("Google_Pixel"), None);
//!
//! let prefixes: Vec<Vec<u8>> = dict.prefix_iter("MacBook_Air").map(|(k, _)| k).collect();
//! assert_eq!(prefixes, [b"Mac".to_vec(), b"MacBook".to_vec(), b"MacBook_Air".to_vec()]);
//!
//! // Zero-copy projection over the serialized bytes.
//! let view = Dictionary8::new(dict.as_bytes()).unwrap();
//! assert_eq!(view.lookup("iMac"), dict.lookup("iMac"));
//! ```
//!
//! ## Code widths
//!
//! The label width is a type parameter: [`Dictionary7`] and [`Dictionary8`]
//! pack units into 32 bits, [`Dictionary15`] and [`Dictionary16`] into 64 bits
//! for larger arrays. [`AnyDictionary`] dispatches on the width stored in a
//! file's header.

#![deny(unsafe_op_in_unsafe_fn)]

mod any;
mod bit_vector;
mod builder;
mod dictionary;
mod encoder;
mod error;
mod format;
mod iter;
mod unit;

pub use any::{AnyDictionary, BuildConfig};
pub use bit_vector::{BitVector, BitVectorBuilder};
pub use builder::{common_prefix_len, Trie, TrieBuilder, TrieNode};
pub use dictionary::{Dictionary, Dictionary15, Dictionary16, Dictionary7, Dictionary8};
pub use encoder::CompactEncoder;
pub use error::{CdatError, ErrorKind, Result};
pub use format::{read_width, read_width_from_file, Header, HEADER_SIZE, MAGIC, VERSION};
pub use iter::{PredictiveIter, PrefixIter};
pub use unit::{CodeUnit, CodeWidth, Unit15, Unit16, Unit7, Unit8};

#[cfg(test)]
mod proptests;
