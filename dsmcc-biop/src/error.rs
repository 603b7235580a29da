//! Error types for BIOP/IOR wire decoding.

use thiserror::Error;

/// Errors raised while decoding BIOP structures from section or module bytes.
///
/// Every variant is fatal to the single decode call that produced it and to
/// nothing else; the surrounding stream or module scan continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BiopError {
    /// A declared length field would read past the end of the buffer.
    #[error("truncated input: need {needed} bytes at offset {offset}, {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// Message does not start with the 'BIOP' magic.
    #[error("invalid magic: expected 'BIOP', got {0:?}")]
    InvalidMagic([u8; 4]),

    /// The object kind does not match a known message variant.
    #[error("unknown object kind: {0:?}")]
    UnknownObjectKind([u8; 4]),

    /// The declared message size is smaller than the variable-length header
    /// it is supposed to cover.
    #[error("declared message size {declared} smaller than header remainder {minimum}")]
    MessageSizeMismatch { declared: u32, minimum: usize },
}
