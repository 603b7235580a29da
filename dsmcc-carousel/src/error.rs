//! Error types for carousel reassembly and resolution.

use dsmcc_biop::BiopError;
use thiserror::Error;

/// Errors raised by the reassembly, registry and navigation layers.
///
/// None of these abort the surrounding stream or carousel: each is attributed
/// to the single section, module or object being processed. Resolution-level
/// "not ready yet" conditions are surfaced as `Ok(None)` from the navigator,
/// not as errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CarouselError {
    /// Wire-level decode failure from the BIOP layer.
    #[error(transparent)]
    Wire(#[from] BiopError),

    /// A control message did not carry the expected DSM-CC message id.
    #[error("unexpected DSM-CC message id {actual:#06x} (expected {expected:#06x})")]
    UnexpectedMessageId { expected: u16, actual: u16 },

    /// An IOR profile does not carry the `[ObjectLocation, ConnBinder]` pair.
    #[error("unsupported profile layout in object reference")]
    UnsupportedProfile,

    /// A section number exceeds the declared last section number.
    /// Logged and dropped by the reassembler; the stream continues.
    #[error("section {section} out of range (last section {last})")]
    SectionOutOfRange { section: u8, last: u8 },

    /// A module lacks blocks at the requested version, or the assembled
    /// length disagrees with the size the DII declared.
    #[error("module {module_id} version {version} incomplete")]
    IncompleteModule { module_id: u16, version: u8 },

    /// A DII announced a module bigger than the configured limit.
    #[error("module {module_id} declares {declared} bytes (limit {limit})")]
    ModuleTooLarge {
        module_id: u16,
        declared: u32,
        limit: u32,
    },

    /// Inflation succeeded but produced the wrong number of bytes.
    #[error("inflated module is {actual} bytes, descriptor declared {expected}")]
    DecompressionMismatch { expected: u32, actual: usize },

    /// The compressed module payload could not be inflated at all.
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Sections arrived on a PID not classified as an object carousel.
    #[error("PID {0:#06x} not classified as an object carousel")]
    UnclassifiedPid(u16),
}
