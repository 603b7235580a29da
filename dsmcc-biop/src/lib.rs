//! BIOP/IOR wire-format decoders for DSM-CC object carousels
//! (ISO/IEC 13818-6, ETSI TS 102 809).
//!
//! This crate is the pure, stateless half of carousel reconstruction: it
//! turns module and control-message bytes into typed object references and
//! messages, and nothing else. Reassembly, stream registries and reference
//! resolution live in the companion engine crate.
//!
//! # Decoded structures
//! - [`Ior`] — interoperable object reference: type id plus tagged profiles
//!   of lite components ([`ObjectLocation`], [`ConnBinder`])
//! - [`Tap`] — delivery channel (association tag, optional transaction id)
//! - [`BiopName`] — (id, kind) string-pair sequence naming directory entries
//! - [`BiopMessage`] — directory / service gateway, file, stream event
//!
//! All multi-byte integers are big-endian. Every decoder takes a shared
//! buffer and an offset and returns the decoded value with its consumed byte
//! count; declared lengths are validated against the buffer and a violation
//! is a [`BiopError::TruncatedInput`] fatal to that single call only.
//!
//! # Example
//! ```
//! use bytes::Bytes;
//! use dsmcc_biop::{decode_tap, tap_use};
//!
//! let buf = Bytes::from_static(&[
//!     0x00, 0x01, 0x00, 0x16, 0x00, 0xAB, 0x0A, // id, use, assoc, sel_len
//!     0x00, 0x01, 0x00, 0x00, 0x01, 0x02, 0x00, 0x00, 0xFF, 0xFF,
//! ]);
//! let (tap, consumed) = decode_tap(&buf, 0).unwrap();
//! assert_eq!(consumed, 17);
//! assert_eq!(tap.use_code, tap_use::BIOP_DELIVERY_PARA_USE);
//! assert_eq!(tap.transaction_id(), Some(0x0102));
//! ```

pub mod error;
pub mod ior;
pub mod message;
pub mod name;
pub mod reader;
pub mod tap;
pub mod types;

#[cfg(test)]
pub(crate) mod encode;

pub use error::BiopError;
pub use ior::{
    component_tag, decode_ior, profile_tag, ConnBinder, Ior, LiteComponent, ObjectLocation,
    TaggedProfile,
};
pub use message::{
    Binding, BindingType, BiopHeader, BiopMessage, DirectoryMessage, FileMessage, ServiceContext,
    StreamEventMessage, StreamInfo, FIXED_HEADER_SIZE,
};
pub use name::{decode_biop_name, BiopName, NameComponent};
pub use reader::Reader;
pub use tap::{decode_tap, tap_use, Tap, TapSelector};
pub use types::{object_kind, ObjectKey, ObjectKind, BIOP_MAGIC};
