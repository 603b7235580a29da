//! DSM-CC object carousel reassembly and navigation engine
//! (ISO/IEC 13818-6, ETSI TS 102 809).
//!
//! Given demultiplexed broadcast sections plus their stream identity, this
//! crate reconstructs the carousel's virtual filesystem: it reassembles
//! multi-section control messages (DSI, DII) and versioned module blocks
//! (DDB) delivered out of order across one or more elementary streams, and
//! resolves chains of object references into an in-memory object graph of
//! directories, files and stream events.
//!
//! # Layers
//! - [`section`] — the input contract and DSM-CC message heads
//! - [`control`] — DSI/DII decoding and the consumed signalling descriptors
//! - [`reassembly`] — per-PID slot stores with version chains
//! - [`registry`] — session-scoped grouping of streams into service carousels
//! - [`navigator`] — IOR resolution, gateway boot, cycle-safe tree walks
//!
//! # Usage
//! ```ignore
//! use dsmcc_carousel::{CarouselConfig, CarouselRegistry, DataBroadcastKind};
//!
//! let mut registry = CarouselRegistry::new(CarouselConfig::default());
//! registry.classify_pid(0x0100, DataBroadcastKind::ObjectCarousel);
//! registry.attach_stream(service_id, 0x0100, association_tag, None);
//!
//! for section in demux {
//!     let _ = registry.push_section(&section);
//!     if let Some(service) = registry.service(service_id) {
//!         if let Ok(Some(gateway)) = service.navigator().service_gateway() {
//!             // walk the tree, save files, ...
//!         }
//!     }
//! }
//! ```
//!
//! Section delivery is push-based and may repeat, reorder or re-version
//! fragments; all mutating entry points are idempotent for identical data
//! and never lose a stored version. Completeness is a query, not an event:
//! resolution returns `Ok(None)` while data is still missing and the caller
//! retries after more sections arrive.

pub mod control;
pub mod error;
pub mod navigator;
pub mod reassembly;
pub mod registry;
pub mod section;

pub use control::{
    descriptor_tag, find_descriptor, CarouselIdentifier, CompressedModule, DiiMessage, DsiMessage,
    EnhancedBoot, ModuleInfo,
};
pub use error::CarouselError;
pub use navigator::Navigator;
pub use reassembly::{MessageGroup, ModuleGroup, StreamReassembler};
pub use registry::{
    CarouselConfig, CarouselRegistry, CarouselSummary, DataBroadcastKind, ModuleStatus,
    ServiceCarousel, StreamSummary,
};
pub use section::{
    message_id, table_id, DownloadDataBlock, DsmccSection, UnMessageHeader,
    PROTOCOL_DISCRIMINATOR,
};

// The wire-format types callers meet at this crate's API surface.
pub use dsmcc_biop::{BiopMessage, Ior, ObjectKey, ObjectKind};
