//! Reference resolution and directory traversal over a service carousel.
//!
//! A navigator is a read-only view over the registry's current snapshot:
//! resolving may legitimately answer "not ready yet" (`Ok(None)`), which the
//! caller retries after more sections arrive. Nothing here blocks or waits.

use std::collections::HashSet;
use std::io::Read;

use bytes::Bytes;
use flate2::read::ZlibDecoder;

use dsmcc_biop::{
    BiopHeader, BiopMessage, BiopName, DirectoryMessage, Ior, ObjectKey, ObjectLocation, Tap,
};

use crate::control::{DiiMessage, DsiMessage, EnhancedBoot, ModuleInfo};
use crate::error::CarouselError;
use crate::reassembly::StreamReassembler;
use crate::registry::ServiceCarousel;
use crate::section::{message_id, UnMessageHeader};

/// Identity of a visited node during a directory walk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VisitKey {
    association_tag: u16,
    module_id: u16,
    object_key: ObjectKey,
}

/// Read-only resolver over one service's carousel state.
pub struct Navigator<'a> {
    carousel: &'a ServiceCarousel,
}

impl<'a> Navigator<'a> {
    pub(crate) fn new(carousel: &'a ServiceCarousel) -> Self {
        Self { carousel }
    }

    /// Resolve an object reference to its message.
    ///
    /// `Ok(None)` means the object is not resolvable *yet* (module or
    /// signalling still incomplete, or the key absent from the assembled
    /// module); errors are structural problems with the reference or the
    /// module bytes and abort only this resolution.
    pub fn resolve(&self, ior: &Ior) -> Result<Option<BiopMessage>, CarouselError> {
        let profile = ior.first_profile().ok_or(CarouselError::UnsupportedProfile)?;
        let (location, binder) = profile
            .location_and_binder()
            .ok_or(CarouselError::UnsupportedProfile)?;
        let tap = binder
            .delivery_tap()
            .ok_or(CarouselError::UnsupportedProfile)?;
        self.resolve_location(location, tap)
    }

    fn resolve_location(
        &self,
        location: &ObjectLocation,
        tap: &Tap,
    ) -> Result<Option<BiopMessage>, CarouselError> {
        let Some(dii) = self.find_dii(tap)? else {
            return Ok(None);
        };
        let Some(module) = dii.module(location.module_id) else {
            log::debug!("module {} not announced by DII yet", location.module_id);
            return Ok(None);
        };
        let Some(bytes) = self.module_bytes(module)? else {
            return Ok(None);
        };
        self.find_object(&bytes, location.module_id, &location.object_key)
    }

    /// Locate the DII a delivery tap points at.
    ///
    /// The selector's transaction id is masked to 16 bits; DSI/DII pairs may
    /// toggle the low bit between announcements, so when the exact id does
    /// not lead to a DII the lookup retries with bit 0 flipped.
    fn find_dii(&self, tap: &Tap) -> Result<Option<DiiMessage>, CarouselError> {
        let Some(stream) = self.carousel.stream_for_tag(tap.association_tag) else {
            log::debug!(
                "association tag {:#06x} not mapped to a stream yet",
                tap.association_tag
            );
            return Ok(None);
        };
        let Some(selector) = tap.selector else {
            log::debug!("delivery tap without selector on tag {:#06x}", tap.association_tag);
            return Ok(None);
        };
        let transaction = (selector.transaction_id & 0xFFFF) as u16;
        Ok(dii_at(stream, transaction).or_else(|| dii_at(stream, transaction ^ 0x0001)))
    }

    /// Assemble (and if needed inflate) the module a DII entry describes.
    fn module_bytes(&self, module: &ModuleInfo) -> Result<Option<Bytes>, CarouselError> {
        let Some(tap) = module.taps.first() else {
            log::debug!("module {} has no delivery tap", module.module_id);
            return Ok(None);
        };
        let Some(stream) = self.carousel.stream_for_tag(tap.association_tag) else {
            return Ok(None);
        };
        let limit = self.carousel.config().max_module_size;
        if module.module_size > limit {
            return Err(CarouselError::ModuleTooLarge {
                module_id: module.module_id,
                declared: module.module_size,
                limit,
            });
        }
        let assembled = match stream.assemble_module(
            module.module_id,
            module.module_version,
            Some(module.module_size as usize),
        ) {
            Ok(bytes) => bytes,
            Err(CarouselError::IncompleteModule { module_id, version }) => {
                log::debug!("module {module_id} v{version} not ready");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        match &module.compressed {
            Some(compressed) => inflate(&assembled, compressed.original_size).map(Some),
            None => Ok(Some(assembled)),
        }
    }

    /// Scan back-to-back BIOP messages for one object key.
    fn find_object(
        &self,
        module_bytes: &Bytes,
        module_id: u16,
        key: &ObjectKey,
    ) -> Result<Option<BiopMessage>, CarouselError> {
        let mut offset = 0;
        while offset < module_bytes.len() {
            let (header, _) = match BiopHeader::decode(module_bytes, offset) {
                Ok(decoded) => decoded,
                Err(e) => {
                    log::warn!("module {module_id}: scan stopped at offset {offset}: {e}");
                    break;
                }
            };
            if header.object_key == *key {
                let (message, _) = BiopMessage::decode(module_bytes, offset)?;
                return Ok(Some(message));
            }
            offset += header.span();
        }
        log::debug!("object key {key:?} not found in module {module_id}");
        Ok(None)
    }

    /// Resolve the service gateway.
    ///
    /// Boot entries with an enhanced (format 0x01) carousel identifier are
    /// tried first: the gateway module is looked up directly by module id
    /// and object key, no DSI involved. Otherwise the U-N groups are scanned
    /// for a DSI and its gateway IOR is resolved normally.
    pub fn service_gateway(&self) -> Result<Option<BiopMessage>, CarouselError> {
        for (tag, identifier) in self.carousel.boot_entries() {
            let Some(boot) = &identifier.enhanced else {
                continue;
            };
            match self.enhanced_gateway(tag, boot) {
                Ok(Some(message)) => return Ok(Some(message)),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("enhanced boot on tag {tag:#06x} failed: {e}");
                }
            }
        }

        for stream in self.carousel.streams() {
            for (transaction, group) in stream.un_groups() {
                let Some(payload) = group.latest() else {
                    continue;
                };
                let Ok((header, _)) = UnMessageHeader::decode(&payload, 0) else {
                    continue;
                };
                if header.message_id != message_id::DSI {
                    continue;
                }
                let dsi = match DsiMessage::decode(&payload) {
                    Ok(dsi) => dsi,
                    Err(e) => {
                        log::debug!("undecodable DSI at transaction {transaction:#06x}: {e}");
                        continue;
                    }
                };
                match self.resolve(&dsi.gateway_ior) {
                    Ok(Some(message)) => return Ok(Some(message)),
                    Ok(None) => {}
                    Err(e) => {
                        log::debug!("gateway reference not resolvable yet: {e}");
                    }
                }
            }
        }
        Ok(None)
    }

    fn enhanced_gateway(
        &self,
        association_tag: u16,
        boot: &EnhancedBoot,
    ) -> Result<Option<BiopMessage>, CarouselError> {
        let Some(stream) = self.carousel.stream_for_tag(association_tag) else {
            return Ok(None);
        };
        let assembled = match stream.assemble_module(
            boot.module_id,
            boot.module_version,
            Some(boot.module_size as usize),
        ) {
            Ok(bytes) => bytes,
            Err(CarouselError::IncompleteModule { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let bytes = if boot.compression_method != 0 {
            inflate(&assembled, boot.original_size)?
        } else {
            assembled
        };
        self.find_object(&bytes, boot.module_id, &boot.object_key)
    }

    /// Lazy child listing of a directory: names and references, nothing
    /// resolved.
    pub fn list_children<'m>(
        &self,
        directory: &'m DirectoryMessage,
    ) -> impl Iterator<Item = (&'m BiopName, &'m Ior)> {
        directory
            .bindings
            .iter()
            .map(|binding| (&binding.name, &binding.ior))
    }

    /// Depth-first walk from a root reference.
    ///
    /// The visitor receives each resolved node's path components and message.
    /// Cycle protection is per walk: a repeated (association tag, module id,
    /// object key) triple ends descent at that node without failing the
    /// walk. Unresolvable or malformed children are skipped with a log line.
    pub fn walk<F>(&self, root: &Ior, visit: &mut F)
    where
        F: FnMut(&[String], &BiopMessage),
    {
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        self.walk_ior(root, &mut path, &mut visited, 0, visit);
    }

    fn walk_ior<F>(
        &self,
        ior: &Ior,
        path: &mut Vec<String>,
        visited: &mut HashSet<VisitKey>,
        depth: usize,
        visit: &mut F,
    ) where
        F: FnMut(&[String], &BiopMessage),
    {
        if depth > self.carousel.config().max_walk_depth {
            log::warn!("walk depth limit reached at {path:?}");
            return;
        }
        let Some(profile) = ior.first_profile() else {
            return;
        };
        let Some((location, binder)) = profile.location_and_binder() else {
            log::debug!("skipping unresolvable reference at {path:?}");
            return;
        };
        let Some(tap) = binder.delivery_tap() else {
            return;
        };
        let key = VisitKey {
            association_tag: tap.association_tag,
            module_id: location.module_id,
            object_key: location.object_key.clone(),
        };
        if !visited.insert(key) {
            log::debug!("cycle at {path:?}, stopping descent");
            return;
        }
        let message = match self.resolve_location(location, tap) {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(e) => {
                log::warn!("skipping subtree at {path:?}: {e}");
                return;
            }
        };
        visit(path, &message);
        if let BiopMessage::Directory(directory) = &message {
            for binding in &directory.bindings {
                path.push(binding.name.display());
                self.walk_ior(&binding.ior, path, visited, depth + 1, visit);
                path.pop();
            }
        }
    }
}

/// Complete DII stored under one transaction id, if that is what the group
/// holds.
fn dii_at(stream: &StreamReassembler, transaction: u16) -> Option<DiiMessage> {
    let payload = stream.un_group(transaction)?.latest()?;
    let (header, _) = UnMessageHeader::decode(&payload, 0).ok()?;
    if header.message_id != message_id::DII {
        return None;
    }
    match DiiMessage::decode(&payload) {
        Ok(dii) => Some(dii),
        Err(e) => {
            log::debug!("undecodable DII at transaction {transaction:#06x}: {e}");
            None
        }
    }
}

/// Inflate a zlib-wrapped compressed module to its declared size.
fn inflate(data: &[u8], original_size: u32) -> Result<Bytes, CarouselError> {
    // The descriptor's size is wire-supplied; cap the pre-allocation and let
    // the decoder grow the buffer as real data arrives.
    let mut out = Vec::with_capacity((original_size as usize).min(1 << 20));
    let mut decoder = ZlibDecoder::new(data);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CarouselError::DecompressionFailed(e.to_string()))?;
    if out.len() != original_size as usize {
        return Err(CarouselError::DecompressionMismatch {
            expected: original_size,
            actual: out.len(),
        });
    }
    Ok(Bytes::from(out))
}
