//! Per-stream reassembly of DSM-CC sections into logical messages and
//! versioned modules.
//!
//! Sections arrive in arbitrary order, with gaps, duplicates and re-versioned
//! content. Storage here is idempotent for identical `(slot, version)` pairs
//! and monotonic: a stored version is never lost, newer versions chain next
//! to older ones rather than overwriting them. Completeness is a query, not
//! an event.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CarouselError;
use crate::section::{table_id, DownloadDataBlock, DsmccSection};

/// Slot-based store for one logical message (DSI/DII or a stream-descriptor
/// list). Each slot holds an arrival-ordered chain of payload versions.
#[derive(Debug, Clone, Default)]
pub struct MessageGroup {
    slots: Vec<Vec<Bytes>>,
}

impl MessageGroup {
    fn ensure_slots(&mut self, count: usize) {
        if self.slots.len() < count {
            self.slots.resize_with(count, Vec::new);
        }
    }

    fn add(&mut self, section_number: u8, last_section_number: u8, payload: Bytes) -> bool {
        self.ensure_slots(last_section_number as usize + 1);
        let slot = &mut self.slots[section_number as usize];
        if slot.iter().any(|existing| existing == &payload) {
            return false;
        }
        slot.push(payload);
        true
    }

    /// True once every declared slot holds at least one version.
    pub fn is_complete(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(|slot| !slot.is_empty())
    }

    /// Newest complete message: each slot's newest version, concatenated.
    pub fn latest(&self) -> Option<Bytes> {
        if !self.is_complete() {
            return None;
        }
        if self.slots.len() == 1 {
            return self.slots[0].last().cloned();
        }
        let mut out = BytesMut::new();
        for slot in &self.slots {
            out.put_slice(slot.last()?);
        }
        Some(out.freeze())
    }

    /// All stored versions of one slot, oldest first.
    pub fn slot_versions(&self, section_number: u8) -> &[Bytes] {
        self.slots
            .get(section_number as usize)
            .map(|slot| slot.as_slice())
            .unwrap_or(&[])
    }

    /// Length of the longest version chain.
    pub fn version_depth(&self) -> usize {
        self.slots.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// One stored block version.
#[derive(Debug, Clone)]
struct BlockVersion {
    version: u8,
    payload: Bytes,
}

/// Versioned block slots for one module id.
///
/// The slot array grows when a section or a DII declares more blocks; it
/// never shrinks. Each slot chains `(version, bytes)` pairs in arrival
/// order, so in-flight references against an old version keep resolving
/// after a newer one starts arriving.
#[derive(Debug, Clone, Default)]
pub struct ModuleGroup {
    slots: Vec<Vec<BlockVersion>>,
}

impl ModuleGroup {
    fn ensure_slots(&mut self, count: usize) {
        if self.slots.len() < count {
            self.slots.resize_with(count, Vec::new);
        }
    }

    /// Grow the slot array to at least `blocks` slots.
    pub(crate) fn grow_to(&mut self, blocks: usize) {
        self.ensure_slots(blocks);
    }

    fn add_block(
        &mut self,
        section_number: u8,
        last_section_number: u8,
        version: u8,
        payload: Bytes,
    ) -> bool {
        self.ensure_slots(last_section_number as usize + 1);
        let slot = &mut self.slots[section_number as usize];
        if let Some(existing) = slot.iter().find(|block| block.version == version) {
            if existing.payload != payload {
                log::debug!(
                    "conflicting payload for block {section_number} version {version}, keeping first"
                );
            }
            return false;
        }
        slot.push(BlockVersion { version, payload });
        true
    }

    /// Number of declared block slots.
    pub fn block_count(&self) -> usize {
        self.slots.len()
    }

    /// Distinct versions seen across all slots, ascending.
    pub fn versions(&self) -> Vec<u8> {
        let mut versions: Vec<u8> = Vec::new();
        for slot in &self.slots {
            for block in slot {
                if !versions.contains(&block.version) {
                    versions.push(block.version);
                }
            }
        }
        versions.sort_unstable();
        versions
    }

    /// True iff every slot holds the requested version.
    pub fn is_complete(&self, version: u8) -> bool {
        !self.slots.is_empty()
            && self
                .slots
                .iter()
                .all(|slot| slot.iter().any(|block| block.version == version))
    }

    /// Concatenate the requested version's blocks in slot order.
    ///
    /// Reads an immutable snapshot of the chains; a concurrent `add_block`
    /// on another group can never make this observe a half-updated module.
    fn assemble(&self, version: u8) -> Option<Bytes> {
        if !self.is_complete(version) {
            return None;
        }
        let mut out = BytesMut::new();
        for slot in &self.slots {
            let block = slot.iter().find(|block| block.version == version)?;
            out.put_slice(&block.payload);
        }
        Some(out.freeze())
    }
}

/// Reassembly state of one elementary stream (PID).
///
/// U-N groups are keyed by transaction id (the table id extension), DDB
/// groups by module id, stream-descriptor groups by event id.
#[derive(Debug, Clone)]
pub struct StreamReassembler {
    pid: u16,
    un_groups: HashMap<u16, MessageGroup>,
    module_groups: HashMap<u16, ModuleGroup>,
    descriptor_groups: HashMap<u16, MessageGroup>,
}

impl StreamReassembler {
    pub fn new(pid: u16) -> Self {
        Self {
            pid,
            un_groups: HashMap::new(),
            module_groups: HashMap::new(),
            descriptor_groups: HashMap::new(),
        }
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }

    /// Route one section into its group.
    ///
    /// Returns `Ok(true)` when new data was stored, `Ok(false)` for an
    /// idempotent re-delivery. A section number beyond the declared last is
    /// dropped with a warning (seen in malformed real-world streams), never
    /// fatal to the stream.
    pub fn push(&mut self, section: &DsmccSection) -> Result<bool, CarouselError> {
        if section.section_number > section.last_section_number {
            log::warn!(
                "PID {:#06x}: section {} beyond last section {}, dropping fragment",
                self.pid,
                section.section_number,
                section.last_section_number
            );
            return Err(CarouselError::SectionOutOfRange {
                section: section.section_number,
                last: section.last_section_number,
            });
        }

        match section.table_id {
            table_id::UN_MESSAGE => Ok(self
                .un_groups
                .entry(section.table_id_extension)
                .or_default()
                .add(
                    section.section_number,
                    section.last_section_number,
                    section.payload.clone(),
                )),
            table_id::DDB => {
                let (block, _) = DownloadDataBlock::decode(&section.payload, 0)?;
                Ok(self
                    .module_groups
                    .entry(section.table_id_extension)
                    .or_default()
                    .add_block(
                        section.section_number,
                        section.last_section_number,
                        block.module_version,
                        block.data,
                    ))
            }
            table_id::STREAM_DESCRIPTORS => Ok(self
                .descriptor_groups
                .entry(section.table_id_extension)
                .or_default()
                .add(
                    section.section_number,
                    section.last_section_number,
                    section.payload.clone(),
                )),
            other => {
                log::debug!("PID {:#06x}: ignoring table id {other:#04x}", self.pid);
                Ok(false)
            }
        }
    }

    /// U-N message group for one transaction id.
    pub fn un_group(&self, transaction_id: u16) -> Option<&MessageGroup> {
        self.un_groups.get(&transaction_id)
    }

    /// All U-N groups, for DSI scans.
    pub fn un_groups(&self) -> impl Iterator<Item = (u16, &MessageGroup)> {
        self.un_groups.iter().map(|(&id, group)| (id, group))
    }

    /// DDB group for one module id.
    pub fn module_group(&self, module_id: u16) -> Option<&ModuleGroup> {
        self.module_groups.get(&module_id)
    }

    /// Module ids with any stored blocks or declared slots.
    pub fn module_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.module_groups.keys().copied()
    }

    /// Stream-descriptor group for one event id.
    pub fn descriptor_group(&self, event_id: u16) -> Option<&MessageGroup> {
        self.descriptor_groups.get(&event_id)
    }

    pub(crate) fn grow_module(&mut self, module_id: u16, blocks: usize) {
        self.module_groups
            .entry(module_id)
            .or_default()
            .grow_to(blocks);
    }

    /// Assemble a module at one version, checking the DII-declared size.
    pub fn assemble_module(
        &self,
        module_id: u16,
        version: u8,
        declared_size: Option<usize>,
    ) -> Result<Bytes, CarouselError> {
        let incomplete = CarouselError::IncompleteModule { module_id, version };
        let group = self.module_groups.get(&module_id).ok_or(incomplete.clone())?;
        let assembled = group.assemble(version).ok_or(incomplete.clone())?;
        if let Some(expected) = declared_size {
            if assembled.len() != expected {
                log::warn!(
                    "PID {:#06x}: module {module_id} v{version} assembled to {} bytes, DII declared {expected}",
                    self.pid,
                    assembled.len()
                );
                return Err(incomplete);
            }
        }
        Ok(assembled)
    }
}
