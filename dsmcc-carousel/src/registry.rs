//! Session-scoped registry grouping streams into per-service carousels.
//!
//! One [`CarouselRegistry`] value exists per capture/session and is passed by
//! reference to all decode and resolve calls; there is no global state. PID
//! classification and the service/association metadata come from external
//! PMT analysis.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::control::{CarouselIdentifier, DiiMessage};
use crate::error::CarouselError;
use crate::navigator::Navigator;
use crate::reassembly::StreamReassembler;
use crate::section::{message_id, table_id, DsmccSection, UnMessageHeader};

/// Data-broadcast classification of a PID, derived from the data broadcast
/// id descriptor during PMT analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataBroadcastKind {
    /// No classification signalling seen yet.
    #[default]
    Unknown,
    /// DVB object carousel.
    ObjectCarousel,
    /// System software update carousel.
    Ssu,
    /// Some other data broadcast.
    Other,
}

impl DataBroadcastKind {
    /// Classify a data broadcast id value.
    pub fn from_data_broadcast_id(id: u16) -> Self {
        match id {
            0x0007 | 0x00F0 => DataBroadcastKind::ObjectCarousel,
            0x000A => DataBroadcastKind::Ssu,
            _ => DataBroadcastKind::Other,
        }
    }
}

/// Engine limits, one value per session.
#[derive(Debug, Clone)]
pub struct CarouselConfig {
    /// Reject DII module entries declaring more bytes than this.
    pub max_module_size: u32,
    /// Tree-walk depth guard, independent of cycle detection.
    pub max_walk_depth: usize,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            max_module_size: 64 << 20,
            max_walk_depth: 64,
        }
    }
}

/// Completeness snapshot of one module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub module_id: u16,
    pub blocks: usize,
    pub versions: Vec<u8>,
    pub complete_versions: Vec<u8>,
}

/// Snapshot of one stream's reassembly state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSummary {
    pub pid: u16,
    pub modules: Vec<ModuleStatus>,
}

/// Serializable snapshot of a service's carousel state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselSummary {
    pub service_id: u16,
    pub streams: Vec<StreamSummary>,
}

/// All carousel state of one broadcast service.
///
/// Created when the demultiplexer first attributes an object-carousel PID to
/// the service; mutated incrementally as signalling arrives; lives as long
/// as the session.
#[derive(Debug)]
pub struct ServiceCarousel {
    service_id: u16,
    config: CarouselConfig,
    streams: HashMap<u16, StreamReassembler>,
    assoc_to_pid: HashMap<u16, u16>,
    boot: HashMap<u16, CarouselIdentifier>,
}

impl ServiceCarousel {
    fn new(service_id: u16, config: CarouselConfig) -> Self {
        Self {
            service_id,
            config,
            streams: HashMap::new(),
            assoc_to_pid: HashMap::new(),
            boot: HashMap::new(),
        }
    }

    pub fn service_id(&self) -> u16 {
        self.service_id
    }

    pub(crate) fn config(&self) -> &CarouselConfig {
        &self.config
    }

    /// Reassembler of one PID.
    pub fn stream(&self, pid: u16) -> Option<&StreamReassembler> {
        self.streams.get(&pid)
    }

    /// All reassemblers of this service.
    pub fn streams(&self) -> impl Iterator<Item = &StreamReassembler> {
        self.streams.values()
    }

    /// Reassembler reached through an association tag.
    pub fn stream_for_tag(&self, association_tag: u16) -> Option<&StreamReassembler> {
        let pid = self.assoc_to_pid.get(&association_tag)?;
        self.streams.get(pid)
    }

    /// Boot entry points: association tag → carousel identifier.
    pub fn boot_entries(&self) -> impl Iterator<Item = (u16, &CarouselIdentifier)> {
        self.boot.iter().map(|(&tag, ident)| (tag, ident))
    }

    /// Read-only navigator over the current snapshot.
    pub fn navigator(&self) -> Navigator<'_> {
        Navigator::new(self)
    }

    fn attach(&mut self, pid: u16, association_tag: u16, identifier: Option<CarouselIdentifier>) {
        self.assoc_to_pid.insert(association_tag, pid);
        self.streams
            .entry(pid)
            .or_insert_with(|| StreamReassembler::new(pid));
        if let Some(identifier) = identifier {
            self.boot.insert(association_tag, identifier);
        }
    }

    fn push_section(&mut self, section: &DsmccSection) -> Result<bool, CarouselError> {
        let stream = self
            .streams
            .entry(section.pid)
            .or_insert_with(|| StreamReassembler::new(section.pid));
        let stored = stream.push(section)?;
        if stored && section.table_id == table_id::UN_MESSAGE {
            self.apply_un_update(section.pid, section.table_id_extension);
        }
        Ok(stored)
    }

    /// When a complete DII lands, pre-size the announced modules' block
    /// arrays on the streams their taps point at.
    fn apply_un_update(&mut self, pid: u16, transaction_id: u16) {
        let Some(payload) = self
            .streams
            .get(&pid)
            .and_then(|stream| stream.un_group(transaction_id))
            .and_then(|group| group.latest())
        else {
            return;
        };
        let Ok((header, _)) = UnMessageHeader::decode(&payload, 0) else {
            return;
        };
        if header.message_id != message_id::DII {
            return;
        }
        let dii = match DiiMessage::decode(&payload) {
            Ok(dii) => dii,
            Err(e) => {
                log::debug!("service {}: undecodable DII: {e}", self.service_id);
                return;
            }
        };
        for module in &dii.modules {
            if module.module_size > self.config.max_module_size {
                log::warn!(
                    "service {}: module {} declares {} bytes (limit {}), ignoring",
                    self.service_id,
                    module.module_id,
                    module.module_size,
                    self.config.max_module_size
                );
                continue;
            }
            let blocks = dii.blocks_for(module);
            let Some(tap) = module.taps.first() else {
                continue;
            };
            let Some(&module_pid) = self.assoc_to_pid.get(&tap.association_tag) else {
                continue;
            };
            if let Some(stream) = self.streams.get_mut(&module_pid) {
                stream.grow_module(module.module_id, blocks);
            }
        }
    }

    /// Completeness snapshot for export or inspection.
    pub fn summary(&self) -> CarouselSummary {
        let mut streams: Vec<StreamSummary> = self
            .streams
            .values()
            .map(|stream| {
                let mut modules: Vec<ModuleStatus> = stream
                    .module_ids()
                    .filter_map(|module_id| {
                        let group = stream.module_group(module_id)?;
                        let versions = group.versions();
                        let complete_versions = versions
                            .iter()
                            .copied()
                            .filter(|&v| group.is_complete(v))
                            .collect();
                        Some(ModuleStatus {
                            module_id,
                            blocks: group.block_count(),
                            versions,
                            complete_versions,
                        })
                    })
                    .collect();
                modules.sort_by_key(|m| m.module_id);
                StreamSummary {
                    pid: stream.pid(),
                    modules,
                }
            })
            .collect();
        streams.sort_by_key(|s| s.pid);
        CarouselSummary {
            service_id: self.service_id,
            streams,
        }
    }
}

/// Registry of every service's carousel state for one session.
#[derive(Debug, Default)]
pub struct CarouselRegistry {
    config: CarouselConfig,
    services: HashMap<u16, ServiceCarousel>,
    pid_service: HashMap<u16, u16>,
    pid_kind: HashMap<u16, DataBroadcastKind>,
}

impl CarouselRegistry {
    pub fn new(config: CarouselConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Record a PID's data-broadcast classification from PMT analysis.
    pub fn classify_pid(&mut self, pid: u16, kind: DataBroadcastKind) {
        self.pid_kind.insert(pid, kind);
    }

    /// Current classification of a PID.
    pub fn classification(&self, pid: u16) -> DataBroadcastKind {
        self.pid_kind.get(&pid).copied().unwrap_or_default()
    }

    /// Attribute a PID and association tag to a service, creating the
    /// service's carousel on first sight.
    pub fn attach_stream(
        &mut self,
        service_id: u16,
        pid: u16,
        association_tag: u16,
        identifier: Option<CarouselIdentifier>,
    ) {
        self.pid_service.insert(pid, service_id);
        let config = self.config.clone();
        self.services
            .entry(service_id)
            .or_insert_with(|| ServiceCarousel::new(service_id, config))
            .attach(pid, association_tag, identifier);
    }

    /// Route one demultiplexed section into its service's reassembly state.
    ///
    /// Sections on PIDs that are unclassified or not object carousels are
    /// rejected with a logged warning, never fatally.
    pub fn push_section(&mut self, section: &DsmccSection) -> Result<bool, CarouselError> {
        match self.classification(section.pid) {
            DataBroadcastKind::ObjectCarousel => {}
            kind => {
                log::warn!(
                    "PID {:#06x} carries DSM-CC sections but is classified {kind:?}, dropping",
                    section.pid
                );
                return Err(CarouselError::UnclassifiedPid(section.pid));
            }
        }
        let Some(&service_id) = self.pid_service.get(&section.pid) else {
            log::warn!(
                "PID {:#06x} not attributed to any service, dropping section",
                section.pid
            );
            return Err(CarouselError::UnclassifiedPid(section.pid));
        };
        let Some(service) = self.services.get_mut(&service_id) else {
            return Err(CarouselError::UnclassifiedPid(section.pid));
        };
        service.push_section(section)
    }

    /// Carousel state of one service.
    pub fn service(&self, service_id: u16) -> Option<&ServiceCarousel> {
        self.services.get(&service_id)
    }

    /// All known services.
    pub fn services(&self) -> impl Iterator<Item = &ServiceCarousel> {
        self.services.values()
    }

    /// Snapshot of every service, sorted by service id.
    pub fn summary(&self) -> Vec<CarouselSummary> {
        let mut summaries: Vec<CarouselSummary> =
            self.services.values().map(ServiceCarousel::summary).collect();
        summaries.sort_by_key(|s| s.service_id);
        summaries
    }
}
