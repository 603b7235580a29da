//! Control-message decoding: DSI (bootstrap), DII (module announcements)
//! and the two signalling descriptors this engine consumes.

use bytes::Bytes;
use dsmcc_biop::{decode_ior, decode_tap, Ior, ObjectKey, Reader, Tap};

use crate::error::CarouselError;
use crate::section::{message_id, UnMessageHeader};

/// Descriptor tags understood by the engine.
pub mod descriptor_tag {
    /// Compressed module descriptor (inside DII module user info).
    pub const COMPRESSED_MODULE: u8 = 0x09;
    /// Carousel identifier descriptor (from PMT analysis).
    pub const CAROUSEL_IDENTIFIER: u8 = 0x13;
    /// Data broadcast id descriptor (from PMT analysis).
    pub const DATA_BROADCAST_ID: u8 = 0x66;
}

/// DownloadServerInitiate: the carousel bootstrap carrying the service
/// gateway's IOR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsiMessage {
    pub transaction_id: u32,
    pub server_id: [u8; 20],
    pub gateway_ior: Ior,
}

impl DsiMessage {
    /// Decode a DSI from a complete U-N message payload.
    pub fn decode(payload: &Bytes) -> Result<Self, CarouselError> {
        let (header, head_len) = UnMessageHeader::decode(payload, 0)?;
        if header.message_id != message_id::DSI {
            return Err(CarouselError::UnexpectedMessageId {
                expected: message_id::DSI,
                actual: header.message_id,
            });
        }
        let mut r = Reader::new(payload, head_len);
        let server_id = r.array::<20>()?;
        let compatibility_length = r.u16()? as usize;
        r.skip(compatibility_length)?;
        let _private_data_length = r.u16()?;
        let (gateway_ior, _) = decode_ior(payload, r.pos())?;
        // Download taps, service contexts and user info follow; nothing
        // beyond the gateway reference is needed here.
        Ok(DsiMessage {
            transaction_id: header.transaction_id,
            server_id,
            gateway_ior,
        })
    }
}

/// Compressed-module descriptor contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedModule {
    pub compression_method: u8,
    pub original_size: u32,
}

/// One module announced by a DII.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub module_id: u16,
    pub module_size: u32,
    pub module_version: u8,
    pub module_timeout: u32,
    pub block_timeout: u32,
    pub min_block_time: u32,
    /// Delivery taps; the first one names the stream carrying the blocks.
    pub taps: Vec<Tap>,
    /// Raw user-info descriptor loop.
    pub user_info: Bytes,
    /// Parsed compressed-module descriptor, when present in the user info.
    pub compressed: Option<CompressedModule>,
}

/// DownloadInfoIndication: announces module ids, sizes, versions and
/// locations for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiiMessage {
    pub transaction_id: u32,
    pub download_id: u32,
    pub block_size: u16,
    pub modules: Vec<ModuleInfo>,
}

impl DiiMessage {
    /// Decode a DII from a complete U-N message payload.
    pub fn decode(payload: &Bytes) -> Result<Self, CarouselError> {
        let (header, head_len) = UnMessageHeader::decode(payload, 0)?;
        if header.message_id != message_id::DII {
            return Err(CarouselError::UnexpectedMessageId {
                expected: message_id::DII,
                actual: header.message_id,
            });
        }
        let mut r = Reader::new(payload, head_len);
        let download_id = r.u32()?;
        let block_size = r.u16()?;
        let _window_size = r.u8()?;
        let _ack_period = r.u8()?;
        let _t_c_download_window = r.u32()?;
        let _t_c_download_scenario = r.u32()?;
        let compatibility_length = r.u16()? as usize;
        r.skip(compatibility_length)?;

        let module_count = r.u16()? as usize;
        let mut modules = Vec::with_capacity(module_count);
        for _ in 0..module_count {
            let module_id = r.u16()?;
            let module_size = r.u32()?;
            let module_version = r.u8()?;
            let info_length = r.u8()? as usize;
            let info = r.take(info_length)?;
            modules.push(decode_module_info(
                module_id,
                module_size,
                module_version,
                &info,
            ));
        }
        let _private_data_length = r.u16().unwrap_or(0);

        Ok(DiiMessage {
            transaction_id: header.transaction_id,
            download_id,
            block_size,
            modules,
        })
    }

    /// Module entry by id.
    pub fn module(&self, module_id: u16) -> Option<&ModuleInfo> {
        self.modules.iter().find(|m| m.module_id == module_id)
    }

    /// Number of blocks a module occupies at this DII's block size.
    pub fn blocks_for(&self, module: &ModuleInfo) -> usize {
        if self.block_size == 0 {
            return if module.module_size == 0 { 0 } else { 1 };
        }
        module.module_size.div_ceil(self.block_size as u32) as usize
    }
}

/// Decode one module's BIOP::ModuleInfo.
///
/// Real muxes occasionally ship module info this engine cannot parse; that
/// yields an entry with no taps rather than failing the whole DII.
fn decode_module_info(
    module_id: u16,
    module_size: u32,
    module_version: u8,
    info: &Bytes,
) -> ModuleInfo {
    let mut module = ModuleInfo {
        module_id,
        module_size,
        module_version,
        module_timeout: 0,
        block_timeout: 0,
        min_block_time: 0,
        taps: Vec::new(),
        user_info: Bytes::new(),
        compressed: None,
    };

    let parsed: Result<(), dsmcc_biop::BiopError> = (|| {
        let mut r = Reader::new(info, 0);
        module.module_timeout = r.u32()?;
        module.block_timeout = r.u32()?;
        module.min_block_time = r.u32()?;
        let taps_count = r.u8()? as usize;
        for _ in 0..taps_count {
            let (tap, consumed) = decode_tap(info, r.pos())?;
            r.skip(consumed)?;
            module.taps.push(tap);
        }
        let user_info_length = r.u8()? as usize;
        module.user_info = r.take(user_info_length)?;
        Ok(())
    })();
    if let Err(e) = parsed {
        log::debug!("module {module_id}: unparsable module info ({e})");
    }

    if let Some(data) = find_descriptor(&module.user_info, descriptor_tag::COMPRESSED_MODULE) {
        if data.len() >= 5 {
            module.compressed = Some(CompressedModule {
                compression_method: data[0],
                original_size: ((data[1] as u32) << 24)
                    | ((data[2] as u32) << 16)
                    | ((data[3] as u32) << 8)
                    | data[4] as u32,
            });
        }
    }
    module
}

/// Enhanced-boot parameters of a format 0x01 carousel identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedBoot {
    pub module_version: u8,
    pub module_id: u16,
    pub block_size: u16,
    pub module_size: u32,
    pub compression_method: u8,
    pub original_size: u32,
    pub timeout: u8,
    pub object_key: ObjectKey,
}

/// Carousel identifier descriptor, supplied by PMT analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselIdentifier {
    pub carousel_id: u32,
    pub format_id: u8,
    /// Present when the format id is 0x01: the service gateway can be
    /// located directly without a DSI.
    pub enhanced: Option<EnhancedBoot>,
}

impl CarouselIdentifier {
    /// Decode from the descriptor payload (tag and length already stripped).
    pub fn decode(data: &Bytes) -> Result<Self, CarouselError> {
        let mut r = Reader::new(data, 0);
        let carousel_id = r.u32()?;
        let format_id = r.u8()?;
        let enhanced = if format_id == 0x01 {
            let module_version = r.u8()?;
            let module_id = r.u16()?;
            let block_size = r.u16()?;
            let module_size = r.u32()?;
            let compression_method = r.u8()?;
            let original_size = r.u32()?;
            let timeout = r.u8()?;
            let key_length = r.u8()? as usize;
            let object_key = ObjectKey::new(r.take(key_length)?.to_vec());
            Some(EnhancedBoot {
                module_version,
                module_id,
                block_size,
                module_size,
                compression_method,
                original_size,
                timeout,
                object_key,
            })
        } else {
            None
        };
        Ok(CarouselIdentifier {
            carousel_id,
            format_id,
            enhanced,
        })
    }
}

/// Find a specific descriptor in a descriptor loop.
pub fn find_descriptor(data: &[u8], tag: u8) -> Option<&[u8]> {
    let mut offset = 0;
    while offset + 2 <= data.len() {
        let t = data[offset];
        let length = data[offset + 1] as usize;
        offset += 2;
        if offset + length > data.len() {
            break;
        }
        if t == tag {
            return Some(&data[offset..offset + length]);
        }
        offset += length;
    }
    None
}
