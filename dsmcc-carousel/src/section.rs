//! DSM-CC section model and the fixed message heads shared by control and
//! data messages.
//!
//! The upstream demultiplexer delivers already-extracted section payloads
//! (CRC validated, 8-byte section header stripped) together with their
//! stream identity. This module defines that input contract and decodes the
//! DSM-CC message heads found inside the payloads.

use bytes::Bytes;
use dsmcc_biop::{BiopError, Reader};

/// Table ids carrying DSM-CC sections.
pub mod table_id {
    /// U-N control messages (DSI / DII).
    pub const UN_MESSAGE: u8 = 0x3B;
    /// Download Data Messages (DDB).
    pub const DDB: u8 = 0x3C;
    /// Stream descriptor lists (stream events).
    pub const STREAM_DESCRIPTORS: u8 = 0x3D;
}

/// Message ids inside U-N message heads.
pub mod message_id {
    /// DownloadInfoIndication.
    pub const DII: u16 = 0x1002;
    /// DownloadDataBlock.
    pub const DDB: u16 = 0x1003;
    /// DownloadServerInitiate.
    pub const DSI: u16 = 0x1006;
}

/// Protocol discriminator of MPEG-2 DSM-CC messages.
pub const PROTOCOL_DISCRIMINATOR: u8 = 0x11;

/// One demultiplexed section as delivered by the external demultiplexer.
///
/// DSI and DII sections use the transaction id as `table_id_extension`; DDB
/// sections the module id; stream-descriptor sections the event id.
#[derive(Debug, Clone)]
pub struct DsmccSection {
    pub pid: u16,
    pub table_id: u8,
    pub table_id_extension: u16,
    pub section_number: u8,
    pub last_section_number: u8,
    pub payload: Bytes,
}

/// Fixed head of a U-N control message (DSI/DII).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnMessageHeader {
    pub protocol_discriminator: u8,
    pub dsmcc_type: u8,
    pub message_id: u16,
    pub transaction_id: u32,
    pub adaptation_length: u8,
    /// Length of everything after this field, adaptation included.
    pub message_length: u16,
}

impl UnMessageHeader {
    /// Decode the head at `offset`. The consumed count includes the
    /// adaptation field, so the message body starts right after it.
    pub fn decode(buf: &Bytes, offset: usize) -> Result<(Self, usize), BiopError> {
        let mut r = Reader::new(buf, offset);
        let protocol_discriminator = r.u8()?;
        let dsmcc_type = r.u8()?;
        let message_id = r.u16()?;
        let transaction_id = r.u32()?;
        let _reserved = r.u8()?;
        let adaptation_length = r.u8()?;
        let message_length = r.u16()?;
        r.skip(adaptation_length as usize)?;
        Ok((
            UnMessageHeader {
                protocol_discriminator,
                dsmcc_type,
                message_id,
                transaction_id,
                adaptation_length,
                message_length,
            },
            r.consumed(),
        ))
    }

    /// Body length: declared message length minus the adaptation field.
    pub fn body_length(&self) -> usize {
        (self.message_length as usize).saturating_sub(self.adaptation_length as usize)
    }
}

/// A decoded DownloadDataBlock: the head plus one block of module bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDataBlock {
    pub download_id: u32,
    pub module_id: u16,
    pub module_version: u8,
    pub block_number: u16,
    /// Block payload, a window into the section bytes.
    pub data: Bytes,
}

impl DownloadDataBlock {
    /// Decode a DDB at `offset`. The head mirrors the U-N shape with
    /// `download_id` in place of the transaction id; the block data spans
    /// `message_length - adaptation_length - 6` bytes.
    pub fn decode(buf: &Bytes, offset: usize) -> Result<(Self, usize), BiopError> {
        let mut r = Reader::new(buf, offset);
        let _protocol_discriminator = r.u8()?;
        let _dsmcc_type = r.u8()?;
        let _message_id = r.u16()?;
        let download_id = r.u32()?;
        let _reserved = r.u8()?;
        let adaptation_length = r.u8()?;
        let message_length = r.u16()?;
        r.skip(adaptation_length as usize)?;

        let module_id = r.u16()?;
        let module_version = r.u8()?;
        let _reserved2 = r.u8()?;
        let block_number = r.u16()?;

        let body = (message_length as usize).saturating_sub(adaptation_length as usize);
        let data_length = body.checked_sub(6).ok_or(BiopError::TruncatedInput {
            offset: r.pos(),
            needed: 6,
            remaining: body,
        })?;
        let data = r.take(data_length)?;

        Ok((
            DownloadDataBlock {
                download_id,
                module_id,
                module_version,
                block_number,
                data,
            },
            r.consumed(),
        ))
    }
}
