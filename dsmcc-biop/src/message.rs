//! BIOP message decoding.
//!
//! A module's payload is a sequence of back-to-back BIOP messages. Every
//! message shares one header shape; the 4-byte object kind in the header
//! selects the body variant (directory / service gateway, file, stream /
//! stream event). The header alone is enough to skip a message, so unknown
//! kinds never derail a module scan.

use bytes::Bytes;

use crate::error::BiopError;
use crate::ior::{decode_ior, Ior};
use crate::name::{decode_biop_name, BiopName};
use crate::reader::Reader;
use crate::tap::{decode_tap, Tap};
use crate::types::{ObjectKey, ObjectKind, BIOP_MAGIC};

/// Fixed part of the header: magic, versions, byte order, message type and
/// the message size field itself. `message_size` counts everything after it.
pub const FIXED_HEADER_SIZE: usize = 12;

/// Decoded BIOP message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiopHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub byte_order: u8,
    pub message_type: u8,
    pub message_size: u32,
    pub object_key: ObjectKey,
    /// Raw 4-byte object kind code.
    pub object_kind: [u8; 4],
    /// Opaque object info bytes; files carry their content-size hint here,
    /// stream events their timing info.
    pub object_info: Bytes,
}

impl BiopHeader {
    /// Decode a header at `offset`. Returns the header and the bytes it
    /// occupies (fixed part plus the variable key/kind/info fields).
    pub fn decode(buf: &Bytes, offset: usize) -> Result<(Self, usize), BiopError> {
        let mut r = Reader::new(buf, offset);
        let magic = r.array::<4>()?;
        if magic != BIOP_MAGIC {
            return Err(BiopError::InvalidMagic(magic));
        }
        let version_major = r.u8()?;
        let version_minor = r.u8()?;
        let byte_order = r.u8()?;
        let message_type = r.u8()?;
        let message_size = r.u32()?;

        let key_length = r.u8()? as usize;
        let object_key = ObjectKey::new(r.take(key_length)?.to_vec());

        let kind_length = r.u32()? as usize;
        let kind_bytes = r.take(kind_length)?;
        let mut object_kind = [0u8; 4];
        for (dst, src) in object_kind.iter_mut().zip(kind_bytes.iter()) {
            *dst = *src;
        }
        if kind_length != 4 {
            log::debug!("object kind length {kind_length} (expected 4)");
        }

        let info_length = r.u16()? as usize;
        let object_info = r.take(info_length)?;

        let consumed = r.consumed();
        let header = BiopHeader {
            version_major,
            version_minor,
            byte_order,
            message_type,
            message_size,
            object_key,
            object_kind,
            object_info,
        };
        if header.span() < consumed {
            return Err(BiopError::MessageSizeMismatch {
                declared: message_size,
                minimum: consumed - FIXED_HEADER_SIZE,
            });
        }
        Ok((header, consumed))
    }

    /// Known object kind, if any.
    pub fn kind(&self) -> Option<ObjectKind> {
        ObjectKind::from_bytes(self.object_kind)
    }

    /// Total byte span of the whole message, for skipping to the next one.
    pub fn span(&self) -> usize {
        FIXED_HEADER_SIZE + self.message_size as usize
    }
}

/// One service-context entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContext {
    pub context_id: u32,
    pub data: Bytes,
}

/// Binding type of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    /// Binds an object (leaf or sub-directory message).
    Object,
    /// Binds a naming context.
    Context,
    /// Unrecognized value, kept verbatim.
    Other(u8),
}

impl From<u8> for BindingType {
    fn from(value: u8) -> Self {
        match value {
            1 => BindingType::Object,
            2 => BindingType::Context,
            other => BindingType::Other(other),
        }
    }
}

/// One name → IOR binding of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: BiopName,
    pub binding_type: BindingType,
    pub ior: Ior,
    pub object_info: Bytes,
}

/// Directory or service gateway message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMessage {
    pub header: BiopHeader,
    pub service_contexts: Vec<ServiceContext>,
    pub bindings: Vec<Binding>,
}

/// File message. `content` is a window into the decoded buffer, not a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMessage {
    pub header: BiopHeader,
    pub service_contexts: Vec<ServiceContext>,
    /// 8-byte content-size hint from the object info, when present.
    pub content_size_hint: Option<u64>,
    pub content: Bytes,
}

/// Timing and media-presence info of a stream or stream-event object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamInfo {
    pub description: Vec<u8>,
    pub duration_seconds: u32,
    /// 32 bits on the wire, matching real broadcasts (the standard's prose
    /// says 16, observed muxes disagree).
    pub duration_microseconds: u32,
    pub audio: u8,
    pub video: u8,
    pub data: u8,
}

/// Stream or stream-event message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEventMessage {
    pub header: BiopHeader,
    pub service_contexts: Vec<ServiceContext>,
    pub info: StreamInfo,
    pub event_names: Vec<Vec<u8>>,
    pub taps: Vec<Tap>,
    pub event_ids: Vec<u16>,
}

/// A decoded BIOP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiopMessage {
    Directory(DirectoryMessage),
    File(FileMessage),
    StreamEvent(StreamEventMessage),
}

impl BiopMessage {
    /// Decode one message at `offset`. The returned consumed count is the
    /// full message span (`FIXED_HEADER_SIZE + message_size`), so back-to-back
    /// messages decode by advancing with it.
    pub fn decode(buf: &Bytes, offset: usize) -> Result<(Self, usize), BiopError> {
        let (header, header_len) = BiopHeader::decode(buf, offset)?;
        let span = header.span();
        if buf.len() < offset + span {
            return Err(BiopError::TruncatedInput {
                offset,
                needed: span,
                remaining: buf.len() - offset,
            });
        }
        let kind = header
            .kind()
            .ok_or(BiopError::UnknownObjectKind(header.object_kind))?;
        let body = buf.slice(offset + header_len..offset + span);

        let message = match kind {
            ObjectKind::ServiceGateway | ObjectKind::Directory => {
                BiopMessage::Directory(decode_directory(header, &body)?)
            }
            ObjectKind::File => BiopMessage::File(decode_file(header, &body)?),
            ObjectKind::Stream => {
                BiopMessage::StreamEvent(decode_stream_event(header, &body, false)?)
            }
            ObjectKind::StreamEvent => {
                BiopMessage::StreamEvent(decode_stream_event(header, &body, true)?)
            }
        };
        Ok((message, span))
    }

    pub fn header(&self) -> &BiopHeader {
        match self {
            BiopMessage::Directory(m) => &m.header,
            BiopMessage::File(m) => &m.header,
            BiopMessage::StreamEvent(m) => &m.header,
        }
    }

    pub fn object_key(&self) -> &ObjectKey {
        &self.header().object_key
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            BiopMessage::Directory(m) => {
                if m.header.kind() == Some(ObjectKind::ServiceGateway) {
                    ObjectKind::ServiceGateway
                } else {
                    ObjectKind::Directory
                }
            }
            BiopMessage::File(_) => ObjectKind::File,
            BiopMessage::StreamEvent(m) => {
                if m.header.kind() == Some(ObjectKind::Stream) {
                    ObjectKind::Stream
                } else {
                    ObjectKind::StreamEvent
                }
            }
        }
    }
}

fn decode_service_contexts(r: &mut Reader<'_>) -> Result<Vec<ServiceContext>, BiopError> {
    let count = r.u8()? as usize;
    let mut contexts = Vec::with_capacity(count);
    for _ in 0..count {
        let context_id = r.u32()?;
        let length = r.u16()? as usize;
        let data = r.take(length)?;
        contexts.push(ServiceContext { context_id, data });
    }
    Ok(contexts)
}

fn decode_directory(header: BiopHeader, body: &Bytes) -> Result<DirectoryMessage, BiopError> {
    let mut r = Reader::new(body, 0);
    let service_contexts = decode_service_contexts(&mut r)?;
    let _message_body_length = r.u32()?;
    let bindings_count = r.u16()? as usize;
    let mut bindings = Vec::with_capacity(bindings_count);
    for _ in 0..bindings_count {
        let (name, consumed) = decode_biop_name(body, r.pos())?;
        r.skip(consumed)?;
        let binding_type = BindingType::from(r.u8()?);
        let (ior, consumed) = decode_ior(body, r.pos())?;
        r.skip(consumed)?;
        let info_length = r.u16()? as usize;
        let object_info = r.take(info_length)?;
        bindings.push(Binding {
            name,
            binding_type,
            ior,
            object_info,
        });
    }
    Ok(DirectoryMessage {
        header,
        service_contexts,
        bindings,
    })
}

fn decode_file(header: BiopHeader, body: &Bytes) -> Result<FileMessage, BiopError> {
    // The content-size hint lives in the header's object info when that is
    // at least 8 bytes long.
    let content_size_hint = if header.object_info.len() >= 8 {
        let mut ir = Reader::new(&header.object_info, 0);
        Some(ir.u64()?)
    } else {
        None
    };

    let mut r = Reader::new(body, 0);
    let service_contexts = decode_service_contexts(&mut r)?;
    let _message_body_length = r.u32()?;
    let content_length = r.u32()? as usize;
    let content = r.take(content_length)?;
    Ok(FileMessage {
        header,
        service_contexts,
        content_size_hint,
        content,
    })
}

fn decode_stream_event(
    header: BiopHeader,
    body: &Bytes,
    has_events: bool,
) -> Result<StreamEventMessage, BiopError> {
    // Stream::Info_T (and the event-name list for stream events) is carried
    // in the header's object info.
    let info_buf = header.object_info.clone();
    let mut ir = Reader::new(&info_buf, 0);
    let description_length = ir.u8()? as usize;
    let description = ir.take(description_length)?.to_vec();
    let info = StreamInfo {
        description,
        duration_seconds: ir.u32()?,
        duration_microseconds: ir.u32()?,
        audio: ir.u8()?,
        video: ir.u8()?,
        data: ir.u8()?,
    };
    let event_names = if has_events {
        let count = ir.u16()? as usize;
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            let length = ir.u8()? as usize;
            names.push(ir.take(length)?.to_vec());
        }
        names
    } else {
        Vec::new()
    };

    let mut r = Reader::new(body, 0);
    let service_contexts = decode_service_contexts(&mut r)?;
    let _message_body_length = r.u32()?;
    let taps_count = r.u8()? as usize;
    let mut taps = Vec::with_capacity(taps_count);
    for _ in 0..taps_count {
        let (tap, consumed) = decode_tap(body, r.pos())?;
        r.skip(consumed)?;
        taps.push(tap);
    }
    let event_ids = if has_events {
        let count = r.u8()? as usize;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(r.u16()?);
        }
        ids
    } else {
        Vec::new()
    };

    Ok(StreamEventMessage {
        header,
        service_contexts,
        info,
        event_names,
        taps,
        event_ids,
    })
}
