//! BIOP::Name decoding.
//!
//! A name is an ordered sequence of (id, kind) string pairs; the first
//! component's id is the display/navigation name.

use bytes::Bytes;

use crate::error::BiopError;
use crate::reader::Reader;

/// One (id, kind) component of a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameComponent {
    pub id: Vec<u8>,
    pub kind: Vec<u8>,
}

/// A decoded BIOP::Name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BiopName {
    pub components: Vec<NameComponent>,
}

impl BiopName {
    /// Display name: the first component's id with one trailing NUL stripped,
    /// lossily decoded as UTF-8.
    pub fn display(&self) -> String {
        let Some(first) = self.components.first() else {
            return String::new();
        };
        let id = first.id.strip_suffix(&[0u8]).unwrap_or(&first.id);
        String::from_utf8_lossy(id).into_owned()
    }

    /// Kind of the first component, if any.
    pub fn kind(&self) -> Option<&[u8]> {
        self.components.first().map(|c| c.kind.as_slice())
    }
}

/// Decode a BIOP::Name at `offset`.
///
/// Layout: `component_count[1]`, then per component
/// `id_length[1] id[..] kind_length[1] kind[..]`.
pub fn decode_biop_name(buf: &Bytes, offset: usize) -> Result<(BiopName, usize), BiopError> {
    let mut r = Reader::new(buf, offset);
    let count = r.u8()? as usize;
    let mut components = Vec::with_capacity(count);
    for _ in 0..count {
        let id_len = r.u8()? as usize;
        let id = r.take(id_len)?.to_vec();
        let kind_len = r.u8()? as usize;
        let kind = r.take(kind_len)?.to_vec();
        components.push(NameComponent { id, kind });
    }
    Ok((BiopName { components }, r.consumed()))
}
