//! Tap decoding.
//!
//! A Tap names the logical channel (association tag) carrying some piece of
//! carousel data, optionally with delivery parameters (transaction id and
//! timeout) in its selector.

use bytes::Bytes;

use crate::error::BiopError;
use crate::reader::Reader;

/// Tap use codes.
pub mod tap_use {
    /// Delivery parameters: the selector carries a transaction id and timeout.
    pub const BIOP_DELIVERY_PARA_USE: u16 = 0x0016;
    /// Plain object carriage.
    pub const BIOP_OBJECT_USE: u16 = 0x0017;
    /// Stream event carriage.
    pub const STR_EVENT_USE: u16 = 0x000C;
}

/// Selector of a delivery-parameter tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapSelector {
    pub selector_type: u16,
    pub transaction_id: u32,
    pub timeout: u32,
}

/// A decoded Tap.
///
/// `selector` is present only for delivery-parameter taps
/// (`use_code == BIOP_DELIVERY_PARA_USE`); callers must not assume a
/// transaction id exists for other use codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tap {
    pub id: u16,
    pub use_code: u16,
    pub association_tag: u16,
    pub selector: Option<TapSelector>,
}

impl Tap {
    /// Transaction id of the delivery selector, if this is a delivery tap.
    pub fn transaction_id(&self) -> Option<u32> {
        self.selector.map(|s| s.transaction_id)
    }
}

/// Decode one Tap at `offset`.
///
/// Layout: `id[2] use[2] association_tag[2] selector_length[1]` followed by
/// `selector_length` selector bytes. The declared selector length always
/// advances the cursor, whether or not the selector was parsed.
pub fn decode_tap(buf: &Bytes, offset: usize) -> Result<(Tap, usize), BiopError> {
    let mut r = Reader::new(buf, offset);
    let id = r.u16()?;
    let use_code = r.u16()?;
    let association_tag = r.u16()?;
    let selector_length = r.u8()? as usize;
    let selector_bytes = r.take(selector_length)?;

    let selector = if use_code == tap_use::BIOP_DELIVERY_PARA_USE {
        if selector_bytes.len() >= 10 {
            let mut s = Reader::new(&selector_bytes, 0);
            Some(TapSelector {
                selector_type: s.u16()?,
                transaction_id: s.u32()?,
                timeout: s.u32()?,
            })
        } else {
            log::debug!(
                "delivery tap (assoc {association_tag:#06x}) with short selector ({selector_length} bytes), ignoring"
            );
            None
        }
    } else {
        None
    };

    Ok((
        Tap {
            id,
            use_code,
            association_tag,
            selector,
        },
        r.consumed(),
    ))
}
