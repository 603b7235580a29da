//! IOR (Interoperable Object Reference) decoding.
//!
//! An IOR names a carousel object indirectly: a type id followed by tagged
//! profiles, each a self-length-prefixed bag of lite components. The profile
//! shape used for carousel objects is one ObjectLocation (carousel id, module
//! id, version, object key) followed by one ConnBinder whose first tap names
//! the delivering stream.

use bytes::Bytes;

use crate::error::BiopError;
use crate::reader::Reader;
use crate::tap::{decode_tap, Tap};
use crate::types::{ObjectKey, ObjectKind};

/// Profile id tags.
pub mod profile_tag {
    /// TAG_BIOP: object carried in a broadcast carousel.
    pub const BIOP_PROFILE: u32 = 0x4953_4F06;
    /// TAG_LITE_OPTIONS: object carried elsewhere (alternate delivery).
    pub const LITE_OPTIONS: u32 = 0x4953_4F05;
}

/// Lite component tags.
pub mod component_tag {
    /// TAG_ObjectLocation.
    pub const OBJECT_LOCATION: u32 = 0x4953_4F50;
    /// TAG_ConnBinder.
    pub const CONN_BINDER: u32 = 0x4953_4F40;
}

/// Location of an object: which module of which carousel, at which version,
/// under which key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub carousel_id: u32,
    pub module_id: u16,
    pub version_major: u8,
    pub version_minor: u8,
    pub object_key: ObjectKey,
}

/// Delivery taps for an object location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnBinder {
    pub taps: Vec<Tap>,
}

impl ConnBinder {
    /// The delivery tap is the first one by convention.
    pub fn delivery_tap(&self) -> Option<&Tap> {
        self.taps.first()
    }
}

/// One lite component of a tagged profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteComponent {
    ObjectLocation(ObjectLocation),
    ConnBinder(ConnBinder),
    /// Unrecognized component, kept verbatim and skipped by declared length.
    Unknown { tag: u32, data: Bytes },
}

/// A tagged profile: id tag plus its decoded components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedProfile {
    pub profile_id_tag: u32,
    pub components: Vec<LiteComponent>,
}

impl TaggedProfile {
    /// The `[ObjectLocation, ConnBinder]` pair, if this profile carries
    /// exactly that shape (in transmitted order, ignoring unknown trailers).
    pub fn location_and_binder(&self) -> Option<(&ObjectLocation, &ConnBinder)> {
        let mut location = None;
        let mut binder = None;
        for component in &self.components {
            match component {
                LiteComponent::ObjectLocation(loc) => {
                    if location.is_some() {
                        return None;
                    }
                    location = Some(loc);
                }
                LiteComponent::ConnBinder(b) => {
                    if binder.is_some() || location.is_none() {
                        return None;
                    }
                    binder = Some(b);
                }
                LiteComponent::Unknown { .. } => {}
            }
        }
        match (location, binder) {
            (Some(loc), Some(b)) => Some((loc, b)),
            _ => None,
        }
    }
}

/// A decoded IOR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ior {
    /// Raw type id bytes. Advisory: the actual object kind is determined by
    /// decoding the referenced message, not by this tag.
    pub type_id: Vec<u8>,
    pub profiles: Vec<TaggedProfile>,
}

impl Ior {
    /// Object kind suggested by the type id, when it is a known 4-byte code.
    pub fn type_kind(&self) -> Option<ObjectKind> {
        let code: [u8; 4] = self.type_id.get(..4)?.try_into().ok()?;
        ObjectKind::from_bytes(code)
    }

    /// First profile, the single expected one for carousel objects.
    pub fn first_profile(&self) -> Option<&TaggedProfile> {
        self.profiles.first()
    }
}

/// Decode an IOR at `offset`.
///
/// Layout: `type_id_length[4] type_id[..] tagged_profiles_count[4]` then that
/// many profiles of `profile_id_tag[4] profile_data_length[1] profile_data`.
/// The declared `profile_data_length` is authoritative for advancing past
/// each profile; component decode problems inside the sub-range are logged
/// and tolerated, as seen in real broadcasts.
pub fn decode_ior(buf: &Bytes, offset: usize) -> Result<(Ior, usize), BiopError> {
    let mut r = Reader::new(buf, offset);
    let type_id_length = r.u32()? as usize;
    let type_id = r.take(type_id_length)?.to_vec();
    let profile_count = r.u32()? as usize;

    // Wire-supplied count; cap the pre-allocation, truncation checks bound
    // the actual loop.
    let mut profiles = Vec::with_capacity(profile_count.min(8));
    for _ in 0..profile_count {
        let profile_id_tag = r.u32()?;
        let profile_data_length = r.u8()? as usize;
        let profile_data = r.take(profile_data_length)?;
        let components = decode_components(&profile_data);
        profiles.push(TaggedProfile {
            profile_id_tag,
            components,
        });
    }

    Ok((Ior { type_id, profiles }, r.consumed()))
}

/// Decode lite components strictly within one profile's data window.
///
/// Never fails: a truncated or malformed component ends the scan with a log
/// line, because the outer cursor already advanced by the declared profile
/// length.
fn decode_components(data: &Bytes) -> Vec<LiteComponent> {
    let mut components = Vec::new();
    let mut r = Reader::new(data, 0);
    while r.remaining() > 0 {
        let component = match decode_component(&mut r) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("malformed lite component, skipping profile remainder: {e}");
                break;
            }
        };
        components.push(component);
    }
    components
}

fn decode_component(r: &mut Reader<'_>) -> Result<LiteComponent, BiopError> {
    let tag = r.u32()?;
    let length = r.u8()? as usize;
    let body = r.take(length)?;
    match tag {
        component_tag::OBJECT_LOCATION => match decode_object_location(&body) {
            Ok(loc) => Ok(LiteComponent::ObjectLocation(loc)),
            Err(e) => {
                log::debug!("bad ObjectLocation body ({e}), keeping raw");
                Ok(LiteComponent::Unknown { tag, data: body })
            }
        },
        component_tag::CONN_BINDER => match decode_conn_binder(&body) {
            Ok(binder) => Ok(LiteComponent::ConnBinder(binder)),
            Err(e) => {
                log::debug!("bad ConnBinder body ({e}), keeping raw");
                Ok(LiteComponent::Unknown { tag, data: body })
            }
        },
        _ => Ok(LiteComponent::Unknown { tag, data: body }),
    }
}

fn decode_object_location(body: &Bytes) -> Result<ObjectLocation, BiopError> {
    let mut r = Reader::new(body, 0);
    let carousel_id = r.u32()?;
    let module_id = r.u16()?;
    let version_major = r.u8()?;
    let version_minor = r.u8()?;
    let key_length = r.u8()? as usize;
    let object_key = ObjectKey::new(r.take(key_length)?.to_vec());
    Ok(ObjectLocation {
        carousel_id,
        module_id,
        version_major,
        version_minor,
        object_key,
    })
}

fn decode_conn_binder(body: &Bytes) -> Result<ConnBinder, BiopError> {
    let mut r = Reader::new(body, 0);
    let taps_count = r.u8()? as usize;
    let mut taps = Vec::with_capacity(taps_count);
    for _ in 0..taps_count {
        let (tap, consumed) = decode_tap(body, r.pos())?;
        r.skip(consumed)?;
        taps.push(tap);
    }
    Ok(ConnBinder { taps })
}
