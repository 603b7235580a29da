//! Test-only re-encoders mirroring the decoders, used for round-trip
//! assertions and for building fixture bytes.

use crate::tap::tap_use;
use crate::types::BIOP_MAGIC;

/// Delivery-parameter tap with the canonical 10-byte selector.
pub fn tap_delivery(id: u16, association_tag: u16, transaction_id: u32, timeout: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&tap_use::BIOP_DELIVERY_PARA_USE.to_be_bytes());
    out.extend_from_slice(&association_tag.to_be_bytes());
    out.push(0x0A);
    out.extend_from_slice(&0x0001u16.to_be_bytes());
    out.extend_from_slice(&transaction_id.to_be_bytes());
    out.extend_from_slice(&timeout.to_be_bytes());
    out
}

/// ObjectLocation lite component, tag and length included.
pub fn object_location_component(
    carousel_id: u32,
    module_id: u16,
    version_major: u8,
    version_minor: u8,
    object_key: &[u8],
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&carousel_id.to_be_bytes());
    body.extend_from_slice(&module_id.to_be_bytes());
    body.push(version_major);
    body.push(version_minor);
    body.push(object_key.len() as u8);
    body.extend_from_slice(object_key);

    let mut out = Vec::new();
    out.extend_from_slice(&crate::ior::component_tag::OBJECT_LOCATION.to_be_bytes());
    out.push(body.len() as u8);
    out.extend_from_slice(&body);
    out
}

/// ConnBinder lite component holding one delivery tap.
pub fn conn_binder_component(association_tag: u16, transaction_id: u32) -> Vec<u8> {
    let tap = tap_delivery(0x0000, association_tag, transaction_id, 0x0000_FFFF);
    let mut body = Vec::new();
    body.push(1); // taps_count
    body.extend_from_slice(&tap);

    let mut out = Vec::new();
    out.extend_from_slice(&crate::ior::component_tag::CONN_BINDER.to_be_bytes());
    out.push(body.len() as u8);
    out.extend_from_slice(&body);
    out
}

/// IOR with one BIOP profile of `[ObjectLocation, ConnBinder]`.
#[allow(clippy::too_many_arguments)]
pub fn ior(
    type_id: &[u8],
    carousel_id: u32,
    module_id: u16,
    version_major: u8,
    version_minor: u8,
    object_key: &[u8],
    association_tag: u16,
    transaction_id: u32,
) -> Vec<u8> {
    let mut profile_data = Vec::new();
    profile_data.extend_from_slice(&object_location_component(
        carousel_id,
        module_id,
        version_major,
        version_minor,
        object_key,
    ));
    profile_data.extend_from_slice(&conn_binder_component(association_tag, transaction_id));

    let mut out = Vec::new();
    out.extend_from_slice(&(type_id.len() as u32).to_be_bytes());
    out.extend_from_slice(type_id);
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&crate::ior::profile_tag::BIOP_PROFILE.to_be_bytes());
    out.push(profile_data.len() as u8);
    out.extend_from_slice(&profile_data);
    out
}

/// One-component BIOP::Name with a NUL-terminated id.
pub fn name(id: &str, kind: [u8; 4]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(1);
    out.push(id.len() as u8 + 1);
    out.extend_from_slice(id.as_bytes());
    out.push(0);
    out.push(4);
    out.extend_from_slice(&kind);
    out
}

/// Directory binding record.
pub fn binding(entry_name: &str, kind: [u8; 4], binding_type: u8, ior_bytes: &[u8]) -> Vec<u8> {
    let mut out = name(entry_name, kind);
    out.push(binding_type);
    out.extend_from_slice(ior_bytes);
    out.extend_from_slice(&0u16.to_be_bytes()); // object_info_length
    out
}

/// Full BIOP message from its kind, key, object info and body bytes.
pub fn biop_message(kind: [u8; 4], object_key: &[u8], object_info: &[u8], body: &[u8]) -> Vec<u8> {
    let mut variable = Vec::new();
    variable.push(object_key.len() as u8);
    variable.extend_from_slice(object_key);
    variable.extend_from_slice(&4u32.to_be_bytes());
    variable.extend_from_slice(&kind);
    variable.extend_from_slice(&(object_info.len() as u16).to_be_bytes());
    variable.extend_from_slice(object_info);

    let message_size = (variable.len() + body.len()) as u32;
    let mut out = Vec::new();
    out.extend_from_slice(&BIOP_MAGIC);
    out.push(1); // version major
    out.push(0); // version minor
    out.push(0); // byte order: big-endian
    out.push(0); // message type
    out.extend_from_slice(&message_size.to_be_bytes());
    out.extend_from_slice(&variable);
    out.extend_from_slice(body);
    out
}

/// Directory (or service gateway) message from pre-encoded bindings.
pub fn directory_message(kind: [u8; 4], object_key: &[u8], bindings: &[Vec<u8>]) -> Vec<u8> {
    let bindings_bytes: usize = bindings.iter().map(Vec::len).sum();
    let mut body = Vec::new();
    body.push(0); // service context count
    body.extend_from_slice(&((2 + bindings_bytes) as u32).to_be_bytes());
    body.extend_from_slice(&(bindings.len() as u16).to_be_bytes());
    for b in bindings {
        body.extend_from_slice(b);
    }
    biop_message(kind, object_key, &[], &body)
}

/// File message; `with_hint` emits the 8-byte content-size hint.
pub fn file_message(object_key: &[u8], content: &[u8], with_hint: bool) -> Vec<u8> {
    let object_info = if with_hint {
        (content.len() as u64).to_be_bytes().to_vec()
    } else {
        Vec::new()
    };
    let mut body = Vec::new();
    body.push(0); // service context count
    body.extend_from_slice(&((4 + content.len()) as u32).to_be_bytes());
    body.extend_from_slice(&(content.len() as u32).to_be_bytes());
    body.extend_from_slice(content);
    biop_message(crate::types::object_kind::FILE, object_key, &object_info, &body)
}

/// Stream-event message with one event tap and the given names and ids.
pub fn stream_event_message(
    object_key: &[u8],
    description: &str,
    duration_seconds: u32,
    duration_microseconds: u32,
    event_names: &[&str],
    event_ids: &[u16],
) -> Vec<u8> {
    let mut object_info = Vec::new();
    object_info.push(description.len() as u8);
    object_info.extend_from_slice(description.as_bytes());
    object_info.extend_from_slice(&duration_seconds.to_be_bytes());
    object_info.extend_from_slice(&duration_microseconds.to_be_bytes());
    object_info.push(1); // audio
    object_info.push(0); // video
    object_info.push(0); // data
    object_info.extend_from_slice(&(event_names.len() as u16).to_be_bytes());
    for n in event_names {
        object_info.push(n.len() as u8);
        object_info.extend_from_slice(n.as_bytes());
    }

    let mut tap = Vec::new();
    tap.extend_from_slice(&0x0001u16.to_be_bytes());
    tap.extend_from_slice(&tap_use::STR_EVENT_USE.to_be_bytes());
    tap.extend_from_slice(&0x000Cu16.to_be_bytes());
    tap.push(0); // no selector

    let mut body = Vec::new();
    body.push(0); // service context count
    body.extend_from_slice(&((1 + tap.len() + 1 + event_ids.len() * 2) as u32).to_be_bytes());
    body.push(1); // taps_count
    body.extend_from_slice(&tap);
    body.push(event_ids.len() as u8);
    for id in event_ids {
        body.extend_from_slice(&id.to_be_bytes());
    }
    biop_message(
        crate::types::object_kind::STREAM_EVENT,
        object_key,
        &object_info,
        &body,
    )
}
