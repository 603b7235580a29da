//! Byte-level fixture builders for a synthetic object carousel.

use bytes::Bytes;
use dsmcc_carousel::{message_id, table_id, DsmccSection, PROTOCOL_DISCRIMINATOR};

pub const TAG_BIOP_PROFILE: u32 = 0x4953_4F06;
pub const TAG_OBJECT_LOCATION: u32 = 0x4953_4F50;
pub const TAG_CONN_BINDER: u32 = 0x4953_4F40;

/// Delivery-parameter tap (use 0x0016, 10-byte selector).
pub fn delivery_tap(association_tag: u16, transaction_id: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_be_bytes()); // id
    out.extend_from_slice(&0x0016u16.to_be_bytes());
    out.extend_from_slice(&association_tag.to_be_bytes());
    out.push(0x0A);
    out.extend_from_slice(&0x0001u16.to_be_bytes()); // selector type
    out.extend_from_slice(&transaction_id.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes()); // timeout
    out
}

/// Plain object tap (use 0x0017, empty selector).
pub fn object_tap(association_tag: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&0x0017u16.to_be_bytes());
    out.extend_from_slice(&association_tag.to_be_bytes());
    out.push(0);
    out
}

/// IOR with one BIOP profile of `[ObjectLocation, ConnBinder]`.
pub fn ior(
    type_id: &[u8; 4],
    module_id: u16,
    object_key: &[u8],
    association_tag: u16,
    transaction_id: u32,
) -> Vec<u8> {
    let mut location = Vec::new();
    location.extend_from_slice(&1u32.to_be_bytes()); // carousel id
    location.extend_from_slice(&module_id.to_be_bytes());
    location.push(1); // version major
    location.push(0); // version minor
    location.push(object_key.len() as u8);
    location.extend_from_slice(object_key);

    let tap = delivery_tap(association_tag, transaction_id);
    let mut binder = Vec::new();
    binder.push(1); // taps count
    binder.extend_from_slice(&tap);

    let mut profile = Vec::new();
    profile.extend_from_slice(&TAG_OBJECT_LOCATION.to_be_bytes());
    profile.push(location.len() as u8);
    profile.extend_from_slice(&location);
    profile.extend_from_slice(&TAG_CONN_BINDER.to_be_bytes());
    profile.push(binder.len() as u8);
    profile.extend_from_slice(&binder);

    let mut out = Vec::new();
    out.extend_from_slice(&4u32.to_be_bytes());
    out.extend_from_slice(type_id);
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&TAG_BIOP_PROFILE.to_be_bytes());
    out.push(profile.len() as u8);
    out.extend_from_slice(&profile);
    out
}

/// Full BIOP message bytes.
pub fn biop_message(kind: &[u8; 4], object_key: &[u8], object_info: &[u8], body: &[u8]) -> Vec<u8> {
    let mut variable = Vec::new();
    variable.push(object_key.len() as u8);
    variable.extend_from_slice(object_key);
    variable.extend_from_slice(&4u32.to_be_bytes());
    variable.extend_from_slice(kind);
    variable.extend_from_slice(&(object_info.len() as u16).to_be_bytes());
    variable.extend_from_slice(object_info);

    let mut out = Vec::new();
    out.extend_from_slice(b"BIOP");
    out.push(1);
    out.push(0);
    out.push(0);
    out.push(0);
    out.extend_from_slice(&((variable.len() + body.len()) as u32).to_be_bytes());
    out.extend_from_slice(&variable);
    out.extend_from_slice(body);
    out
}

/// One directory binding record.
pub fn binding(name: &str, kind: &[u8; 4], ior_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(1); // name component count
    out.push(name.len() as u8 + 1);
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    out.push(4);
    out.extend_from_slice(kind);
    out.push(1); // binding type: object
    out.extend_from_slice(ior_bytes);
    out.extend_from_slice(&0u16.to_be_bytes()); // object info length
    out
}

/// Directory (or service gateway) message.
pub fn directory_message(kind: &[u8; 4], object_key: &[u8], bindings: &[Vec<u8>]) -> Vec<u8> {
    let bindings_bytes: usize = bindings.iter().map(Vec::len).sum();
    let mut body = Vec::new();
    body.push(0); // service contexts
    body.extend_from_slice(&((2 + bindings_bytes) as u32).to_be_bytes());
    body.extend_from_slice(&(bindings.len() as u16).to_be_bytes());
    for b in bindings {
        body.extend_from_slice(b);
    }
    biop_message(kind, object_key, &[], &body)
}

/// File message with a content-size hint.
pub fn file_message(object_key: &[u8], content: &[u8]) -> Vec<u8> {
    let object_info = (content.len() as u64).to_be_bytes();
    let mut body = Vec::new();
    body.push(0); // service contexts
    body.extend_from_slice(&((4 + content.len()) as u32).to_be_bytes());
    body.extend_from_slice(&(content.len() as u32).to_be_bytes());
    body.extend_from_slice(content);
    biop_message(b"fil\0", object_key, &object_info, &body)
}

/// U-N message payload: head plus body.
pub fn un_message(msg_id: u16, transaction_id: u32, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(PROTOCOL_DISCRIMINATOR);
    out.push(0x03);
    out.extend_from_slice(&msg_id.to_be_bytes());
    out.extend_from_slice(&transaction_id.to_be_bytes());
    out.push(0xFF);
    out.push(0x00);
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// DSI payload carrying the gateway reference.
pub fn dsi_payload(transaction_id: u32, gateway_ior: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&[0xFF; 20]); // server id
    body.extend_from_slice(&0u16.to_be_bytes()); // compatibility length
    body.extend_from_slice(&(gateway_ior.len() as u16).to_be_bytes());
    body.extend_from_slice(gateway_ior);
    un_message(message_id::DSI, transaction_id, &body)
}

/// One module entry for a DII payload.
pub struct ModuleSpec {
    pub module_id: u16,
    pub module_size: u32,
    pub module_version: u8,
    pub association_tag: u16,
    pub user_info: Vec<u8>,
}

/// DII payload announcing the given modules.
pub fn dii_payload(transaction_id: u32, block_size: u16, modules: &[ModuleSpec]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0xD00Du32.to_be_bytes()); // download id
    body.extend_from_slice(&block_size.to_be_bytes());
    body.push(0); // window size
    body.push(0); // ack period
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes()); // compatibility length
    body.extend_from_slice(&(modules.len() as u16).to_be_bytes());
    for module in modules {
        let mut info = Vec::new();
        info.extend_from_slice(&0u32.to_be_bytes()); // module timeout
        info.extend_from_slice(&0u32.to_be_bytes()); // block timeout
        info.extend_from_slice(&0u32.to_be_bytes()); // min block time
        info.push(1); // taps count
        info.extend_from_slice(&object_tap(module.association_tag));
        info.push(module.user_info.len() as u8);
        info.extend_from_slice(&module.user_info);

        body.extend_from_slice(&module.module_id.to_be_bytes());
        body.extend_from_slice(&module.module_size.to_be_bytes());
        body.push(module.module_version);
        body.push(info.len() as u8);
        body.extend_from_slice(&info);
    }
    body.extend_from_slice(&0u16.to_be_bytes()); // private data length
    un_message(message_id::DII, transaction_id, &body)
}

/// Compressed-module descriptor for DII user info.
pub fn compressed_module_descriptor(original_size: u32) -> Vec<u8> {
    let mut out = vec![0x09, 0x05, 0x08];
    out.extend_from_slice(&original_size.to_be_bytes());
    out
}

/// U-N section wrapping a DSI/DII payload.
pub fn un_section(pid: u16, transaction_id: u16, payload: &[u8]) -> DsmccSection {
    DsmccSection {
        pid,
        table_id: table_id::UN_MESSAGE,
        table_id_extension: transaction_id,
        section_number: 0,
        last_section_number: 0,
        payload: Bytes::copy_from_slice(payload),
    }
}

/// DDB section carrying one module block.
pub fn ddb_section(
    pid: u16,
    module_id: u16,
    module_version: u8,
    block: u8,
    last_block: u8,
    data: &[u8],
) -> DsmccSection {
    let mut body = Vec::new();
    body.extend_from_slice(&module_id.to_be_bytes());
    body.push(module_version);
    body.push(0xFF);
    body.extend_from_slice(&(block as u16).to_be_bytes());
    body.extend_from_slice(data);

    let mut payload = Vec::new();
    payload.push(PROTOCOL_DISCRIMINATOR);
    payload.push(0x03);
    payload.extend_from_slice(&message_id::DDB.to_be_bytes());
    payload.extend_from_slice(&0xD00Du32.to_be_bytes()); // download id
    payload.push(0xFF);
    payload.push(0x00);
    payload.extend_from_slice(&(body.len() as u16).to_be_bytes());
    payload.extend_from_slice(&body);

    DsmccSection {
        pid,
        table_id: table_id::DDB,
        table_id_extension: module_id,
        section_number: block,
        last_section_number: last_block,
        payload: Bytes::from(payload),
    }
}

/// Split module bytes into DDB sections of `block_size` bytes.
pub fn module_as_ddb_sections(
    pid: u16,
    module_id: u16,
    module_version: u8,
    block_size: usize,
    bytes: &[u8],
) -> Vec<DsmccSection> {
    let chunks: Vec<&[u8]> = bytes.chunks(block_size).collect();
    let last = (chunks.len() - 1) as u8;
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| ddb_section(pid, module_id, module_version, i as u8, last, chunk))
        .collect()
}
