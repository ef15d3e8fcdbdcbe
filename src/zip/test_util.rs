//! Hand-assembled archives for tests that need control over every field.

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

use super::structures::{CDFH_SIGNATURE, EOCD_SIGNATURE, LFH_SIGNATURE};

/// One entry as it should appear on disk.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub name: Vec<u8>,
    pub flags: u16,
    pub method: u16,
    pub timestamp: u32,
    pub crc32: u32,
    /// Bytes stored after the local header, compressed or not.
    pub data: Vec<u8>,
    pub original_size: u32,
    pub local_extra: Vec<u8>,
    pub central_extra: Vec<u8>,
    pub comment: Vec<u8>,
    pub local_signature: u32,
    pub central_signature: u32,
}

impl RawEntry {
    pub fn stored(name: &str, content: &[u8]) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            flags: 0,
            method: 0,
            timestamp: 0x4A6A6000,
            crc32: crc32fast::hash(content),
            data: content.to_vec(),
            original_size: content.len() as u32,
            local_extra: Vec::new(),
            central_extra: Vec::new(),
            comment: Vec::new(),
            local_signature: LFH_SIGNATURE,
            central_signature: CDFH_SIGNATURE,
        }
    }

    pub fn deflated(name: &str, content: &[u8]) -> Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).unwrap();
        Self {
            method: 8,
            data: encoder.finish().unwrap(),
            ..Self::stored(name, content)
        }
    }
}

/// Lay out local headers, data, central directory and EOCD.
pub fn build_archive(entries: &[RawEntry], comment: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut offsets = Vec::with_capacity(entries.len());

    for e in entries {
        offsets.push(out.len() as u32);
        out.write_u32::<LittleEndian>(e.local_signature).unwrap();
        out.write_u16::<LittleEndian>(20).unwrap();
        out.write_u16::<LittleEndian>(e.flags).unwrap();
        out.write_u16::<LittleEndian>(e.method).unwrap();
        out.write_u32::<LittleEndian>(e.timestamp).unwrap();
        out.write_u32::<LittleEndian>(e.crc32).unwrap();
        out.write_u32::<LittleEndian>(e.data.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(e.original_size).unwrap();
        out.write_u16::<LittleEndian>(e.name.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(e.local_extra.len() as u16).unwrap();
        out.extend_from_slice(&e.name);
        out.extend_from_slice(&e.local_extra);
        out.extend_from_slice(&e.data);
    }

    let cd_offset = out.len() as u32;
    for (e, offset) in entries.iter().zip(offsets) {
        out.write_u32::<LittleEndian>(e.central_signature).unwrap();
        out.write_u16::<LittleEndian>(20).unwrap();
        out.write_u16::<LittleEndian>(20).unwrap();
        out.write_u16::<LittleEndian>(e.flags).unwrap();
        out.write_u16::<LittleEndian>(e.method).unwrap();
        out.write_u32::<LittleEndian>(e.timestamp).unwrap();
        out.write_u32::<LittleEndian>(e.crc32).unwrap();
        out.write_u32::<LittleEndian>(e.data.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(e.original_size).unwrap();
        out.write_u16::<LittleEndian>(e.name.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(e.central_extra.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(e.comment.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(offset).unwrap();
        out.extend_from_slice(&e.name);
        out.extend_from_slice(&e.central_extra);
        out.extend_from_slice(&e.comment);
    }
    let cd_size = out.len() as u32 - cd_offset;

    out.write_u32::<LittleEndian>(EOCD_SIGNATURE).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
    out.write_u32::<LittleEndian>(cd_size).unwrap();
    out.write_u32::<LittleEndian>(cd_offset).unwrap();
    out.write_u16::<LittleEndian>(comment.len() as u16).unwrap();
    out.extend_from_slice(comment);
    out
}
