use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::error::Error;

/// Expected file magic value.
pub const MAGIC: u16 = 0xA50C;
/// Only layout version 1 is known/supported.
pub const LAYOUT_VERSION: u16 = 1;

pub(crate) const FILE_HEADER_SIZE: usize = 140;
pub(crate) const STAT_RECORD_SIZE: usize = 136;

/// nfdump file header: magic, layout version, compression flags, block
/// count and a free-form 128-byte identifier.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub magic: u16,
    pub version: u16,
    pub flags: u32,
    pub num_blocks: u32,
    pub ident: [u8; 128],
}

impl FileHeader {
    pub fn read<R: Read>(mut reader: R) -> Result<Self, Error> {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        reader.read_exact(&mut buf).map_err(Error::ReadHeader)?;

        let magic = LittleEndian::read_u16(&buf[0..2]);
        if magic != MAGIC {
            return Err(Error::BadMagic);
        }
        let version = LittleEndian::read_u16(&buf[2..4]);
        if version != LAYOUT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let mut ident = [0u8; 128];
        ident.copy_from_slice(&buf[12..140]);

        Ok(Self {
            magic,
            version,
            flags: LittleEndian::read_u32(&buf[4..8]),
            num_blocks: LittleEndian::read_u32(&buf[8..12]),
            ident,
        })
    }

    /// The identifier as text, with trailing NUL padding stripped.
    pub fn ident_str(&self) -> String {
        let end = self
            .ident
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.ident.len());
        String::from_utf8_lossy(&self.ident[..end]).into_owned()
    }
}

/// Aggregate counters nfdump maintains for the whole file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    pub num_flows: u64,
    pub num_bytes: u64,
    pub num_packets: u64,

    pub num_flows_tcp: u64,
    pub num_flows_udp: u64,
    pub num_flows_icmp: u64,
    pub num_flows_other: u64,

    pub num_bytes_tcp: u64,
    pub num_bytes_udp: u64,
    pub num_bytes_icmp: u64,
    pub num_bytes_other: u64,

    pub num_packets_tcp: u64,
    pub num_packets_udp: u64,
    pub num_packets_icmp: u64,
    pub num_packets_other: u64,

    pub first_seen: u32,
    pub last_seen: u32,
    pub msec_first: u16,
    pub msec_last: u16,

    pub sequence_failure: u32,
}

impl StatRecord {
    pub fn read<R: Read>(mut reader: R) -> Result<Self, Error> {
        let mut buf = [0u8; STAT_RECORD_SIZE];
        reader.read_exact(&mut buf).map_err(Error::ReadStatRecord)?;

        let mut fields = Fields(&buf);
        Ok(Self {
            num_flows: fields.u64(),
            num_bytes: fields.u64(),
            num_packets: fields.u64(),
            num_flows_tcp: fields.u64(),
            num_flows_udp: fields.u64(),
            num_flows_icmp: fields.u64(),
            num_flows_other: fields.u64(),
            num_bytes_tcp: fields.u64(),
            num_bytes_udp: fields.u64(),
            num_bytes_icmp: fields.u64(),
            num_bytes_other: fields.u64(),
            num_packets_tcp: fields.u64(),
            num_packets_udp: fields.u64(),
            num_packets_icmp: fields.u64(),
            num_packets_other: fields.u64(),
            first_seen: fields.u32(),
            last_seen: fields.u32(),
            msec_first: fields.u16(),
            msec_last: fields.u16(),
            sequence_failure: fields.u32(),
        })
    }
}

/// Sequential little-endian field reader over an exactly-sized buffer.
struct Fields<'a>(&'a [u8]);

impl Fields<'_> {
    fn u64(&mut self) -> u64 {
        let v = LittleEndian::read_u64(&self.0[..8]);
        self.0 = &self.0[8..];
        v
    }

    fn u32(&mut self) -> u32 {
        let v = LittleEndian::read_u32(&self.0[..4]);
        self.0 = &self.0[4..];
        v
    }

    fn u16(&mut self) -> u16 {
        let v = LittleEndian::read_u16(&self.0[..2]);
        self.0 = &self.0[2..];
        v
    }
}
