//! Exporter, sampler and exporter-statistics records. These carry the
//! context of the device that emitted the flows and are accumulated into
//! per-file maps keyed by the exporter's internal sys id.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A device exporting flows, as announced by a type-7 record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterInfo {
    /// Exporter protocol version.
    pub version: u32,
    /// Exporter IP address.
    pub ip_addr: IpAddr,
    pub sa_family: u16,
    /// Internal id the collector assigned to this exporter.
    pub sys_id: u16,
    /// Observation domain id assigned by the device itself.
    pub id: u32,
}

impl ExporterInfo {
    pub(crate) fn decode(record: &[u8]) -> Result<Self, Error> {
        if record.len() < 32 {
            return Err(Error::CorruptRecordSize);
        }

        // The exporter IP is stored as two 64-bit little-endian words at
        // [8:16] and [16:24]. A zero second word means IPv4, packed in the
        // top half of the first word; otherwise the IPv6 address is the
        // second word's bytes followed by the first word's.
        let word2 = LittleEndian::read_u64(&record[16..24]);
        let ip_addr = if word2 == 0 {
            let mut v4 = [0u8; 4];
            v4.copy_from_slice(&record[12..16]);
            IpAddr::V4(Ipv4Addr::from(v4))
        } else {
            let mut v6 = [0u8; 16];
            v6[..8].copy_from_slice(&record[16..24]);
            v6[8..].copy_from_slice(&record[8..16]);
            IpAddr::V6(Ipv6Addr::from(v6))
        };

        Ok(Self {
            version: LittleEndian::read_u32(&record[4..8]),
            ip_addr,
            sa_family: LittleEndian::read_u16(&record[24..26]),
            sys_id: LittleEndian::read_u16(&record[26..28]),
            id: LittleEndian::read_u32(&record[28..32]),
        })
    }
}

/// Sampling configuration on an exporter (type-9 record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerInfo {
    /// Sampler id assigned by the exporting device.
    pub id: u32,
    /// Sampling interval.
    pub interval: u32,
    /// Sampling mode.
    pub mode: u16,
    /// Internal reference to the exporter.
    pub exporter_sys_id: u16,
}

impl SamplerInfo {
    pub(crate) fn decode(record: &[u8]) -> Result<Self, Error> {
        if record.len() < 16 {
            return Err(Error::CorruptRecordSize);
        }
        Ok(Self {
            id: LittleEndian::read_u32(&record[4..8]),
            interval: LittleEndian::read_u32(&record[8..12]),
            mode: LittleEndian::read_u16(&record[12..14]),
            exporter_sys_id: LittleEndian::read_u16(&record[14..16]),
        })
    }
}

/// Per-exporter traffic totals (one entry of a type-8 record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterStat {
    pub sys_id: u32,
    /// Total sequence failures/drops observed for this exporter.
    pub sequence_failures: u32,
    pub packets: u64,
    pub flows: u64,
}

/// A type-8 record is a batch: a u32 entry count at offset 4 followed by
/// 24-byte entries starting at offset 8.
pub(crate) fn decode_exporter_stats(record: &[u8]) -> Result<Vec<ExporterStat>, Error> {
    if record.len() < 8 {
        return Err(Error::CorruptRecordSize);
    }
    let count = LittleEndian::read_u32(&record[4..8]) as usize;
    let need = 8u64 + count as u64 * 24;
    if (record.len() as u64) < need {
        return Err(Error::CorruptRecordSize);
    }

    let mut stats = Vec::with_capacity(count);
    for entry in record[8..8 + count * 24].chunks_exact(24) {
        stats.push(ExporterStat {
            sys_id: LittleEndian::read_u32(&entry[0..4]),
            sequence_failures: LittleEndian::read_u32(&entry[4..8]),
            packets: LittleEndian::read_u64(&entry[8..16]),
            flows: LittleEndian::read_u64(&entry[16..24]),
        });
    }
    Ok(stats)
}
