//! Flow-record decoding — the core of the crate.
//!
//! A flow record is a fixed common block followed by a variable tail.
//! Three flag bits size the common block's IP and counter fields; the
//! tail is the ordered list of extensions registered for the record's
//! map id, each decoded (or skipped) at a fixed width.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::extmap::ExtensionMap;

/// Record flag bit: IP fields are IPv6 (16 bytes each).
pub const FLAG_IPV6: u16 = 0x01;
/// Record flag bit: the packet counter is stored as 64 bits.
pub const FLAG_PACKETS_64BIT: u16 = 0x02;
/// Record flag bit: the byte counter is stored as 64 bits.
pub const FLAG_BYTES_64BIT: u16 = 0x04;

/// Record header plus the fixed common fields, before the flag-sized IPs
/// and counters.
const COMMON_BLOCK_SIZE: usize = 32;

/// One decoded flow. Every field is present; counters are zero and the
/// optional IPs are `None` when the extension that would set them was
/// absent from the record's extension list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub flags: u16,

    /// Flow start/end time, milliseconds part.
    pub msec_first: u16,
    pub msec_last: u16,
    /// Flow start/end time, seconds since epoch.
    pub first: u32,
    pub last: u32,

    pub fwd_status: u8,
    pub tcp_flags: u8,
    pub proto: u8,
    pub tos: u8,
    pub src_port: u16,
    /// For ICMP/ICMPv6 flows this is `icmp_type << 8 | icmp_code`.
    pub dst_port: u16,
    pub exporter_sys_id: u16,
    pub reserved: u16,
    pub icmp_type: u8,
    pub icmp_code: u8,

    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,

    pub packet_count: u64,
    pub byte_count: u64,

    // Extensions 4 & 5
    pub input: u32,
    pub output: u32,

    // Extensions 6 & 7
    pub src_as: u32,
    pub dst_as: u32,

    // Extension 8
    pub dst_tos: u8,
    pub dir: u8,
    pub src_mask: u8,
    pub dst_mask: u8,

    // Extensions 9 & 10
    pub next_hop_ip: Option<IpAddr>,

    // Extensions 11 & 12
    pub bgp_next_ip: Option<IpAddr>,

    // Extension 13
    pub src_vlan: u16,
    pub dst_vlan: u16,

    // Extensions 14 & 15
    pub out_pkts: u64,

    // Extensions 16 & 17
    pub out_bytes: u64,

    // Extensions 18 & 19
    pub agge_flows: u64,

    // Extensions 23 & 24
    pub router_ip: Option<IpAddr>,

    // Extension 27
    /// Time the collector received the flow, milliseconds since epoch.
    pub received: u64,
}

impl Default for FlowRecord {
    fn default() -> Self {
        Self {
            flags: 0,
            msec_first: 0,
            msec_last: 0,
            first: 0,
            last: 0,
            fwd_status: 0,
            tcp_flags: 0,
            proto: 0,
            tos: 0,
            src_port: 0,
            dst_port: 0,
            exporter_sys_id: 0,
            reserved: 0,
            icmp_type: 0,
            icmp_code: 0,
            src_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            dst_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            packet_count: 0,
            byte_count: 0,
            input: 0,
            output: 0,
            src_as: 0,
            dst_as: 0,
            dst_tos: 0,
            dir: 0,
            src_mask: 0,
            dst_mask: 0,
            next_hop_ip: None,
            bgp_next_ip: None,
            src_vlan: 0,
            dst_vlan: 0,
            out_pkts: 0,
            out_bytes: 0,
            agge_flows: 0,
            router_ip: None,
            received: 0,
        }
    }
}

impl FlowRecord {
    /// Decode one type-10 record. `record` covers the whole record
    /// including its 4-byte header; the extension tail is replayed from
    /// the list the record's map id selects in `ext_map`.
    pub(crate) fn decode(record: &[u8], ext_map: &ExtensionMap) -> Result<Self, Error> {
        if record.len() < COMMON_BLOCK_SIZE {
            return Err(Error::CorruptRecordSize);
        }

        let mut rec = FlowRecord::default();

        rec.flags = LittleEndian::read_u16(&record[4..6]);
        let map_id = LittleEndian::read_u16(&record[6..8]);
        rec.msec_first = LittleEndian::read_u16(&record[8..10]);
        rec.msec_last = LittleEndian::read_u16(&record[10..12]);
        rec.first = LittleEndian::read_u32(&record[12..16]);
        rec.last = LittleEndian::read_u32(&record[16..20]);
        rec.fwd_status = record[20];
        rec.tcp_flags = record[21];
        rec.proto = record[22];
        rec.tos = record[23];

        // ICMP and ICMPv6 reuse the destination port slot for type/code.
        if rec.proto == 1 || rec.proto == 58 {
            rec.icmp_type = record[27];
            rec.icmp_code = record[26];
            rec.src_port = 0;
            rec.dst_port = (rec.icmp_type as u16) << 8 | rec.icmp_code as u16;
        } else {
            rec.src_port = LittleEndian::read_u16(&record[24..26]);
            rec.dst_port = LittleEndian::read_u16(&record[26..28]);
        }

        rec.exporter_sys_id = LittleEndian::read_u16(&record[28..30]);
        rec.reserved = LittleEndian::read_u16(&record[30..32]);

        let ip_size = if rec.flags & FLAG_IPV6 != 0 {
            rec.src_ip = ipv6(field(record, 32, 16)?);
            rec.dst_ip = ipv6(field(record, 48, 16)?);
            32
        } else {
            rec.src_ip = ipv4(field(record, 32, 4)?);
            rec.dst_ip = ipv4(field(record, 36, 4)?);
            8
        };
        let mut offset = COMMON_BLOCK_SIZE + ip_size;

        if rec.flags & FLAG_PACKETS_64BIT != 0 {
            rec.packet_count = LittleEndian::read_u64(field(record, offset, 8)?);
            offset += 8;
        } else {
            rec.packet_count = LittleEndian::read_u32(field(record, offset, 4)?) as u64;
            offset += 4;
        }

        if rec.flags & FLAG_BYTES_64BIT != 0 {
            rec.byte_count = LittleEndian::read_u64(field(record, offset, 8)?);
            offset += 8;
        } else {
            rec.byte_count = LittleEndian::read_u32(field(record, offset, 4)?) as u64;
            offset += 4;
        }

        let ext_ids = ext_map
            .get(map_id)
            .ok_or(Error::UnknownExtMapId(map_id))?;
        for &ext_id in ext_ids {
            offset = rec.decode_extension(ext_id, record, offset)?;
        }

        Ok(rec)
    }

    fn decode_extension(
        &mut self,
        ext_id: u16,
        record: &[u8],
        mut offset: usize,
    ) -> Result<usize, Error> {
        match ext_id {
            4 => {
                self.input = LittleEndian::read_u16(field(record, offset, 2)?) as u32;
                self.output = LittleEndian::read_u16(field(record, offset + 2, 2)?) as u32;
                offset += 4;
            }
            5 => {
                self.input = LittleEndian::read_u32(field(record, offset, 4)?);
                self.output = LittleEndian::read_u32(field(record, offset + 4, 4)?);
                offset += 8;
            }
            6 => {
                self.src_as = LittleEndian::read_u16(field(record, offset, 2)?) as u32;
                self.dst_as = LittleEndian::read_u16(field(record, offset + 2, 2)?) as u32;
                offset += 4;
            }
            7 => {
                self.src_as = LittleEndian::read_u32(field(record, offset, 4)?);
                self.dst_as = LittleEndian::read_u32(field(record, offset + 4, 4)?);
                offset += 8;
            }
            8 => {
                let b = field(record, offset, 4)?;
                self.dst_tos = b[0];
                self.dir = b[1];
                self.src_mask = b[2];
                self.dst_mask = b[3];
                offset += 4;
            }
            9 => {
                self.next_hop_ip = Some(ipv4(field(record, offset, 4)?));
                offset += 4;
            }
            10 => {
                self.next_hop_ip = Some(ipv6(field(record, offset, 16)?));
                offset += 16;
            }
            11 => {
                self.bgp_next_ip = Some(ipv4(field(record, offset, 4)?));
                offset += 4;
            }
            12 => {
                self.bgp_next_ip = Some(ipv6(field(record, offset, 16)?));
                offset += 16;
            }
            13 => {
                self.src_vlan = LittleEndian::read_u16(field(record, offset, 2)?);
                self.dst_vlan = LittleEndian::read_u16(field(record, offset + 2, 2)?);
                offset += 4;
            }
            14 => {
                self.out_pkts = LittleEndian::read_u32(field(record, offset, 4)?) as u64;
                offset += 4;
            }
            15 => {
                self.out_pkts = LittleEndian::read_u64(field(record, offset, 8)?);
                offset += 8;
            }
            16 => {
                self.out_bytes = LittleEndian::read_u32(field(record, offset, 4)?) as u64;
                offset += 4;
            }
            17 => {
                self.out_bytes = LittleEndian::read_u64(field(record, offset, 8)?);
                offset += 8;
            }
            18 => {
                self.agge_flows = LittleEndian::read_u32(field(record, offset, 4)?) as u64;
                offset += 4;
            }
            19 => {
                self.agge_flows = LittleEndian::read_u64(field(record, offset, 8)?);
                offset += 8;
            }
            23 => {
                self.router_ip = Some(ipv4(field(record, offset, 4)?));
                offset += 4;
            }
            24 => {
                self.router_ip = Some(ipv6(field(record, offset, 16)?));
                offset += 16;
            }
            27 => {
                self.received = LittleEndian::read_u64(field(record, offset, 8)?);
                offset += 8;
            }
            // Fixed-width extensions this reader does not surface; their
            // payload is consumed and discarded.
            20 | 21 => offset += 16,
            22 => offset += 40,
            25 | 38 => offset += 4,
            26 | 39 | 47 | 48 => offset += 8,
            37 => offset += 20,
            40 => offset += 32,
            41 | 42 | 45 => offset += 24,
            43 => offset += 72,
            46 => offset += 12,
            // 28-36 and 44 are reserved, no payload. Anything else is
            // unassigned and carries no bytes either.
            _ => {}
        }
        Ok(offset)
    }

    /// Flow start time. The Unix epoch stands in for an unset time.
    pub fn start_time(&self) -> DateTime<Utc> {
        if self.first == 0 && self.msec_first == 0 {
            return DateTime::UNIX_EPOCH;
        }
        DateTime::from_timestamp(self.first as i64, self.msec_first as u32 * 1_000_000)
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Flow start time in milliseconds since epoch.
    pub fn start_time_ms(&self) -> i64 {
        self.first as i64 * 1000 + self.msec_first as i64
    }

    /// Flow end time. The Unix epoch stands in for an unset time.
    pub fn end_time(&self) -> DateTime<Utc> {
        if self.last == 0 && self.msec_last == 0 {
            return DateTime::UNIX_EPOCH;
        }
        DateTime::from_timestamp(self.last as i64, self.msec_last as u32 * 1_000_000)
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Flow end time in milliseconds since epoch.
    pub fn end_time_ms(&self) -> i64 {
        self.last as i64 * 1000 + self.msec_last as i64
    }

    /// Time the collector received the flow.
    pub fn received_time(&self) -> DateTime<Utc> {
        if self.received == 0 {
            return DateTime::UNIX_EPOCH;
        }
        let secs = (self.received / 1000) as i64;
        let nanos = (self.received % 1000) as u32 * 1_000_000;
        DateTime::from_timestamp(secs, nanos).unwrap_or(DateTime::UNIX_EPOCH)
    }

    pub fn duration(&self) -> Duration {
        Duration::milliseconds(self.duration_ms())
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_time_ms() - self.start_time_ms()
    }
}

/// `record.size` governs framing, not the decoded extent; any field the
/// flags or extension list demand beyond it is corruption.
fn field(record: &[u8], at: usize, len: usize) -> Result<&[u8], Error> {
    record.get(at..at + len).ok_or(Error::CorruptRecordSize)
}

/// IPv4 fields are stored with their 4-byte window reversed.
fn ipv4(window: &[u8]) -> IpAddr {
    let mut b = [0u8; 4];
    b.copy_from_slice(window);
    b.reverse();
    IpAddr::V4(Ipv4Addr::from(b))
}

/// IPv6 fields are stored as two little-endian 64-bit words: each 8-byte
/// half is reversed independently, then both are concatenated.
fn ipv6(window: &[u8]) -> IpAddr {
    let mut b = [0u8; 16];
    b[..8].copy_from_slice(&window[..8]);
    b[..8].reverse();
    b[8..].copy_from_slice(&window[8..16]);
    b[8..].reverse();
    IpAddr::V6(Ipv6Addr::from(b))
}
