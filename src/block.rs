use byteorder::{ByteOrder, LittleEndian};

/// Only blocks with this id carry flow and metadata records; every other
/// block id is skipped.
pub const DATA_BLOCK_ID: u16 = 2;

pub(crate) const BLOCK_HEADER_SIZE: usize = 12;
pub(crate) const RECORD_HEADER_SIZE: usize = 4;

// Record types dispatched inside a data block.
pub const EMPTY_RECORD: u16 = 0;
pub const EXTENSION_MAP_RECORD: u16 = 2;
pub const EXPORTER_INFO_RECORD: u16 = 7;
pub const EXPORTER_STAT_RECORD: u16 = 8;
pub const SAMPLER_INFO_RECORD: u16 = 9;
pub const FLOW_RECORD: u16 = 10;

/// 12-byte header framing each block: record count, payload size in
/// bytes, block id and flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockHeader {
    pub num_records: u32,
    pub size: u32,
    pub id: u16,
    pub flags: u16,
}

impl BlockHeader {
    pub(crate) fn parse(buf: &[u8; BLOCK_HEADER_SIZE]) -> Self {
        Self {
            num_records: LittleEndian::read_u32(&buf[0..4]),
            size: LittleEndian::read_u32(&buf[4..8]),
            id: LittleEndian::read_u16(&buf[8..10]),
            flags: LittleEndian::read_u16(&buf[10..12]),
        }
    }
}

/// 4-byte header framing each record: type and total size including the
/// header itself.
#[derive(Debug, Clone, Copy)]
pub struct RecordHeader {
    pub record_type: u16,
    pub size: u16,
}

impl RecordHeader {
    /// `buf` must hold at least [`RECORD_HEADER_SIZE`] bytes.
    pub(crate) fn parse(buf: &[u8]) -> Self {
        Self {
            record_type: LittleEndian::read_u16(&buf[0..2]),
            size: LittleEndian::read_u16(&buf[2..4]),
        }
    }
}
