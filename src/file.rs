//! Whole-file [`NfFile`] API — the primary embedding surface when the
//! archive fits in memory.

use std::collections::HashMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::exporter::{ExporterInfo, ExporterStat, SamplerInfo};
use crate::header::{FileHeader, StatRecord};
use crate::record::FlowRecord;
use crate::stream::NfStream;

/// Occurrence counters accumulated while materializing a file. Streaming
/// callers who need these maintain their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Records seen per record type, all types.
    pub record_id_count: HashMap<u16, u64>,
    /// Blocks seen per block id, including skipped blocks.
    pub block_id_count: HashMap<u16, u64>,
    pub ipv4_count: u64,
    pub ipv6_count: u64,
    /// Times each extension id was registered in an extension map.
    pub ext_usage: HashMap<u16, u64>,
}

/// A fully decoded nfdump file.
#[derive(Debug)]
pub struct NfFile {
    pub header: FileHeader,
    pub stats: StatRecord,
    /// Flow records in file order.
    pub records: Vec<FlowRecord>,
    pub meta: Meta,
    /// Exporters keyed by exporter sys id.
    pub exporters: HashMap<u16, ExporterInfo>,
    /// Exporter statistics keyed by exporter sys id.
    pub exporter_stats: HashMap<u32, ExporterStat>,
    /// Samplers keyed by exporter sys id.
    pub samplers: HashMap<u16, SamplerInfo>,
}

impl NfFile {
    /// Decode a whole file from `reader`.
    ///
    /// The record vector is pre-allocated from the stat record's flow
    /// count; that value is a hint, never trusted as authoritative.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let mut stream = NfStream::with_meta(reader, true)?;
        let mut records = Vec::with_capacity(stream.stats().num_flows as usize);
        while let Some(record) = stream.next_record() {
            records.push(record?);
        }
        Ok(stream.into_file(records))
    }
}
