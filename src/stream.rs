//! Streaming decode engine.
//!
//! [`NfStream`] reads one flow record per call with minimal memory:
//! the raw block buffer is reused (grown in place, never shrunk) and a
//! decompressed buffer lives only for the current block. Metadata
//! records — extension maps, exporters, samplers, exporter statistics —
//! are folded into per-file state as they are encountered and can be
//! inspected between calls.
//!
//! The materializing API ([`crate::NfFile`]) drives the same engine, so
//! both shapes decode identically by construction.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{self, Read};

use crate::block::{
    BlockHeader, RecordHeader, BLOCK_HEADER_SIZE, DATA_BLOCK_ID, EMPTY_RECORD,
    EXPORTER_INFO_RECORD, EXPORTER_STAT_RECORD, EXTENSION_MAP_RECORD, FLOW_RECORD,
    RECORD_HEADER_SIZE, SAMPLER_INFO_RECORD,
};
use crate::codec::{self, Compression};
use crate::error::Error;
use crate::exporter::{decode_exporter_stats, ExporterInfo, ExporterStat, SamplerInfo};
use crate::extmap::ExtensionMap;
use crate::file::{Meta, NfFile};
use crate::header::{FileHeader, StatRecord};
use crate::record::{FlowRecord, FLAG_IPV6};

/// One-record-at-a-time reader over an nfdump byte stream.
///
/// `next_record` returns `None` at end of stream; errors are fatal and
/// fuse the stream. Also usable as an [`Iterator`].
pub struct NfStream<R> {
    reader: R,
    header: FileHeader,
    stats: StatRecord,

    block_header: BlockHeader,
    blocks_read: u32,
    /// Raw block payload; reused across blocks, grown but never shrunk.
    block_data: Vec<u8>,
    /// LZO output for the current block.
    decoded: Vec<u8>,
    /// The current block view borrows `block_data` (uncompressed file).
    block_plain: bool,
    block_len: usize,
    /// Cursor into the current block view.
    start: usize,
    /// Records of any type consumed from the current block.
    block_records: u32,
    read_new_block: bool,
    done: bool,

    ext_map: ExtensionMap,
    exporters: HashMap<u16, ExporterInfo>,
    exporter_stats: HashMap<u32, ExporterStat>,
    samplers: HashMap<u16, SamplerInfo>,
    meta: Option<Meta>,
}

impl<R: Read> NfStream<R> {
    /// Read the file preamble and set up for streaming. Fails on a bad
    /// magic, an unknown layout version or a short preamble.
    pub fn new(reader: R) -> Result<Self, Error> {
        Self::with_meta(reader, false)
    }

    pub(crate) fn with_meta(mut reader: R, collect_meta: bool) -> Result<Self, Error> {
        let header = FileHeader::read(&mut reader)?;
        let stats = StatRecord::read(&mut reader)?;
        Ok(Self {
            reader,
            header,
            stats,
            block_header: BlockHeader::default(),
            blocks_read: 0,
            block_data: Vec::new(),
            decoded: Vec::new(),
            block_plain: true,
            block_len: 0,
            start: 0,
            block_records: 0,
            read_new_block: true,
            done: false,
            ext_map: ExtensionMap::default(),
            exporters: HashMap::new(),
            exporter_stats: HashMap::new(),
            samplers: HashMap::new(),
            meta: collect_meta.then(Meta::default),
        })
    }

    /// The next flow record, or `None` at end of stream. Metadata
    /// records encountered on the way update the per-file maps and the
    /// loop continues internally; only flow records are returned.
    pub fn next_record(&mut self) -> Option<Result<FlowRecord, Error>> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }

    fn step(&mut self) -> Result<Option<FlowRecord>, Error> {
        loop {
            if self.read_new_block {
                if !self.next_block()? {
                    return Ok(None);
                }
                self.read_new_block = false;
            }

            let block: &[u8] = if self.block_plain {
                &self.block_data[..self.block_len]
            } else {
                &self.decoded
            };

            // Block exhausted: every promised record consumed, or too few
            // bytes left for another record header.
            if self.block_records >= self.block_header.num_records
                || self.start + RECORD_HEADER_SIZE > block.len()
            {
                self.read_new_block = true;
                continue;
            }

            let header = RecordHeader::parse(&block[self.start..self.start + RECORD_HEADER_SIZE]);
            let size = header.size as usize;
            if size == 0 {
                return Err(Error::CorruptRecordSize);
            }
            let Some(record) = block.get(self.start..self.start + size) else {
                return Err(Error::CorruptRecordSize);
            };

            self.block_records += 1;
            if let Some(meta) = self.meta.as_mut() {
                *meta.record_id_count.entry(header.record_type).or_insert(0) += 1;
            }

            match header.record_type {
                EMPTY_RECORD => {
                    self.read_new_block = true;
                }
                EXTENSION_MAP_RECORD => {
                    self.ext_map
                        .update(record, self.meta.as_mut().map(|m| &mut m.ext_usage))?;
                    self.start += size;
                }
                EXPORTER_INFO_RECORD => {
                    let exporter = ExporterInfo::decode(record)?;
                    self.exporters.insert(exporter.sys_id, exporter);
                    self.start += size;
                }
                EXPORTER_STAT_RECORD => {
                    for stat in decode_exporter_stats(record)? {
                        self.exporter_stats.insert(stat.sys_id, stat);
                    }
                    self.read_new_block = true;
                }
                SAMPLER_INFO_RECORD => {
                    let sampler = SamplerInfo::decode(record)?;
                    self.samplers.insert(sampler.exporter_sys_id, sampler);
                    self.start += size;
                }
                FLOW_RECORD => {
                    let flow = FlowRecord::decode(record, &self.ext_map)?;
                    self.start += size;
                    if let Some(meta) = self.meta.as_mut() {
                        if flow.flags & FLAG_IPV6 != 0 {
                            meta.ipv6_count += 1;
                        } else {
                            meta.ipv4_count += 1;
                        }
                    }
                    if self.block_records == self.block_header.num_records {
                        self.read_new_block = true;
                    }
                    return Ok(Some(flow));
                }
                _ => {
                    // Unknown record type: skip it whole.
                    self.start += size;
                }
            }
        }
    }

    /// Advance to the next data block, skipping blocks with foreign ids.
    /// Returns `false` at end of stream: all promised blocks read, or a
    /// clean EOF exactly at a block boundary.
    fn next_block(&mut self) -> Result<bool, Error> {
        loop {
            if self.blocks_read >= self.header.num_blocks {
                return Ok(false);
            }

            let mut buf = [0u8; BLOCK_HEADER_SIZE];
            match read_full(&mut self.reader, &mut buf) {
                Ok(0) => return Ok(false),
                Ok(n) if n < BLOCK_HEADER_SIZE => {
                    return Err(Error::ReadBlockHeader(io::ErrorKind::UnexpectedEof.into()))
                }
                Ok(_) => {}
                Err(err) => return Err(Error::ReadBlockHeader(err)),
            }
            self.block_header = BlockHeader::parse(&buf);
            self.blocks_read += 1;

            if let Some(meta) = self.meta.as_mut() {
                *meta.block_id_count.entry(self.block_header.id).or_insert(0) += 1;
            }

            let size = self.block_header.size as usize;
            if self.block_data.len() < size {
                self.block_data.resize(size, 0);
            }
            self.reader
                .read_exact(&mut self.block_data[..size])
                .map_err(|source| Error::ReadBlockBody {
                    block: self.blocks_read,
                    source,
                })?;

            // The payload had to be consumed to keep the stream aligned;
            // only data blocks are decoded.
            if self.block_header.id != DATA_BLOCK_ID {
                continue;
            }

            let compression = Compression::from_header_flags(self.header.flags)?;
            match codec::decompress(compression, &self.block_data[..size])? {
                Cow::Borrowed(_) => {
                    self.block_plain = true;
                    self.block_len = size;
                }
                Cow::Owned(buf) => {
                    self.block_plain = false;
                    self.decoded = buf;
                }
            }

            self.start = 0;
            self.block_records = 0;
            return Ok(true);
        }
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn stats(&self) -> &StatRecord {
        &self.stats
    }

    /// Exporters seen so far, keyed by exporter sys id.
    pub fn exporters(&self) -> &HashMap<u16, ExporterInfo> {
        &self.exporters
    }

    /// Exporter statistics seen so far, keyed by exporter sys id.
    pub fn exporter_stats(&self) -> &HashMap<u32, ExporterStat> {
        &self.exporter_stats
    }

    /// Samplers seen so far, keyed by exporter sys id.
    pub fn samplers(&self) -> &HashMap<u16, SamplerInfo> {
        &self.samplers
    }

    pub(crate) fn into_file(self, records: Vec<FlowRecord>) -> NfFile {
        NfFile {
            header: self.header,
            stats: self.stats,
            records,
            meta: self.meta.unwrap_or_default(),
            exporters: self.exporters,
            exporter_stats: self.exporter_stats,
            samplers: self.samplers,
        }
    }
}

impl<R: Read> Iterator for NfStream<R> {
    type Item = Result<FlowRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

/// Fill `buf` as far as the stream allows. Returns the number of bytes
/// read; fewer than `buf.len()` means EOF was hit.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match reader.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(read)
}
