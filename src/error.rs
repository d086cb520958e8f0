use std::io;
use thiserror::Error;

use crate::codec::Compression;

/// Everything that can go wrong while decoding an nfdump file.
///
/// End-of-stream is not an error: the streaming API reports it as `None`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("bad file magic")]
    BadMagic,

    #[error("unsupported file layout version: {0}")]
    UnsupportedVersion(u16),

    #[error("failed to read file header: {0}")]
    ReadHeader(#[source] io::Error),

    #[error("failed to read stat record: {0}")]
    ReadStatRecord(#[source] io::Error),

    #[error("failed to read block header: {0}")]
    ReadBlockHeader(#[source] io::Error),

    #[error("failed to read body of block {block}: {source}")]
    ReadBlockBody { block: u32, source: io::Error },

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(Compression),

    #[error("LZO decompression failed: {0}")]
    LzoDecompress(String),

    #[error("unsupported extension map v2 record")]
    UnsupportedExtMapV2,

    #[error("corrupt extension map: extension id {ext_id} out of range (map {map_id})")]
    CorruptExtMapId { ext_id: u16, map_id: u16 },

    #[error("corrupt record: zero size or size exceeding block bounds")]
    CorruptRecordSize,

    #[error("flow record references undefined extension map {0}")]
    UnknownExtMapId(u16),
}
