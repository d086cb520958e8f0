use std::borrow::Cow;
use std::fmt;

use minilzo_rs::LZO;

use crate::error::Error;

// Compression flag bits in the file header.
pub const LZO_COMPRESSED: u32 = 0x01;
pub const BZ2_COMPRESSED: u32 = 0x08;
pub const LZ4_COMPRESSED: u32 = 0x10;
pub const COMPRESSION_MASK: u32 = 0x19;

/// Upper bound for the inflated size of one block. nfdump writes blocks
/// from a 1 MiB buffer; anything claiming more than this is hostile.
pub const MAX_BLOCK_SIZE: usize = 5 * 1024 * 1024;

/// Block compression algorithm, derived from the file header flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lzo,
    Bzip2,
    Lz4,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => f.write_str("none"),
            Compression::Lzo => f.write_str("lzo1x"),
            Compression::Bzip2 => f.write_str("bzip2"),
            Compression::Lz4 => f.write_str("lz4"),
        }
    }
}

impl Compression {
    /// Select the block compression from the file header `flags`. LZ4 and
    /// BZ2 are recognised but rejected; only LZO1X and uncompressed files
    /// can be decoded.
    pub fn from_header_flags(flags: u32) -> Result<Self, Error> {
        if flags & COMPRESSION_MASK == 0 {
            Ok(Compression::None)
        } else if flags & LZO_COMPRESSED != 0 {
            Ok(Compression::Lzo)
        } else if flags & LZ4_COMPRESSED != 0 {
            Err(Error::UnsupportedCompression(Compression::Lz4))
        } else {
            Err(Error::UnsupportedCompression(Compression::Bzip2))
        }
    }
}

/// Inflate one block body. Uncompressed blocks are passed through
/// borrowed; LZO blocks come back as a fresh buffer whose length the
/// algorithm determines.
pub fn decompress(compression: Compression, body: &[u8]) -> Result<Cow<'_, [u8]>, Error> {
    match compression {
        Compression::None => Ok(Cow::Borrowed(body)),
        Compression::Lzo => {
            let mut lzo = LZO::init().map_err(|e| Error::LzoDecompress(format!("init: {e:?}")))?;
            let out = lzo
                .decompress_safe(body, MAX_BLOCK_SIZE)
                .map_err(|e| Error::LzoDecompress(format!("{e:?}")))?;
            Ok(Cow::Owned(out))
        }
        Compression::Bzip2 | Compression::Lz4 => Err(Error::UnsupportedCompression(compression)),
    }
}
