//! Reader for nfdump (nfcapd) capture files — binary archives of
//! NetFlow/IPFIX/sFlow flow records.
//!
//! Two shapes over one decode engine:
//!
//! ```no_run
//! use nffile::{NfFile, NfStream};
//!
//! // Materialize the whole file.
//! let file = std::fs::File::open("nfcapd.202001011200")?;
//! let nf = NfFile::from_reader(std::io::BufReader::new(file))?;
//! println!("{} flows from {} exporters", nf.records.len(), nf.exporters.len());
//!
//! // Or stream record by record.
//! let file = std::fs::File::open("nfcapd.202001011200")?;
//! let mut stream = NfStream::new(std::io::BufReader::new(file))?;
//! while let Some(record) = stream.next_record() {
//!     let record = record?;
//!     println!("{} -> {} ({} bytes)", record.src_ip, record.dst_ip, record.byte_count);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod block;
pub mod codec;
pub mod error;
pub mod exporter;
pub mod extmap;
pub mod file;
pub mod header;
pub mod record;
pub mod stream;

pub use codec::Compression;
pub use error::Error;
pub use exporter::{ExporterInfo, ExporterStat, SamplerInfo};
pub use file::{Meta, NfFile};
pub use header::{FileHeader, StatRecord};
pub use record::FlowRecord;
pub use stream::NfStream;
