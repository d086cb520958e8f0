use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::Error;

/// Extension ids above this value cannot occur in a well-formed file.
pub(crate) const MAX_EXTENSION_ID: u16 = 48;

/// Per-file dictionary mapping a map id to the ordered list of extension
/// ids appended to every flow record that references it. The map is
/// mutable for the lifetime of one file: a redefinition of a map id
/// replaces its previous list.
#[derive(Debug, Default)]
pub struct ExtensionMap {
    maps: HashMap<u16, Vec<u16>>,
}

impl ExtensionMap {
    /// Apply a type-2 extension-map record. `record` covers the whole
    /// record including its 4-byte header.
    ///
    /// Layout: u16 map id, u16 extension size, then `(size - 8) / 2`
    /// extension ids. A zero extension size marks the (unsupported) v2
    /// format; zero ids are 32-bit alignment padding and are skipped.
    pub(crate) fn update(
        &mut self,
        record: &[u8],
        mut usage: Option<&mut HashMap<u16, u64>>,
    ) -> Result<(), Error> {
        if record.len() < 8 {
            return Err(Error::CorruptRecordSize);
        }
        let map_id = LittleEndian::read_u16(&record[4..6]);
        let ext_size = LittleEndian::read_u16(&record[6..8]);
        if ext_size == 0 {
            return Err(Error::UnsupportedExtMapV2);
        }

        let ids = self.maps.entry(map_id).or_default();
        ids.clear();
        for chunk in record[8..].chunks_exact(2) {
            let ext_id = LittleEndian::read_u16(chunk);
            if ext_id > MAX_EXTENSION_ID {
                return Err(Error::CorruptExtMapId { ext_id, map_id });
            }
            if ext_id == 0 {
                continue;
            }
            if let Some(usage) = usage.as_mut() {
                *usage.entry(ext_id).or_insert(0) += 1;
            }
            ids.push(ext_id);
        }
        Ok(())
    }

    /// The extension list registered for `map_id`, if any.
    pub fn get(&self, map_id: u16) -> Option<&[u16]> {
        self.maps.get(&map_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
