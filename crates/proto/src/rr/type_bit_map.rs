// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! type bit map helper definitions for NSEC and NSEC3

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::ProtoResult;
use crate::rr::RecordType;
use crate::serialize::binary::{BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict};

/// The "type bit maps" field of NSEC and NSEC3 records (RFC 4034 section
/// 4.1.2): the record type space split into 256-entry windows, each present
/// window encoded as window number, bitmap length, bitmap.
///
/// Blocks with no types present are omitted and trailing zero octets of each
/// bitmap are trimmed. The octets read off the wire are retained so that
/// re-encoding reproduces them byte for byte.
#[derive(Clone)]
pub struct RecordTypeSet {
    types: BTreeSet<RecordType>,
    original_encoding: Option<Vec<u8>>,
}

impl RecordTypeSet {
    /// Construct a new set of record types
    pub fn new(types: impl IntoIterator<Item = RecordType>) -> Self {
        Self {
            types: types.into_iter().collect(),
            original_encoding: None,
        }
    }

    /// Iterate the types present in the bitmap
    pub fn iter(&self) -> impl Iterator<Item = RecordType> + '_ {
        self.types.iter().copied()
    }

    /// Returns true if `record_type` is present in the bitmap
    pub fn contains(&self, record_type: RecordType) -> bool {
        self.types.contains(&record_type)
    }

    /// Returns true if no types are present
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl PartialEq for RecordTypeSet {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
    }
}

impl Eq for RecordTypeSet {}

impl Hash for RecordTypeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for t in &self.types {
            u16::from(*t).hash(state);
        }
    }
}

impl fmt::Debug for RecordTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.types.iter()).finish()
    }
}

impl fmt::Display for RecordTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.types.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{t}")?;
        }
        Ok(())
    }
}

impl BinEncodable for RecordTypeSet {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        if let Some(encoded_bytes) = &self.original_encoding {
            return encoder.emit_vec(encoded_bytes);
        }

        let mut windows: BTreeMap<u8, Vec<u8>> = BTreeMap::new();

        for rr_type in self.types.iter() {
            let code = u16::from(*rr_type);
            let window = (code >> 8) as u8;
            let low = (code & 0x00FF) as u8;

            let bit_map = windows.entry(window).or_default();
            let index = usize::from(low / 8);
            let bit = 0b1000_0000 >> (low % 8);

            if bit_map.len() < index + 1 {
                bit_map.resize(index + 1, 0_u8);
            }

            bit_map[index] |= bit;
        }

        for (window, bitmap) in windows {
            encoder.emit(window)?;
            // bitmaps are bounded at 32 octets by the 256-type window
            encoder.emit(bitmap.len() as u8)?;
            encoder.emit_vec(&bitmap)?;
        }

        Ok(())
    }
}

impl RecordDataDecodable<'_> for RecordTypeSet {
    fn read_data(decoder: &mut BinDecoder<'_>, length: Restrict<u16>) -> ProtoResult<Self> {
        let bit_map_len = length.unverified(/*bounded by rdata length*/) as usize;
        let bytes = decoder.read_vec(bit_map_len)?.unverified(/*parsed below*/);

        let mut types = BTreeSet::new();
        let mut pos = 0;
        while pos < bytes.len() {
            if pos + 2 > bytes.len() {
                return Err("NSEC bitmap window truncated".into());
            }
            let window = bytes[pos];
            let len = bytes[pos + 1] as usize;
            if len == 0 || len > 32 {
                return Err("NSEC bitmap length out of range".into());
            }
            if pos + 2 + len > bytes.len() {
                return Err("NSEC bitmap truncated".into());
            }

            for (octet, bits) in bytes[pos + 2..pos + 2 + len].iter().enumerate() {
                for bit in 0..8 {
                    if bits & (0b1000_0000 >> bit) != 0 {
                        let low = (octet * 8 + bit) as u8;
                        let code = (u16::from(window) << 8) | u16::from(low);
                        types.insert(RecordType::from(code));
                    }
                }
            }

            pos += 2 + len;
        }

        Ok(Self {
            types,
            original_encoding: Some(bytes),
        })
    }
}
