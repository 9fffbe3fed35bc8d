// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! negative cache proof for non-existence, RFC 4034 section 4
//!
//! An NSEC record names the next owner in the canonical ordering of the zone
//! and the set of types present at its own owner; together, a chain of NSEC
//! records proves which names and types do not exist.

use std::fmt;

use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::rr::type_bit_map::RecordTypeSet;
use crate::rr::RecordType;
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The NSEC record data
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NSEC {
    next_domain_name: Name,
    type_bit_maps: RecordTypeSet,
}

impl NSEC {
    /// Construct new NSEC rdata
    pub fn new(next_domain_name: Name, types: impl IntoIterator<Item = RecordType>) -> Self {
        Self {
            next_domain_name,
            type_bit_maps: RecordTypeSet::new(types),
        }
    }

    /// The next owner name in the canonical ordering of the zone
    pub fn next_domain_name(&self) -> &Name {
        &self.next_domain_name
    }

    /// The types present at this record's owner name
    pub fn type_set(&self) -> &RecordTypeSet {
        &self.type_bit_maps
    }

    /// Parse the zone-file form: `next-name type [type...]`
    pub fn parse<'i>(
        mut tokens: impl Iterator<Item = &'i str>,
        origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        let next_domain_name = Name::parse(
            tokens
                .next()
                .ok_or_else(|| ProtoError::from("next domain name not present"))?,
            origin,
        )?;
        let types = tokens
            .map(str::parse)
            .collect::<ProtoResult<Vec<RecordType>>>()?;
        Ok(Self::new(next_domain_name, types))
    }
}

impl BinEncodable for NSEC {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        // RFC 6840 clarifies the next owner name is neither compressed nor
        // lowercased in the canonical form
        self.next_domain_name.emit_as_canonical(encoder, false)?;
        self.type_bit_maps.emit(encoder)
    }
}

impl<'r> RecordDataDecodable<'r> for NSEC {
    fn read_data(decoder: &mut BinDecoder<'r>, length: Restrict<u16>) -> ProtoResult<Self> {
        let start_idx = decoder.index();
        let next_domain_name = Name::read(decoder)?;

        let bit_map_len = (length.unverified(/*bounded by sub below*/) as usize)
            .checked_sub(decoder.index() - start_idx)
            .ok_or_else(|| ProtoError::from("invalid rdata length in NSEC"))?;
        let type_bit_maps =
            RecordTypeSet::read_data(decoder, Restrict::new(bit_map_len as u16))?;

        Ok(Self {
            next_domain_name,
            type_bit_maps,
        })
    }
}

impl fmt::Display for NSEC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.next_domain_name, self.type_bit_maps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = NSEC::new(
            Name::from_ascii("b.example.com.").unwrap(),
            [RecordType::A, RecordType::NS, RecordType::RRSIG],
        );

        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = NSEC::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
        assert!(read.type_set().contains(RecordType::A));
        assert!(!read.type_set().contains(RecordType::TXT));
    }
}
