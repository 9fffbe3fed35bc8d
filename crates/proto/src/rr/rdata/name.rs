// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Record types whose RDATA is a single domain name: NS, CNAME, PTR.
//!
//! These are RFC 1035 "standard" types: their names may be compressed on the
//! wire, and the DNSSEC canonical form lowercases them.

use std::fmt;
use std::ops::Deref;

use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

macro_rules! name_rdata {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, PartialEq, Eq, Hash, Clone)]
        pub struct $name(pub Name);

        impl $name {
            /// Parse the zone-file form, a single possibly-relative name
            pub fn parse<'i>(
                mut tokens: impl Iterator<Item = &'i str>,
                origin: Option<&Name>,
            ) -> ProtoResult<Self> {
                let token = tokens
                    .next()
                    .ok_or_else(|| ProtoError::from("name not present"))?;
                Name::parse(token, origin).map(Self)
            }
        }

        impl BinEncodable for $name {
            fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
                self.0.emit(encoder)
            }
        }

        impl RecordDataDecodable<'_> for $name {
            fn read_data(decoder: &mut BinDecoder<'_>, _length: Restrict<u16>) -> ProtoResult<Self> {
                Name::read(decoder).map(Self)
            }
        }

        impl Deref for $name {
            type Target = Name;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

name_rdata!(NS, "The NS record type, an authoritative name server");
name_rdata!(CNAME, "The CNAME record type, the canonical name for an alias");
name_rdata!(PTR, "The PTR record type, a domain name pointer");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = NS(Name::from_ascii("ns.example.com.").unwrap());
        let bytes = rdata.to_bytes().unwrap();

        let mut decoder = BinDecoder::new(&bytes);
        let read = NS::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }

    #[test]
    fn test_parse_with_origin() {
        let origin = Name::from_ascii("example.com.").unwrap();
        let rdata = CNAME::parse(["target"].into_iter(), Some(&origin)).unwrap();
        assert_eq!(rdata.0, Name::from_ascii("target.example.com.").unwrap());
    }
}
