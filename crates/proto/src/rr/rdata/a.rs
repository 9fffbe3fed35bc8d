// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! IPv4 address record data
//!
//! [RFC 1035, DOMAIN NAMES - IMPLEMENTATION AND SPECIFICATION, November 1987](https://tools.ietf.org/html/rfc1035)
//!
//! ```text
//! 3.4.1. A RDATA format
//!
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    ADDRESS                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!
//! ADDRESS         A 32 bit Internet address.
//!
//! Hosts that have multiple Internet addresses will have multiple A
//! records.
//! ```

use std::fmt;
use std::net::Ipv4Addr;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The A record type, an IPv4 address
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct A(pub Ipv4Addr);

impl A {
    /// Construct a new A record from the octets of the address
    pub fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self(Ipv4Addr::new(a, b, c, d))
    }

    /// Parse the zone-file form, a dotted-quad address
    pub fn parse<'i>(mut tokens: impl Iterator<Item = &'i str>, _origin: Option<&Name>) -> ProtoResult<Self> {
        let address = tokens.next().ok_or_else(|| ProtoError::from("address not present"))?;
        Ok(Self(Ipv4Addr::from_str(address).map_err(|e| {
            ProtoError::from(format!("illegal ipv4 address: {e}"))
        })?))
    }
}

impl BinEncodable for A {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        self.0.emit(encoder)
    }
}

impl RecordDataDecodable<'_> for A {
    fn read_data(decoder: &mut BinDecoder<'_>, _length: Restrict<u16>) -> ProtoResult<Self> {
        Ipv4Addr::read(decoder).map(Self)
    }
}

impl From<Ipv4Addr> for A {
    fn from(a: Ipv4Addr) -> Self {
        Self(a)
    }
}

impl Deref for A {
    type Target = Ipv4Addr;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for A {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = A::new(192, 0, 2, 42);
        let bytes = rdata.to_bytes().unwrap();
        assert_eq!(bytes, vec![192, 0, 2, 42]);

        let mut decoder = BinDecoder::new(&bytes);
        let read = A::read_data(&mut decoder, Restrict::new(4)).unwrap();
        assert_eq!(read, rdata);
    }

    #[test]
    fn test_parse() {
        let rdata = A::parse(["192.0.2.1"].into_iter(), None).unwrap();
        assert_eq!(rdata, A::new(192, 0, 2, 1));
        assert!(A::parse(["not-an-address"].into_iter(), None).is_err());
    }
}
