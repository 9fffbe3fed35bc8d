// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! IPv6 address record data, RFC 3596

use std::fmt;
use std::net::Ipv6Addr;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The AAAA record type, an IPv6 address
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct AAAA(pub Ipv6Addr);

impl AAAA {
    /// Parse the zone-file form, a colon-grouped address
    pub fn parse<'i>(
        mut tokens: impl Iterator<Item = &'i str>,
        _origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        let address = tokens
            .next()
            .ok_or_else(|| ProtoError::from("address not present"))?;
        Ok(Self(Ipv6Addr::from_str(address).map_err(|e| {
            ProtoError::from(format!("illegal ipv6 address: {e}"))
        })?))
    }
}

impl BinEncodable for AAAA {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        self.0.emit(encoder)
    }
}

impl RecordDataDecodable<'_> for AAAA {
    fn read_data(decoder: &mut BinDecoder<'_>, _length: Restrict<u16>) -> ProtoResult<Self> {
        Ipv6Addr::read(decoder).map(Self)
    }
}

impl From<Ipv6Addr> for AAAA {
    fn from(a: Ipv6Addr) -> Self {
        Self(a)
    }
}

impl Deref for AAAA {
    type Target = Ipv6Addr;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for AAAA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = AAAA(Ipv6Addr::from_str("2001:db8::1").unwrap());
        let bytes = rdata.to_bytes().unwrap();
        assert_eq!(bytes.len(), 16);

        let mut decoder = BinDecoder::new(&bytes);
        let read = AAAA::read_data(&mut decoder, Restrict::new(16)).unwrap();
        assert_eq!(read, rdata);
    }
}
