// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! start of authority record defining ownership and defaults for the zone
//!
//! [RFC 1035, DOMAIN NAMES - IMPLEMENTATION AND SPECIFICATION, November 1987](https://tools.ietf.org/html/rfc1035)
//!
//! ```text
//! 3.3.13. SOA RDATA format
//!
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     /                     MNAME                     /
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     /                     RNAME                     /
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    SERIAL                     |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    REFRESH                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                     RETRY                     |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    EXPIRE                     |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    MINIMUM                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The SOA record type
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SOA {
    mname: Name,
    rname: Name,
    serial: u32,
    refresh: u32,
    retry: u32,
    expire: u32,
    minimum: u32,
}

impl SOA {
    /// Create a new SOA record
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mname: Name,
        rname: Name,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    ) -> Self {
        Self {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        }
    }

    /// The name server that was the original source of data for this zone
    pub fn mname(&self) -> &Name {
        &self.mname
    }

    /// The mailbox of the person responsible for this zone
    pub fn rname(&self) -> &Name {
        &self.rname
    }

    /// The version number of the original copy of the zone
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// The interval before the zone should be refreshed
    pub fn refresh(&self) -> u32 {
        self.refresh
    }

    /// The interval before a failed refresh should be retried
    pub fn retry(&self) -> u32 {
        self.retry
    }

    /// The upper bound on the time the zone stays authoritative
    pub fn expire(&self) -> u32 {
        self.expire
    }

    /// The minimum TTL field, the negative-caching TTL of the zone (RFC 2308)
    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    /// Parse the zone-file form: `mname rname serial refresh retry expire minimum`
    pub fn parse<'i>(
        mut tokens: impl Iterator<Item = &'i str>,
        origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        let mut next_name = |field: &'static str| {
            tokens
                .next()
                .ok_or(ProtoError::from(field))
                .and_then(|t| Name::parse(t, origin))
        };
        let mname = next_name("mname not present")?;
        let rname = next_name("rname not present")?;

        let mut next_u32 = |field: &'static str| {
            tokens
                .next()
                .ok_or(ProtoError::from(field))
                .and_then(|t| u32::from_str(t).map_err(|e| format!("{field}: {e}").into()))
        };

        Ok(Self {
            mname,
            rname,
            serial: next_u32("serial not present")?,
            refresh: next_u32("refresh not present")?,
            retry: next_u32("retry not present")?,
            expire: next_u32("expire not present")?,
            minimum: next_u32("minimum not present")?,
        })
    }
}

impl BinEncodable for SOA {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        self.mname.emit(encoder)?;
        self.rname.emit(encoder)?;
        encoder.emit_u32(self.serial)?;
        encoder.emit_u32(self.refresh)?;
        encoder.emit_u32(self.retry)?;
        encoder.emit_u32(self.expire)?;
        encoder.emit_u32(self.minimum)?;
        Ok(())
    }
}

impl RecordDataDecodable<'_> for SOA {
    fn read_data(decoder: &mut BinDecoder<'_>, _length: Restrict<u16>) -> ProtoResult<Self> {
        Ok(Self {
            mname: Name::read(decoder)?,
            rname: Name::read(decoder)?,
            serial: decoder.read_u32()?.unverified(/*any u32 is valid*/),
            refresh: decoder.read_u32()?.unverified(/*any u32 is valid*/),
            retry: decoder.read_u32()?.unverified(/*any u32 is valid*/),
            expire: decoder.read_u32()?.unverified(/*any u32 is valid*/),
            minimum: decoder.read_u32()?.unverified(/*any u32 is valid*/),
        })
    }
}

impl fmt::Display for SOA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{mname} {rname} {serial} {refresh} {retry} {expire} {minimum}",
            mname = self.mname,
            rname = self.rname,
            serial = self.serial,
            refresh = self.refresh,
            retry = self.retry,
            expire = self.expire,
            minimum = self.minimum,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = SOA::new(
            Name::from_ascii("ns1.example.com.").unwrap(),
            Name::from_ascii("hostmaster.example.com.").unwrap(),
            2024010101,
            7200,
            3600,
            1209600,
            60,
        );

        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = SOA::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }

    #[test]
    fn test_parse() {
        let tokens = "ns1.example.com. host.example.com. 1 7200 3600 1209600 60";
        let rdata = SOA::parse(tokens.split_whitespace(), None).unwrap();
        assert_eq!(rdata.serial(), 1);
        assert_eq!(rdata.minimum(), 60);
    }
}
