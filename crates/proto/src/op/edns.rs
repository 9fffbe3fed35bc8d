// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Extended DNS options, RFC 6891
//!
//! `Edns` is the interpreted view over the OPT pseudo-record: the record's
//! class field carries the requestor's maximum UDP payload size, and its TTL
//! packs `extended-rcode:8 | version:8 | flags:16` where only the DO bit of
//! the flags is assigned.

use std::fmt;

use crate::error::ProtoResult;
use crate::rr::domain::Name;
use crate::rr::rdata::opt::{EdnsCode, EdnsOption, OPT};
use crate::rr::{DNSClass, RData, Record};
use crate::serialize::binary::{BinEncodable, BinEncoder};

const DNSSEC_OK_MASK: u16 = 0x8000;

/// The EDNS state of a message
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Edns {
    rcode_high: u8,
    version: u8,
    flags: u16,
    max_payload: u16,
    options: OPT,
}

impl Default for Edns {
    fn default() -> Self {
        Self {
            rcode_high: 0,
            version: 0,
            flags: 0,
            max_payload: 512,
            options: OPT::default(),
        }
    }
}

impl Edns {
    /// Creates a new EDNS state with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// The high 8 bits of the extended 12-bit response code
    pub fn rcode_high(&self) -> u8 {
        self.rcode_high
    }

    /// The EDNS version; only 0 is specified
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The DO bit: the requestor can validate DNSSEC records
    pub fn dnssec_ok(&self) -> bool {
        self.flags & DNSSEC_OK_MASK != 0
    }

    /// The maximum datagram size the requestor can reassemble
    pub fn max_payload(&self) -> u16 {
        self.max_payload
    }

    /// Returns the option with the given code
    pub fn option(&self, code: EdnsCode) -> Option<&EdnsOption> {
        self.options.get(code)
    }

    /// The options of the OPT record
    pub fn options(&self) -> &OPT {
        &self.options
    }

    /// Mutable access to the options
    pub fn options_mut(&mut self) -> &mut OPT {
        &mut self.options
    }

    /// Sets the high bits of the extended response code
    pub fn set_rcode_high(&mut self, rcode_high: u8) -> &mut Self {
        self.rcode_high = rcode_high;
        self
    }

    /// Sets the EDNS version
    pub fn set_version(&mut self, version: u8) -> &mut Self {
        self.version = version;
        self
    }

    /// Sets the DO bit
    pub fn set_dnssec_ok(&mut self, dnssec_ok: bool) -> &mut Self {
        if dnssec_ok {
            self.flags |= DNSSEC_OK_MASK;
        } else {
            self.flags &= !DNSSEC_OK_MASK;
        }
        self
    }

    /// Sets the maximum payload size; values below 512 are treated as 512
    pub fn set_max_payload(&mut self, max_payload: u16) -> &mut Self {
        self.max_payload = max_payload.max(512);
        self
    }
}

impl From<&Record> for Edns {
    /// Interpret an OPT record; the caller must have verified the type
    fn from(record: &Record) -> Self {
        debug_assert_eq!(record.record_type(), crate::rr::RecordType::OPT);

        let rcode_high = ((record.ttl() & 0xFF00_0000) >> 24) as u8;
        let version = ((record.ttl() & 0x00FF_0000) >> 16) as u8;
        let flags = (record.ttl() & 0x0000_FFFF) as u16;
        let max_payload = u16::from(record.dns_class());

        let options = match record.data() {
            Some(RData::OPT(options)) => options.clone(),
            _ => OPT::default(),
        };

        Self {
            rcode_high,
            version,
            flags,
            max_payload,
            options,
        }
    }
}

impl From<&Edns> for Record {
    /// Build the OPT pseudo-record for this EDNS state
    fn from(edns: &Edns) -> Self {
        let mut ttl = u32::from(edns.rcode_high()) << 24;
        ttl |= u32::from(edns.version()) << 16;
        ttl |= u32::from(edns.flags);

        let mut record = Self::from_rdata(Name::root(), ttl, RData::OPT(edns.options().clone()));
        record.set_dns_class(DNSClass::for_opt(edns.max_payload()));
        record
    }
}

impl BinEncodable for Edns {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        Record::from(self).emit(encoder)
    }
}

impl fmt::Display for Edns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version: {version} dnssec_ok: {dnssec_ok} max_payload: {max_payload} opts: {opts}",
            version = self.version,
            dnssec_ok = self.dnssec_ok(),
            max_payload = self.max_payload,
            opts = self.options.options().len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dnssec::Algorithm;

    #[test]
    fn test_record_round_trip() {
        let mut edns = Edns::new();
        edns.set_dnssec_ok(true)
            .set_max_payload(4096)
            .set_version(0)
            .set_rcode_high(0x01);
        edns.options_mut()
            .insert(EdnsOption::DAU(Algorithm::supported().to_vec()));

        let record = Record::from(&edns);
        let decoded = Edns::from(&record);

        assert_eq!(decoded, edns);
        assert!(decoded.dnssec_ok());
        assert_eq!(decoded.max_payload(), 4096);
        assert_eq!(decoded.rcode_high(), 0x01);
    }

    #[test]
    fn test_payload_clamped() {
        let mut edns = Edns::new();
        edns.set_max_payload(100);
        assert_eq!(edns.max_payload(), 512);
    }
}
