// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! resource record implementation
//!
//! [RFC 1035](https://tools.ietf.org/html/rfc1035) section 4.1.3:
//!
//! ```text
//!                                     1  1  1  1  1  1
//!       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     /                      NAME                     /
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                      TYPE                     |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                     CLASS                     |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                      TTL                      |
//!     |                                               |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                   RDLENGTH                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--|
//!     /                     RDATA                     /
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```

use std::cmp::Ordering;
use std::fmt;

use crate::error::{ProtoError, ProtoErrorKind, ProtoResult};
use crate::rr::domain::Name;
use crate::rr::{DNSClass, RData, RecordData, RecordType};
use crate::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder, Restrict};

/// A resource record: the envelope of (name, type, class, ttl) around a
/// typed payload.
///
/// The generic parameter is the payload type; use the [`RData`] default when
/// the type is not known at compile time.
#[derive(Debug, Eq, Clone)]
pub struct Record<R: RecordData = RData> {
    name: Name,
    rr_type: RecordType,
    dns_class: DNSClass,
    ttl: u32,
    rdata: Option<R>,
}

impl<R: RecordData> Record<R> {
    /// Create a record carrying `rdata`
    pub fn from_rdata(name: Name, ttl: u32, rdata: R) -> Self {
        Self {
            rr_type: rdata.record_type(),
            name,
            dns_class: DNSClass::IN,
            ttl,
            rdata: Some(rdata),
        }
    }

    /// Attempts to convert the generic record into one with payload type `R`
    pub fn try_from(record: Record<RData>) -> Result<Self, Record<RData>> {
        let Record {
            name,
            rr_type,
            dns_class,
            ttl,
            rdata,
        } = record;

        match rdata.map(R::try_from_rdata) {
            None => Ok(Self {
                name,
                rr_type,
                dns_class,
                ttl,
                rdata: None,
            }),
            Some(Ok(rdata)) => Ok(Self {
                name,
                rr_type,
                dns_class,
                ttl,
                rdata: Some(rdata),
            }),
            Some(Err(rdata)) => Err(Record {
                name,
                rr_type,
                dns_class,
                ttl,
                rdata: Some(rdata),
            }),
        }
    }

    /// Converts this record into one with the generic payload
    pub fn into_record_of_rdata(self) -> Record<RData> {
        let Self {
            name,
            rr_type,
            dns_class,
            ttl,
            rdata,
        } = self;

        Record {
            name,
            rr_type,
            dns_class,
            ttl,
            rdata: rdata.map(RecordData::into_rdata),
        }
    }

    /// Returns the owner name of the record
    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the record type
    #[inline]
    pub fn record_type(&self) -> RecordType {
        self.rr_type
    }

    /// Returns the class, generally IN
    #[inline]
    pub fn dns_class(&self) -> DNSClass {
        self.dns_class
    }

    /// Returns the time-to-live in seconds
    #[inline]
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Returns the payload; empty payloads occur in dynamic-update
    /// prerequisites and optionless OPT records
    #[inline]
    pub fn data(&self) -> Option<&R> {
        self.rdata.as_ref()
    }

    /// Returns the payload, consuming the record
    #[inline]
    pub fn into_data(self) -> Option<R> {
        self.rdata
    }

    /// Sets the owner name
    pub fn set_name(&mut self, name: Name) -> &mut Self {
        self.name = name;
        self
    }

    /// Sets the class
    pub fn set_dns_class(&mut self, dns_class: DNSClass) -> &mut Self {
        self.dns_class = dns_class;
        self
    }

    /// Sets the time-to-live
    pub fn set_ttl(&mut self, ttl: u32) -> &mut Self {
        self.ttl = ttl;
        self
    }
}

impl<R: RecordData> BinEncodable for Record<R> {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        self.name.emit(encoder)?;
        self.rr_type.emit(encoder)?;
        self.dns_class.emit(encoder)?;
        encoder.emit_u32(self.ttl)?;

        // RDLENGTH is patched once the payload has been written
        let place = encoder.place_u16()?;
        if let Some(rdata) = &self.rdata {
            rdata.emit(encoder)?;
        }

        let len = encoder.len_since_place(&place);
        assert!(len <= u16::MAX as usize);
        place.replace(encoder, len as u16)
    }
}

impl<'r> BinDecodable<'r> for Record<RData> {
    fn read(decoder: &mut BinDecoder<'r>) -> ProtoResult<Self> {
        let name = Name::read(decoder)?;
        let rr_type = RecordType::read(decoder)?;

        let dns_class = if rr_type == RecordType::OPT {
            // an OPT record must be owned by the root, and its class is the
            // requestor's payload size (RFC 6891)
            if !name.is_root() {
                return Err(ProtoErrorKind::EdnsNameNotRoot(name).into());
            }
            DNSClass::for_opt(decoder.read_u16()?.unverified(/*clamped by for_opt*/))
        } else {
            DNSClass::read(decoder)?
        };

        let ttl = decoder.read_u32()?.unverified(/*any u32 is valid*/);

        let rd_length = decoder
            .read_u16()?
            .verify_unwrap(|len| *len as usize <= decoder.len())
            .map_err(|len| {
                ProtoError::from(format!(
                    "rdata length too large for remaining bytes, need: {len} remain: {}",
                    decoder.len()
                ))
            })?;

        // zero-length rdata expresses "any data" in RFC 2136 prerequisites
        let rdata = if rd_length == 0 {
            None
        } else {
            Some(RData::read(decoder, rr_type, Restrict::new(rd_length))?)
        };

        Ok(Self {
            name,
            rr_type,
            dns_class,
            ttl,
            rdata,
        })
    }
}

impl<R: RecordData> fmt::Display for Record<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{name} {ttl} {class} {ty}",
            name = self.name,
            ttl = self.ttl,
            class = self.dns_class,
            ty = self.rr_type,
        )?;

        if let Some(rdata) = &self.rdata {
            write!(f, " {rdata}")?;
        }

        Ok(())
    }
}

impl<R: RecordData> PartialEq for Record<R> {
    /// Equality per RFC 2136 section 1.1.1: NAME, CLASS, TYPE and RDATA; the
    /// TTL is explicitly excluded.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.rr_type == other.rr_type
            && self.dns_class == other.dns_class
            && self.rdata == other.rdata
    }
}

impl Ord for Record {
    /// Canonical ordering per RFC 4034 section 6.2
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.rr_type.cmp(&other.rr_type))
            .then_with(|| self.dns_class.cmp(&other.dns_class))
            .then_with(|| self.ttl.cmp(&other.ttl))
            .then_with(|| self.rdata.cmp(&other.rdata))
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::rdata::A;

    fn a_record() -> Record {
        Record::from_rdata(
            Name::from_ascii("www.example.com.").unwrap(),
            5,
            RData::A(A::new(192, 168, 0, 1)),
        )
    }

    #[test]
    fn test_emit_and_read() {
        let record = a_record();

        let mut bytes = Vec::with_capacity(64);
        {
            let mut encoder = BinEncoder::new(&mut bytes);
            record.emit(&mut encoder).unwrap();
        }

        let mut decoder = BinDecoder::new(&bytes);
        let got = Record::read(&mut decoder).unwrap();
        assert_eq!(got, record);
        assert_eq!(got.ttl(), 5);
    }

    #[test]
    fn test_eq_ignores_ttl() {
        let record = a_record();
        let mut other = record.clone();
        other.set_ttl(3600);
        assert_eq!(record, other);
    }

    #[test]
    fn test_order() {
        let record = a_record();

        let mut greater_name = record.clone();
        greater_name.set_name(Name::from_ascii("zzz.example.com.").unwrap());

        let mut greater_rdata = record.clone();
        greater_rdata.rdata = Some(RData::A(A::new(192, 168, 0, 255)));

        assert_eq!(record.cmp(&record.clone()), Ordering::Equal);
        assert_eq!(record.cmp(&greater_name), Ordering::Less);
        assert_eq!(record.cmp(&greater_rdata), Ordering::Less);
    }

    #[test]
    fn test_typed_conversion() {
        let record = a_record();
        let typed: Record<A> = Record::try_from(record.clone()).unwrap();
        assert_eq!(typed.data(), Some(&A::new(192, 168, 0, 1)));
        assert_eq!(typed.into_record_of_rdata(), record);

        assert!(Record::<crate::rr::rdata::NS>::try_from(record).is_err());
    }
}
