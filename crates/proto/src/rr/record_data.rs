// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! record data enum variants and the per-type dispatch

use std::fmt;
use std::net::IpAddr;

use crate::dnssec::rdata::DNSSECRData;
use crate::error::{ProtoErrorKind, ProtoResult};
use crate::rr::domain::Name;
use crate::rr::rdata::{A, AAAA, CNAME, HIP, MX, NS, NULL, OPT, PTR, SOA, SRV, TKEY, TSIG, TXT};
use crate::rr::RecordType;
use crate::serialize::binary::{BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict};

/// Record data that knows its own record type, the interface every payload
/// variant exposes and the bound for typed [`crate::rr::Record`]s.
pub trait RecordData:
    Clone + PartialEq + Eq + Sized + fmt::Debug + fmt::Display + BinEncodable + Send + Sync + 'static
{
    /// Convert the generic enum into this type, handing the input back on
    /// variant mismatch
    fn try_from_rdata(data: RData) -> Result<Self, RData>;

    /// Borrow this type out of the generic enum, if the variant matches
    fn try_borrow(data: &RData) -> Option<&Self>;

    /// The record type of this payload
    fn record_type(&self) -> RecordType;

    /// Wrap into the generic enum
    fn into_rdata(self) -> RData;
}

/// The tagged variant over all registered record payloads
#[derive(Debug, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum RData {
    /// An IPv4 address
    A(A),
    /// An IPv6 address
    AAAA(AAAA),
    /// The canonical name of an alias
    CNAME(CNAME),
    /// Host Identity Protocol data
    HIP(HIP),
    /// A mail exchange
    MX(MX),
    /// An authoritative name server
    NS(NS),
    /// Opaque data
    NULL(NULL),
    /// EDNS options, only valid inside an OPT pseudo-record
    OPT(OPT),
    /// A domain name pointer
    PTR(PTR),
    /// Zone authority data
    SOA(SOA),
    /// A service locator
    SRV(SRV),
    /// Transaction key negotiation data
    TKEY(TKEY),
    /// A transaction signature
    TSIG(TSIG),
    /// Text strings
    TXT(TXT),
    /// A DNSSEC record payload
    DNSSEC(DNSSECRData),
    /// A type this library does not recognize; the bytes round-trip
    /// unchanged per RFC 3597
    Unknown {
        /// The numeric record type
        code: u16,
        /// The raw RDATA
        rdata: NULL,
    },
}

impl RData {
    /// The record type of the contained payload
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::A(..) => RecordType::A,
            Self::AAAA(..) => RecordType::AAAA,
            Self::CNAME(..) => RecordType::CNAME,
            Self::HIP(..) => RecordType::HIP,
            Self::MX(..) => RecordType::MX,
            Self::NS(..) => RecordType::NS,
            Self::NULL(..) => RecordType::NULL,
            Self::OPT(..) => RecordType::OPT,
            Self::PTR(..) => RecordType::PTR,
            Self::SOA(..) => RecordType::SOA,
            Self::SRV(..) => RecordType::SRV,
            Self::TKEY(..) => RecordType::TKEY,
            Self::TSIG(..) => RecordType::TSIG,
            Self::TXT(..) => RecordType::TXT,
            Self::DNSSEC(rdata) => rdata.record_type(),
            Self::Unknown { code, .. } => RecordType::Unknown(*code),
        }
    }

    /// Read the payload for `record_type` off the wire.
    ///
    /// Exactly `rdata_length` bytes must be consumed; under- or over-reads
    /// are malformed records.
    pub fn read(
        decoder: &mut BinDecoder<'_>,
        record_type: RecordType,
        rdata_length: Restrict<u16>,
    ) -> ProtoResult<Self> {
        let start_idx = decoder.index();

        let rdata = match record_type {
            RecordType::A => A::read_data(decoder, rdata_length).map(Self::A)?,
            RecordType::AAAA => AAAA::read_data(decoder, rdata_length).map(Self::AAAA)?,
            RecordType::CNAME => CNAME::read_data(decoder, rdata_length).map(Self::CNAME)?,
            RecordType::HIP => HIP::read_data(decoder, rdata_length).map(Self::HIP)?,
            RecordType::MX => MX::read_data(decoder, rdata_length).map(Self::MX)?,
            RecordType::NS => NS::read_data(decoder, rdata_length).map(Self::NS)?,
            RecordType::NULL => NULL::read_data(decoder, rdata_length).map(Self::NULL)?,
            RecordType::OPT => OPT::read_data(decoder, rdata_length).map(Self::OPT)?,
            RecordType::PTR => PTR::read_data(decoder, rdata_length).map(Self::PTR)?,
            RecordType::SOA => SOA::read_data(decoder, rdata_length).map(Self::SOA)?,
            RecordType::SRV => SRV::read_data(decoder, rdata_length).map(Self::SRV)?,
            RecordType::TKEY => TKEY::read_data(decoder, rdata_length).map(Self::TKEY)?,
            RecordType::TSIG => TSIG::read_data(decoder, rdata_length).map(Self::TSIG)?,
            RecordType::TXT => TXT::read_data(decoder, rdata_length).map(Self::TXT)?,
            RecordType::DNSKEY
            | RecordType::DS
            | RecordType::NSEC
            | RecordType::NSEC3
            | RecordType::NSEC3PARAM
            | RecordType::RRSIG
            | RecordType::SIG => {
                DNSSECRData::read(decoder, record_type, rdata_length).map(Self::DNSSEC)?
            }
            _ => NULL::read_data(decoder, rdata_length).map(|rdata| Self::Unknown {
                code: record_type.into(),
                rdata,
            })?,
        };

        decoder.verify_consumed(start_idx, rdata_length.unverified(/*checked here*/))?;
        Ok(rdata)
    }

    /// Parse the zone-file token form of the payload for `record_type`.
    ///
    /// Pseudo and transaction types (OPT, TSIG, TKEY) have no presentation
    /// form and fail here.
    pub fn parse<'i>(
        record_type: RecordType,
        tokens: impl Iterator<Item = &'i str>,
        origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        use crate::dnssec::rdata::{DNSKEY, DS, NSEC, NSEC3, NSEC3PARAM, RRSIG};

        let rdata = match record_type {
            RecordType::A => Self::A(A::parse(tokens, origin)?),
            RecordType::AAAA => Self::AAAA(AAAA::parse(tokens, origin)?),
            RecordType::CNAME => Self::CNAME(CNAME::parse(tokens, origin)?),
            RecordType::HIP => Self::HIP(HIP::parse(tokens, origin)?),
            RecordType::MX => Self::MX(MX::parse(tokens, origin)?),
            RecordType::NS => Self::NS(NS::parse(tokens, origin)?),
            RecordType::PTR => Self::PTR(PTR::parse(tokens, origin)?),
            RecordType::SOA => Self::SOA(SOA::parse(tokens, origin)?),
            RecordType::SRV => Self::SRV(SRV::parse(tokens, origin)?),
            RecordType::TXT => Self::TXT(TXT::parse(tokens, origin)?),
            RecordType::DNSKEY => {
                Self::DNSSEC(DNSSECRData::DNSKEY(DNSKEY::parse(tokens, origin)?))
            }
            RecordType::DS => Self::DNSSEC(DNSSECRData::DS(DS::parse(tokens, origin)?)),
            RecordType::NSEC => Self::DNSSEC(DNSSECRData::NSEC(NSEC::parse(tokens, origin)?)),
            RecordType::NSEC3 => Self::DNSSEC(DNSSECRData::NSEC3(NSEC3::parse(tokens, origin)?)),
            RecordType::NSEC3PARAM => {
                Self::DNSSEC(DNSSECRData::NSEC3PARAM(NSEC3PARAM::parse(tokens, origin)?))
            }
            RecordType::RRSIG => Self::DNSSEC(DNSSECRData::RRSIG(RRSIG::parse(tokens, origin)?)),
            _ => {
                return Err(ProtoErrorKind::Msg(format!(
                    "record type {record_type} has no text form"
                ))
                .into());
            }
        };

        Ok(rdata)
    }

    /// Borrow the CNAME payload, if that is the variant
    pub fn as_cname(&self) -> Option<&CNAME> {
        match self {
            Self::CNAME(rdata) => Some(rdata),
            _ => None,
        }
    }

    /// Borrow the NS payload, if that is the variant
    pub fn as_ns(&self) -> Option<&NS> {
        match self {
            Self::NS(rdata) => Some(rdata),
            _ => None,
        }
    }

    /// Borrow the SOA payload, if that is the variant
    pub fn as_soa(&self) -> Option<&SOA> {
        match self {
            Self::SOA(rdata) => Some(rdata),
            _ => None,
        }
    }

    /// Borrow the DNSSEC payload, if that is the variant
    pub fn as_dnssec(&self) -> Option<&DNSSECRData> {
        match self {
            Self::DNSSEC(rdata) => Some(rdata),
            _ => None,
        }
    }

    /// The address of an A or AAAA payload
    pub fn ip_addr(&self) -> Option<IpAddr> {
        match self {
            Self::A(a) => Some(IpAddr::V4(a.0)),
            Self::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
            _ => None,
        }
    }
}

impl BinEncodable for RData {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        match self {
            Self::A(rdata) => rdata.emit(encoder),
            Self::AAAA(rdata) => rdata.emit(encoder),
            Self::CNAME(rdata) => rdata.emit(encoder),
            Self::HIP(rdata) => rdata.emit(encoder),
            Self::MX(rdata) => rdata.emit(encoder),
            Self::NS(rdata) => rdata.emit(encoder),
            Self::NULL(rdata) => rdata.emit(encoder),
            Self::OPT(rdata) => rdata.emit(encoder),
            Self::PTR(rdata) => rdata.emit(encoder),
            Self::SOA(rdata) => rdata.emit(encoder),
            Self::SRV(rdata) => rdata.emit(encoder),
            Self::TKEY(rdata) => rdata.emit(encoder),
            Self::TSIG(rdata) => rdata.emit(encoder),
            Self::TXT(rdata) => rdata.emit(encoder),
            Self::DNSSEC(rdata) => rdata.emit(encoder),
            Self::Unknown { rdata, .. } => rdata.emit(encoder),
        }
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(rdata) => rdata.fmt(f),
            Self::AAAA(rdata) => rdata.fmt(f),
            Self::CNAME(rdata) => rdata.fmt(f),
            Self::HIP(rdata) => rdata.fmt(f),
            Self::MX(rdata) => rdata.fmt(f),
            Self::NS(rdata) => rdata.fmt(f),
            Self::NULL(rdata) => rdata.fmt(f),
            Self::OPT(rdata) => rdata.fmt(f),
            Self::PTR(rdata) => rdata.fmt(f),
            Self::SOA(rdata) => rdata.fmt(f),
            Self::SRV(rdata) => rdata.fmt(f),
            Self::TKEY(rdata) => rdata.fmt(f),
            Self::TSIG(rdata) => rdata.fmt(f),
            Self::TXT(rdata) => rdata.fmt(f),
            Self::DNSSEC(rdata) => rdata.fmt(f),
            Self::Unknown { rdata, .. } => rdata.fmt(f),
        }
    }
}

/// RDATA ordering in canonical form is by the uncompressed wire encoding
impl Ord for RData {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let mut self_buf = Vec::new();
        let mut other_buf = Vec::new();
        {
            let mut encoder = BinEncoder::new(&mut self_buf);
            encoder.set_canonical_form(true);
            let _ = self.emit(&mut encoder);
        }
        {
            let mut encoder = BinEncoder::new(&mut other_buf);
            encoder.set_canonical_form(true);
            let _ = other.emit(&mut encoder);
        }
        self_buf.cmp(&other_buf)
    }
}

impl PartialOrd for RData {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl RecordData for RData {
    fn try_from_rdata(data: RData) -> Result<Self, RData> {
        Ok(data)
    }

    fn try_borrow(data: &RData) -> Option<&Self> {
        Some(data)
    }

    fn record_type(&self) -> RecordType {
        self.record_type()
    }

    fn into_rdata(self) -> RData {
        self
    }
}

macro_rules! rdata_variant {
    ($name:ident) => {
        impl RecordData for $name {
            fn try_from_rdata(data: RData) -> Result<Self, RData> {
                match data {
                    RData::$name(rdata) => Ok(rdata),
                    _ => Err(data),
                }
            }

            fn try_borrow(data: &RData) -> Option<&Self> {
                match data {
                    RData::$name(rdata) => Some(rdata),
                    _ => None,
                }
            }

            fn record_type(&self) -> RecordType {
                RecordType::$name
            }

            fn into_rdata(self) -> RData {
                RData::$name(self)
            }
        }
    };
}

rdata_variant!(A);
rdata_variant!(AAAA);
rdata_variant!(CNAME);
rdata_variant!(HIP);
rdata_variant!(MX);
rdata_variant!(NS);
rdata_variant!(NULL);
rdata_variant!(OPT);
rdata_variant!(PTR);
rdata_variant!(SOA);
rdata_variant!(SRV);
rdata_variant!(TKEY);
rdata_variant!(TSIG);
rdata_variant!(TXT);

macro_rules! dnssec_rdata_variant {
    ($name:ident) => {
        impl RecordData for crate::dnssec::rdata::$name {
            fn try_from_rdata(data: RData) -> Result<Self, RData> {
                match data {
                    RData::DNSSEC(DNSSECRData::$name(rdata)) => Ok(rdata),
                    _ => Err(data),
                }
            }

            fn try_borrow(data: &RData) -> Option<&Self> {
                match data {
                    RData::DNSSEC(DNSSECRData::$name(rdata)) => Some(rdata),
                    _ => None,
                }
            }

            fn record_type(&self) -> RecordType {
                RecordType::$name
            }

            fn into_rdata(self) -> RData {
                RData::DNSSEC(DNSSECRData::$name(self))
            }
        }
    };
}

dnssec_rdata_variant!(DNSKEY);
dnssec_rdata_variant!(DS);
dnssec_rdata_variant!(NSEC);
dnssec_rdata_variant!(NSEC3);
dnssec_rdata_variant!(NSEC3PARAM);
dnssec_rdata_variant!(RRSIG);
dnssec_rdata_variant!(SIG);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::binary::BinDecoder;

    #[test]
    fn test_read_checks_length() {
        // A record rdata of 4 octets, but claimed length 5
        let bytes = [192, 0, 2, 1, 99];
        let mut decoder = BinDecoder::new(&bytes);
        assert!(RData::read(&mut decoder, RecordType::A, Restrict::new(5)).is_err());
    }

    #[test]
    fn test_unknown_passthrough() {
        let bytes = [1, 2, 3, 4, 5];
        let mut decoder = BinDecoder::new(&bytes);
        let rdata = RData::read(
            &mut decoder,
            RecordType::Unknown(4711),
            Restrict::new(bytes.len() as u16),
        )
        .unwrap();

        assert_eq!(rdata.record_type(), RecordType::Unknown(4711));
        assert_eq!(rdata.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_canonical_rdata_order() {
        let small = RData::A(A::new(1, 1, 1, 1));
        let large = RData::A(A::new(200, 1, 1, 1));
        assert!(small < large);
    }

    #[test]
    fn test_typed_conversions() {
        let rdata = RData::A(A::new(127, 0, 0, 1));
        assert_eq!(A::try_borrow(&rdata), Some(&A::new(127, 0, 0, 1)));
        assert!(NS::try_borrow(&rdata).is_none());
        let a = A::try_from_rdata(rdata).unwrap();
        assert_eq!(a.into_rdata(), RData::A(A::new(127, 0, 0, 1)));
    }
}
