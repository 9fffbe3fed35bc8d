// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! record type definitions

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{ProtoError, ProtoResult};
use crate::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder, Restrict};

/// The type of the resource record, specifying the meaning of the RDATA
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
#[non_exhaustive]
pub enum RecordType {
    /// [RFC 1035](https://tools.ietf.org/html/rfc1035) IPv4 Address record
    A,
    /// [RFC 3596](https://tools.ietf.org/html/rfc3596) IPv6 address record
    AAAA,
    /// [RFC 1035](https://tools.ietf.org/html/rfc1035) All records, aka ANY
    ANY,
    /// [RFC 5936](https://tools.ietf.org/html/rfc5936) Authoritative Zone Transfer
    AXFR,
    /// [RFC 1035](https://tools.ietf.org/html/rfc1035) Canonical name record
    CNAME,
    /// [RFC 4034](https://tools.ietf.org/html/rfc4034) DNS Key record
    DNSKEY,
    /// [RFC 4034](https://tools.ietf.org/html/rfc4034) Delegation signer
    DS,
    /// [RFC 8005](https://tools.ietf.org/html/rfc8005) Host Identity Protocol
    HIP,
    /// [RFC 1996](https://tools.ietf.org/html/rfc1996) Incremental Zone Transfer
    IXFR,
    /// [RFC 1035](https://tools.ietf.org/html/rfc1035) Mail exchange record
    MX,
    /// [RFC 1035](https://tools.ietf.org/html/rfc1035) Name server record
    NS,
    /// [RFC 4034](https://tools.ietf.org/html/rfc4034) Next-Secure record
    NSEC,
    /// [RFC 5155](https://tools.ietf.org/html/rfc5155) NSEC record version 3
    NSEC3,
    /// [RFC 5155](https://tools.ietf.org/html/rfc5155) NSEC3 parameters
    NSEC3PARAM,
    /// [RFC 1035](https://tools.ietf.org/html/rfc1035) Null record, opaque data
    NULL,
    /// [RFC 6891](https://tools.ietf.org/html/rfc6891) EDNS Option pseudo-record
    OPT,
    /// [RFC 1035](https://tools.ietf.org/html/rfc1035) Pointer record
    PTR,
    /// [RFC 4034](https://tools.ietf.org/html/rfc4034) DNSSEC signature
    RRSIG,
    /// [RFC 2535](https://tools.ietf.org/html/rfc2535) and [RFC 2931](https://tools.ietf.org/html/rfc2931) Signature
    SIG,
    /// [RFC 1035](https://tools.ietf.org/html/rfc1035) and [RFC 2308](https://tools.ietf.org/html/rfc2308) Start of authority record
    SOA,
    /// [RFC 2782](https://tools.ietf.org/html/rfc2782) Service locator
    SRV,
    /// [RFC 2930](https://tools.ietf.org/html/rfc2930) Transaction Key
    TKEY,
    /// [RFC 8945](https://tools.ietf.org/html/rfc8945) Transaction Signature
    TSIG,
    /// [RFC 1035](https://tools.ietf.org/html/rfc1035) Text record
    TXT,
    /// Record type of 0, invalid in queries
    ZERO,
    /// Unknown record type, round-tripped as opaque RDATA
    Unknown(u16),
}

impl RecordType {
    /// Returns true if this is an ANY
    #[inline]
    pub fn is_any(self) -> bool {
        self == Self::ANY
    }

    /// Returns true if this is a CNAME
    #[inline]
    pub fn is_cname(self) -> bool {
        self == Self::CNAME
    }

    /// Returns true if this is an SOA
    #[inline]
    pub fn is_soa(self) -> bool {
        self == Self::SOA
    }

    /// Returns true if this is an A or an AAAA record
    #[inline]
    pub fn is_ip_addr(self) -> bool {
        matches!(self, Self::A | Self::AAAA)
    }

    /// Returns true if this is a DNSSEC record type
    #[inline]
    pub fn is_dnssec(self) -> bool {
        matches!(
            self,
            Self::DNSKEY
                | Self::DS
                | Self::NSEC
                | Self::NSEC3
                | Self::NSEC3PARAM
                | Self::RRSIG
                | Self::SIG
                | Self::TSIG
        )
    }

    /// Zone transfers and ANY queries may produce responses too large for
    /// datagrams and are sent over TCP from the start.
    #[inline]
    pub fn needs_reliable_transport(self) -> bool {
        matches!(self, Self::AXFR | Self::IXFR | Self::ANY)
    }
}

impl FromStr for RecordType {
    type Err = ProtoError;

    fn from_str(str: &str) -> ProtoResult<Self> {
        match str {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::AAAA),
            "AXFR" => Ok(Self::AXFR),
            "CNAME" => Ok(Self::CNAME),
            "DNSKEY" => Ok(Self::DNSKEY),
            "DS" => Ok(Self::DS),
            "HIP" => Ok(Self::HIP),
            "IXFR" => Ok(Self::IXFR),
            "MX" => Ok(Self::MX),
            "NS" => Ok(Self::NS),
            "NSEC" => Ok(Self::NSEC),
            "NSEC3" => Ok(Self::NSEC3),
            "NSEC3PARAM" => Ok(Self::NSEC3PARAM),
            "NULL" => Ok(Self::NULL),
            "OPT" => Ok(Self::OPT),
            "PTR" => Ok(Self::PTR),
            "RRSIG" => Ok(Self::RRSIG),
            "SIG" => Ok(Self::SIG),
            "SOA" => Ok(Self::SOA),
            "SRV" => Ok(Self::SRV),
            "TKEY" => Ok(Self::TKEY),
            "TSIG" => Ok(Self::TSIG),
            "TXT" => Ok(Self::TXT),
            "ANY" | "*" => Ok(Self::ANY),
            _ => match str.strip_prefix("TYPE") {
                Some(code) => Ok(Self::from(
                    code.parse::<u16>()
                        .map_err(|_| ProtoError::from(format!("unknown record type: {str}")))?,
                )),
                None => Err(format!("unknown record type: {str}").into()),
            },
        }
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => Self::A,
            28 => Self::AAAA,
            255 => Self::ANY,
            252 => Self::AXFR,
            5 => Self::CNAME,
            48 => Self::DNSKEY,
            43 => Self::DS,
            55 => Self::HIP,
            251 => Self::IXFR,
            15 => Self::MX,
            2 => Self::NS,
            47 => Self::NSEC,
            50 => Self::NSEC3,
            51 => Self::NSEC3PARAM,
            10 => Self::NULL,
            41 => Self::OPT,
            12 => Self::PTR,
            46 => Self::RRSIG,
            24 => Self::SIG,
            6 => Self::SOA,
            33 => Self::SRV,
            249 => Self::TKEY,
            250 => Self::TSIG,
            16 => Self::TXT,
            0 => Self::ZERO,
            _ => Self::Unknown(value),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(rt: RecordType) -> Self {
        match rt {
            RecordType::A => 1,
            RecordType::AAAA => 28,
            RecordType::ANY => 255,
            RecordType::AXFR => 252,
            RecordType::CNAME => 5,
            RecordType::DNSKEY => 48,
            RecordType::DS => 43,
            RecordType::HIP => 55,
            RecordType::IXFR => 251,
            RecordType::MX => 15,
            RecordType::NS => 2,
            RecordType::NSEC => 47,
            RecordType::NSEC3 => 50,
            RecordType::NSEC3PARAM => 51,
            RecordType::NULL => 10,
            RecordType::OPT => 41,
            RecordType::PTR => 12,
            RecordType::RRSIG => 46,
            RecordType::SIG => 24,
            RecordType::SOA => 6,
            RecordType::SRV => 33,
            RecordType::TKEY => 249,
            RecordType::TSIG => 250,
            RecordType::TXT => 16,
            RecordType::ZERO => 0,
            RecordType::Unknown(code) => code,
        }
    }
}

impl BinEncodable for RecordType {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        encoder.emit_u16((*self).into())
    }
}

impl<'r> BinDecodable<'r> for RecordType {
    fn read(decoder: &mut BinDecoder<'_>) -> ProtoResult<Self> {
        Ok(decoder
            .read_u16()
            .map(Restrict::unverified /*RecordType is safe with any u16*/)
            .map(Self::from)?)
    }
}

/// Canonical order per RFC 4034 is by the numeric type value
impl Ord for RecordType {
    fn cmp(&self, other: &Self) -> Ordering {
        u16::from(*self).cmp(&u16::from(*other))
    }
}

impl PartialOrd for RecordType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::ANY => "ANY",
            Self::AXFR => "AXFR",
            Self::CNAME => "CNAME",
            Self::DNSKEY => "DNSKEY",
            Self::DS => "DS",
            Self::HIP => "HIP",
            Self::IXFR => "IXFR",
            Self::MX => "MX",
            Self::NS => "NS",
            Self::NSEC => "NSEC",
            Self::NSEC3 => "NSEC3",
            Self::NSEC3PARAM => "NSEC3PARAM",
            Self::NULL => "NULL",
            Self::OPT => "OPT",
            Self::PTR => "PTR",
            Self::RRSIG => "RRSIG",
            Self::SIG => "SIG",
            Self::SOA => "SOA",
            Self::SRV => "SRV",
            Self::TKEY => "TKEY",
            Self::TSIG => "TSIG",
            Self::TXT => "TXT",
            Self::ZERO => "ZERO",
            Self::Unknown(code) => return write!(f, "TYPE{code}"),
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_round_trip() {
        for code in 0..=300_u16 {
            assert_eq!(u16::from(RecordType::from(code)), code);
        }
    }

    #[test]
    fn test_str_round_trip() {
        for name in [
            "A", "AAAA", "AXFR", "CNAME", "DNSKEY", "DS", "HIP", "IXFR", "MX", "NS", "NSEC",
            "NSEC3", "NSEC3PARAM", "NULL", "OPT", "PTR", "RRSIG", "SIG", "SOA", "SRV", "TKEY",
            "TSIG", "TXT", "ANY",
        ] {
            let rtype: RecordType = name.parse().unwrap();
            assert_eq!(rtype.to_string(), name);
        }

        assert_eq!("TYPE1234".parse::<RecordType>().unwrap(), RecordType::Unknown(1234));
        assert_eq!(RecordType::Unknown(1234).to_string(), "TYPE1234");
    }

    #[test]
    fn test_order() {
        let mut types = vec![RecordType::ANY, RecordType::TXT, RecordType::A, RecordType::NS];
        types.sort();
        assert_eq!(
            types,
            vec![RecordType::A, RecordType::NS, RecordType::TXT, RecordType::ANY]
        );
    }
}
