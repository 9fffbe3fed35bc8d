// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! class of DNS operations, in general always IN for internet

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{ProtoError, ProtoResult};
use crate::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder, Restrict};

/// The DNS Record class
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
#[non_exhaustive]
pub enum DNSClass {
    /// Internet
    IN,
    /// Chaos
    CH,
    /// Hesiod
    HS,
    /// QCLASS NONE, used by dynamic update deletes
    NONE,
    /// QCLASS * (ANY)
    ANY,
    /// Special class for OPT pseudo-records, the value is the requestor's
    /// maximum UDP payload size
    OPT(u16),
    /// Unassigned class values
    Unknown(u16),
}

impl DNSClass {
    /// Convert from u16 to DNSClass
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::IN,
            3 => Self::CH,
            4 => Self::HS,
            254 => Self::NONE,
            255 => Self::ANY,
            _ => Self::Unknown(value),
        }
    }

    /// Construct the OPT class from the requestor's maximum payload size.
    ///
    /// Values lower than 512 are treated as equal to 512 (RFC 6891).
    pub fn for_opt(value: u16) -> Self {
        Self::OPT(value.max(512))
    }
}

impl FromStr for DNSClass {
    type Err = ProtoError;

    fn from_str(str: &str) -> ProtoResult<Self> {
        match str {
            "IN" => Ok(Self::IN),
            "CH" => Ok(Self::CH),
            "HS" => Ok(Self::HS),
            "NONE" => Ok(Self::NONE),
            "ANY" | "*" => Ok(Self::ANY),
            _ => Err(format!("unknown dns class: {str}").into()),
        }
    }
}

impl From<DNSClass> for u16 {
    fn from(class: DNSClass) -> Self {
        match class {
            DNSClass::IN => 1,
            DNSClass::CH => 3,
            DNSClass::HS => 4,
            DNSClass::NONE => 254,
            DNSClass::ANY => 255,
            // the OPT class is the negotiated payload size
            DNSClass::OPT(max_payload) => max_payload.max(512),
            DNSClass::Unknown(code) => code,
        }
    }
}

impl BinEncodable for DNSClass {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        encoder.emit_u16((*self).into())
    }
}

impl<'r> BinDecodable<'r> for DNSClass {
    fn read(decoder: &mut BinDecoder<'_>) -> ProtoResult<Self> {
        Ok(decoder
            .read_u16()
            .map(Restrict::unverified)
            .map(Self::from_u16)?)
    }
}

/// Canonical order per RFC 4034 is by the numeric class value
impl Ord for DNSClass {
    fn cmp(&self, other: &Self) -> Ordering {
        u16::from(*self).cmp(&u16::from(*other))
    }
}

impl PartialOrd for DNSClass {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DNSClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::IN => "IN",
            Self::CH => "CH",
            Self::HS => "HS",
            Self::NONE => "NONE",
            Self::ANY => "ANY",
            Self::OPT(_) => "OPT",
            Self::Unknown(code) => return write!(f, "CLASS{code}"),
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for class in [DNSClass::IN, DNSClass::CH, DNSClass::HS, DNSClass::NONE, DNSClass::ANY] {
            assert_eq!(DNSClass::from_u16(u16::from(class)), class);
        }
    }

    #[test]
    fn test_opt_clamps_payload() {
        assert_eq!(u16::from(DNSClass::for_opt(0)), 512);
        assert_eq!(u16::from(DNSClass::for_opt(512)), 512);
        assert_eq!(u16::from(DNSClass::for_opt(4096)), 4096);
    }
}
