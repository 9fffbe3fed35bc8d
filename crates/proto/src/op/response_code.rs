// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! response codes, the full 12-bit space of RFC 6895 section 2.3
//!
//! The low 4 bits live in the message header; the high 8 bits live in the
//! TTL field of the OPT record when EDNS is present.

use std::fmt;

/// The response code of a response
#[derive(Debug, Default, PartialEq, Eq, Hash, Copy, Clone)]
#[non_exhaustive]
pub enum ResponseCode {
    /// No error
    #[default]
    NoError,
    /// The name server was unable to interpret the query
    FormErr,
    /// There was a problem with the name server
    ServFail,
    /// The domain name referenced in the query does not exist
    NXDomain,
    /// The name server does not support the requested kind of query
    NotImp,
    /// The name server refuses to perform the operation for policy reasons
    Refused,
    /// A name exists when it should not, RFC 2136
    YXDomain,
    /// An RRset exists when it should not, RFC 2136
    YXRRSet,
    /// An RRset that should exist does not, RFC 2136
    NXRRSet,
    /// The server is not authoritative for the zone, RFC 2136
    NotAuth,
    /// A name is not within the zone of the update, RFC 2136
    NotZone,
    /// The EDNS version is not supported, RFC 6891.
    ///
    /// Shares value 16 with BADSIG; a message carrying an OPT record decodes
    /// 16 as BADVERS, the TSIG error field decodes it as BADSIG.
    BADVERS,
    /// The TSIG signature failed verification, RFC 8945
    BADSIG,
    /// The TSIG key is not recognized, RFC 8945
    BADKEY,
    /// The TSIG time was outside the fudge window, RFC 8945
    BADTIME,
    /// Bad TKEY mode, RFC 2930
    BADMODE,
    /// Duplicate TKEY key name, RFC 2930
    BADNAME,
    /// The TKEY algorithm is not supported, RFC 2930
    BADALG,
    /// Bad truncation of a TSIG MAC, RFC 8945
    BADTRUNC,
    /// Bad or missing server cookie, RFC 7873
    BADCOOKIE,
    /// Unassigned values
    Unknown(u16),
}

impl ResponseCode {
    /// The low 4 bits, stored in the message header
    pub fn low(self) -> u8 {
        (u16::from(self) & 0x000F) as u8
    }

    /// The high 8 bits, stored in the OPT TTL field when EDNS is present
    pub fn high(self) -> u8 {
        ((u16::from(self) & 0x0FF0) >> 4) as u8
    }

    /// Reassemble from the header low bits and the EDNS high bits
    pub fn from_low_high(low: u8, high: u8) -> Self {
        Self::from_u16((u16::from(high) << 4) | u16::from(low & 0x0F))
    }

    /// Decode the combined 12-bit value; 16 decodes as BADVERS, which is
    /// only reachable when an OPT record was present
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::FormErr,
            2 => Self::ServFail,
            3 => Self::NXDomain,
            4 => Self::NotImp,
            5 => Self::Refused,
            6 => Self::YXDomain,
            7 => Self::YXRRSet,
            8 => Self::NXRRSet,
            9 => Self::NotAuth,
            10 => Self::NotZone,
            16 => Self::BADVERS,
            17 => Self::BADKEY,
            18 => Self::BADTIME,
            19 => Self::BADMODE,
            20 => Self::BADNAME,
            21 => Self::BADALG,
            22 => Self::BADTRUNC,
            23 => Self::BADCOOKIE,
            _ => Self::Unknown(value),
        }
    }

    /// Decode the 16-bit error field of a TSIG record, where 16 is BADSIG
    pub fn from_tsig_error(value: u16) -> Self {
        match value {
            16 => Self::BADSIG,
            _ => Self::from_u16(value),
        }
    }
}

impl From<ResponseCode> for u16 {
    fn from(code: ResponseCode) -> Self {
        match code {
            ResponseCode::NoError => 0,
            ResponseCode::FormErr => 1,
            ResponseCode::ServFail => 2,
            ResponseCode::NXDomain => 3,
            ResponseCode::NotImp => 4,
            ResponseCode::Refused => 5,
            ResponseCode::YXDomain => 6,
            ResponseCode::YXRRSet => 7,
            ResponseCode::NXRRSet => 8,
            ResponseCode::NotAuth => 9,
            ResponseCode::NotZone => 10,
            ResponseCode::BADVERS | ResponseCode::BADSIG => 16,
            ResponseCode::BADKEY => 17,
            ResponseCode::BADTIME => 18,
            ResponseCode::BADMODE => 19,
            ResponseCode::BADNAME => 20,
            ResponseCode::BADALG => 21,
            ResponseCode::BADTRUNC => 22,
            ResponseCode::BADCOOKIE => 23,
            ResponseCode::Unknown(value) => value,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoError => "NoError",
            Self::FormErr => "FormErr",
            Self::ServFail => "ServFail",
            Self::NXDomain => "NXDomain",
            Self::NotImp => "NotImp",
            Self::Refused => "Refused",
            Self::YXDomain => "YXDomain",
            Self::YXRRSet => "YXRRSet",
            Self::NXRRSet => "NXRRSet",
            Self::NotAuth => "NotAuth",
            Self::NotZone => "NotZone",
            Self::BADVERS => "BADVERS",
            Self::BADSIG => "BADSIG",
            Self::BADKEY => "BADKEY",
            Self::BADTIME => "BADTIME",
            Self::BADMODE => "BADMODE",
            Self::BADNAME => "BADNAME",
            Self::BADALG => "BADALG",
            Self::BADTRUNC => "BADTRUNC",
            Self::BADCOOKIE => "BADCOOKIE",
            Self::Unknown(value) => return write!(f, "RCODE{value}"),
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_high_split() {
        let code = ResponseCode::BADCOOKIE; // 23 = 0b1_0111
        assert_eq!(code.low(), 7);
        assert_eq!(code.high(), 1);
        assert_eq!(ResponseCode::from_low_high(code.low(), code.high()), code);
    }

    #[test]
    fn test_value_16_disambiguation() {
        assert_eq!(ResponseCode::from_u16(16), ResponseCode::BADVERS);
        assert_eq!(ResponseCode::from_tsig_error(16), ResponseCode::BADSIG);
        assert_eq!(u16::from(ResponseCode::BADVERS), 16);
        assert_eq!(u16::from(ResponseCode::BADSIG), 16);
    }
}
