// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! DNSSEC signing and verification algorithms

use std::fmt;

use crate::error::ProtoResult;
use crate::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder, Restrict};

/// DNSSEC signing algorithms, RFC 4034 appendix A.1 and successors
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, PartialOrd, Ord)]
#[non_exhaustive]
pub enum Algorithm {
    /// RSA/SHA-1, RFC 3110 (verification only, legacy)
    RSASHA1,
    /// RSA/SHA-1 for NSEC3 zones, RFC 5155 (verification only, legacy)
    RSASHA1NSEC3SHA1,
    /// RSA/SHA-256, RFC 5702
    RSASHA256,
    /// RSA/SHA-512, RFC 5702
    RSASHA512,
    /// ECDSA P-256 with SHA-256, RFC 6605
    ECDSAP256SHA256,
    /// ECDSA P-384 with SHA-384, RFC 6605
    ECDSAP384SHA384,
    /// Ed25519, RFC 8080
    ED25519,
    /// Unassigned or unsupported algorithm numbers
    Unknown(u8),
}

impl Algorithm {
    /// Convert from the wire-form algorithm number
    pub fn from_u8(value: u8) -> Self {
        match value {
            5 => Self::RSASHA1,
            7 => Self::RSASHA1NSEC3SHA1,
            8 => Self::RSASHA256,
            10 => Self::RSASHA512,
            13 => Self::ECDSAP256SHA256,
            14 => Self::ECDSAP384SHA384,
            15 => Self::ED25519,
            _ => Self::Unknown(value),
        }
    }

    /// Returns true if this implementation can verify signatures made with
    /// this algorithm
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// The set of verifiable algorithms, advertised via the EDNS DAU option
    pub fn supported() -> &'static [Self] {
        &[
            Self::RSASHA1,
            Self::RSASHA1NSEC3SHA1,
            Self::RSASHA256,
            Self::RSASHA512,
            Self::ECDSAP256SHA256,
            Self::ECDSAP384SHA384,
            Self::ED25519,
        ]
    }
}

impl From<Algorithm> for u8 {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::RSASHA1 => 5,
            Algorithm::RSASHA1NSEC3SHA1 => 7,
            Algorithm::RSASHA256 => 8,
            Algorithm::RSASHA512 => 10,
            Algorithm::ECDSAP256SHA256 => 13,
            Algorithm::ECDSAP384SHA384 => 14,
            Algorithm::ED25519 => 15,
            Algorithm::Unknown(value) => value,
        }
    }
}

impl BinEncodable for Algorithm {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        encoder.emit_u8((*self).into())
    }
}

impl<'r> BinDecodable<'r> for Algorithm {
    fn read(decoder: &mut BinDecoder<'_>) -> ProtoResult<Self> {
        Ok(decoder
            .read_u8()
            .map(Restrict::unverified /*Algorithm is safe with any u8*/)
            .map(Self::from_u8)?)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RSASHA1 => "RSASHA1",
            Self::RSASHA1NSEC3SHA1 => "RSASHA1-NSEC3-SHA1",
            Self::RSASHA256 => "RSASHA256",
            Self::RSASHA512 => "RSASHA512",
            Self::ECDSAP256SHA256 => "ECDSAP256SHA256",
            Self::ECDSAP384SHA384 => "ECDSAP384SHA384",
            Self::ED25519 => "ED25519",
            Self::Unknown(value) => return write!(f, "{value}"),
        };
        f.write_str(s)
    }
}
