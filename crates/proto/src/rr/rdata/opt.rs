// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! option record for passing protocol options between client and server,
//! RFC 6891
//!
//! The OPT pseudo-record may appear at most once per message, owned by the
//! root name. Its class field carries the requestor's UDP payload size and
//! its TTL packs `extended-rcode:8 | version:8 | flags:16`; those fields are
//! interpreted by [`crate::op::Edns`], this module handles the option list in
//! the RDATA.

use std::fmt;

use crate::dnssec::{Algorithm, DigestType, Nsec3HashAlgorithm};
use crate::error::ProtoResult;
use crate::serialize::binary::{BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict};

/// The OPT record rdata: a sequence of EDNS options in listed order
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct OPT {
    options: Vec<EdnsOption>,
}

impl OPT {
    /// Creates a new OPT record data from the given options
    pub fn new(options: Vec<EdnsOption>) -> Self {
        Self { options }
    }

    /// Returns the first option for the given code
    pub fn get(&self, code: EdnsCode) -> Option<&EdnsOption> {
        self.options.iter().find(|o| EdnsCode::from(*o) == code)
    }

    /// Appends an option, replacing any existing option of the same code
    pub fn insert(&mut self, option: EdnsOption) {
        let code = EdnsCode::from(&option);
        self.options.retain(|o| EdnsCode::from(o) != code);
        self.options.push(option);
    }

    /// The options in listed order
    pub fn options(&self) -> &[EdnsOption] {
        &self.options
    }

    /// Returns true if no options are present
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl BinEncodable for OPT {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        for option in &self.options {
            encoder.emit_u16(u16::from(EdnsCode::from(option)))?;
            let data = option.option_data();
            encoder.emit_u16(data.len() as u16)?;
            encoder.emit_vec(&data)?;
        }
        Ok(())
    }
}

impl RecordDataDecodable<'_> for OPT {
    fn read_data(decoder: &mut BinDecoder<'_>, length: Restrict<u16>) -> ProtoResult<Self> {
        let end = decoder.index() + length.unverified(/*bounded by rdata*/) as usize;

        let mut options = Vec::new();
        while decoder.index() < end {
            let code = EdnsCode::from(
                decoder.read_u16()?.unverified(/*any code accepted, unknown passthrough*/),
            );
            let option_len = decoder
                .read_u16()?
                .verify_unwrap(|len| decoder.index() + *len as usize <= end)
                .map_err(|_| "option length extends beyond rdata")?;
            let data = decoder
                .read_vec(option_len as usize)?
                .unverified(/*option data is opaque at this layer*/);
            options.push(EdnsOption::from_data(code, data));
        }

        Ok(Self { options })
    }
}

impl fmt::Display for OPT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} options", self.options.len())
    }
}

/// EDNS option codes, RFC 6891 section 6.1.2
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
#[non_exhaustive]
pub enum EdnsCode {
    /// [RFC 6975](https://tools.ietf.org/html/rfc6975) DNSSEC Algorithm Understood
    DAU,
    /// [RFC 6975](https://tools.ietf.org/html/rfc6975) DS Hash Understood
    DHU,
    /// [RFC 6975](https://tools.ietf.org/html/rfc6975) NSEC3 Hash Understood
    N3U,
    /// Unknown or unsupported option code
    Unknown(u16),
}

impl From<u16> for EdnsCode {
    fn from(value: u16) -> Self {
        match value {
            5 => Self::DAU,
            6 => Self::DHU,
            7 => Self::N3U,
            _ => Self::Unknown(value),
        }
    }
}

impl From<EdnsCode> for u16 {
    fn from(code: EdnsCode) -> Self {
        match code {
            EdnsCode::DAU => 5,
            EdnsCode::DHU => 6,
            EdnsCode::N3U => 7,
            EdnsCode::Unknown(value) => value,
        }
    }
}

/// EDNS options; unknown options round-trip as opaque bytes
#[derive(Debug, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum EdnsOption {
    /// The DNSSEC signing algorithms this requestor can validate
    DAU(Vec<Algorithm>),
    /// The DS digest algorithms this requestor can validate
    DHU(Vec<DigestType>),
    /// The NSEC3 hash algorithms this requestor can validate
    N3U(Vec<Nsec3HashAlgorithm>),
    /// An option this library does not interpret
    Unknown(u16, Vec<u8>),
}

impl EdnsOption {
    fn from_data(code: EdnsCode, data: Vec<u8>) -> Self {
        match code {
            EdnsCode::DAU => Self::DAU(data.iter().map(|b| Algorithm::from_u8(*b)).collect()),
            EdnsCode::DHU => Self::DHU(data.iter().map(|b| DigestType::from_u8(*b)).collect()),
            EdnsCode::N3U => Self::N3U(
                data.iter()
                    .map(|b| Nsec3HashAlgorithm::from_u8(*b))
                    .collect(),
            ),
            EdnsCode::Unknown(value) => Self::Unknown(value, data),
        }
    }

    fn option_data(&self) -> Vec<u8> {
        match self {
            Self::DAU(algorithms) => algorithms.iter().map(|a| u8::from(*a)).collect(),
            Self::DHU(digests) => digests.iter().map(|d| u8::from(*d)).collect(),
            Self::N3U(hashes) => hashes.iter().map(|h| u8::from(*h)).collect(),
            Self::Unknown(_, data) => data.clone(),
        }
    }
}

impl From<&EdnsOption> for EdnsCode {
    fn from(option: &EdnsOption) -> Self {
        match option {
            EdnsOption::DAU(..) => Self::DAU,
            EdnsOption::DHU(..) => Self::DHU,
            EdnsOption::N3U(..) => Self::N3U,
            EdnsOption::Unknown(code, ..) => Self::Unknown(*code),
        }
    }
}
