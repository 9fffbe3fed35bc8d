// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Transaction Key, RFC 2930
//!
//! TKEY establishes shared secret keys for use with TSIG. This library
//! implements the codec; key negotiation itself belongs to higher layers.

use std::fmt;

use data_encoding::BASE64;

use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The TKEY record data
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TKEY {
    algorithm: Name,
    inception: u32,
    expiration: u32,
    mode: TkeyMode,
    error: u16,
    key: Vec<u8>,
    other: Vec<u8>,
}

/// TKEY modes, RFC 2930 section 2.5
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[non_exhaustive]
pub enum TkeyMode {
    /// Server assignment
    ServerAssignment,
    /// Diffie-Hellman exchange
    DiffieHellman,
    /// GSS-API negotiation
    GssApi,
    /// Resolver assignment
    ResolverAssignment,
    /// Key deletion
    KeyDeletion,
    /// Unassigned mode values
    Unknown(u16),
}

impl From<u16> for TkeyMode {
    fn from(value: u16) -> Self {
        match value {
            1 => Self::ServerAssignment,
            2 => Self::DiffieHellman,
            3 => Self::GssApi,
            4 => Self::ResolverAssignment,
            5 => Self::KeyDeletion,
            _ => Self::Unknown(value),
        }
    }
}

impl From<TkeyMode> for u16 {
    fn from(mode: TkeyMode) -> Self {
        match mode {
            TkeyMode::ServerAssignment => 1,
            TkeyMode::DiffieHellman => 2,
            TkeyMode::GssApi => 3,
            TkeyMode::ResolverAssignment => 4,
            TkeyMode::KeyDeletion => 5,
            TkeyMode::Unknown(value) => value,
        }
    }
}

impl TKEY {
    /// Construct new TKEY rdata
    pub fn new(
        algorithm: Name,
        inception: u32,
        expiration: u32,
        mode: TkeyMode,
        error: u16,
        key: Vec<u8>,
        other: Vec<u8>,
    ) -> Self {
        Self {
            algorithm,
            inception,
            expiration,
            mode,
            error,
            key,
            other,
        }
    }

    /// The algorithm the negotiated key is for, e.g. a TSIG algorithm name
    pub fn algorithm(&self) -> &Name {
        &self.algorithm
    }

    /// Seconds since the epoch from which the key is valid
    pub fn inception(&self) -> u32 {
        self.inception
    }

    /// Seconds since the epoch until which the key is valid
    pub fn expiration(&self) -> u32 {
        self.expiration
    }

    /// The negotiation mode
    pub fn mode(&self) -> TkeyMode {
        self.mode
    }

    /// Extended rcode carrying TKEY errors
    pub fn error(&self) -> u16 {
        self.error
    }

    /// The key exchange data
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Other data, unused by the defined modes
    pub fn other(&self) -> &[u8] {
        &self.other
    }
}

impl BinEncodable for TKEY {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        self.algorithm.emit_as_canonical(encoder, false)?;
        encoder.emit_u32(self.inception)?;
        encoder.emit_u32(self.expiration)?;
        encoder.emit_u16(self.mode.into())?;
        encoder.emit_u16(self.error)?;
        encoder.emit_u16(self.key.len() as u16)?;
        encoder.emit_vec(&self.key)?;
        encoder.emit_u16(self.other.len() as u16)?;
        encoder.emit_vec(&self.other)
    }
}

impl RecordDataDecodable<'_> for TKEY {
    fn read_data(decoder: &mut BinDecoder<'_>, length: Restrict<u16>) -> ProtoResult<Self> {
        let end = decoder.index() + length.unverified(/*bounded by rdata*/) as usize;

        let algorithm = Name::read(decoder)?;
        let inception = decoder.read_u32()?.unverified(/*valid as any u32*/);
        let expiration = decoder.read_u32()?.unverified(/*valid as any u32*/);
        let mode = TkeyMode::from(decoder.read_u16()?.unverified(/*unknown passthrough*/));
        let error = decoder.read_u16()?.unverified(/*valid as any u16*/);

        let key_len = decoder
            .read_u16()?
            .verify_unwrap(|len| decoder.index() + *len as usize <= end)
            .map_err(|_| ProtoError::from("tkey key length extends beyond rdata"))?;
        let key = decoder.read_vec(key_len as usize)?.unverified(/*opaque*/);

        let other_len = decoder
            .read_u16()?
            .verify_unwrap(|len| decoder.index() + *len as usize <= end)
            .map_err(|_| ProtoError::from("tkey other length extends beyond rdata"))?;
        let other = decoder.read_vec(other_len as usize)?.unverified(/*opaque*/);

        Ok(Self {
            algorithm,
            inception,
            expiration,
            mode,
            error,
            key,
            other,
        })
    }
}

impl fmt::Display for TKEY {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.algorithm,
            self.inception,
            self.expiration,
            u16::from(self.mode),
            self.error,
            BASE64.encode(&self.key),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = TKEY::new(
            Name::from_ascii("hmac-sha256.").unwrap(),
            1_700_000_000,
            1_700_003_600,
            TkeyMode::DiffieHellman,
            0,
            vec![1, 2, 3, 4],
            Vec::new(),
        );

        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = TKEY::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }
}
