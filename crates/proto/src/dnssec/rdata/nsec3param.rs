// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! parameters of the NSEC3 chain of a zone, RFC 5155 section 4

use std::fmt;

use data_encoding::HEXUPPER_PERMISSIVE;

use super::nsec3::Nsec3HashAlgorithm;
use crate::error::ProtoResult;
use crate::serialize::binary::{
    BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The NSEC3PARAM record data
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NSEC3PARAM {
    hash_algorithm: Nsec3HashAlgorithm,
    iterations: u16,
    salt: Vec<u8>,
}

impl NSEC3PARAM {
    /// Construct new NSEC3PARAM rdata
    pub fn new(hash_algorithm: Nsec3HashAlgorithm, iterations: u16, salt: Vec<u8>) -> Self {
        Self {
            hash_algorithm,
            iterations,
            salt,
        }
    }

    /// The hash algorithm of the zone's NSEC3 chain
    pub fn hash_algorithm(&self) -> Nsec3HashAlgorithm {
        self.hash_algorithm
    }

    /// The iteration count of the zone's NSEC3 chain
    pub fn iterations(&self) -> u16 {
        self.iterations
    }

    /// The salt of the zone's NSEC3 chain
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Parse the zone-file form: `hash-alg flags iterations salt`
    pub fn parse<'i>(
        mut tokens: impl Iterator<Item = &'i str>,
        _origin: Option<&crate::rr::domain::Name>,
    ) -> ProtoResult<Self> {
        use crate::error::ProtoError;

        let mut next = |field: &'static str| tokens.next().ok_or(ProtoError::from(field));

        let hash_algorithm = Nsec3HashAlgorithm::from_u8(
            next("hash algorithm not present")?
                .parse()
                .map_err(|e| ProtoError::from(format!("hash algorithm: {e}")))?,
        );
        let _flags: u8 = next("flags not present")?
            .parse()
            .map_err(|e| ProtoError::from(format!("flags: {e}")))?;
        let iterations = next("iterations not present")?
            .parse()
            .map_err(|e| ProtoError::from(format!("iterations: {e}")))?;
        let salt = super::nsec3::parse_salt(next("salt not present")?)?;

        Ok(Self::new(hash_algorithm, iterations, salt))
    }
}

impl BinEncodable for NSEC3PARAM {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        encoder.emit_u8(self.hash_algorithm.into())?;
        // flags must be zero in NSEC3PARAM records
        encoder.emit_u8(0)?;
        encoder.emit_u16(self.iterations)?;
        encoder.emit_u8(self.salt.len() as u8)?;
        encoder.emit_vec(&self.salt)
    }
}

impl RecordDataDecodable<'_> for NSEC3PARAM {
    fn read_data(decoder: &mut BinDecoder<'_>, _length: Restrict<u16>) -> ProtoResult<Self> {
        let hash_algorithm =
            Nsec3HashAlgorithm::from_u8(decoder.read_u8()?.unverified(/*unknown passthrough*/));
        let _flags = decoder.read_u8()?.unverified(/*must be zero, ignored on read*/);
        let iterations = decoder.read_u16()?.unverified(/*valid as any u16*/);
        let salt_len = decoder.read_u8()?.unverified(/*bounded by read_vec*/);
        let salt = decoder.read_vec(salt_len as usize)?.unverified(/*opaque*/);

        Ok(Self {
            hash_algorithm,
            iterations,
            salt,
        })
    }
}

impl fmt::Display for NSEC3PARAM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let salt = if self.salt.is_empty() {
            "-".to_string()
        } else {
            HEXUPPER_PERMISSIVE.encode(&self.salt)
        };
        write!(
            f,
            "{} 0 {} {salt}",
            u8::from(self.hash_algorithm),
            self.iterations,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = NSEC3PARAM::new(Nsec3HashAlgorithm::SHA1, 12, vec![0xAA, 0xBB, 0xCC, 0xDD]);
        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = NSEC3PARAM::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }
}
