// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! hashed denial of existence, RFC 5155
//!
//! ```text
//! 3.2.  NSEC3 RDATA Wire Format
//!
//!   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  |   Hash Alg.   |     Flags     |          Iterations           |
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  |  Salt Length  |                     Salt                      /
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  |  Hash Length  |             Next Hashed Owner Name            /
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  /                         Type Bit Maps                         /
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use std::fmt;

use data_encoding::{BASE32_DNSSEC, HEXUPPER_PERMISSIVE};

use crate::dnssec::DigestType;
use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::rr::type_bit_map::RecordTypeSet;
use crate::rr::RecordType;
use crate::serialize::binary::{
    BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The NSEC3 record data
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NSEC3 {
    hash_algorithm: Nsec3HashAlgorithm,
    opt_out: bool,
    iterations: u16,
    salt: Vec<u8>,
    next_hashed_owner_name: Vec<u8>,
    type_bit_maps: RecordTypeSet,
}

impl NSEC3 {
    /// Construct new NSEC3 rdata
    pub fn new(
        hash_algorithm: Nsec3HashAlgorithm,
        opt_out: bool,
        iterations: u16,
        salt: Vec<u8>,
        next_hashed_owner_name: Vec<u8>,
        types: impl IntoIterator<Item = RecordType>,
    ) -> Self {
        Self {
            hash_algorithm,
            opt_out,
            iterations,
            salt,
            next_hashed_owner_name,
            type_bit_maps: RecordTypeSet::new(types),
        }
    }

    /// The hash algorithm of the owner and next-owner hashes
    pub fn hash_algorithm(&self) -> Nsec3HashAlgorithm {
        self.hash_algorithm
    }

    /// The opt-out flag: unsigned delegations may exist between this owner
    /// and the next
    pub fn opt_out(&self) -> bool {
        self.opt_out
    }

    /// Additional hash iterations applied over the initial hash
    pub fn iterations(&self) -> u16 {
        self.iterations
    }

    /// The salt appended to the name on every hash iteration
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// The hash of the next owner in hash order
    pub fn next_hashed_owner_name(&self) -> &[u8] {
        &self.next_hashed_owner_name
    }

    /// The types present at the original owner name
    pub fn type_set(&self) -> &RecordTypeSet {
        &self.type_bit_maps
    }

    /// Hash `name` with this record's parameters
    pub fn hash_name(&self, name: &Name) -> ProtoResult<Vec<u8>> {
        self.hash_algorithm
            .hash(&self.salt, name, self.iterations)
    }

    /// Parse the zone-file form:
    /// `hash-alg flags iterations salt next-hashed-owner type [type...]`
    pub fn parse<'i>(
        mut tokens: impl Iterator<Item = &'i str>,
        _origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        let mut next = |field: &'static str| tokens.next().ok_or(ProtoError::from(field));

        let hash_algorithm = Nsec3HashAlgorithm::from_u8(
            next("hash algorithm not present")?
                .parse()
                .map_err(|e| ProtoError::from(format!("hash algorithm: {e}")))?,
        );
        let flags: u8 = next("flags not present")?
            .parse()
            .map_err(|e| ProtoError::from(format!("flags: {e}")))?;
        let iterations = next("iterations not present")?
            .parse()
            .map_err(|e| ProtoError::from(format!("iterations: {e}")))?;
        let salt = parse_salt(next("salt not present")?)?;
        let next_hashed_owner_name = BASE32_DNSSEC
            .decode(next("next hashed owner not present")?.to_lowercase().as_bytes())
            .map_err(|e| ProtoError::from(format!("next hashed owner: {e}")))?;

        let types = tokens
            .map(str::parse)
            .collect::<ProtoResult<Vec<RecordType>>>()?;

        Ok(Self::new(
            hash_algorithm,
            flags & 0b0000_0001 != 0,
            iterations,
            salt,
            next_hashed_owner_name,
            types,
        ))
    }
}

/// A salt of `-` means empty in presentation form
pub(crate) fn parse_salt(token: &str) -> ProtoResult<Vec<u8>> {
    if token == "-" {
        return Ok(Vec::new());
    }
    HEXUPPER_PERMISSIVE
        .decode(token.as_bytes())
        .map_err(|e| ProtoError::from(format!("salt: {e}")))
}

impl BinEncodable for NSEC3 {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        encoder.emit_u8(self.hash_algorithm.into())?;
        encoder.emit_u8(if self.opt_out { 1 } else { 0 })?;
        encoder.emit_u16(self.iterations)?;
        encoder.emit_u8(self.salt.len() as u8)?;
        encoder.emit_vec(&self.salt)?;
        encoder.emit_u8(self.next_hashed_owner_name.len() as u8)?;
        encoder.emit_vec(&self.next_hashed_owner_name)?;
        self.type_bit_maps.emit(encoder)
    }
}

impl<'r> RecordDataDecodable<'r> for NSEC3 {
    fn read_data(decoder: &mut BinDecoder<'r>, length: Restrict<u16>) -> ProtoResult<Self> {
        let start_idx = decoder.index();

        let hash_algorithm =
            Nsec3HashAlgorithm::from_u8(decoder.read_u8()?.unverified(/*unknown passthrough*/));
        let flags = decoder.read_u8()?.unverified(/*only bit 0 is assigned*/);
        let opt_out = flags & 0b0000_0001 != 0;
        let iterations = decoder.read_u16()?.unverified(/*valid as any u16*/);

        let salt_len = decoder.read_u8()?.unverified(/*bounded by read_vec*/);
        let salt = decoder.read_vec(salt_len as usize)?.unverified(/*opaque*/);

        let hash_len = decoder.read_u8()?.unverified(/*bounded by read_vec*/);
        let next_hashed_owner_name =
            decoder.read_vec(hash_len as usize)?.unverified(/*opaque*/);

        let bit_map_len = (length.unverified(/*bounded by sub below*/) as usize)
            .checked_sub(decoder.index() - start_idx)
            .ok_or_else(|| ProtoError::from("invalid rdata length in NSEC3"))?;
        let type_bit_maps = RecordTypeSet::read_data(decoder, Restrict::new(bit_map_len as u16))?;

        Ok(Self {
            hash_algorithm,
            opt_out,
            iterations,
            salt,
            next_hashed_owner_name,
            type_bit_maps,
        })
    }
}

impl fmt::Display for NSEC3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let salt = if self.salt.is_empty() {
            "-".to_string()
        } else {
            HEXUPPER_PERMISSIVE.encode(&self.salt)
        };

        write!(
            f,
            "{alg} {flags} {iterations} {salt} {next} {types}",
            alg = u8::from(self.hash_algorithm),
            flags = u8::from(self.opt_out),
            iterations = self.iterations,
            next = BASE32_DNSSEC.encode(&self.next_hashed_owner_name),
            types = self.type_bit_maps,
        )
    }
}

/// NSEC3 hash algorithms; only SHA-1 is assigned (RFC 5155 section 11)
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
#[non_exhaustive]
pub enum Nsec3HashAlgorithm {
    /// SHA-1, the only assigned algorithm
    SHA1,
    /// Unassigned values
    Unknown(u8),
}

impl Nsec3HashAlgorithm {
    /// Convert from the wire-form algorithm number
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::SHA1,
            _ => Self::Unknown(value),
        }
    }

    /// The set of computable hashes, advertised via the EDNS N3U option
    pub fn supported() -> &'static [Self] {
        &[Self::SHA1]
    }

    /// Hash a name per RFC 5155 section 5:
    ///
    /// ```text
    /// IH(salt, x, 0) = H(x || salt)
    /// IH(salt, x, k) = H(IH(salt, x, k-1) || salt), if k > 0
    /// ```
    ///
    /// where `x` is the canonical (lowercase, uncompressed) wire form of the
    /// name.
    pub fn hash(self, salt: &[u8], name: &Name, iterations: u16) -> ProtoResult<Vec<u8>> {
        let digest_type = match self {
            Self::SHA1 => DigestType::SHA1,
            Self::Unknown(value) => {
                return Err(ProtoError::from(format!(
                    "unsupported nsec3 hash algorithm: {value}"
                )));
            }
        };

        let mut buf = Vec::with_capacity(name.encoded_len());
        {
            let mut encoder = BinEncoder::new(&mut buf);
            name.to_lowercase().emit_as_canonical(&mut encoder, true)?;
        }

        let mut hash = digest_type.digest_all(&[&buf, salt])?;
        for _ in 0..iterations {
            hash = digest_type.digest_all(&[&hash, salt])?;
        }
        Ok(hash)
    }
}

impl From<Nsec3HashAlgorithm> for u8 {
    fn from(algorithm: Nsec3HashAlgorithm) -> Self {
        match algorithm {
            Nsec3HashAlgorithm::SHA1 => 1,
            Nsec3HashAlgorithm::Unknown(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = NSEC3::new(
            Nsec3HashAlgorithm::SHA1,
            true,
            12,
            vec![0xAA, 0xBB],
            vec![0x01; 20],
            [RecordType::A, RecordType::RRSIG],
        );

        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = NSEC3::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
        assert!(read.opt_out());
    }

    #[test]
    fn test_rfc5155_appendix_a_hash() {
        // H(example) with salt aabbccdd, 12 iterations, from the RFC 5155
        // example zone: 0p9mhaveqvm6t7vbl5lop2u3t2rp3tom
        let name = Name::from_ascii("example.").unwrap();
        let salt = [0xAA, 0xBB, 0xCC, 0xDD];
        let hash = Nsec3HashAlgorithm::SHA1.hash(&salt, &name, 12).unwrap();
        assert_eq!(
            BASE32_DNSSEC.encode(&hash),
            "0p9mhaveqvm6t7vbl5lop2u3t2rp3tom"
        );
    }

    #[test]
    fn test_hash_is_case_insensitive() {
        let salt = [0xAA];
        let lower = Name::from_ascii("name.example.").unwrap();
        let upper = Name::from_ascii("NAME.EXAMPLE.").unwrap();
        assert_eq!(
            Nsec3HashAlgorithm::SHA1.hash(&salt, &lower, 5).unwrap(),
            Nsec3HashAlgorithm::SHA1.hash(&salt, &upper, 5).unwrap(),
        );
    }
}
