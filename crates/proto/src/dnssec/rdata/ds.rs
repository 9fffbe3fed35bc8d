// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! pointer record from parent zone to child zone's key-signing key
//!
//! [RFC 4034](https://tools.ietf.org/html/rfc4034#section-5), DNSSEC Resource
//! Records, March 2005
//!
//! ```text
//! 5.1.  DS RDATA Wire Format
//!
//!     0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//!    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!    |           Key Tag             |  Algorithm    |  Digest Type  |
//!    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!    /                                                               /
//!    /                            Digest                             /
//!    /                                                               /
//!    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use std::fmt;

use data_encoding::HEXUPPER_PERMISSIVE;

use super::DNSKEY;
use crate::dnssec::{Algorithm, DigestType};
use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::serialize::binary::{
    BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The DS record data
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct DS {
    key_tag: u16,
    algorithm: Algorithm,
    digest_type: DigestType,
    digest: Vec<u8>,
}

impl DS {
    /// Construct new DS rdata
    pub fn new(key_tag: u16, algorithm: Algorithm, digest_type: DigestType, digest: Vec<u8>) -> Self {
        Self {
            key_tag,
            algorithm,
            digest_type,
            digest,
        }
    }

    /// The key tag of the referenced DNSKEY
    pub fn key_tag(&self) -> u16 {
        self.key_tag
    }

    /// The algorithm of the referenced DNSKEY
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The digest algorithm used to hash the DNSKEY
    pub fn digest_type(&self) -> DigestType {
        self.digest_type
    }

    /// The digest of the referenced DNSKEY
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Returns true if this DS references `dnskey` at `name`:
    ///
    /// ```text
    /// digest = digest_algorithm( DNSKEY owner name | DNSKEY RDATA);
    /// ```
    ///
    /// with the owner name in canonical form (RFC 4034 section 5.1.4).
    pub fn covers(&self, name: &Name, dnskey: &DNSKEY) -> ProtoResult<bool> {
        if dnskey.algorithm() != self.algorithm {
            return Ok(false);
        }
        if dnskey.calculate_key_tag()? != self.key_tag {
            return Ok(false);
        }

        let mut buf = Vec::with_capacity(name.encoded_len() + 64);
        {
            let mut encoder = BinEncoder::new(&mut buf);
            encoder.set_canonical_form(true);
            name.emit_as_canonical(&mut encoder, true)?;
            dnskey.emit(&mut encoder)?;
        }

        let computed = self.digest_type.digest(&buf)?;
        Ok(computed == self.digest)
    }

    /// Parse the zone-file form: `key-tag algorithm digest-type digest-hex`
    pub fn parse<'i>(
        mut tokens: impl Iterator<Item = &'i str>,
        _origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        let key_tag: u16 = tokens
            .next()
            .ok_or_else(|| ProtoError::from("key tag not present"))?
            .parse()
            .map_err(|e| ProtoError::from(format!("key tag: {e}")))?;
        let algorithm = Algorithm::from_u8(
            tokens
                .next()
                .ok_or_else(|| ProtoError::from("algorithm not present"))?
                .parse()
                .map_err(|e| ProtoError::from(format!("algorithm: {e}")))?,
        );
        let digest_type = DigestType::from_u8(
            tokens
                .next()
                .ok_or_else(|| ProtoError::from("digest type not present"))?
                .parse()
                .map_err(|e| ProtoError::from(format!("digest type: {e}")))?,
        );

        let digest_str: String = tokens.collect();
        if digest_str.is_empty() {
            return Err("digest not present".into());
        }
        let digest = HEXUPPER_PERMISSIVE
            .decode(digest_str.as_bytes())
            .map_err(|e| ProtoError::from(format!("digest: {e}")))?;

        Ok(Self::new(key_tag, algorithm, digest_type, digest))
    }
}

impl BinEncodable for DS {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        encoder.emit_u16(self.key_tag)?;
        self.algorithm.emit(encoder)?;
        encoder.emit_u8(self.digest_type.into())?;
        encoder.emit_vec(&self.digest)
    }
}

impl RecordDataDecodable<'_> for DS {
    fn read_data(decoder: &mut BinDecoder<'_>, length: Restrict<u16>) -> ProtoResult<Self> {
        let key_tag = decoder.read_u16()?.unverified(/*valid as any u16*/);
        let algorithm = Algorithm::from_u8(decoder.read_u8()?.unverified(/*unknown passthrough*/));
        let digest_type =
            DigestType::from_u8(decoder.read_u8()?.unverified(/*unknown passthrough*/));

        let digest_len = (length.unverified(/*bounded by sub below*/) as usize)
            .checked_sub(4)
            .ok_or_else(|| ProtoError::from("invalid rdata length in DS"))?;
        let digest = decoder.read_vec(digest_len)?.unverified(/*opaque digest*/);

        Ok(Self::new(key_tag, algorithm, digest_type, digest))
    }
}

impl fmt::Display for DS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{tag} {alg} {ty} {digest}",
            tag = self.key_tag,
            alg = u8::from(self.algorithm),
            ty = u8::from(self.digest_type),
            digest = HEXUPPER_PERMISSIVE.encode(&self.digest),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = DS::new(
            0xF00F,
            Algorithm::RSASHA256,
            DigestType::SHA256,
            vec![5, 6, 7, 8],
        );
        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = DS::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }

    #[test]
    fn test_covers() {
        let name = Name::from_ascii("example.com.").unwrap();
        let dnskey = DNSKEY::new(true, true, false, Algorithm::ED25519, vec![0x22; 32]);

        let mut buf = Vec::new();
        {
            let mut encoder = BinEncoder::new(&mut buf);
            encoder.set_canonical_form(true);
            name.emit_as_canonical(&mut encoder, true).unwrap();
            dnskey.emit(&mut encoder).unwrap();
        }
        let digest = DigestType::SHA256.digest(&buf).unwrap();

        let ds = DS::new(
            dnskey.calculate_key_tag().unwrap(),
            Algorithm::ED25519,
            DigestType::SHA256,
            digest,
        );

        assert!(ds.covers(&name, &dnskey).unwrap());

        let other_key = DNSKEY::new(true, true, false, Algorithm::ED25519, vec![0x33; 32]);
        assert!(!ds.covers(&name, &other_key).unwrap());
    }
}
