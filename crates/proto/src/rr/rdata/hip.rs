// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Host Identity Protocol record, RFC 8005
//!
//! ```text
//! 3.1.  HIP RDATA Wire Format
//!
//!   0                   1                   2                   3
//!   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  |  HIT length   | PK algorithm  |          PK length            |
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  ~                           HIT                                 ~
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  ~                       Public Key                              ~
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  ~                Rendezvous Servers                             ~
//!  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Rendezvous server names are never compressed.

use std::fmt;

use data_encoding::{BASE64, HEXUPPER_PERMISSIVE};

use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The HIP record data
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HIP {
    pk_algorithm: u8,
    hit: Vec<u8>,
    public_key: Vec<u8>,
    rendezvous_servers: Vec<Name>,
}

impl HIP {
    /// Construct new HIP rdata
    pub fn new(
        pk_algorithm: u8,
        hit: Vec<u8>,
        public_key: Vec<u8>,
        rendezvous_servers: Vec<Name>,
    ) -> Self {
        Self {
            pk_algorithm,
            hit,
            public_key,
            rendezvous_servers,
        }
    }

    /// The public key algorithm, per the IPSECKEY registry
    pub fn pk_algorithm(&self) -> u8 {
        self.pk_algorithm
    }

    /// The host identity tag
    pub fn hit(&self) -> &[u8] {
        &self.hit
    }

    /// The public key material
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Zero or more rendezvous servers, in order of preference
    pub fn rendezvous_servers(&self) -> &[Name] {
        &self.rendezvous_servers
    }

    /// Parse the zone-file form: `pk-algorithm hit-hex pk-base64 [servers...]`
    pub fn parse<'i>(
        mut tokens: impl Iterator<Item = &'i str>,
        origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        let pk_algorithm = tokens
            .next()
            .ok_or_else(|| ProtoError::from("pk algorithm not present"))?
            .parse::<u8>()
            .map_err(|e| ProtoError::from(format!("pk algorithm: {e}")))?;
        let hit = tokens
            .next()
            .ok_or_else(|| ProtoError::from("hit not present"))
            .and_then(|t| {
                HEXUPPER_PERMISSIVE
                    .decode(t.as_bytes())
                    .map_err(|e| format!("hit: {e}").into())
            })?;
        let public_key = tokens
            .next()
            .ok_or_else(|| ProtoError::from("public key not present"))
            .and_then(|t| {
                BASE64
                    .decode(t.as_bytes())
                    .map_err(|e| format!("public key: {e}").into())
            })?;

        let rendezvous_servers = tokens
            .map(|t| Name::parse(t, origin))
            .collect::<ProtoResult<Vec<Name>>>()?;

        Ok(Self::new(pk_algorithm, hit, public_key, rendezvous_servers))
    }
}

impl BinEncodable for HIP {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        if self.hit.len() > 255 {
            return Err("hit exceeds 255 octets".into());
        }

        encoder.emit_u8(self.hit.len() as u8)?;
        encoder.emit_u8(self.pk_algorithm)?;
        encoder.emit_u16(self.public_key.len() as u16)?;
        encoder.emit_vec(&self.hit)?;
        encoder.emit_vec(&self.public_key)?;
        for server in &self.rendezvous_servers {
            server.emit_as_canonical(encoder, false)?;
        }
        Ok(())
    }
}

impl RecordDataDecodable<'_> for HIP {
    fn read_data(decoder: &mut BinDecoder<'_>, length: Restrict<u16>) -> ProtoResult<Self> {
        let end = decoder.index() + length.unverified(/*bounded by rdata*/) as usize;

        let hit_len = decoder.read_u8()?.unverified(/*bounded by read_vec below*/);
        let pk_algorithm = decoder.read_u8()?.unverified(/*valid as any u8*/);
        let pk_len = decoder.read_u16()?.unverified(/*bounded by read_vec below*/);

        let hit = decoder.read_vec(hit_len as usize)?.unverified(/*opaque*/);
        let public_key = decoder.read_vec(pk_len as usize)?.unverified(/*opaque*/);

        let mut rendezvous_servers = Vec::new();
        while decoder.index() < end {
            rendezvous_servers.push(Name::read(decoder)?);
        }

        Ok(Self {
            pk_algorithm,
            hit,
            public_key,
            rendezvous_servers,
        })
    }
}

impl fmt::Display for HIP {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.pk_algorithm,
            HEXUPPER_PERMISSIVE.encode(&self.hit),
            BASE64.encode(&self.public_key),
        )?;
        for server in &self.rendezvous_servers {
            write!(f, " {server}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = HIP::new(
            2,
            vec![0x20, 0x01, 0x00, 0x10],
            vec![0xAA; 16],
            vec![
                Name::from_ascii("rvs1.example.com.").unwrap(),
                Name::from_ascii("rvs2.example.com.").unwrap(),
            ],
        );

        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = HIP::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }

    #[test]
    fn test_no_servers() {
        let rdata = HIP::new(2, vec![1, 2], vec![3, 4], Vec::new());
        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = HIP::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }
}
