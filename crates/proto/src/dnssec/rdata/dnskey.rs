// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! public key record data for signing zone records
//!
//! [RFC 4034](https://tools.ietf.org/html/rfc4034#section-2), DNSSEC Resource
//! Records, March 2005
//!
//! ```text
//! 2.1.  DNSKEY RDATA Wire Format
//!
//!      0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//!     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!     |              Flags            |    Protocol   |   Algorithm   |
//!     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!     /                                                               /
//!     /                            Public Key                         /
//!     /                                                               /
//!     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use std::fmt;

use data_encoding::BASE64;

use crate::dnssec::{Algorithm, PublicKey};
use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The DNSKEY record data
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct DNSKEY {
    zone_key: bool,
    secure_entry_point: bool,
    revoke: bool,
    algorithm: Algorithm,
    public_key: Vec<u8>,
}

impl DNSKEY {
    /// Construct new DNSKEY rdata
    pub fn new(
        zone_key: bool,
        secure_entry_point: bool,
        revoke: bool,
        algorithm: Algorithm,
        public_key: Vec<u8>,
    ) -> Self {
        Self {
            zone_key,
            secure_entry_point,
            revoke,
            algorithm,
            public_key,
        }
    }

    /// Bit 7 of the flags: the key is a zone key; only zone keys sign RRsets
    pub fn zone_key(&self) -> bool {
        self.zone_key
    }

    /// Bit 15 of the flags: secure entry point, i.e. a key-signing key.
    /// Informational only per RFC 4034; validation must not rely on it.
    pub fn secure_entry_point(&self) -> bool {
        self.secure_entry_point
    }

    /// Bit 8 of the flags: the key is revoked, RFC 5011
    pub fn revoke(&self) -> bool {
        self.revoke
    }

    /// The signing algorithm of this key
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The raw public key material, algorithm-specific layout
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The flags field reassembled
    pub fn flags(&self) -> u16 {
        let mut flags = 0;
        if self.zone_key {
            flags |= 0b0000_0001_0000_0000;
        }
        if self.secure_entry_point {
            flags |= 0b0000_0000_0000_0001;
        }
        if self.revoke {
            flags |= 0b0000_0000_1000_0000;
        }
        flags
    }

    /// Decode the key for signature verification
    pub fn key(&self) -> ProtoResult<PublicKey<'_>> {
        PublicKey::from_dnskey(&self.public_key, self.algorithm)
    }

    /// The key tag over the rdata wire form, RFC 4034 appendix B:
    ///
    /// ```text
    ///  for ( ac = 0, i = 0; i < keysize; ++i )
    ///      ac += (i&1) ? key[i] : key[i]<<8;
    ///  ac += (ac>>16) & 0xFFFF;
    ///  return ac & 0xFFFF;
    /// ```
    pub fn calculate_key_tag(&self) -> ProtoResult<u16> {
        let mut bytes = Vec::with_capacity(4 + self.public_key.len());
        {
            let mut encoder = BinEncoder::new(&mut bytes);
            self.emit(&mut encoder)?;
        }

        let mut ac = 0_u32;
        for (i, byte) in bytes.iter().enumerate() {
            ac += if i & 1 == 1 {
                u32::from(*byte)
            } else {
                u32::from(*byte) << 8
            };
        }
        ac += (ac >> 16) & 0xFFFF;
        Ok((ac & 0xFFFF) as u16)
    }

    /// Parse the zone-file form: `flags protocol algorithm public-key`
    pub fn parse<'i>(
        mut tokens: impl Iterator<Item = &'i str>,
        _origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        let flags: u16 = tokens
            .next()
            .ok_or_else(|| ProtoError::from("flags not present"))?
            .parse()
            .map_err(|e| ProtoError::from(format!("flags: {e}")))?;
        let protocol: u8 = tokens
            .next()
            .ok_or_else(|| ProtoError::from("protocol not present"))?
            .parse()
            .map_err(|e| ProtoError::from(format!("protocol: {e}")))?;
        if protocol != 3 {
            return Err("protocol field must be 3".into());
        }
        let algorithm = Algorithm::from_u8(
            tokens
                .next()
                .ok_or_else(|| ProtoError::from("algorithm not present"))?
                .parse()
                .map_err(|e| ProtoError::from(format!("algorithm: {e}")))?,
        );

        let public_key_str: String = tokens.collect();
        if public_key_str.is_empty() {
            return Err("public key not present".into());
        }
        let public_key = BASE64
            .decode(public_key_str.as_bytes())
            .map_err(|e| ProtoError::from(format!("public key: {e}")))?;

        Ok(Self::new(
            flags & 0b0000_0001_0000_0000 != 0,
            flags & 0b0000_0000_0000_0001 != 0,
            flags & 0b0000_0000_1000_0000 != 0,
            algorithm,
            public_key,
        ))
    }
}

impl BinEncodable for DNSKEY {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        encoder.emit_u16(self.flags())?;
        encoder.emit_u8(3)?; // protocol is always 3 per RFC 4034
        self.algorithm.emit(encoder)?;
        encoder.emit_vec(&self.public_key)
    }
}

impl RecordDataDecodable<'_> for DNSKEY {
    fn read_data(decoder: &mut BinDecoder<'_>, length: Restrict<u16>) -> ProtoResult<Self> {
        let flags = decoder.read_u16()?.unverified(/*relevant bits decoded below*/);

        let zone_key = flags & 0b0000_0001_0000_0000 != 0;
        let secure_entry_point = flags & 0b0000_0000_0000_0001 != 0;
        let revoke = flags & 0b0000_0000_1000_0000 != 0;

        // RFC 4034: the protocol field must be 3, but is ignored on read
        let _protocol = decoder.read_u8()?.unverified(/*ignored per RFC*/);
        let algorithm = Algorithm::read(decoder)?;

        let key_len = (length.unverified(/*bounded by sub below*/) as usize)
            .checked_sub(4)
            .ok_or_else(|| ProtoError::from("invalid rdata length in DNSKEY"))?;
        let public_key = decoder.read_vec(key_len)?.unverified(/*opaque key material*/);

        Ok(Self::new(
            zone_key,
            secure_entry_point,
            revoke,
            algorithm,
            public_key,
        ))
    }
}

impl fmt::Display for DNSKEY {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{flags} 3 {alg} {key}",
            flags = self.flags(),
            alg = u8::from(self.algorithm),
            key = BASE64.encode(&self.public_key),
        )
    }
}
