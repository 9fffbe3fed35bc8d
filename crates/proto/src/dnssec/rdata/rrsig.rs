// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! RRSIG type and related implementations, RFC 4034 section 3

use std::fmt;
use std::ops::Deref;

use super::sig::{SIG, SigInput, parse_timestamp};
use crate::dnssec::Algorithm;
use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::rr::{Record, RecordType, SerialNumber};
use crate::serialize::binary::{
    BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// RRSIG is a derivation of the original SIG record data, covering one RRset
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct RRSIG(pub(crate) SIG);

impl RRSIG {
    /// Construct a new RRSIG from its input block and signature bytes
    pub fn new(input: SigInput, sig: Vec<u8>) -> Self {
        Self(SIG::new(input, sig))
    }

    /// Returns the authenticated TTL of a record covered by this signature.
    ///
    /// RFC 4035 section 5.3.3: no greater than the minimum of the received
    /// TTL, the RRSIG TTL, the original TTL field, and the remaining
    /// signature lifetime.
    pub fn authenticated_ttl(&self, record: &Record, current_time: u32) -> u32 {
        record
            .ttl()
            .min(self.input().original_ttl)
            .min(self.input().sig_expiration.get().saturating_sub(current_time))
    }

    /// Parse the zone-file form:
    /// `type-covered algorithm labels original-ttl expiration inception key-tag signer signature`
    pub fn parse<'i>(
        mut tokens: impl Iterator<Item = &'i str>,
        origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        let mut next = |field: &'static str| {
            tokens.next().ok_or_else(|| ProtoError::from(field))
        };

        let type_covered: RecordType = next("type covered not present")?.parse()?;
        let algorithm = Algorithm::from_u8(
            next("algorithm not present")?
                .parse()
                .map_err(|e| ProtoError::from(format!("algorithm: {e}")))?,
        );
        let num_labels = next("labels not present")?
            .parse()
            .map_err(|e| ProtoError::from(format!("labels: {e}")))?;
        let original_ttl = next("original ttl not present")?
            .parse()
            .map_err(|e| ProtoError::from(format!("original ttl: {e}")))?;
        let sig_expiration = parse_timestamp(next("expiration not present")?)?;
        let sig_inception = parse_timestamp(next("inception not present")?)?;
        let key_tag = next("key tag not present")?
            .parse()
            .map_err(|e| ProtoError::from(format!("key tag: {e}")))?;
        let signer_name = Name::parse(next("signer name not present")?, origin)?;

        let signature: String = tokens.collect();
        let sig = data_encoding::BASE64
            .decode(signature.as_bytes())
            .map_err(|e| ProtoError::from(format!("signature: {e}")))?;

        Ok(Self::new(
            SigInput {
                type_covered,
                algorithm,
                num_labels,
                original_ttl,
                sig_expiration,
                sig_inception,
                key_tag,
                signer_name,
            },
            sig,
        ))
    }
}

impl Deref for RRSIG {
    type Target = SIG;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl BinEncodable for RRSIG {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        self.0.emit(encoder)
    }
}

impl<'r> RecordDataDecodable<'r> for RRSIG {
    fn read_data(decoder: &mut BinDecoder<'r>, length: Restrict<u16>) -> ProtoResult<Self> {
        SIG::read_data(decoder, length).map(Self)
    }
}

impl fmt::Display for RRSIG {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let tokens = "A 15 2 300 20231115221320 20231114221320 12345 example.com. aGVsbG8=";
        let rrsig = RRSIG::parse(tokens.split_whitespace(), None).unwrap();
        assert_eq!(rrsig.input().type_covered, RecordType::A);
        assert_eq!(rrsig.input().algorithm, Algorithm::ED25519);
        assert_eq!(rrsig.input().key_tag, 12345);
        assert_eq!(rrsig.sig(), b"hello");
        assert!(
            SerialNumber(rrsig.input().sig_inception.get())
                < SerialNumber(rrsig.input().sig_expiration.get())
        );
    }
}
