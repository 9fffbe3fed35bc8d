// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! signature record for signing queries, updates, and responses
//!
//! [RFC 2535](https://tools.ietf.org/html/rfc2535#section-4.1), obsoleted for
//! RRset signing by RFC 4034 (see [`super::RRSIG`]) but retained for SIG(0).
//!
//! ```text
//! 4.1 SIG RDATA Format
//!
//!  1 1 1 1 1 1 1 1 1 1 2 2 2 2 2 2 2 2 2 2 3 3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |        type covered           |  algorithm    |     labels    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         original TTL                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      signature expiration                     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      signature inception                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |            key  tag           |                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+         signer's name         +
//! |                                                               /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-/
//! /                                                               /
//! /                            signature                          /
//! /                                                               /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use std::fmt;
use std::str::FromStr;

use data_encoding::BASE64;
use time::{OffsetDateTime, PrimitiveDateTime, format_description};

use crate::dnssec::Algorithm;
use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::rr::{RecordType, SerialNumber};
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// All fields of a signature record except the signature itself; the wire
/// form of this block, with the signer's name in canonical form, prefixes
/// the data every RRset signature is computed over.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SigInput {
    /// The type of the RRset covered by this signature
    pub type_covered: RecordType,
    /// The signing algorithm
    pub algorithm: Algorithm,
    /// The number of labels of the owner name, discounting root and any `*`
    pub num_labels: u8,
    /// The TTL of the covered RRset as it appears in the zone
    pub original_ttl: u32,
    /// Expiration of the validity window, seconds since the epoch, RFC 1982
    pub sig_expiration: SerialNumber,
    /// Inception of the validity window, seconds since the epoch, RFC 1982
    pub sig_inception: SerialNumber,
    /// Key tag of the signing DNSKEY
    pub key_tag: u16,
    /// Owner of the signing DNSKEY RRset
    pub signer_name: Name,
}

impl BinEncodable for SigInput {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        self.type_covered.emit(encoder)?;
        self.algorithm.emit(encoder)?;
        encoder.emit_u8(self.num_labels)?;
        encoder.emit_u32(self.original_ttl)?;
        encoder.emit_u32(self.sig_expiration.get())?;
        encoder.emit_u32(self.sig_inception.get())?;
        encoder.emit_u16(self.key_tag)?;
        // the signer name is never compressed; in canonical form it is
        // lowercased as well
        self.signer_name
            .emit_as_canonical(encoder, encoder.is_canonical_form())
    }
}

impl<'r> BinDecodable<'r> for SigInput {
    fn read(decoder: &mut BinDecoder<'r>) -> ProtoResult<Self> {
        Ok(Self {
            type_covered: RecordType::read(decoder)?,
            algorithm: Algorithm::read(decoder)?,
            num_labels: decoder.read_u8()?.unverified(/*checked against name in validation*/),
            original_ttl: decoder.read_u32()?.unverified(/*valid as any u32*/),
            sig_expiration: SerialNumber(decoder.read_u32()?.unverified(/*valid as any u32*/)),
            sig_inception: SerialNumber(decoder.read_u32()?.unverified(/*valid as any u32*/)),
            key_tag: decoder.read_u16()?.unverified(/*valid as any u16*/),
            signer_name: Name::read(decoder)?,
        })
    }
}

/// The SIG record data
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SIG {
    input: SigInput,
    sig: Vec<u8>,
}

impl SIG {
    /// Construct a new SIG from its input block and signature bytes
    pub fn new(input: SigInput, sig: Vec<u8>) -> Self {
        Self { input, sig }
    }

    /// The input data of the signature
    pub fn input(&self) -> &SigInput {
        &self.input
    }

    /// The signature bytes
    pub fn sig(&self) -> &[u8] {
        &self.sig
    }
}

impl BinEncodable for SIG {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        self.input.emit(encoder)?;
        encoder.emit_vec(&self.sig)
    }
}

impl<'r> RecordDataDecodable<'r> for SIG {
    fn read_data(decoder: &mut BinDecoder<'r>, length: Restrict<u16>) -> ProtoResult<Self> {
        let start_idx = decoder.index();
        let input = SigInput::read(decoder)?;

        let sig_len = (length.unverified(/*bounded by sub below*/) as usize)
            .checked_sub(decoder.index() - start_idx)
            .ok_or_else(|| ProtoError::from("invalid rdata length in SIG"))?;
        let sig = decoder.read_vec(sig_len)?.unverified(/*opaque signature*/);

        Ok(Self { input, sig })
    }
}

/// Render an epoch-seconds timestamp as the YYYYMMDDHHmmSS presentation form
pub(crate) fn fmt_timestamp(serial: SerialNumber) -> String {
    match OffsetDateTime::from_unix_timestamp(i64::from(serial.get())) {
        Ok(when) => {
            let format = format_description::parse(
                "[year][month][day][hour][minute][second]",
            )
            .expect("static format always parses");
            when.format(&format)
                .unwrap_or_else(|_| serial.get().to_string())
        }
        Err(_) => serial.get().to_string(),
    }
}

/// Parse the YYYYMMDDHHmmSS presentation form into epoch seconds, UTC
pub(crate) fn parse_timestamp(token: &str) -> ProtoResult<SerialNumber> {
    if token.len() != 14 {
        // also accepted: plain seconds since the epoch
        return u32::from_str(token)
            .map(SerialNumber)
            .map_err(|e| format!("bad timestamp: {e}").into());
    }

    let format = format_description::parse("[year][month][day][hour][minute][second]")
        .expect("static format always parses");
    let when = PrimitiveDateTime::parse(token, &format)
        .map_err(|e| ProtoError::from(format!("bad timestamp: {e}")))?;
    Ok(SerialNumber(when.assume_utc().unix_timestamp() as u32))
}

impl fmt::Display for SIG {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{type_covered} {algorithm} {num_labels} {original_ttl} {expiration} {inception} {key_tag} {signer} {sig}",
            type_covered = self.input.type_covered,
            algorithm = self.input.algorithm,
            num_labels = self.input.num_labels,
            original_ttl = self.input.original_ttl,
            expiration = fmt_timestamp(self.input.sig_expiration),
            inception = fmt_timestamp(self.input.sig_inception),
            key_tag = self.input.key_tag,
            signer = self.input.signer_name,
            sig = BASE64.encode(&self.sig),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_input() -> SigInput {
        SigInput {
            type_covered: RecordType::A,
            algorithm: Algorithm::ED25519,
            num_labels: 2,
            original_ttl: 300,
            sig_expiration: SerialNumber(1_700_003_600),
            sig_inception: SerialNumber(1_700_000_000),
            key_tag: 12345,
            signer_name: Name::from_ascii("example.com.").unwrap(),
        }
    }

    #[test]
    fn test_round_trip() {
        let rdata = SIG::new(test_input(), vec![0x55; 64]);
        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = SIG::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let serial = parse_timestamp("20231114221320").unwrap();
        assert_eq!(fmt_timestamp(serial), "20231114221320");
    }
}
