// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Transaction Signature, RFC 8945
//!
//! A TSIG record is always the last record of the additional section of a
//! signed message. The MAC covers the unsigned wire form of the message (the
//! TSIG record removed, ARCOUNT decremented, the original transaction id in
//! the header) concatenated with a canonical "TSIG variables" block. For a
//! response, the request MAC is prepended, length-prefixed.

use std::fmt;

use data_encoding::BASE64;
use ring::hmac;

use crate::error::{ProtoError, ProtoErrorKind, ProtoResult};
use crate::rr::domain::Name;
use crate::rr::{DNSClass, RecordType};
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The TSIG record data
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TSIG {
    algorithm: TsigAlgorithm,
    time: u64,
    fudge: u16,
    mac: Vec<u8>,
    oid: u16,
    error: u16,
    other: Vec<u8>,
}

impl TSIG {
    /// Construct a new TSIG rdata
    pub fn new(
        algorithm: TsigAlgorithm,
        time: u64,
        fudge: u16,
        mac: Vec<u8>,
        oid: u16,
        error: u16,
        other: Vec<u8>,
    ) -> Self {
        Self {
            algorithm,
            time,
            fudge,
            mac,
            oid,
            error,
            other,
        }
    }

    /// The algorithm used to compute the MAC
    pub fn algorithm(&self) -> &TsigAlgorithm {
        &self.algorithm
    }

    /// Seconds since the Unix epoch when the message was signed, 48 bits
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Permitted clock skew in seconds
    pub fn fudge(&self) -> u16 {
        self.fudge
    }

    /// The message authentication code
    pub fn mac(&self) -> &[u8] {
        &self.mac
    }

    /// The transaction id of the message before any forwarder rewrote it
    pub fn original_id(&self) -> u16 {
        self.oid
    }

    /// The TSIG error field; 16 here means BADSIG, not BADVERS
    pub fn error(&self) -> u16 {
        self.error
    }

    /// Other data, carries the server clock on BADTIME errors
    pub fn other(&self) -> &[u8] {
        &self.other
    }

    /// Emit the "TSIG variables" block covered by the MAC: owner name and
    /// algorithm in canonical form, class ANY, TTL 0, and all rdata fields
    /// except the MAC itself and the original id (RFC 8945 section 4.3.3).
    pub fn emit_tsig_variables(
        &self,
        encoder: &mut BinEncoder<'_>,
        record_name: &Name,
    ) -> ProtoResult<()> {
        record_name.emit_as_canonical(encoder, true)?;
        DNSClass::ANY.emit(encoder)?;
        encoder.emit_u32(0)?;
        self.algorithm.to_name().emit_as_canonical(encoder, true)?;
        encoder.emit_u48(self.time)?;
        encoder.emit_u16(self.fudge)?;
        encoder.emit_u16(self.error)?;
        encoder.emit_u16(self.other.len() as u16)?;
        encoder.emit_vec(&self.other)
    }

    /// Build the full octet stream the MAC is computed over
    pub fn signed_data(
        &self,
        unsigned_message: &[u8],
        record_name: &Name,
        request_mac: Option<&[u8]>,
    ) -> ProtoResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(unsigned_message.len() + 64);
        let mut encoder = BinEncoder::new(&mut buf);

        if let Some(request_mac) = request_mac {
            encoder.emit_u16(request_mac.len() as u16)?;
            encoder.emit_vec(request_mac)?;
        }
        encoder.emit_vec(unsigned_message)?;
        self.emit_tsig_variables(&mut encoder, record_name)?;

        Ok(buf)
    }
}

impl BinEncodable for TSIG {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        // never compressed, case preserved (RFC 3597 class of types)
        self.algorithm.to_name().emit_as_canonical(encoder, false)?;
        encoder.emit_u48(self.time)?;
        encoder.emit_u16(self.fudge)?;
        encoder.emit_u16(self.mac.len() as u16)?;
        encoder.emit_vec(&self.mac)?;
        encoder.emit_u16(self.oid)?;
        encoder.emit_u16(self.error)?;
        encoder.emit_u16(self.other.len() as u16)?;
        encoder.emit_vec(&self.other)
    }
}

impl RecordDataDecodable<'_> for TSIG {
    fn read_data(decoder: &mut BinDecoder<'_>, _length: Restrict<u16>) -> ProtoResult<Self> {
        let algorithm = TsigAlgorithm::from_name(Name::read(decoder)?);
        let time = decoder.read_u48()?.unverified(/*valid as any u48*/);
        let fudge = decoder.read_u16()?.unverified(/*valid as any u16*/);
        let mac_len = decoder.read_u16()?.unverified(/*bounded by read_vec below*/);
        let mac = decoder.read_vec(mac_len as usize)?.unverified(/*opaque*/);
        let oid = decoder.read_u16()?.unverified(/*valid as any u16*/);
        let error = decoder.read_u16()?.unverified(/*valid as any u16*/);
        let other_len = decoder.read_u16()?.unverified(/*bounded by read_vec below*/);
        let other = decoder.read_vec(other_len as usize)?.unverified(/*opaque*/);

        Ok(Self {
            algorithm,
            time,
            fudge,
            mac,
            oid,
            error,
            other,
        })
    }
}

impl fmt::Display for TSIG {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.algorithm.to_name(),
            self.time,
            self.fudge,
            BASE64.encode(&self.mac),
            self.oid,
            self.error,
        )
    }
}

/// TSIG MAC algorithms; unrecognized names are retained but cannot be used
/// to sign or verify.
#[derive(Debug, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum TsigAlgorithm {
    /// hmac-sha256, mandatory to implement per RFC 8945
    HmacSha256,
    /// hmac-sha384
    HmacSha384,
    /// hmac-sha512
    HmacSha512,
    /// An algorithm name this implementation cannot compute
    Unknown(Name),
}

impl TsigAlgorithm {
    /// The wire-form algorithm name
    pub fn to_name(&self) -> Name {
        match self {
            Self::HmacSha256 => Name::from_ascii("hmac-sha256."),
            Self::HmacSha384 => Name::from_ascii("hmac-sha384."),
            Self::HmacSha512 => Name::from_ascii("hmac-sha512."),
            Self::Unknown(name) => return name.clone(),
        }
        .expect("static algorithm names always parse")
    }

    /// Map a wire-form algorithm name to the algorithm
    pub fn from_name(name: Name) -> Self {
        let lower = name.to_lowercase().to_string();
        match lower.as_str() {
            "hmac-sha256." => Self::HmacSha256,
            "hmac-sha384." => Self::HmacSha384,
            "hmac-sha512." => Self::HmacSha512,
            _ => Self::Unknown(name),
        }
    }

    fn hmac_algorithm(&self) -> ProtoResult<hmac::Algorithm> {
        match self {
            Self::HmacSha256 => Ok(hmac::HMAC_SHA256),
            Self::HmacSha384 => Ok(hmac::HMAC_SHA384),
            Self::HmacSha512 => Ok(hmac::HMAC_SHA512),
            Self::Unknown(name) => {
                Err(ProtoErrorKind::TsigUnsupportedAlgorithm(name.clone()).into())
            }
        }
    }
}

/// A shared secret for signing queries and verifying responses
#[derive(Clone)]
pub struct TsigSigner {
    name: Name,
    algorithm: TsigAlgorithm,
    key: Vec<u8>,
    fudge: u16,
}

impl TsigSigner {
    /// Create a signer from the key name and raw shared secret
    pub fn new(name: Name, algorithm: TsigAlgorithm, key: Vec<u8>) -> Self {
        Self {
            name,
            algorithm,
            key,
            fudge: 300,
        }
    }

    /// The key name, the owner of emitted TSIG records
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The permitted clock skew, 300 seconds by default
    pub fn fudge(&self) -> u16 {
        self.fudge
    }

    /// The MAC algorithm of this key
    pub fn algorithm(&self) -> &TsigAlgorithm {
        &self.algorithm
    }

    /// Compute the MAC over `data`.
    ///
    /// Fails for unrecognized algorithms; they are never silently skipped.
    pub fn sign(&self, data: &[u8]) -> ProtoResult<Vec<u8>> {
        let key = hmac::Key::new(self.algorithm.hmac_algorithm()?, &self.key);
        Ok(hmac::sign(&key, data).as_ref().to_vec())
    }

    /// Verify `mac` over `data`
    pub fn verify(&self, data: &[u8], mac: &[u8]) -> ProtoResult<()> {
        let key = hmac::Key::new(self.algorithm.hmac_algorithm()?, &self.key);
        hmac::verify(&key, data, mac)
            .map_err(|_| ProtoErrorKind::TsigFailure("mac did not verify").into())
    }
}

/// Split a signed message into its unsigned prefix and the TSIG record.
///
/// The returned bytes end where the TSIG record began, with ARCOUNT
/// decremented and the original id restored, exactly the stream the MAC was
/// computed over.
pub fn strip_tsig(message_bytes: &[u8]) -> ProtoResult<(Vec<u8>, Name, TSIG)> {
    let mut decoder = BinDecoder::new(message_bytes);

    // header: id, flags, then the four counts
    decoder.read_u16()?;
    decoder.read_u16()?;
    let query_count = decoder.read_u16()?.unverified(/*checked during skip*/);
    let answer_count = decoder.read_u16()?.unverified(/*checked during skip*/);
    let authority_count = decoder.read_u16()?.unverified(/*checked during skip*/);
    let additional_count = decoder
        .read_u16()?
        .verify_unwrap(|c| *c > 0)
        .map_err(|_| ProtoError::from(ProtoErrorKind::TsigFailure("no additional records")))?;

    for _ in 0..query_count {
        Name::read(&mut decoder)?;
        decoder.read_u16()?;
        decoder.read_u16()?;
    }

    for _ in 0..(u32::from(answer_count) + u32::from(authority_count) + u32::from(additional_count) - 1)
    {
        skip_record(&mut decoder)?;
    }

    let tsig_offset = decoder.index();
    let record_name = Name::read(&mut decoder)?;
    let record_type = RecordType::read(&mut decoder)?;
    if record_type != RecordType::TSIG {
        return Err(ProtoErrorKind::TsigFailure("tsig must be the last additional record").into());
    }
    decoder.read_u16()?; // class
    decoder.read_u32()?; // ttl
    let rdata_length = decoder.read_u16()?.unverified(/*bounded by read_data*/);
    let tsig = TSIG::read_data(&mut decoder, Restrict::new(rdata_length))?;

    let mut unsigned = message_bytes[..tsig_offset].to_vec();
    // restore the original id and decrement ARCOUNT
    unsigned[0..2].copy_from_slice(&tsig.original_id().to_be_bytes());
    unsigned[10..12].copy_from_slice(&(additional_count - 1).to_be_bytes());

    Ok((unsigned, record_name, tsig))
}

fn skip_record(decoder: &mut BinDecoder<'_>) -> ProtoResult<()> {
    Name::read(decoder)?;
    decoder.read_u16()?; // type
    decoder.read_u16()?; // class
    decoder.read_u32()?; // ttl
    let rdata_length = decoder.read_u16()?.unverified(/*bounded by read_slice*/);
    decoder.read_slice(rdata_length as usize)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rdata_round_trip() {
        let rdata = TSIG::new(
            TsigAlgorithm::HmacSha256,
            1_700_000_000,
            300,
            vec![0xAB; 32],
            0x1234,
            0,
            Vec::new(),
        );

        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = TSIG::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }

    #[test]
    fn test_algorithm_names() {
        for alg in [
            TsigAlgorithm::HmacSha256,
            TsigAlgorithm::HmacSha384,
            TsigAlgorithm::HmacSha512,
        ] {
            assert_eq!(TsigAlgorithm::from_name(alg.to_name()), alg);
        }

        let unknown = Name::from_ascii("hmac-md5.sig-alg.reg.int.").unwrap();
        let alg = TsigAlgorithm::from_name(unknown.clone());
        assert_eq!(alg, TsigAlgorithm::Unknown(unknown));
    }

    #[test]
    fn test_unknown_algorithm_fails_closed() {
        let signer = TsigSigner::new(
            Name::from_ascii("key.example.").unwrap(),
            TsigAlgorithm::Unknown(Name::from_ascii("hmac-md5.").unwrap()),
            b"secret".to_vec(),
        );
        assert!(signer.sign(b"data").is_err());
        assert!(signer.verify(b"data", b"mac").is_err());
    }

    #[test]
    fn test_sign_verify() {
        let signer = TsigSigner::new(
            Name::from_ascii("key.example.").unwrap(),
            TsigAlgorithm::HmacSha256,
            b"very secret".to_vec(),
        );

        let mac = signer.sign(b"message bytes").unwrap();
        assert!(signer.verify(b"message bytes", &mac).is_ok());
        assert!(signer.verify(b"tampered bytes", &mac).is_err());
    }
}
