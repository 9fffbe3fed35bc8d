// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! All DNSSEC record data structures

mod dnskey;
mod ds;
mod nsec;
mod nsec3;
mod nsec3param;
mod rrsig;
pub mod sig;

use std::fmt;

use crate::error::{ProtoErrorKind, ProtoResult};
use crate::rr::RecordType;
use crate::serialize::binary::{BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict};

pub use self::dnskey::DNSKEY;
pub use self::ds::DS;
pub use self::nsec::NSEC;
pub use self::nsec3::{NSEC3, Nsec3HashAlgorithm};
pub use self::nsec3param::NSEC3PARAM;
pub use self::rrsig::RRSIG;
pub use self::sig::{SIG, SigInput};

/// The DNSSEC subset of record data variants
#[derive(Debug, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum DNSSECRData {
    /// A zone public key
    DNSKEY(DNSKEY),
    /// A delegation signer in the parent zone
    DS(DS),
    /// An ordered proof of non-existence
    NSEC(NSEC),
    /// A hashed proof of non-existence
    NSEC3(NSEC3),
    /// The NSEC3 parameters of a zone
    NSEC3PARAM(NSEC3PARAM),
    /// A signature over an RRset
    RRSIG(RRSIG),
    /// A transaction signature, SIG(0)
    SIG(SIG),
}

impl DNSSECRData {
    /// The record type of the contained data
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::DNSKEY(..) => RecordType::DNSKEY,
            Self::DS(..) => RecordType::DS,
            Self::NSEC(..) => RecordType::NSEC,
            Self::NSEC3(..) => RecordType::NSEC3,
            Self::NSEC3PARAM(..) => RecordType::NSEC3PARAM,
            Self::RRSIG(..) => RecordType::RRSIG,
            Self::SIG(..) => RecordType::SIG,
        }
    }

    pub(crate) fn read(
        decoder: &mut BinDecoder<'_>,
        record_type: RecordType,
        rdata_length: Restrict<u16>,
    ) -> ProtoResult<Self> {
        match record_type {
            RecordType::DNSKEY => DNSKEY::read_data(decoder, rdata_length).map(Self::DNSKEY),
            RecordType::DS => DS::read_data(decoder, rdata_length).map(Self::DS),
            RecordType::NSEC => NSEC::read_data(decoder, rdata_length).map(Self::NSEC),
            RecordType::NSEC3 => NSEC3::read_data(decoder, rdata_length).map(Self::NSEC3),
            RecordType::NSEC3PARAM => {
                NSEC3PARAM::read_data(decoder, rdata_length).map(Self::NSEC3PARAM)
            }
            RecordType::RRSIG => RRSIG::read_data(decoder, rdata_length).map(Self::RRSIG),
            RecordType::SIG => SIG::read_data(decoder, rdata_length).map(Self::SIG),
            _ => Err(ProtoErrorKind::MalformedRecord("not a dnssec record type").into()),
        }
    }
}

impl BinEncodable for DNSSECRData {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        match self {
            Self::DNSKEY(rdata) => rdata.emit(encoder),
            Self::DS(rdata) => rdata.emit(encoder),
            Self::NSEC(rdata) => rdata.emit(encoder),
            Self::NSEC3(rdata) => rdata.emit(encoder),
            Self::NSEC3PARAM(rdata) => rdata.emit(encoder),
            Self::RRSIG(rdata) => rdata.emit(encoder),
            Self::SIG(rdata) => rdata.emit(encoder),
        }
    }
}

impl fmt::Display for DNSSECRData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DNSKEY(rdata) => rdata.fmt(f),
            Self::DS(rdata) => rdata.fmt(f),
            Self::NSEC(rdata) => rdata.fmt(f),
            Self::NSEC3(rdata) => rdata.fmt(f),
            Self::NSEC3PARAM(rdata) => rdata.fmt(f),
            Self::RRSIG(rdata) => rdata.fmt(f),
            Self::SIG(rdata) => rdata.fmt(f),
        }
    }
}
