// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! null record type, generally not used except as an opaque data carrier.
//!
//! Record types this library does not recognize round-trip through the same
//! anything-goes representation, per RFC 3597.

use std::fmt;

use data_encoding::BASE64;

use crate::error::ProtoResult;
use crate::serialize::binary::{BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict};

/// Opaque RDATA of any length
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct NULL {
    anything: Vec<u8>,
}

impl NULL {
    /// Construct a new NULL RData with no bytes
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a new NULL RData with the given bytes
    pub fn with(anything: Vec<u8>) -> Self {
        Self { anything }
    }

    /// The raw bytes
    pub fn anything(&self) -> &[u8] {
        &self.anything
    }
}

impl BinEncodable for NULL {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        encoder.emit_vec(self.anything())
    }
}

impl RecordDataDecodable<'_> for NULL {
    fn read_data(decoder: &mut BinDecoder<'_>, length: Restrict<u16>) -> ProtoResult<Self> {
        let rdata_length = length.unverified(/*any length is valid*/) as usize;
        let anything = decoder.read_vec(rdata_length)?.unverified(/*any data allowed*/);
        Ok(Self::with(anything))
    }
}

impl fmt::Display for NULL {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE64.encode(self.anything()))
    }
}
