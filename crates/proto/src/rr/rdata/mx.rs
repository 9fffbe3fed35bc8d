// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! mail exchange record, RFC 1035 section 3.3.9

use std::fmt;
use std::str::FromStr;

use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The MX record type, a mail exchange with a preference
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MX {
    preference: u16,
    exchange: Name,
}

impl MX {
    /// Create a new MX record
    pub fn new(preference: u16, exchange: Name) -> Self {
        Self {
            preference,
            exchange,
        }
    }

    /// Lower values are preferred; senders sort ascending and pick randomly
    /// among equal preferences.
    pub fn preference(&self) -> u16 {
        self.preference
    }

    /// The host willing to act as mail exchange
    pub fn exchange(&self) -> &Name {
        &self.exchange
    }

    /// Parse the zone-file form: `preference exchange`
    pub fn parse<'i>(
        mut tokens: impl Iterator<Item = &'i str>,
        origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        let preference = tokens
            .next()
            .ok_or_else(|| ProtoError::from("preference not present"))
            .and_then(|t| u16::from_str(t).map_err(|e| format!("preference: {e}").into()))?;
        let exchange = tokens
            .next()
            .ok_or_else(|| ProtoError::from("exchange not present"))
            .and_then(|t| Name::parse(t, origin))?;
        Ok(Self::new(preference, exchange))
    }
}

/// Order MX hosts for use: ascending preference, random order within equal
/// preference (RFC 5321 section 5.1). The wire codec preserves listed order.
pub fn preference_order(records: &[MX]) -> Vec<MX> {
    use rand::seq::SliceRandom;

    let mut ordered = records.to_vec();
    ordered.shuffle(&mut rand::thread_rng());
    ordered.sort_by_key(MX::preference);
    ordered
}

impl BinEncodable for MX {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        encoder.emit_u16(self.preference)?;
        self.exchange.emit(encoder)
    }
}

impl RecordDataDecodable<'_> for MX {
    fn read_data(decoder: &mut BinDecoder<'_>, _length: Restrict<u16>) -> ProtoResult<Self> {
        Ok(Self {
            preference: decoder.read_u16()?.unverified(/*any u16 is valid*/),
            exchange: Name::read(decoder)?,
        })
    }
}

impl fmt::Display for MX {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.preference, self.exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = MX::new(10, Name::from_ascii("mail.example.com.").unwrap());
        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = MX::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }

    #[test]
    fn test_preference_order() {
        let exchange = Name::from_ascii("mx.example.com.").unwrap();
        let records = vec![
            MX::new(20, exchange.clone()),
            MX::new(5, exchange.clone()),
            MX::new(10, exchange.clone()),
            MX::new(10, exchange),
        ];

        for _ in 0..8 {
            let ordered = preference_order(&records);
            let preferences: Vec<u16> = ordered.iter().map(MX::preference).collect();
            assert_eq!(preferences, vec![5, 10, 10, 20]);
        }
    }
}
