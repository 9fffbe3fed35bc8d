// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! text records for storing arbitrary data, RFC 1035 section 3.3.14

use std::fmt;

use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::serialize::binary::{BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict};

/// The TXT record type: one or more `<character-string>`s, each at most 255
/// octets of binary data.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct TXT {
    txt_data: Vec<Box<[u8]>>,
}

impl TXT {
    /// Creates a new TXT record from the given strings.
    ///
    /// Strings longer than 255 octets must be pre-split by the caller; this
    /// constructor rejects them.
    pub fn new<S: AsRef<[u8]>>(txt_data: impl IntoIterator<Item = S>) -> ProtoResult<Self> {
        let mut strings = Vec::new();
        for s in txt_data {
            let bytes = s.as_ref();
            if bytes.len() > 255 {
                return Err("txt string exceeds 255 octets".into());
            }
            strings.push(bytes.to_vec().into_boxed_slice());
        }
        Ok(Self { txt_data: strings })
    }

    /// Returns the strings of the record in listed order
    pub fn txt_data(&self) -> &[Box<[u8]>] {
        &self.txt_data
    }

    /// Parse the zone-file form: each token is one string. Surrounding
    /// double quotes, if present, are removed by tokenization upstream.
    pub fn parse<'i>(
        tokens: impl Iterator<Item = &'i str>,
        _origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        let strings: Vec<&str> = tokens.collect();
        if strings.is_empty() {
            return Err(ProtoError::from("txt data not present"));
        }
        Self::new(strings)
    }
}

impl BinEncodable for TXT {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        for string in &self.txt_data {
            encoder.emit_character_data(string)?;
        }
        Ok(())
    }
}

impl RecordDataDecodable<'_> for TXT {
    fn read_data(decoder: &mut BinDecoder<'_>, length: Restrict<u16>) -> ProtoResult<Self> {
        let end = decoder.index() + length.unverified(/*bounded by rdata*/) as usize;

        let mut strings = Vec::with_capacity(1);
        while decoder.index() < end {
            let string = decoder.read_character_data()?.unverified(/*any data allowed*/);
            strings.push(string.to_vec().into_boxed_slice());
        }

        Ok(Self { txt_data: strings })
    }
}

impl fmt::Display for TXT {
    /// Each string is rendered double-quoted, non-printable octets escaped
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, string) in self.txt_data.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str("\"")?;
            for byte in string.iter() {
                match byte {
                    b'"' | b'\\' => write!(f, "\\{}", *byte as char)?,
                    0x20..=0x7e => write!(f, "{}", *byte as char)?,
                    _ => write!(f, "\\{byte:03}")?,
                }
            }
            f.write_str("\"")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let rdata = TXT::new(["v=spf1 -all", "second"]).unwrap();
        let bytes = rdata.to_bytes().unwrap();

        let mut decoder = BinDecoder::new(&bytes);
        let read = TXT::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }

    #[test]
    fn test_display_quotes() {
        let rdata = TXT::new(["hello \"world\""]).unwrap();
        assert_eq!(rdata.to_string(), "\"hello \\\"world\\\"\"");
    }

    #[test]
    fn test_too_long_rejected() {
        assert!(TXT::new([vec![b'a'; 256]]).is_err());
        assert!(TXT::new([vec![b'a'; 255]]).is_ok());
    }
}
