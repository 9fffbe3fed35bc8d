// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! domain name, aka labels, implementation

use std::cmp::Ordering;
use std::fmt::{self, Write};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use tinyvec::TinyVec;

use crate::error::{ProtoError, ProtoErrorKind, ProtoResult};
use crate::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder};

/// A domain name: an ordered sequence of labels.
///
/// Labels are at most 63 octets; the encoded name, including one length
/// octet per label and the terminating zero octet, is at most 255 octets.
/// Equality and hashing are ASCII case-insensitive.
#[derive(Clone, Default, Eq)]
pub struct Name {
    is_fqdn: bool,
    label_data: TinyVec<[u8; 32]>,
    // label_ends[i] is the offset one past the end of label i in label_data
    label_ends: TinyVec<[u8; 24]>,
}

/// Maximum number of compression pointers followed while reading one name.
///
/// A legal name has at most 127 labels, each of which can be reached by at
/// most one pointer; anything deeper is a crafted loop.
const MAX_POINTERS: usize = 126;

impl Name {
    /// Maximum legal length of the encoded form of a domain name
    pub const MAX_LENGTH: usize = 255;

    /// Create a new empty, relative name
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the root name, i.e. `.`
    pub fn root() -> Self {
        let mut this = Self::new();
        this.is_fqdn = true;
        this
    }

    /// Returns true if this is the root name
    pub fn is_root(&self) -> bool {
        self.label_ends.is_empty() && self.is_fqdn
    }

    /// Returns true if the name ends in the root label, i.e. was written with
    /// a trailing dot or read off the wire.
    pub fn is_fqdn(&self) -> bool {
        self.is_fqdn
    }

    /// Marks the name as fully qualified
    pub fn set_fqdn(&mut self, val: bool) {
        self.is_fqdn = val;
    }

    /// Returns true if the leftmost label is `*`
    pub fn is_wildcard(&self) -> bool {
        self.iter().next() == Some(&b"*"[..])
    }

    /// Returns the wildcard at this name's level, i.e. `*` followed by the
    /// parent of this name.
    pub fn into_wildcard(self) -> Self {
        if self.label_ends.is_empty() {
            return self;
        }
        let mut name = Self::from_labels([&b"*"[..]]).expect("single label always fits");
        name = name
            .append_name(&self.base_name())
            .expect("wildcard of a legal name is legal");
        name.is_fqdn = self.is_fqdn;
        name
    }

    /// Returns an iterator over the labels, leftmost first
    pub fn iter(&self) -> LabelIter<'_> {
        LabelIter {
            name: self,
            start: 0,
            end: self.label_ends.len(),
        }
    }

    /// Number of labels in the name, discounting a leading `*`
    pub fn num_labels(&self) -> u8 {
        let num = self.label_ends.len() as u8;
        if self.is_wildcard() { num - 1 } else { num }
    }

    /// Length of the encoded form of the name, ignoring compression.
    ///
    /// The root label terminating the name is always counted.
    pub fn encoded_len(&self) -> usize {
        self.label_ends.len() + self.label_data.len() + 1
    }

    fn label_slice(&self, index: usize) -> &[u8] {
        let start = if index == 0 {
            0
        } else {
            self.label_ends[index - 1] as usize
        };
        &self.label_data[start..self.label_ends[index] as usize]
    }

    fn extend_name(&mut self, label: &[u8]) -> ProtoResult<()> {
        if label.len() > 63 {
            return Err(ProtoErrorKind::LabelBytesTooLong(label.len()).into());
        }
        if label.is_empty() {
            return Err("empty label is not legal in a name".into());
        }

        let new_len = self.encoded_len() + label.len() + 1;
        if new_len > Self::MAX_LENGTH {
            return Err(ProtoErrorKind::DomainNameTooLong(new_len).into());
        }

        self.label_data.extend_from_slice(label);
        self.label_ends.push(self.label_data.len() as u8);
        Ok(())
    }

    /// Appends `label` to the end of this name
    pub fn append_label<L: AsRef<[u8]>>(mut self, label: L) -> ProtoResult<Self> {
        self.extend_name(label.as_ref())?;
        Ok(self)
    }

    /// Creates a new Name from the given labels, leftmost first
    pub fn from_labels<I, L>(labels: I) -> ProtoResult<Self>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let mut name = Self {
            is_fqdn: true,
            ..Self::default()
        };
        for label in labels {
            name = name.append_label(label)?;
        }
        Ok(name)
    }

    /// Appends `other` to `self`, carrying forward the FQDN flag of `other`
    pub fn append_name(mut self, other: &Self) -> ProtoResult<Self> {
        for label in other.iter() {
            self.extend_name(label)?;
        }
        self.is_fqdn = other.is_fqdn;
        Ok(self)
    }

    /// Appends `domain` to `self`, making the result fully qualified
    pub fn append_domain(self, domain: &Self) -> ProtoResult<Self> {
        let mut this = self.append_name(domain)?;
        this.set_fqdn(true);
        Ok(this)
    }

    /// Trims off the leftmost label, yielding the parent name.
    ///
    /// The parent of the root is the root.
    pub fn base_name(&self) -> Self {
        let length = self.label_ends.len();
        if length > 0 {
            return self.trim_to(length - 1);
        }
        self.clone()
    }

    /// Keeps only the rightmost `num_labels` labels
    pub fn trim_to(&self, num_labels: usize) -> Self {
        if num_labels >= self.label_ends.len() {
            return self.clone();
        }

        let mut name = Self {
            is_fqdn: self.is_fqdn,
            ..Self::default()
        };
        let skip = self.label_ends.len() - num_labels;
        for index in skip..self.label_ends.len() {
            name.extend_name(self.label_slice(index))
                .expect("shortened name is always legal");
        }
        name
    }

    /// Returns true if `self` is a zone that contains `name`, i.e. the labels
    /// of `self` are a suffix of the labels of `name`. A name is a zone of
    /// itself; the root is a zone of every name.
    pub fn zone_of(&self, name: &Self) -> bool {
        if self.label_ends.len() > name.label_ends.len() {
            return false;
        }

        let self_iter = self.iter().rev();
        let name_iter = name.iter().rev();
        self_iter
            .zip(name_iter)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Creates a new Name with all ASCII letters lowercased, the canonical
    /// form used for DNSSEC signing.
    pub fn to_lowercase(&self) -> Self {
        Self {
            is_fqdn: self.is_fqdn,
            label_data: self
                .label_data
                .iter()
                .map(|c| c.to_ascii_lowercase())
                .collect(),
            label_ends: self.label_ends.clone(),
        }
    }

    /// Randomize the case of ASCII letters in the name, leaving its
    /// case-insensitive identity unchanged (draft-vixie-dnsext-dns0x20).
    pub fn randomize_label_case(&mut self) {
        let mut rand_bits: u32 = 0;

        for (i, b) in self.label_data.iter_mut().enumerate() {
            if i % 32 == 0 {
                rand_bits = rand::random();
            }

            if b.is_ascii_alphabetic() && rand_bits & 1 == 1 {
                *b ^= 0x20;
            }

            rand_bits >>= 1;
        }
    }

    /// Case sensitive label comparison, used to validate 0x20 responses
    pub fn eq_case(&self, other: &Self) -> bool {
        self.label_ends == other.label_ends && self.label_data == other.label_data
    }

    /// Parses a name such as `"example.com."`, appending `origin` when the
    /// input is not fully qualified.
    ///
    /// `\.` escapes a literal dot inside a label and `\DDD` a decimal octet.
    pub fn parse(local: &str, origin: Option<&Self>) -> ProtoResult<Self> {
        let mut name = Self::new();
        let mut label = Vec::new();

        if local == "." {
            name.set_fqdn(true);
            return Ok(name);
        }
        if local == "@" {
            return match origin {
                Some(origin) => Ok(origin.clone()),
                None => Err("@ without an origin".into()),
            };
        }

        let mut state = ParseState::Label;
        for ch in local.chars() {
            match state {
                ParseState::Label => match ch {
                    '.' => {
                        name = name.append_label(&label)?;
                        label.clear();
                    }
                    '\\' => state = ParseState::Escape1,
                    ch if !ch.is_control() && !ch.is_whitespace() && ch.is_ascii() => {
                        label.push(ch as u8)
                    }
                    _ => return Err(format!("unrecognized char: {ch}").into()),
                },
                ParseState::Escape1 => {
                    if let Some(i) = ch.to_digit(10) {
                        state = ParseState::Escape2(i);
                    } else {
                        label.push(ch as u8);
                        state = ParseState::Label;
                    }
                }
                ParseState::Escape2(i) => match ch.to_digit(10) {
                    Some(ii) => state = ParseState::Escape3(i, ii),
                    None => return Err(format!("unrecognized char: {ch}").into()),
                },
                ParseState::Escape3(i, ii) => match ch.to_digit(10) {
                    Some(iii) => {
                        let val = i * 100 + ii * 10 + iii;
                        let byte = u8::try_from(val)
                            .map_err(|_| ProtoError::from(format!("illegal escape: {val}")))?;
                        label.push(byte);
                        state = ParseState::Label;
                    }
                    None => return Err(format!("unrecognized char: {ch}").into()),
                },
            }
        }

        if !label.is_empty() {
            name = name.append_label(&label)?;
        }

        // an unescaped trailing `.` leaves the last label empty
        if label.is_empty() && !local.is_empty() {
            name.set_fqdn(true);
        } else if let Some(other) = origin {
            return name.append_domain(other);
        }

        Ok(name)
    }

    /// Parses an ASCII presentation-form name without an origin
    pub fn from_ascii<S: AsRef<str>>(name: S) -> ProtoResult<Self> {
        Self::parse(name.as_ref(), None)
    }

    /// Emits the name to the encoder, optionally forcing the canonical form.
    ///
    /// In canonical form no compression pointers are written. Otherwise, when
    /// a suffix of this name was already written into the message below
    /// offset 0x4000, a pointer to its earliest occurrence replaces it.
    pub fn emit_as_canonical(
        &self,
        encoder: &mut BinEncoder<'_>,
        canonical: bool,
    ) -> ProtoResult<()> {
        let buf_len = encoder.len();

        // write out each label, tracking where each starts so suffixes can be
        // searched against previously written names
        let mut labels_written = Vec::with_capacity(self.label_ends.len());
        for index in 0..self.label_ends.len() {
            labels_written.push(encoder.offset());
            let label = self.label_slice(index);
            if canonical {
                let lower: Vec<u8> = label.iter().map(|c| c.to_ascii_lowercase()).collect();
                encoder.emit_character_data(&lower)?;
            } else {
                encoder.emit_character_data(label)?;
            }
        }

        let last_index = encoder.offset();
        for label_idx in &labels_written {
            match encoder.get_label_pointer(*label_idx, last_index) {
                Some(_) if canonical => continue,
                Some(loc) => {
                    // rewind to the start of this suffix and emit a pointer to
                    // the earlier occurrence instead
                    encoder.trim_to(*label_idx);
                    encoder.set_offset(*label_idx);
                    encoder.emit_u16(0xC000_u16 | (loc & 0x3FFF_u16))?;
                    return Ok(());
                }
                None => encoder.store_label_pointer(*label_idx, last_index),
            }
        }

        encoder.emit(0)?;

        let length = encoder.len() - buf_len;
        if length > Self::MAX_LENGTH {
            return Err(ProtoErrorKind::DomainNameTooLong(length).into());
        }

        Ok(())
    }
}

enum ParseState {
    Label,
    Escape1,
    Escape2(u32),
    Escape3(u32, u32),
}

impl BinEncodable for Name {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        let canonical = encoder.is_canonical_form();
        self.emit_as_canonical(encoder, canonical)
    }
}

impl<'r> BinDecodable<'r> for Name {
    /// Parses a name from the wire, following compression pointers in the
    /// enclosing message.
    fn read(decoder: &mut BinDecoder<'r>) -> ProtoResult<Self> {
        let mut name = Self::root();
        let mut pointer_budget = MAX_POINTERS;
        // decoder to read the current portion from; swapped when a pointer is
        // followed, while the outer decoder stays at the end of the name
        let mut current = None::<BinDecoder<'r>>;

        loop {
            let reader = current.as_mut().unwrap_or(decoder);
            let length = reader.pop()?.unverified(/*length bits checked below*/);

            match length & 0b1100_0000 {
                0b0000_0000 => {
                    if length == 0 {
                        break;
                    }
                    let label = reader
                        .read_slice(length as usize)?
                        .unverified(/*bounded above by label length checks*/);
                    name.extend_name(label)?;
                }
                0b1100_0000 => {
                    if pointer_budget == 0 {
                        return Err(ProtoErrorKind::PointerBudgetExceeded.into());
                    }
                    pointer_budget -= 1;

                    let low = reader.pop()?.unverified(/*valid as any u8*/);
                    let location = (u16::from(length & 0b0011_1111) << 8) | u16::from(low);

                    // a pointer must point strictly backwards
                    let here = current.as_ref().map_or(decoder.index(), BinDecoder::index);
                    if usize::from(location) >= here - 2 {
                        return Err(ProtoErrorKind::BadPointer(location).into());
                    }

                    current = Some(
                        current
                            .as_ref()
                            .map_or_else(|| decoder.clone(location), |d| d.clone(location)),
                    );
                }
                code => return Err(ProtoErrorKind::UnrecognizedLabelCode(code).into()),
            }
        }

        Ok(name)
    }
}

impl fmt::Display for Name {
    /// Escaped presentation form; FQDNs print with the trailing dot.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_char('.');
        }

        for (i, label) in self.iter().enumerate() {
            if i > 0 {
                f.write_char('.')?;
            }
            for byte in label {
                match byte {
                    b'.' | b'\\' => write!(f, "\\{}", *byte as char)?,
                    0x20..=0x7e => f.write_char(*byte as char)?,
                    _ => write!(f, "\\{byte:03}")?,
                }
            }
        }

        if self.is_fqdn {
            f.write_char('.')?;
        }

        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name(\"{self}\")")
    }
}

impl FromStr for Name {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_ascii(s)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.is_fqdn == other.is_fqdn
            && self.label_ends == other.label_ends
            && self
                .label_data
                .iter()
                .zip(other.label_data.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_fqdn.hash(state);
        self.label_ends.hash(state);
        for byte in self.label_data.iter() {
            byte.to_ascii_lowercase().hash(state);
        }
    }
}

impl Ord for Name {
    /// Canonical name order per RFC 4034 section 6.1: compare labels right
    /// to left, case-insensitively, shorter names sorting first when one is
    /// a suffix of the other.
    fn cmp(&self, other: &Self) -> Ordering {
        let self_labels = self.iter().rev();
        let other_labels = other.iter().rev();

        for (l, r) in self_labels.zip(other_labels) {
            let l = l.iter().map(u8::to_ascii_lowercase);
            let r = r.iter().map(u8::to_ascii_lowercase);
            match l.cmp(r) {
                Ordering::Equal => continue,
                not_eq => return not_eq,
            }
        }

        self.label_ends.len().cmp(&other.label_ends.len())
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An iterator over the labels of a name
pub struct LabelIter<'a> {
    name: &'a Name,
    start: usize,
    end: usize,
}

impl<'a> Iterator for LabelIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.start >= self.end {
            return None;
        }
        let label = self.name.label_slice(self.start);
        self.start += 1;
        Some(label)
    }
}

impl DoubleEndedIterator for LabelIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.start >= self.end {
            return None;
        }
        self.end -= 1;
        Some(self.name.label_slice(self.end))
    }
}

impl ExactSizeIterator for LabelIter<'_> {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::binary::BinDecodable;

    fn name(s: &str) -> Name {
        Name::from_ascii(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(name("www.example.com.").to_string(), "www.example.com.");
        assert_eq!(name("www.example.com").to_string(), "www.example.com");
        assert_eq!(name(".").to_string(), ".");
        assert_eq!(Name::root().to_string(), ".");
        assert_eq!(
            name("escaped\\.dot.example.").to_string(),
            "escaped\\.dot.example."
        );
        assert_eq!(name("a\\046b.example.").iter().next(), Some(&b"a.b"[..]));
    }

    #[test]
    fn test_origin() {
        let origin = name("example.com.");
        let parsed = Name::parse("www", Some(&origin)).unwrap();
        assert_eq!(parsed, name("www.example.com."));
        assert!(parsed.is_fqdn());

        // fully qualified input ignores the origin
        let parsed = Name::parse("www.test.", Some(&origin)).unwrap();
        assert_eq!(parsed, name("www.test."));
    }

    #[test]
    fn test_base_name_and_trim() {
        let n = name("www.example.com.");
        assert_eq!(n.base_name(), name("example.com."));
        assert_eq!(n.trim_to(1), name("com."));
        assert_eq!(n.trim_to(0), Name::root());
        assert_eq!(n.trim_to(9), n);
        assert_eq!(Name::root().base_name(), Name::root());
    }

    #[test]
    fn test_zone_of() {
        let n = name("www.example.com.");
        assert!(name("example.com.").zone_of(&n));
        assert!(name("com.").zone_of(&n));
        assert!(Name::root().zone_of(&n));
        assert!(n.zone_of(&n));
        assert!(!name("example.net.").zone_of(&n));
        assert!(!n.zone_of(&name("example.com.")));
        // case does not matter
        assert!(name("EXAMPLE.com.").zone_of(&name("www.example.COM.")));
    }

    #[test]
    fn test_num_labels() {
        assert_eq!(Name::root().num_labels(), 0);
        assert_eq!(name("example.com.").num_labels(), 2);
        assert_eq!(name("*.example.com.").num_labels(), 2);
    }

    #[test]
    fn test_into_wildcard() {
        assert_eq!(name("www.example.com.").into_wildcard(), name("*.example.com."));
        assert_eq!(name("*.example.com.").into_wildcard(), name("*.example.com."));
        assert_eq!(Name::root().into_wildcard(), Name::root());
    }

    #[test]
    fn test_eq_ignores_case() {
        assert_eq!(name("EXAMPLE.com."), name("example.COM."));
        assert!(!name("EXAMPLE.com.").eq_case(&name("example.com.")));
        assert!(name("example.com.").eq_case(&name("example.com.")));
    }

    #[test]
    fn test_wire_round_trip() {
        let n = name("WWW.example.COM.");
        let bytes = n.to_bytes().unwrap();
        assert_eq!(
            bytes,
            b"\x03WWW\x07example\x03COM\x00".to_vec()
        );
        let read = Name::from_bytes(&bytes).unwrap();
        assert!(read.eq_case(&n));
        assert!(read.is_fqdn());
    }

    #[test]
    fn test_max_encoded_length() {
        let label = "a".repeat(63);
        let mut n = Name::root();
        for _ in 0..3 {
            n = n.append_label(label.as_bytes()).unwrap();
        }
        // 3 * 64 = 192, room for one more label of 62
        assert!(n.clone().append_label("b".repeat(62).as_bytes()).is_ok());
        assert!(n.append_label("b".repeat(63).as_bytes()).is_err());

        assert!(Name::root().append_label("c".repeat(64).as_bytes()).is_err());
    }

    #[test]
    fn test_pointer_read() {
        // "example.com." at offset 0, then "www" + pointer to 0 at offset 13
        let mut bytes: Vec<u8> = b"\x07example\x03com\x00".to_vec();
        bytes.extend_from_slice(b"\x03www\xC0\x00");

        let mut decoder = BinDecoder::new(&bytes);
        let first = Name::read(&mut decoder).unwrap();
        assert_eq!(first, name("example.com."));
        let second = Name::read(&mut decoder).unwrap();
        assert_eq!(second, name("www.example.com."));
    }

    #[test]
    fn test_pointer_loop_fails() {
        // a pointer at offset 0 pointing at itself
        let bytes = vec![0xC0, 0x00, 0x00];
        let mut decoder = BinDecoder::new(&bytes);
        assert!(Name::read(&mut decoder).is_err());
    }

    #[test]
    fn test_forward_pointer_fails() {
        let bytes = vec![0xC0, 0x0A];
        let mut decoder = BinDecoder::new(&bytes);
        assert!(Name::read(&mut decoder).is_err());
    }

    #[test]
    fn test_reserved_label_code_fails() {
        let bytes = vec![0b1000_0001, 0x00];
        let mut decoder = BinDecoder::new(&bytes);
        match *Name::read(&mut decoder).unwrap_err().kind {
            ProtoErrorKind::UnrecognizedLabelCode(_) => {}
            ref e => panic!("wrong error: {e}"),
        }
    }

    #[test]
    fn test_emit_compression() {
        let mut bytes = Vec::new();
        {
            let mut encoder = BinEncoder::new(&mut bytes);
            name("example.com.").emit(&mut encoder).unwrap();
            name("www.example.com.").emit(&mut encoder).unwrap();
        }

        // second name is written as one label plus a pointer to offset 0
        assert_eq!(&bytes[..13], b"\x07example\x03com\x00");
        assert_eq!(&bytes[13..], b"\x03www\xC0\x00");

        let mut decoder = BinDecoder::new(&bytes);
        assert_eq!(Name::read(&mut decoder).unwrap(), name("example.com."));
        assert_eq!(Name::read(&mut decoder).unwrap(), name("www.example.com."));
    }

    #[test]
    fn test_canonical_emit_suppresses_compression() {
        let mut bytes = Vec::new();
        {
            let mut encoder = BinEncoder::new(&mut bytes);
            encoder.set_canonical_form(true);
            name("Example.COM.").emit(&mut encoder).unwrap();
            name("www.Example.COM.").emit(&mut encoder).unwrap();
        }
        assert_eq!(
            bytes,
            b"\x07example\x03com\x00\x03www\x07example\x03com\x00".to_vec()
        );
    }

    #[test]
    fn test_canonical_order() {
        // ordering example from RFC 4034 section 6.1
        let ordered = [
            name("example."),
            name("a.example."),
            name("yljkjljk.a.example."),
            name("Z.a.example."),
            name("zABC.a.EXAMPLE."),
            name("z.example."),
        ];

        let mut shuffled = ordered.to_vec();
        shuffled.reverse();
        shuffled.sort();

        assert_eq!(shuffled, ordered);
    }

    #[test]
    fn test_randomize_label_case_identity() {
        let original = name("www.example.com.");
        let mut randomized = original.clone();
        randomized.randomize_label_case();
        assert_eq!(original, randomized);
        assert_eq!(
            original.to_lowercase().to_string(),
            randomized.to_lowercase().to_string()
        );
    }
}
