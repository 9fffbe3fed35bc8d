// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! the Question section entry: (name, type, class)

use std::fmt;

use crate::error::ProtoResult;
use crate::rr::domain::Name;
use crate::rr::{DNSClass, RecordType};
use crate::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder};

/// A query of the Question section.
///
/// The fields are set at construction; a question does not change over the
/// life of a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    name: Name,
    query_type: RecordType,
    query_class: DNSClass,
}

impl Query {
    /// Create a query for `name` and `query_type` in the IN class
    pub fn query(name: Name, query_type: RecordType) -> Self {
        Self {
            name,
            query_type,
            query_class: DNSClass::IN,
        }
    }

    /// Create a query with an explicit class
    pub fn with_class(name: Name, query_type: RecordType, query_class: DNSClass) -> Self {
        Self {
            name,
            query_type,
            query_class,
        }
    }

    /// The name being queried
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The type being queried
    pub fn query_type(&self) -> RecordType {
        self.query_type
    }

    /// The class being queried
    pub fn query_class(&self) -> DNSClass {
        self.query_class
    }

    /// A copy with the name's letter case randomized (0x20 encoding).
    ///
    /// The randomized query equals the original under the protocol's
    /// case-insensitive comparison; only `Name::eq_case` distinguishes them.
    pub fn randomize_case(&self) -> Self {
        let mut name = self.name.clone();
        name.randomize_label_case();
        Self {
            name,
            query_type: self.query_type,
            query_class: self.query_class,
        }
    }

    /// Case-exact comparison against the question echoed in a response,
    /// required when 0x20 validation is enabled.
    pub fn matches_case(&self, other: &Self) -> bool {
        self.query_type == other.query_type
            && self.query_class == other.query_class
            && self.name.eq_case(other.name())
    }
}

impl BinEncodable for Query {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        self.name.emit(encoder)?;
        self.query_type.emit(encoder)?;
        self.query_class.emit(encoder)
    }
}

impl<'r> BinDecodable<'r> for Query {
    fn read(decoder: &mut BinDecoder<'r>) -> ProtoResult<Self> {
        Ok(Self {
            name: Name::read(decoder)?,
            query_type: RecordType::read(decoder)?,
            query_class: DNSClass::read(decoder)?,
        })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{name} {class} {ty}",
            name = self.name,
            class = self.query_class,
            ty = self.query_type,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let query = Query::query(
            Name::from_ascii("www.example.com.").unwrap(),
            RecordType::AAAA,
        );
        let bytes = query.to_bytes().unwrap();
        let read = Query::from_bytes(&bytes).unwrap();
        assert_eq!(read, query);
    }

    #[test]
    fn test_case_matching() {
        let query = Query::query(Name::from_ascii("www.example.com.").unwrap(), RecordType::A);
        let randomized = query.randomize_case();

        // identity is unchanged
        assert_eq!(query, randomized);
        // exact case must match itself
        assert!(randomized.matches_case(&randomized.clone()));

        let other = Query::query(Name::from_ascii("www.example.org.").unwrap(), RecordType::A);
        assert!(!randomized.matches_case(&other));
    }
}
