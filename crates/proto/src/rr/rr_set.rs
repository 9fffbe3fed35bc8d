// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! the RRset: records sharing (name, type, class), the atomic unit of
//! caching and DNSSEC signing

use crate::rr::domain::Name;
use crate::rr::{DNSClass, Record, RecordType};

/// A set of records with equal owner name, record type and class.
///
/// The TTL of the set is the minimum of its members, which is how an RRset
/// enters the cache. Member order is insertion order; canonical order for
/// signing is produced on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    name: Name,
    record_type: RecordType,
    dns_class: DNSClass,
    ttl: u32,
    records: Vec<Record>,
}

impl RecordSet {
    /// Create an empty RRset for the given key
    pub fn new(name: Name, record_type: RecordType, dns_class: DNSClass) -> Self {
        Self {
            name,
            record_type,
            dns_class,
            ttl: 0,
            records: Vec::new(),
        }
    }

    /// The owner name shared by all members
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The record type shared by all members
    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    /// The class shared by all members
    pub fn dns_class(&self) -> DNSClass {
        self.dns_class
    }

    /// The TTL of the set: the minimum TTL of the inserted members
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// The members in insertion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns true if the set has no members
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Insert a record into the set.
    ///
    /// Records whose key does not match the set, or whose rdata duplicates a
    /// member, are ignored; a CNAME set keeps only its latest member. The
    /// set TTL decays to the smallest inserted TTL.
    pub fn insert(&mut self, record: Record) -> bool {
        if record.name() != &self.name
            || record.record_type() != self.record_type
            || record.dns_class() != self.dns_class
        {
            return false;
        }

        // only one CNAME may exist at a name
        if self.record_type == RecordType::CNAME {
            self.records.clear();
        }

        if self.records.iter().any(|r| r == &record) {
            return false;
        }

        self.ttl = if self.records.is_empty() {
            record.ttl()
        } else {
            self.ttl.min(record.ttl())
        };
        self.records.push(record);
        true
    }

    /// The members sorted into RFC 4034 section 6.3 canonical order, which
    /// is total and independent of insertion order
    pub fn records_in_canonical_order(&self) -> Vec<&Record> {
        let mut records: Vec<&Record> = self.records.iter().collect();
        records.sort();
        records
    }

    /// Consume into the member records
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl From<Record> for RecordSet {
    fn from(record: Record) -> Self {
        let mut set = Self::new(
            record.name().clone(),
            record.record_type(),
            record.dns_class(),
        );
        set.insert(record);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::rdata::A;
    use crate::rr::RData;

    fn record(last_octet: u8, ttl: u32) -> Record {
        Record::from_rdata(
            Name::from_ascii("example.com.").unwrap(),
            ttl,
            RData::A(A::new(192, 0, 2, last_octet)),
        )
    }

    #[test]
    fn test_ttl_is_minimum() {
        let mut set = RecordSet::new(
            Name::from_ascii("example.com.").unwrap(),
            RecordType::A,
            DNSClass::IN,
        );
        assert!(set.insert(record(1, 300)));
        assert!(set.insert(record(2, 60)));
        assert!(set.insert(record(3, 600)));
        assert_eq!(set.ttl(), 60);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_duplicates_and_mismatches_rejected() {
        let mut set = RecordSet::from(record(1, 300));
        assert!(!set.insert(record(1, 200)));

        let other_name = Record::from_rdata(
            Name::from_ascii("other.com.").unwrap(),
            300,
            RData::A(A::new(192, 0, 2, 9)),
        );
        assert!(!set.insert(other_name));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_canonical_order_is_insertion_independent() {
        let mut forward = RecordSet::new(
            Name::from_ascii("example.com.").unwrap(),
            RecordType::A,
            DNSClass::IN,
        );
        forward.insert(record(1, 300));
        forward.insert(record(2, 300));

        let mut backward = RecordSet::new(
            Name::from_ascii("example.com.").unwrap(),
            RecordType::A,
            DNSClass::IN,
        );
        backward.insert(record(2, 300));
        backward.insert(record(1, 300));

        assert_eq!(
            forward.records_in_canonical_order(),
            backward.records_in_canonical_order()
        );
    }

    #[test]
    fn test_cname_single_value() {
        use crate::rr::rdata::CNAME;

        let name = Name::from_ascii("alias.example.com.").unwrap();
        let mut set = RecordSet::new(name.clone(), RecordType::CNAME, DNSClass::IN);
        set.insert(Record::from_rdata(
            name.clone(),
            300,
            RData::CNAME(CNAME(Name::from_ascii("one.example.com.").unwrap())),
        ));
        set.insert(Record::from_rdata(
            name,
            300,
            RData::CNAME(CNAME(Name::from_ascii("two.example.com.").unwrap())),
        ));
        assert_eq!(set.len(), 1);
    }
}
