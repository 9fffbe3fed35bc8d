// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! the record cache, keyed by (name, type, class)

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::trace;

use quill_proto::dnssec::Proof;
use quill_proto::op::Query;
use quill_proto::rr::Record;

/// An RRset pulled from the cache: the records with decayed TTLs and the
/// validation verdict assigned when they were stored.
///
/// An empty record list is a cached negative answer.
#[derive(Debug, Clone)]
pub struct CachedRrset {
    /// The records of the set; TTLs reflect the time already spent cached
    pub records: Vec<Record>,
    /// The verdict assigned at insertion
    pub proof: Proof,
}

struct CacheEntry {
    records: Vec<Record>,
    proof: Proof,
    inserted: Instant,
    valid_until: Instant,
}

impl CacheEntry {
    fn is_current(&self, now: Instant) -> bool {
        now < self.valid_until
    }
}

/// An in-memory cache of RRsets with absolute expiry.
///
/// Concurrent readers do not block each other; stale entries are evicted
/// lazily when a lookup touches them.
#[derive(Default)]
pub struct RecordCache {
    inner: RwLock<HashMap<Query, CacheEntry>>,
}

impl RecordCache {
    /// Construct an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the RRset for `query`.
    ///
    /// A hit is returned only while `now` is before the entry's expiry; the
    /// elapsed cache time is subtracted from the returned TTLs, so a cached
    /// TTL never increases and decays toward zero.
    pub fn get(&self, query: &Query, now: Instant) -> Option<CachedRrset> {
        {
            let cache = self.inner.read();
            let entry = cache.get(query)?;

            if entry.is_current(now) {
                let elapsed =
                    u32::try_from(now.saturating_duration_since(entry.inserted).as_secs())
                        .unwrap_or(u32::MAX);

                let records = entry
                    .records
                    .iter()
                    .cloned()
                    .map(|mut record| {
                        record.set_ttl(record.ttl().saturating_sub(elapsed));
                        record
                    })
                    .collect();

                return Some(CachedRrset {
                    records,
                    proof: entry.proof,
                });
            }
        }

        // stale entry observed, evict it before reporting the miss
        trace!("evicting stale cache entry for {query}");
        self.inner.write().remove(query);
        None
    }

    /// Store the RRset for `query`, replacing any previous entry.
    ///
    /// A zero TTL makes the write a no-op: such records serve only the
    /// transaction in progress. An empty record list with a verdict is a
    /// negative entry.
    pub fn insert(
        &self,
        query: Query,
        records: Vec<Record>,
        proof: Proof,
        ttl: u32,
        now: Instant,
    ) {
        if ttl == 0 {
            return;
        }

        let entry = CacheEntry {
            records,
            proof,
            inserted: now,
            valid_until: now + Duration::from_secs(u64::from(ttl)),
        };
        self.inner.write().insert(query, entry);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Number of live and stale entries currently held
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_proto::rr::rdata::A;
    use quill_proto::rr::{Name, RData, RecordType};

    fn query() -> Query {
        Query::query(Name::from_ascii("example.com.").unwrap(), RecordType::A)
    }

    fn records(ttl: u32) -> Vec<Record> {
        vec![Record::from_rdata(
            Name::from_ascii("example.com.").unwrap(),
            ttl,
            RData::A(A::new(192, 0, 2, 1)),
        )]
    }

    #[test]
    fn test_hit_and_expiry() {
        let cache = RecordCache::new();
        let now = Instant::now();

        cache.insert(query(), records(300), Proof::Unsigned, 300, now);

        let hit = cache.get(&query(), now).expect("fresh entry must hit");
        assert_eq!(hit.records.len(), 1);
        assert_eq!(hit.proof, Proof::Unsigned);

        // just before expiry: hit; at/after expiry: unobservable
        assert!(cache.get(&query(), now + Duration::from_secs(299)).is_some());
        assert!(cache.get(&query(), now + Duration::from_secs(300)).is_none());
        assert!(cache.get(&query(), now + Duration::from_secs(301)).is_none());

        // the stale entry was evicted lazily
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_decays() {
        let cache = RecordCache::new();
        let now = Instant::now();

        cache.insert(query(), records(300), Proof::Unsigned, 300, now);

        let hit = cache.get(&query(), now + Duration::from_secs(100)).unwrap();
        assert_eq!(hit.records[0].ttl(), 200);

        // a TTL never increases after insertion
        let earlier_hit = cache.get(&query(), now).unwrap();
        assert_eq!(earlier_hit.records[0].ttl(), 300);
    }

    #[test]
    fn test_zero_ttl_is_noop() {
        let cache = RecordCache::new();
        let now = Instant::now();

        cache.insert(query(), records(0), Proof::Unsigned, 0, now);
        assert!(cache.get(&query(), now).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_negative_entry() {
        let cache = RecordCache::new();
        let now = Instant::now();

        cache.insert(query(), Vec::new(), Proof::Secure, 60, now);

        let hit = cache.get(&query(), now).unwrap();
        assert!(hit.records.is_empty());
        assert_eq!(hit.proof, Proof::Secure);
    }

    #[test]
    fn test_insert_replaces() {
        let cache = RecordCache::new();
        let now = Instant::now();

        cache.insert(query(), records(300), Proof::Unsigned, 300, now);
        cache.insert(query(), records(60), Proof::Secure, 60, now);

        let hit = cache.get(&query(), now).unwrap();
        assert_eq!(hit.proof, Proof::Secure);
        assert_eq!(hit.records[0].ttl(), 60);
    }

    #[test]
    fn test_clear() {
        let cache = RecordCache::new();
        let now = Instant::now();
        cache.insert(query(), records(300), Proof::Unsigned, 300, now);
        cache.clear();
        assert!(cache.get(&query(), now).is_none());
    }
}
