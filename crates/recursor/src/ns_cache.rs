// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! the nameserver cache, mapping zones to server addresses
//!
//! Kept apart from the record cache because selection here ranks by address
//! family and randomizes order, not by DNS record type.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use tracing::debug;

use quill_proto::rr::Name;

struct NsEntry {
    addr: IpAddr,
    valid_until: Instant,
}

/// Learned delegations: for each zone, the addresses of its authoritative
/// servers with their expiry.
pub struct NameServerCache {
    zones: Mutex<HashMap<Name, Vec<NsEntry>>>,
    roots: Vec<IpAddr>,
}

impl NameServerCache {
    /// Construct a cache that falls back to the given root addresses
    pub fn new(roots: Vec<IpAddr>) -> Self {
        Self {
            zones: Mutex::new(HashMap::new()),
            roots,
        }
    }

    /// Record the addresses of `zone`'s nameservers for `ttl` seconds
    pub fn insert(&self, zone: Name, addrs: impl IntoIterator<Item = IpAddr>, ttl: u32, now: Instant) {
        let valid_until = now + Duration::from_secs(u64::from(ttl));

        let mut zones = self.zones.lock();
        let entries = zones.entry(zone).or_default();
        for addr in addrs {
            match entries.iter_mut().find(|e| e.addr == addr) {
                Some(entry) => entry.valid_until = entry.valid_until.max(valid_until),
                None => entries.push(NsEntry { addr, valid_until }),
            }
        }
    }

    /// The best nameservers to ask about `name`: the live entries of the
    /// longest cached suffix of `name`, IPv6 addresses first and shuffled
    /// within each family. With no suffix cached, the root hints.
    ///
    /// Returns the zone the servers are authoritative for alongside the
    /// addresses.
    pub fn best_nameservers(&self, name: &Name, now: Instant) -> (Name, Vec<IpAddr>) {
        let mut zones = self.zones.lock();

        let mut zone = name.clone();
        loop {
            if let Some(entries) = zones.get_mut(&zone) {
                entries.retain(|e| now < e.valid_until);
                if !entries.is_empty() {
                    let addrs = order_addresses(entries.iter().map(|e| e.addr));
                    return (zone, addrs);
                }
                zones.remove(&zone);
            }

            if zone.is_root() {
                break;
            }
            zone = zone.base_name();
        }

        debug!("no cached delegation for {name}, using root hints");
        (Name::root(), order_addresses(self.roots.iter().copied()))
    }

    /// Drop every learned delegation; the root hints remain
    pub fn clear(&self) {
        self.zones.lock().clear();
    }
}

/// Preferred family first (IPv6), random order within each family
fn order_addresses(addrs: impl Iterator<Item = IpAddr>) -> Vec<IpAddr> {
    let mut rng = rand::thread_rng();

    let (mut v6, mut v4): (Vec<IpAddr>, Vec<IpAddr>) = addrs.partition(IpAddr::is_ipv6);
    v6.shuffle(&mut rng);
    v4.shuffle(&mut rng);
    v6.extend(v4);
    v6
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn name(s: &str) -> Name {
        Name::from_ascii(s).unwrap()
    }

    fn v4(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, last))
    }

    #[test]
    fn test_longest_suffix_wins() {
        let cache = NameServerCache::new(vec![v4(1)]);
        let now = Instant::now();

        cache.insert(name("com."), [v4(10)], 300, now);
        cache.insert(name("example.com."), [v4(20)], 300, now);

        let (zone, addrs) = cache.best_nameservers(&name("www.example.com."), now);
        assert_eq!(zone, name("example.com."));
        assert_eq!(addrs, vec![v4(20)]);

        let (zone, addrs) = cache.best_nameservers(&name("other.com."), now);
        assert_eq!(zone, name("com."));
        assert_eq!(addrs, vec![v4(10)]);
    }

    #[test]
    fn test_root_hints_fallback() {
        let cache = NameServerCache::new(vec![v4(1), v4(2)]);
        let (zone, addrs) = cache.best_nameservers(&name("example.org."), Instant::now());
        assert_eq!(zone, Name::root());
        assert_eq!(addrs.len(), 2);
    }

    #[test]
    fn test_expiry() {
        let cache = NameServerCache::new(vec![v4(1)]);
        let now = Instant::now();

        cache.insert(name("com."), [v4(10)], 10, now);

        let later = now + Duration::from_secs(11);
        let (zone, _) = cache.best_nameservers(&name("example.com."), later);
        assert_eq!(zone, Name::root());
    }

    #[test]
    fn test_ipv6_preferred() {
        let cache = NameServerCache::new(Vec::new());
        let now = Instant::now();

        let v6_addr = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
        cache.insert(name("com."), [v4(10), v6_addr, v4(11)], 300, now);

        let (_, addrs) = cache.best_nameservers(&name("com."), now);
        assert_eq!(addrs[0], v6_addr);
        assert_eq!(addrs.len(), 3);
    }
}
