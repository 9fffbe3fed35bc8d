// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! recursor configuration: tunables, root hints and trust anchors

use std::net::IpAddr;
use std::time::Duration;

use quill_proto::dnssec::rdata::{DNSKEY, DS};
use quill_proto::rr::Name;

/// Tunables of the iterative resolver
#[derive(Clone)]
pub struct RecursorOpts {
    /// Time budget of each outbound query, per server attempt
    pub query_timeout: Duration,
    /// Upper bound on referrals followed within one resolution attempt
    pub max_referrals: u8,
    /// Randomize question-name letter case on outbound queries (0x20)
    pub case_randomization: bool,
    /// Reject responses whose question does not echo the query
    pub validate_response_identity: bool,
    /// The EDNS payload size advertised to servers
    pub edns_payload_size: u16,
    /// The port nameservers are contacted on; anything other than 53 is
    /// for testing
    pub dns_port: u16,
}

impl Default for RecursorOpts {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(5),
            max_referrals: 24,
            case_randomization: false,
            validate_response_identity: true,
            edns_payload_size: 1232,
            dns_port: 53,
        }
    }
}

/// The bootstrap state of the resolver: where iteration starts and which
/// keys are trusted a priori. Immutable once the resolver is constructed.
#[derive(Clone, Default)]
pub struct RecursorHints {
    roots: Vec<IpAddr>,
    trust_anchors: TrustAnchors,
}

impl RecursorHints {
    /// Hints with the given root server addresses and no trust anchors
    pub fn from_roots(roots: Vec<IpAddr>) -> Self {
        Self {
            roots,
            trust_anchors: TrustAnchors::default(),
        }
    }

    /// Hints seeded with the well-known root server addresses
    /// (a.root-servers.net through m.root-servers.net)
    pub fn for_public_roots() -> Self {
        use std::net::{Ipv4Addr, Ipv6Addr};

        let v4: [Ipv4Addr; 13] = [
            Ipv4Addr::new(198, 41, 0, 4),     // a
            Ipv4Addr::new(170, 247, 170, 2),  // b
            Ipv4Addr::new(192, 33, 4, 12),    // c
            Ipv4Addr::new(199, 7, 91, 13),    // d
            Ipv4Addr::new(192, 203, 230, 10), // e
            Ipv4Addr::new(192, 5, 5, 241),    // f
            Ipv4Addr::new(192, 112, 36, 4),   // g
            Ipv4Addr::new(198, 97, 190, 53),  // h
            Ipv4Addr::new(192, 36, 148, 17),  // i
            Ipv4Addr::new(192, 58, 128, 30),  // j
            Ipv4Addr::new(193, 0, 14, 129),   // k
            Ipv4Addr::new(199, 7, 83, 42),    // l
            Ipv4Addr::new(202, 12, 27, 33),   // m
        ];
        let v6: [Ipv6Addr; 4] = [
            Ipv6Addr::new(0x2001, 0x503, 0xba3e, 0, 0, 0, 0x2, 0x30), // a
            Ipv6Addr::new(0x2801, 0x1b8, 0x10, 0, 0, 0, 0, 0xb),      // b
            Ipv6Addr::new(0x2001, 0x500, 0x2, 0, 0, 0, 0, 0xc),       // c
            Ipv6Addr::new(0x2001, 0x500, 0x2d, 0, 0, 0, 0, 0xd),      // d
        ];

        let roots = v4
            .into_iter()
            .map(IpAddr::V4)
            .chain(v6.into_iter().map(IpAddr::V6))
            .collect();
        Self::from_roots(roots)
    }

    /// Replace the trust anchor set
    pub fn with_trust_anchors(mut self, trust_anchors: TrustAnchors) -> Self {
        self.trust_anchors = trust_anchors;
        self
    }

    /// The root server addresses iteration starts from
    pub fn roots(&self) -> &[IpAddr] {
        &self.roots
    }

    /// The keys accepted without validation
    pub fn trust_anchors(&self) -> &TrustAnchors {
        &self.trust_anchors
    }
}

/// DNSKEY and DS records accepted a priori for their zones, typically the
/// root key-signing key.
#[derive(Clone, Default)]
pub struct TrustAnchors {
    dnskeys: Vec<(Name, DNSKEY)>,
    ds: Vec<(Name, DS)>,
}

impl TrustAnchors {
    /// An empty anchor set; validation yields Indeterminate for everything
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if no anchors are configured
    pub fn is_empty(&self) -> bool {
        self.dnskeys.is_empty() && self.ds.is_empty()
    }

    /// Trust `dnskey` for `zone`
    pub fn insert_dnskey(&mut self, zone: Name, dnskey: DNSKEY) {
        self.dnskeys.push((zone, dnskey));
    }

    /// Trust `ds` for `zone`
    pub fn insert_ds(&mut self, zone: Name, ds: DS) {
        self.ds.push((zone, ds));
    }

    /// The trusted DNSKEYs of `zone`
    pub fn dnskeys_for<'a>(&'a self, zone: &'a Name) -> impl Iterator<Item = &'a DNSKEY> {
        self.dnskeys
            .iter()
            .filter(move |(anchor_zone, _)| anchor_zone == zone)
            .map(|(_, dnskey)| dnskey)
    }

    /// The trusted DS records of `zone`
    pub fn ds_for<'a>(&'a self, zone: &'a Name) -> impl Iterator<Item = &'a DS> {
        self.ds
            .iter()
            .filter(move |(anchor_zone, _)| anchor_zone == zone)
            .map(|(_, ds)| ds)
    }

    /// Returns true if an anchor exists exactly at `zone`
    pub fn covers_zone(&self, zone: &Name) -> bool {
        self.dnskeys.iter().any(|(anchor, _)| anchor == zone)
            || self.ds.iter().any(|(anchor, _)| anchor == zone)
    }

    /// Returns true if any anchored zone contains `name`, i.e. a chain of
    /// trust to `name` is conceivable
    pub fn covers_name(&self, name: &Name) -> bool {
        self.dnskeys.iter().any(|(anchor, _)| anchor.zone_of(name))
            || self.ds.iter().any(|(anchor, _)| anchor.zone_of(name))
    }

    /// The deepest anchored zone containing `name`, where a chain-of-trust
    /// walk toward `name` starts
    pub fn deepest_anchor_for(&self, name: &Name) -> Option<Name> {
        self.dnskeys
            .iter()
            .map(|(anchor, _)| anchor)
            .chain(self.ds.iter().map(|(anchor, _)| anchor))
            .filter(|anchor| anchor.zone_of(name))
            .max_by_key(|anchor| anchor.num_labels())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_proto::dnssec::Algorithm;

    #[test]
    fn test_anchor_lookup() {
        let mut anchors = TrustAnchors::empty();
        assert!(anchors.is_empty());

        let root = Name::root();
        let key = DNSKEY::new(true, true, false, Algorithm::ED25519, vec![1; 32]);
        anchors.insert_dnskey(root.clone(), key);

        assert!(anchors.covers_zone(&root));
        assert!(!anchors.covers_zone(&Name::from_ascii("example.com.").unwrap()));
        assert!(anchors.covers_name(&Name::from_ascii("example.com.").unwrap()));
        assert_eq!(anchors.dnskeys_for(&root).count(), 1);
        assert_eq!(anchors.ds_for(&root).count(), 0);
    }
}
