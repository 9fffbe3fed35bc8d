// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! the DNSSEC validator: top-down chain-of-trust from the configured
//! anchors to the RRset under consideration
//!
//! The validator is an internal collaborator of the resolver: it borrows
//! the resolver for the duration of one resolution to fetch the DNSKEY and
//! DS records a chain needs, with the loop-protection stack carried
//! through. Missing data yields Indeterminate, a proven unsigned delegation
//! yields Insecure, contradictory data yields Bogus; the validator never
//! synthesizes a missing chain.

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use quill_proto::dnssec::rdata::{DNSKEY, DS, NSEC, NSEC3, RRSIG};
use quill_proto::dnssec::{Proof, verify_rrsig};
use quill_proto::op::{Message, Query};
use quill_proto::rr::{Name, Record, RecordData, RecordType, SerialNumber};

use crate::denial::{Denial, verify_nsec, verify_nsec3};
use crate::recursor::Recursor;
use crate::stack::ResolutionStack;

pub(crate) struct Validator<'a> {
    pub(crate) recursor: &'a Recursor,
    pub(crate) stack: &'a ResolutionStack,
    pub(crate) cancel: &'a CancellationToken,
}

impl Validator<'_> {
    /// Assign a verdict to one RRset, using the signatures carried in the
    /// same response and fetching key material through the resolver.
    pub(crate) async fn validate_rrset(&self, records: &[Record], response: &Message) -> Proof {
        let Some(first) = records.first() else {
            return Proof::Indeterminate;
        };
        let name = first.name().clone();
        let record_type = first.record_type();

        if !self.recursor.trust_anchors().covers_name(&name) {
            return Proof::Indeterminate;
        }

        if record_type == RecordType::DNSKEY {
            return self.validate_dnskey_rrset(records, response).await;
        }

        let rrsigs = covering_rrsigs(response, &name, record_type);
        if rrsigs.is_empty() {
            trace!("no rrsig covers {name} {record_type}, probing for unsigned delegation");
            return self.prove_unsigned(&name).await;
        }

        let now = SerialNumber(OffsetDateTime::now_utc().unix_timestamp() as u32);
        let mut any_supported = false;

        for rrsig in &rrsigs {
            let Some(sig_data) = rrsig.data() else {
                continue;
            };
            let input = sig_data.input();

            if !input.algorithm.is_supported() {
                continue;
            }
            any_supported = true;

            if !sig_is_consistent(rrsig.name(), input, records, now) {
                continue;
            }

            let (dnskeys, key_proof) = self.fetch_dnskeys(&input.signer_name).await;
            if key_proof != Proof::Secure {
                debug!(
                    "dnskeys for {} not secure: {key_proof}",
                    input.signer_name
                );
                return key_proof;
            }

            for dnskey in &dnskeys {
                if !dnskey.zone_key() || dnskey.revoke() {
                    continue;
                }
                if dnskey.algorithm() != input.algorithm {
                    continue;
                }
                if dnskey.calculate_key_tag().ok() != Some(input.key_tag) {
                    continue;
                }

                if verify_rrsig(dnskey, rrsig, records.iter()).is_ok() {
                    return Proof::Secure;
                }
            }
        }

        if !any_supported {
            // RFC 4035 section 5.2: only unsupported algorithms is treated
            // as an unsigned zone
            return Proof::Insecure;
        }

        debug!("all signatures over {name} {record_type} failed");
        Proof::Bogus
    }

    /// Authenticate a DNSKEY RRset: its keys must be matched by a trust
    /// anchor or by a validated DS RRset in the parent, and the RRset must
    /// verify under one of the matched keys.
    async fn validate_dnskey_rrset(&self, records: &[Record], response: &Message) -> Proof {
        let Some(first) = records.first() else {
            return Proof::Indeterminate;
        };
        let zone = first.name().clone();

        let dnskeys: Vec<&DNSKEY> = records
            .iter()
            .filter_map(|r| r.data().and_then(DNSKEY::try_borrow))
            .collect();

        let anchors = self.recursor.trust_anchors();
        let mut trusted: Vec<&DNSKEY> = Vec::new();

        if anchors.covers_zone(&zone) {
            for dnskey in &dnskeys {
                let direct = anchors.dnskeys_for(&zone).any(|anchor| anchor == *dnskey);
                let via_ds = anchors
                    .ds_for(&zone)
                    .any(|ds| ds.covers(&zone, dnskey).unwrap_or(false));
                if direct || via_ds {
                    trusted.push(dnskey);
                }
            }
        } else {
            let (ds_set, ds_proof) = self.fetch_ds(&zone).await;
            match ds_proof {
                Proof::Secure if ds_set.is_empty() => return Proof::Insecure,
                Proof::Secure => {}
                Proof::Insecure => return Proof::Insecure,
                Proof::Bogus => return Proof::Bogus,
                Proof::Unsigned | Proof::Indeterminate => return Proof::Indeterminate,
            }

            for dnskey in &dnskeys {
                if ds_set
                    .iter()
                    .any(|ds| ds.covers(&zone, dnskey).unwrap_or(false))
                {
                    trusted.push(dnskey);
                }
            }
        }

        if trusted.is_empty() {
            debug!("no dnskey of {zone} is matched by an anchor or ds");
            return Proof::Bogus;
        }

        // the RRset signs itself with the key-signing key
        let now = SerialNumber(OffsetDateTime::now_utc().unix_timestamp() as u32);
        for rrsig in covering_rrsigs(response, &zone, RecordType::DNSKEY) {
            let Some(sig_data) = rrsig.data() else {
                continue;
            };
            let input = sig_data.input();

            if !input.algorithm.is_supported()
                || !sig_is_consistent(rrsig.name(), input, records, now)
            {
                continue;
            }

            for dnskey in &trusted {
                if dnskey.calculate_key_tag().ok() != Some(input.key_tag) {
                    continue;
                }
                if verify_rrsig(dnskey, &rrsig, records.iter()).is_ok() {
                    return Proof::Secure;
                }
            }
        }

        debug!("dnskey rrset of {zone} failed self-verification");
        Proof::Bogus
    }

    /// Decide the verdict for an unsigned RRset by walking the DS chain
    /// from the deepest applicable anchor toward the owner: a securely
    /// proven DS absence makes the delegation, and everything below it,
    /// Insecure; a complete chain of present DS records means the records
    /// should have been signed.
    async fn prove_unsigned(&self, name: &Name) -> Proof {
        let Some(anchor_zone) = self
            .recursor
            .trust_anchors()
            .deepest_anchor_for(name)
        else {
            return Proof::Indeterminate;
        };

        let mut labels = anchor_zone.num_labels() as usize + 1;
        while labels <= name.num_labels() as usize {
            let zone = name.trim_to(labels);
            let (ds_set, ds_proof) = self.fetch_ds(&zone).await;

            match ds_proof {
                Proof::Secure if ds_set.is_empty() => return Proof::Insecure,
                Proof::Secure => {
                    // signed delegation, the break must be deeper
                    labels += 1;
                }
                Proof::Insecure => return Proof::Insecure,
                Proof::Bogus => return Proof::Bogus,
                Proof::Unsigned | Proof::Indeterminate => return Proof::Indeterminate,
            }
        }

        // every delegation down to the owner is signed, yet the RRset
        // carries no signature
        Proof::Bogus
    }

    async fn fetch_dnskeys(&self, zone: &Name) -> (Vec<DNSKEY>, Proof) {
        let query = Query::query(zone.clone(), RecordType::DNSKEY);
        match self
            .recursor
            .resolve_inner(query, self.stack, self.cancel, true)
            .await
        {
            Ok(hit) => {
                let keys = hit
                    .records
                    .iter()
                    .filter_map(|r| r.data().and_then(DNSKEY::try_borrow))
                    .cloned()
                    .collect();
                (keys, hit.proof)
            }
            Err(e) => {
                debug!("dnskey fetch for {zone} failed: {e}");
                (Vec::new(), Proof::Indeterminate)
            }
        }
    }

    async fn fetch_ds(&self, zone: &Name) -> (Vec<DS>, Proof) {
        let query = Query::query(zone.clone(), RecordType::DS);
        match self
            .recursor
            .resolve_inner(query, self.stack, self.cancel, true)
            .await
        {
            Ok(hit) => {
                let ds_set = hit
                    .records
                    .iter()
                    .filter_map(|r| r.data().and_then(DS::try_borrow))
                    .cloned()
                    .collect();
                (ds_set, hit.proof)
            }
            Err(e) => {
                debug!("ds fetch for {zone} failed: {e}");
                (Vec::new(), Proof::Indeterminate)
            }
        }
    }

    /// Validate a negative answer: the NSEC/NSEC3 RRsets of the authority
    /// section must themselves be Secure, and together they must deny the
    /// queried name (`name_error`) or type.
    pub(crate) async fn validate_denial(
        &self,
        query: &Query,
        response: &Message,
        name_error: bool,
    ) -> Proof {
        let mut nsec_pairs: Vec<(&Name, &NSEC)> = Vec::new();
        let mut nsec3_pairs: Vec<(&Name, &NSEC3)> = Vec::new();
        for record in response.name_servers() {
            match record.record_type() {
                RecordType::NSEC => {
                    if let Some(nsec) = record.data().and_then(NSEC::try_borrow) {
                        nsec_pairs.push((record.name(), nsec));
                    }
                }
                RecordType::NSEC3 => {
                    if let Some(nsec3) = record.data().and_then(NSEC3::try_borrow) {
                        nsec3_pairs.push((record.name(), nsec3));
                    }
                }
                _ => {}
            }
        }

        if nsec_pairs.is_empty() && nsec3_pairs.is_empty() {
            // no proof material at all; an unsigned zone is still fine if
            // the delegation break is provable
            return self.prove_unsigned(query.name()).await;
        }

        // the proofs are only as good as their own signatures
        let mut worst = Proof::Secure;
        for rrset in group_denial_rrsets(response) {
            let proof = self.validate_rrset(&rrset, response).await;
            worst = worst.combine(proof);
            if worst.is_bogus() {
                return Proof::Bogus;
            }
        }

        let denial = if !nsec_pairs.is_empty() {
            verify_nsec(query, &nsec_pairs, name_error)
        } else {
            verify_nsec3(query, &nsec3_pairs, name_error)
        };

        match denial {
            Denial::Proven => worst,
            Denial::OptOut => worst.combine(Proof::Insecure),
            Denial::Invalid => Proof::Bogus,
        }
    }
}

/// Collect the denial-relevant RRsets (SOA, NSEC, NSEC3) of the authority
/// section, grouped by owner and type.
fn group_denial_rrsets(response: &Message) -> Vec<Vec<Record>> {
    let mut groups: Vec<Vec<Record>> = Vec::new();

    for record in response.name_servers() {
        if !matches!(
            record.record_type(),
            RecordType::SOA | RecordType::NSEC | RecordType::NSEC3
        ) {
            continue;
        }

        match groups.iter_mut().find(|group| {
            group[0].name() == record.name() && group[0].record_type() == record.record_type()
        }) {
            Some(group) => group.push(record.clone()),
            None => groups.push(vec![record.clone()]),
        }
    }

    groups
}

/// The signatures in `response` covering (name, record_type)
fn covering_rrsigs(response: &Message, name: &Name, record_type: RecordType) -> Vec<Record<RRSIG>> {
    response
        .all_sections()
        .filter(|record| record.record_type() == RecordType::RRSIG && record.name() == name)
        .filter_map(|record| Record::<RRSIG>::try_from(record.clone()).ok())
        .filter(|rrsig| {
            rrsig
                .data()
                .is_some_and(|sig| sig.input().type_covered == record_type)
        })
        .collect()
}

/// The checks of RFC 4035 section 5.3.1 that need no key material: owner,
/// label count, original TTL, signer bailiwick, and the validity window
/// under serial-number arithmetic.
fn sig_is_consistent(
    rrsig_owner: &Name,
    input: &quill_proto::dnssec::rdata::SigInput,
    records: &[Record],
    now: SerialNumber,
) -> bool {
    let Some(first) = records.first() else {
        return false;
    };

    if rrsig_owner != first.name() {
        return false;
    }
    if input.num_labels > first.name().num_labels() {
        return false;
    }
    if !input.signer_name.zone_of(first.name()) {
        return false;
    }
    if records.iter().any(|r| r.ttl() > input.original_ttl) {
        return false;
    }

    // inception <= now <= expiration, RFC 1982 comparisons
    let after_inception = matches!(
        input.sig_inception.partial_cmp(&now),
        Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
    );
    let before_expiration = matches!(
        now.partial_cmp(&input.sig_expiration),
        Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
    );

    after_inception && before_expiration
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_proto::dnssec::Algorithm;
    use quill_proto::dnssec::rdata::SigInput;
    use quill_proto::rr::RData;
    use quill_proto::rr::rdata::A;

    fn sig_input(inception: u32, expiration: u32) -> SigInput {
        SigInput {
            type_covered: RecordType::A,
            algorithm: Algorithm::ED25519,
            num_labels: 2,
            original_ttl: 300,
            sig_expiration: SerialNumber(expiration),
            sig_inception: SerialNumber(inception),
            key_tag: 1,
            signer_name: Name::from_ascii("example.com.").unwrap(),
        }
    }

    fn a_records() -> Vec<Record> {
        vec![Record::from_rdata(
            Name::from_ascii("www.example.com.").unwrap(),
            300,
            RData::A(A::new(192, 0, 2, 1)),
        )]
    }

    #[test]
    fn test_sig_window() {
        let owner = Name::from_ascii("www.example.com.").unwrap();
        let records = a_records();

        let input = sig_input(100, 200);
        assert!(sig_is_consistent(&owner, &input, &records, SerialNumber(150)));
        assert!(sig_is_consistent(&owner, &input, &records, SerialNumber(100)));
        assert!(sig_is_consistent(&owner, &input, &records, SerialNumber(200)));
        assert!(!sig_is_consistent(&owner, &input, &records, SerialNumber(99)));
        assert!(!sig_is_consistent(&owner, &input, &records, SerialNumber(201)));
    }

    #[test]
    fn test_sig_owner_and_bailiwick() {
        let records = a_records();
        let input = sig_input(100, 200);

        let wrong_owner = Name::from_ascii("other.example.com.").unwrap();
        assert!(!sig_is_consistent(&wrong_owner, &input, &records, SerialNumber(150)));

        let mut foreign_signer = sig_input(100, 200);
        foreign_signer.signer_name = Name::from_ascii("example.org.").unwrap();
        let owner = Name::from_ascii("www.example.com.").unwrap();
        assert!(!sig_is_consistent(&owner, &foreign_signer, &records, SerialNumber(150)));
    }

    #[test]
    fn test_sig_label_count() {
        let records = a_records();
        let owner = Name::from_ascii("www.example.com.").unwrap();

        let mut too_many = sig_input(100, 200);
        too_many.num_labels = 4;
        assert!(!sig_is_consistent(&owner, &too_many, &records, SerialNumber(150)));

        // fewer labels is legal, it signals wildcard expansion
        let mut wildcard = sig_input(100, 200);
        wildcard.num_labels = 2;
        assert!(sig_is_consistent(&owner, &wildcard, &records, SerialNumber(150)));
    }

    #[test]
    fn test_original_ttl_bound() {
        let owner = Name::from_ascii("www.example.com.").unwrap();
        let input = sig_input(100, 200);

        let mut inflated = a_records();
        inflated[0].set_ttl(301);
        assert!(!sig_is_consistent(&owner, &input, &inflated, SerialNumber(150)));
    }
}
