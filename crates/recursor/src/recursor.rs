// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! the iterative resolver control loop

use std::net::IpAddr;
use std::time::Instant;

use async_recursion::async_recursion;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use quill_proto::client::{Client, ClientOptions};
use quill_proto::dnssec::Proof;
use quill_proto::op::{Message, Query, ResponseCode};
use quill_proto::rr::{DNSClass, Name, RData, Record, RecordData, RecordType};

use crate::cache::{CachedRrset, RecordCache};
use crate::config::{RecursorHints, RecursorOpts, TrustAnchors};
use crate::error::{Error, ErrorKind, Result};
use crate::ns_cache::NameServerCache;
use crate::stack::ResolutionStack;
use crate::validator::Validator;

/// An iterative, cache-aware, optionally validating resolver.
///
/// One `Recursor` serves any number of concurrent resolutions; they share
/// only the record cache and the nameserver cache. Within one resolution,
/// queries are issued strictly sequentially.
pub struct Recursor {
    client: Client,
    record_cache: RecordCache,
    ns_cache: NameServerCache,
    trust_anchors: TrustAnchors,
    opts: RecursorOpts,
}

impl Recursor {
    /// Construct a resolver from its tunables and bootstrap hints
    pub fn new(opts: RecursorOpts, hints: RecursorHints) -> Self {
        let client = Client::new(ClientOptions {
            // iteration drives recursion itself and validates on its own
            recursion_desired: false,
            checking_disabled: true,
            use_edns: true,
            dnssec_ok: !hints.trust_anchors().is_empty(),
            edns_payload_size: opts.edns_payload_size,
            case_randomization: opts.case_randomization,
            validate_response_identity: opts.validate_response_identity,
            timeout: opts.query_timeout,
            tsig: None,
        });

        Self {
            client,
            record_cache: RecordCache::new(),
            ns_cache: NameServerCache::new(hints.roots().to_vec()),
            trust_anchors: hints.trust_anchors().clone(),
            opts,
        }
    }

    /// The configured trust anchors
    pub fn trust_anchors(&self) -> &TrustAnchors {
        &self.trust_anchors
    }

    /// Resolve without validation.
    ///
    /// Returns an empty list for both NXDOMAIN and NoData; transport and
    /// limit failures are errors.
    pub async fn resolve<R: RecordData>(
        &self,
        name: Name,
        record_type: RecordType,
        class: DNSClass,
    ) -> Result<Vec<Record<R>>> {
        let cancel = CancellationToken::new();
        let query = Query::with_class(name, record_type, class);
        let result = self
            .resolve_inner(query, &ResolutionStack::new(), &cancel, false)
            .await?;

        Ok(into_typed(result.records))
    }

    /// Resolve and validate, returning the records together with the
    /// verdict of the chain-of-trust walk.
    ///
    /// A Bogus verdict is an error; Insecure and Indeterminate answers are
    /// returned with their verdict for the caller to judge.
    pub async fn resolve_secure<R: RecordData>(
        &self,
        name: Name,
        record_type: RecordType,
        class: DNSClass,
    ) -> Result<(Vec<Record<R>>, Proof)> {
        let cancel = CancellationToken::new();
        let query = Query::with_class(name, record_type, class);
        let result = self
            .resolve_inner(query.clone(), &ResolutionStack::new(), &cancel, true)
            .await?;

        if result.proof.is_bogus() {
            return Err(ErrorKind::Validation {
                query,
                proof: result.proof,
            }
            .into());
        }

        Ok((into_typed(result.records), result.proof))
    }

    /// Drop every cached record and learned delegation; the root hints and
    /// trust anchors remain.
    pub fn clear_cache(&self) {
        self.record_cache.clear();
        self.ns_cache.clear();
    }

    /// One resolution attempt: cache, then iterate referrals from the best
    /// known nameservers.
    #[async_recursion]
    pub(crate) async fn resolve_inner(
        &self,
        query: Query,
        stack: &ResolutionStack,
        cancel: &CancellationToken,
        validate: bool,
    ) -> Result<CachedRrset> {
        let _guard = stack.enter(&query)?;
        trace!("resolving {query} at depth {}", stack.depth());

        if let Some(hit) = self.cache_lookup(&query, validate) {
            debug!("cache hit for {query}");
            return Ok(hit);
        }

        // a cached CNAME short-circuits to the canonical name
        if query.query_type() != RecordType::CNAME && query.query_type() != RecordType::ANY {
            let cname_key =
                Query::with_class(query.name().clone(), RecordType::CNAME, query.query_class());
            if let Some(cname_hit) = self.cache_lookup(&cname_key, validate) {
                if let Some(target) = cname_target(&cname_hit.records) {
                    debug!("cached cname {} -> {target}", query.name());
                    return self
                        .chase_cname(&query, cname_hit, target, stack, cancel, validate)
                        .await;
                }
            }
        }

        for _ in 0..self.opts.max_referrals {
            if cancel.is_cancelled() {
                return Err(ErrorKind::Canceled.into());
            }

            // DS lives in the parent zone, everything else at the owner
            let lookup_name = match query.query_type() {
                RecordType::DS if !query.name().is_root() => query.name().base_name(),
                _ => query.name().clone(),
            };
            let (zone, servers) = self
                .ns_cache
                .best_nameservers(&lookup_name, Instant::now());
            if servers.is_empty() {
                return Err(ErrorKind::NoDelegation(zone).into());
            }

            debug!("querying {query} at {} server(s) for zone {zone}", servers.len());
            let response = match self
                .client
                .query(
                    query.clone(),
                    &socket_addrs(&servers, self.opts.dns_port),
                    cancel,
                )
                .await
            {
                Ok(response) => response,
                Err(e) if e.is_timeout() => return Err(Error::from(ErrorKind::Proto(e))),
                Err(e) => {
                    debug!("no response for {query}: {e}");
                    return Err(ErrorKind::Unreachable(query).into());
                }
            };

            match response.response_code() {
                ResponseCode::NoError | ResponseCode::NXDomain => {}
                code => {
                    debug!("unusable rcode {code} for {query}");
                    return Err(ErrorKind::Unreachable(query).into());
                }
            }

            if response.header().authoritative() {
                return self
                    .classify(&query, &response, stack, cancel, validate)
                    .await;
            }

            if !self
                .follow_referral(&query, &zone, &response, stack, cancel)
                .await?
            {
                return Err(ErrorKind::NoDelegation(zone).into());
            }
        }

        Err(ErrorKind::ReferralLimitExceeded {
            count: self.opts.max_referrals,
        }
        .into())
    }

    /// Cache lookup honoring the validation mode: a validating resolution
    /// does not accept entries stored without validation.
    fn cache_lookup(&self, query: &Query, validate: bool) -> Option<CachedRrset> {
        let hit = self.record_cache.get(query, Instant::now())?;
        if validate && hit.proof == Proof::Unsigned {
            return None;
        }
        Some(hit)
    }

    /// Classify an authoritative response: answer, CNAME, negative, or
    /// nothing. Validated RRsets are cached with their verdicts along the
    /// way.
    async fn classify(
        &self,
        query: &Query,
        response: &Message,
        stack: &ResolutionStack,
        cancel: &CancellationToken,
        validate: bool,
    ) -> Result<CachedRrset> {
        let now = Instant::now();
        let class = query.query_class();
        let validator = Validator {
            recursor: self,
            stack,
            cancel,
        };

        // validate and cache every answer RRset; signatures stay with the
        // response and are not cached as sets of their own
        let mut found: Option<CachedRrset> = None;
        let mut cname_set: Option<CachedRrset> = None;

        for rrset in group_rrsets(response.answers()) {
            let (name, record_type) = {
                let first = &rrset[0];
                (first.name().clone(), first.record_type())
            };
            if record_type == RecordType::RRSIG {
                continue;
            }

            let proof = if validate {
                validator.validate_rrset(&rrset, response).await
            } else {
                Proof::Unsigned
            };
            let ttl = rrset.iter().map(Record::ttl).min().unwrap_or(0);

            self.record_cache.insert(
                Query::with_class(name.clone(), record_type, class),
                rrset.clone(),
                proof,
                ttl,
                now,
            );

            if &name == query.name() {
                if record_type == query.query_type() || query.query_type() == RecordType::ANY {
                    let entry = CachedRrset {
                        records: rrset,
                        proof,
                    };
                    match &mut found {
                        // ANY answers merge across types
                        Some(existing) if query.query_type() == RecordType::ANY => {
                            existing.records.extend(entry.records);
                            existing.proof = existing.proof.combine(entry.proof);
                        }
                        Some(_) => {}
                        None => found = Some(entry),
                    }
                } else if record_type == RecordType::CNAME {
                    cname_set = Some(CachedRrset {
                        records: rrset,
                        proof,
                    });
                }
            }
        }

        if let Some(found) = found {
            return Ok(found);
        }

        if let Some(cname_set) = cname_set {
            if let Some(target) = cname_target(&cname_set.records) {
                return self
                    .chase_cname(query, cname_set, target, stack, cancel, validate)
                    .await;
            }
        }

        // negative answer: an SOA of an enclosing zone in the authority
        let soa_record = response
            .name_servers()
            .iter()
            .find(|r| r.record_type() == RecordType::SOA && r.name().zone_of(query.name()));

        if let Some(soa_record) = soa_record {
            let name_error = response.response_code() == ResponseCode::NXDomain;

            let proof = if validate {
                validator.validate_denial(query, response, name_error).await
            } else {
                Proof::Unsigned
            };

            let negative_ttl = match soa_record.data().and_then(RData::as_soa) {
                // RFC 2308: the negative TTL is the lesser of the SOA
                // MINIMUM and the SOA's own TTL
                Some(soa) => soa.minimum().min(soa_record.ttl()),
                None => soa_record.ttl(),
            };

            debug!(
                "negative answer for {query} (nxdomain: {name_error}), caching {negative_ttl}s"
            );
            self.record_cache
                .insert(query.clone(), Vec::new(), proof, negative_ttl, now);

            return Ok(CachedRrset {
                records: Vec::new(),
                proof,
            });
        }

        Err(ErrorKind::NoAnswer(query.clone()).into())
    }

    /// Follow a CNAME to its target, combining verdicts: the chain is only
    /// as strong as its weakest hop.
    async fn chase_cname(
        &self,
        query: &Query,
        cname_set: CachedRrset,
        target: Name,
        stack: &ResolutionStack,
        cancel: &CancellationToken,
        validate: bool,
    ) -> Result<CachedRrset> {
        let target_query = Query::with_class(target, query.query_type(), query.query_class());
        let chased = self
            .resolve_inner(target_query, stack, cancel, validate)
            .await?;

        let mut records = cname_set.records;
        records.extend(chased.records);

        Ok(CachedRrset {
            records,
            proof: cname_set.proof.combine(chased.proof),
        })
    }

    /// Digest a referral: learn the delegated zone's nameservers, with glue
    /// when offered, resolving the NS targets otherwise. Returns false when
    /// the response holds no usable delegation.
    async fn follow_referral(
        &self,
        query: &Query,
        current_zone: &Name,
        response: &Message,
        stack: &ResolutionStack,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        // deepest NS owner that encloses the queried name and moves the
        // iteration downward from the zone we just asked
        let mut referral: Option<(&Name, Vec<&Name>, u32)> = None;
        for record in response.name_servers() {
            if record.record_type() != RecordType::NS {
                continue;
            }
            let Some(ns) = record.data().and_then(RData::as_ns) else {
                continue;
            };
            let owner = record.name();

            if !owner.zone_of(query.name()) {
                warn!("ignoring off-question referral owner {owner}");
                continue;
            }
            if !current_zone.zone_of(owner) || owner.num_labels() <= current_zone.num_labels() {
                warn!("ignoring non-descending referral to {owner}");
                continue;
            }

            match &mut referral {
                Some((zone, targets, ttl)) if *zone == owner => {
                    targets.push(&ns.0);
                    *ttl = (*ttl).min(record.ttl());
                }
                Some((zone, ..)) if zone.num_labels() >= owner.num_labels() => {}
                _ => referral = Some((owner, vec![&ns.0], record.ttl())),
            }
        }

        let Some((referral_zone, targets, ns_ttl)) = referral else {
            debug!("response for {query} carries no referral");
            return Ok(false);
        };

        // glue from the additional section, in-bailiwick targets only
        let mut addrs: Vec<IpAddr> = Vec::new();
        let mut glue_ttl = ns_ttl;
        for record in response.additionals() {
            let Some(ip) = record.data().and_then(RData::ip_addr) else {
                continue;
            };
            let in_targets = targets.iter().any(|target| *target == record.name());
            if in_targets && referral_zone.zone_of(record.name()) {
                if !addrs.contains(&ip) {
                    addrs.push(ip);
                }
                glue_ttl = glue_ttl.min(record.ttl());
            }
        }

        // glueless delegation: resolve target addresses, one at a time
        if addrs.is_empty() {
            for target in &targets {
                for record_type in [RecordType::A, RecordType::AAAA] {
                    let target_query = Query::with_class(
                        (*target).clone(),
                        record_type,
                        query.query_class(),
                    );
                    match self
                        .resolve_inner(target_query, stack, cancel, false)
                        .await
                    {
                        Ok(hit) => addrs.extend(
                            hit.records
                                .iter()
                                .filter_map(|r| r.data().and_then(RData::ip_addr)),
                        ),
                        Err(e) => debug!("could not resolve ns target {target}: {e}"),
                    }
                }
                if !addrs.is_empty() {
                    break;
                }
            }
        }

        if addrs.is_empty() {
            debug!("no addresses for any nameserver of {referral_zone}");
            return Ok(false);
        }

        debug!(
            "learned {} nameserver address(es) for {referral_zone}",
            addrs.len()
        );
        self.ns_cache
            .insert(referral_zone.clone(), addrs, glue_ttl, Instant::now());
        Ok(true)
    }
}

fn into_typed<R: RecordData>(records: Vec<Record>) -> Vec<Record<R>> {
    records
        .into_iter()
        .filter_map(|record| Record::<R>::try_from(record).ok())
        .filter(|record| record.data().is_some())
        .collect()
}

fn cname_target(records: &[Record]) -> Option<Name> {
    records
        .iter()
        .find_map(|r| r.data().and_then(RData::as_cname))
        .map(|cname| cname.0.clone())
}

fn socket_addrs(addrs: &[IpAddr], port: u16) -> Vec<std::net::SocketAddr> {
    addrs
        .iter()
        .map(|addr| std::net::SocketAddr::new(*addr, port))
        .collect()
}

/// Group consecutive and non-consecutive records into RRsets by owner name
/// and type, preserving first-appearance order.
fn group_rrsets(records: &[Record]) -> Vec<Vec<Record>> {
    let mut groups: Vec<Vec<Record>> = Vec::new();

    for record in records {
        match groups.iter_mut().find(|group| {
            group[0].name() == record.name() && group[0].record_type() == record.record_type()
        }) {
            Some(group) => group.push(record.clone()),
            None => groups.push(vec![record.clone()]),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_proto::rr::rdata::{A, CNAME};

    fn name(s: &str) -> Name {
        Name::from_ascii(s).unwrap()
    }

    #[test]
    fn test_group_rrsets() {
        let records = vec![
            Record::from_rdata(name("a.test."), 300, RData::A(A::new(192, 0, 2, 1))),
            Record::from_rdata(name("b.test."), 300, RData::A(A::new(192, 0, 2, 2))),
            Record::from_rdata(name("a.test."), 300, RData::A(A::new(192, 0, 2, 3))),
        ];

        let groups = group_rrsets(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn test_into_typed_filters() {
        let records = vec![
            Record::from_rdata(
                name("alias.test."),
                300,
                RData::CNAME(CNAME(name("target.test."))),
            ),
            Record::from_rdata(name("target.test."), 300, RData::A(A::new(192, 0, 2, 7))),
        ];

        let typed: Vec<Record<A>> = into_typed(records);
        assert_eq!(typed.len(), 1);
        assert_eq!(typed[0].data(), Some(&A::new(192, 0, 2, 7)));
    }

    #[test]
    fn test_cname_target() {
        let records = vec![Record::from_rdata(
            name("alias.test."),
            300,
            RData::CNAME(CNAME(name("target.test."))),
        )];
        assert_eq!(cname_target(&records), Some(name("target.test.")));
        assert_eq!(cname_target(&[]), None);
    }

    #[tokio::test]
    async fn test_loop_detected() {
        let recursor = Recursor::new(
            RecursorOpts::default(),
            RecursorHints::from_roots(vec![IpAddr::from([192, 0, 2, 1])]),
        );

        let stack = ResolutionStack::new();
        let cancel = CancellationToken::new();
        let query = Query::query(name("loop.test."), RecordType::A);
        let _guard = stack.enter(&query).unwrap();

        let err = recursor
            .resolve_inner(query, &stack, &cancel, false)
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LoopDetected(_)));

        // the failed attempt left no trace in the record cache
        assert!(recursor.record_cache.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_query() {
        let recursor = Recursor::new(
            RecursorOpts::default(),
            RecursorHints::from_roots(vec![IpAddr::from([192, 0, 2, 1])]),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = recursor
            .resolve_inner(
                Query::query(name("example.test."), RecordType::A),
                &ResolutionStack::new(),
                &cancel,
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Canceled));
    }
}
