// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! denial-of-existence proofs over NSEC (RFC 4035 section 5.4) and NSEC3
//! (RFC 5155 section 8) records
//!
//! The records handed in here must already have been validated; these
//! functions only decide whether the set of proofs actually denies the
//! queried name or type.

use data_encoding::BASE32_DNSSEC;
use tracing::debug;

use quill_proto::dnssec::rdata::{NSEC, NSEC3};
use quill_proto::op::Query;
use quill_proto::rr::{Name, RecordType};

/// The outcome of checking a set of denial proofs
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub(crate) enum Denial {
    /// The proofs deny the name or type
    Proven,
    /// An opt-out NSEC3 span covers the name; absence of the delegation is
    /// not signed, the result is insecure rather than secure
    OptOut,
    /// The proofs do not add up
    Invalid,
}

/// Check NSEC proofs for `query`.
///
/// With `name_error` the proofs must show the name does not exist (a
/// covering NSEC plus a covered wildcard); otherwise they must show the
/// name exists but lacks the queried type.
pub(crate) fn verify_nsec(query: &Query, nsecs: &[(&Name, &NSEC)], name_error: bool) -> Denial {
    if nsecs.is_empty() {
        return Denial::Invalid;
    }

    let qname = query.name().to_lowercase();

    if !name_error {
        // NoData: an NSEC at the queried name whose bitmap excludes the type
        for (owner, nsec) in nsecs {
            if *owner == &qname {
                if nsec.type_set().contains(query.query_type())
                    || nsec.type_set().contains(RecordType::CNAME)
                {
                    debug!("nsec at {owner} asserts {} exists", query.query_type());
                    return Denial::Invalid;
                }
                return Denial::Proven;
            }
        }

        // a wildcard may have synthesized the NoData: the wildcard matches
        // but lacks the type, and the queried name itself is covered
        let wildcard_nodata = nsecs.iter().any(|(owner, nsec)| {
            owner.is_wildcard()
                && owner.base_name().zone_of(&qname)
                && !nsec.type_set().contains(query.query_type())
        });
        if wildcard_nodata && covered_by_any(&qname, nsecs) {
            return Denial::Proven;
        }

        return Denial::Invalid;
    }

    // NameError: the name must be covered...
    let Some((covering_owner, covering_nsec)) = nsecs
        .iter()
        .find(|(owner, nsec)| nsec_covers(owner, nsec.next_domain_name(), &qname))
    else {
        debug!("no nsec covers {qname}");
        return Denial::Invalid;
    };

    // ...and so must the wildcard at the closest encloser, or the covering
    // span already proves the wildcard absent
    let closest_encloser = closest_encloser(
        &qname,
        covering_owner,
        covering_nsec.next_domain_name(),
    );
    let wildcard = closest_encloser.into_wildcard();

    if covered_by_any(&wildcard.to_lowercase(), nsecs) {
        Denial::Proven
    } else {
        debug!("wildcard {wildcard} not proven absent");
        Denial::Invalid
    }
}

fn covered_by_any(name: &Name, nsecs: &[(&Name, &NSEC)]) -> bool {
    nsecs
        .iter()
        .any(|(owner, nsec)| nsec_covers(owner, nsec.next_domain_name(), name))
}

/// True if `name` falls strictly between `owner` and `next` in canonical
/// order, accounting for the wrap at the end of the zone.
fn nsec_covers(owner: &Name, next: &Name, name: &Name) -> bool {
    let owner = owner.to_lowercase();
    let next = next.to_lowercase();
    let name = name.to_lowercase();

    if owner < next {
        owner < name && name < next
    } else {
        // the last NSEC of the zone wraps around to the apex
        name > owner || name < next
    }
}

/// The longest ancestor of `qname` shared with either endpoint of the
/// covering NSEC span; the wildcard that could have matched `qname` lives
/// directly below it.
fn closest_encloser(qname: &Name, owner: &Name, next: &Name) -> Name {
    let from_owner = common_ancestor_labels(qname, owner);
    let from_next = common_ancestor_labels(qname, next);
    qname.trim_to(from_owner.max(from_next))
}

fn common_ancestor_labels(a: &Name, b: &Name) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(left, right)| left.eq_ignore_ascii_case(right))
        .count()
}

/// Check NSEC3 proofs for `query`, hashing with each record's parameters.
///
/// The NSEC3 owner names carry the hash as their first label in Base32hex;
/// all records of one response share the zone's parameters (a mixed set is
/// invalid per RFC 5155 section 8.2).
pub(crate) fn verify_nsec3(query: &Query, nsec3s: &[(&Name, &NSEC3)], name_error: bool) -> Denial {
    if nsec3s.is_empty() {
        return Denial::Invalid;
    }

    let qname = query.name().to_lowercase();

    if !name_error {
        // NoData: a matching NSEC3 whose bitmap excludes the type
        for (owner, nsec3) in nsec3s {
            if nsec3_matches(owner, nsec3, &qname) {
                if nsec3.type_set().contains(query.query_type())
                    || nsec3.type_set().contains(RecordType::CNAME)
                {
                    return Denial::Invalid;
                }
                return Denial::Proven;
            }
        }

        // DS NoData via an opt-out span covering the name
        if query.query_type() == RecordType::DS {
            if let Some((_, nsec3)) = nsec3_covering(&qname, nsec3s) {
                if nsec3.opt_out() {
                    return Denial::OptOut;
                }
            }
        }

        return Denial::Invalid;
    }

    // NameError, RFC 5155 section 8.4: find the closest encloser with a
    // matching NSEC3, then prove the next-closer name and the wildcard at
    // the closest encloser are covered.
    let mut closest = None;
    for labels in (0..qname.num_labels() as usize).rev() {
        let candidate = qname.trim_to(labels);
        if nsec3s
            .iter()
            .any(|(owner, nsec3)| nsec3_matches(owner, nsec3, &candidate))
        {
            closest = Some((candidate, labels));
            break;
        }
    }

    let Some((closest_encloser, encloser_labels)) = closest else {
        debug!("no closest encloser proven for {qname}");
        return Denial::Invalid;
    };

    let next_closer = qname.trim_to(encloser_labels + 1);
    let Some((_, covering)) = nsec3_covering(&next_closer, nsec3s) else {
        debug!("next closer {next_closer} not covered");
        return Denial::Invalid;
    };
    let opt_out = covering.opt_out();

    let wildcard = closest_encloser.into_wildcard();
    if nsec3_covering(&wildcard, nsec3s).is_none() {
        debug!("wildcard {wildcard} not covered");
        return Denial::Invalid;
    }

    if opt_out { Denial::OptOut } else { Denial::Proven }
}

fn nsec3_matches(owner: &Name, nsec3: &NSEC3, name: &Name) -> bool {
    let Ok(hash) = nsec3.hash_name(name) else {
        return false;
    };
    owner_hash(owner).as_deref() == Some(hash.as_slice())
}

fn nsec3_covering<'a>(
    name: &Name,
    nsec3s: &'a [(&'a Name, &'a NSEC3)],
) -> Option<&'a (&'a Name, &'a NSEC3)> {
    nsec3s.iter().find(|(owner, nsec3)| {
        let Ok(hash) = nsec3.hash_name(name) else {
            return false;
        };
        let Some(owner_hash) = owner_hash(owner) else {
            return false;
        };

        let next = nsec3.next_hashed_owner_name();
        if owner_hash.as_slice() < next {
            owner_hash.as_slice() < hash.as_slice() && hash.as_slice() < next
        } else {
            hash.as_slice() > owner_hash.as_slice() || hash.as_slice() < next
        }
    })
}

/// Decode the hash from the first label of an NSEC3 owner name
fn owner_hash(owner: &Name) -> Option<Vec<u8>> {
    let first = owner.iter().next()?;
    let lower: Vec<u8> = first.iter().map(u8::to_ascii_lowercase).collect();
    BASE32_DNSSEC.decode(&lower).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_proto::dnssec::Nsec3HashAlgorithm;
    use quill_proto::rr::RecordType;

    fn name(s: &str) -> Name {
        Name::from_ascii(s).unwrap()
    }

    #[test]
    fn test_nsec_covers() {
        let owner = name("a.example.");
        let next = name("d.example.");
        assert!(nsec_covers(&owner, &next, &name("b.example.")));
        assert!(!nsec_covers(&owner, &next, &name("a.example.")));
        assert!(!nsec_covers(&owner, &next, &name("e.example.")));

        // wrap-around at the end of the zone
        let last_owner = name("z.example.");
        let apex = name("example.");
        assert!(nsec_covers(&last_owner, &apex, &name("zz.example.")));
    }

    #[test]
    fn test_nsec_nodata() {
        let query = Query::query(name("a.example."), RecordType::AAAA);
        let owner = name("a.example.");
        let nsec = NSEC::new(name("b.example."), [RecordType::A, RecordType::RRSIG]);

        assert_eq!(
            verify_nsec(&query, &[(&owner, &nsec)], false),
            Denial::Proven
        );

        // the type being present invalidates the proof
        let query_a = Query::query(name("a.example."), RecordType::A);
        assert_eq!(
            verify_nsec(&query_a, &[(&owner, &nsec)], false),
            Denial::Invalid
        );
    }

    #[test]
    fn test_nsec_name_error() {
        let query = Query::query(name("b.example."), RecordType::A);

        // covers b.example. and the wildcard *.example.
        let apex_owner = name("example.");
        let apex_nsec = NSEC::new(name("a.example."), [RecordType::SOA, RecordType::NS]);
        let owner = name("a.example.");
        let nsec = NSEC::new(name("z.example."), [RecordType::A]);

        let proofs = [(&apex_owner, &apex_nsec), (&owner, &nsec)];
        assert_eq!(verify_nsec(&query, &proofs, true), Denial::Proven);

        // without the wildcard-covering span the proof is incomplete
        let only_cover = [(&owner, &nsec)];
        assert_eq!(verify_nsec(&query, &only_cover, true), Denial::Invalid);
    }

    fn nsec3_record(zone: &Name, covered: &Name, next_of: &Name, opt_out: bool) -> (Name, NSEC3) {
        // build an NSEC3 whose owner is H(covered) and next is H(next_of)
        let alg = Nsec3HashAlgorithm::SHA1;
        let owner_hash = alg.hash(&[], covered, 1).unwrap();
        let next_hash = alg.hash(&[], next_of, 1).unwrap();

        let owner_label = BASE32_DNSSEC.encode(&owner_hash);
        let owner = Name::from_ascii(format!("{owner_label}.{zone}")).unwrap();
        let nsec3 = NSEC3::new(alg, opt_out, 1, Vec::new(), next_hash, [RecordType::A]);
        (owner, nsec3)
    }

    #[test]
    fn test_nsec3_nodata() {
        let zone = name("example.");
        let qname = name("a.example.");
        let (owner, nsec3) = nsec3_record(&zone, &qname, &zone, false);

        let query = Query::query(qname, RecordType::AAAA);
        assert_eq!(
            verify_nsec3(&query, &[(&owner, &nsec3)], false),
            Denial::Proven
        );

        let query_a = Query::query(name("a.example."), RecordType::A);
        assert_eq!(
            verify_nsec3(&query_a, &[(&owner, &nsec3)], false),
            Denial::Invalid
        );
    }

    #[test]
    fn test_nsec3_name_error_needs_closest_encloser() {
        let zone = name("example.");
        let qname = name("missing.example.");

        // matching NSEC3 for the closest encloser (the apex)...
        let (apex_owner, apex_nsec3) = nsec3_record(&zone, &zone, &name("a.example."), false);

        // ...and spans covering the next closer name and the wildcard. Both
        // endpoints are synthetic names whose hashes bracket the targets;
        // build wide spans by hashing names far apart in hash space.
        let hash = |n: &Name| Nsec3HashAlgorithm::SHA1.hash(&[], n, 1).unwrap();

        // a span (min, max) over the whole hash space except the endpoints
        let owner_label = BASE32_DNSSEC.encode(&[0_u8; 20]);
        let wide_owner = Name::from_ascii(format!("{owner_label}.{zone}")).unwrap();
        let wide = NSEC3::new(
            Nsec3HashAlgorithm::SHA1,
            false,
            1,
            Vec::new(),
            vec![0xFF; 20],
            [RecordType::A],
        );

        // sanity: the wide span covers both targets
        assert!(hash(&qname).as_slice() > [0_u8; 20].as_slice());
        assert!(hash(&name("*.example.")).as_slice() < [0xFF_u8; 20].as_slice());

        let proofs = [(&apex_owner, &apex_nsec3), (&wide_owner, &wide)];
        let query = Query::query(qname, RecordType::A);
        assert_eq!(verify_nsec3(&query, &proofs, true), Denial::Proven);

        // without the closest-encloser match the proof fails
        let incomplete = [(&wide_owner, &wide)];
        assert_eq!(verify_nsec3(&query, &incomplete, true), Denial::Invalid);
    }

    #[test]
    fn test_nsec3_ds_opt_out() {
        let zone = name("example.");
        let delegated = name("unsigned.example.");

        // an opt-out span covering the delegation's hash
        let owner_label = BASE32_DNSSEC.encode(&[0_u8; 20]);
        let owner = Name::from_ascii(format!("{owner_label}.{zone}")).unwrap();
        let span = NSEC3::new(
            Nsec3HashAlgorithm::SHA1,
            true,
            1,
            Vec::new(),
            vec![0xFF; 20],
            [RecordType::A],
        );

        let query = Query::query(delegated, RecordType::DS);
        assert_eq!(verify_nsec3(&query, &[(&owner, &span)], false), Denial::OptOut);
    }
}
