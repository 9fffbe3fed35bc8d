//! end-to-end DNSSEC validation against an in-test signed zone

mod server_harness;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair};
use time::OffsetDateTime;

use server_harness::{Handler, MockServer, free_port};

use quill_recursor::proto::dnssec::rdata::{DNSKEY, DNSSECRData, RRSIG, SigInput};
use quill_recursor::proto::dnssec::{Algorithm, Proof, TBS};
use quill_recursor::proto::op::Message;
use quill_recursor::proto::rr::rdata::A;
use quill_recursor::proto::rr::{DNSClass, Name, RData, Record, RecordType, SerialNumber};
use quill_recursor::{ErrorKind, Recursor, RecursorHints, RecursorOpts, TrustAnchors};

fn name(s: &str) -> Name {
    Name::from_ascii(s).unwrap()
}

/// A signed test zone: one Ed25519 key acting as both KSK and ZSK
struct SignedZone {
    apex: Name,
    keypair: Ed25519KeyPair,
    dnskey: DNSKEY,
}

impl SignedZone {
    fn generate(apex: Name) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let keypair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        let dnskey = DNSKEY::new(
            true,
            true,
            false,
            Algorithm::ED25519,
            keypair.public_key().as_ref().to_vec(),
        );

        Self {
            apex,
            keypair,
            dnskey,
        }
    }

    fn dnskey_record(&self) -> Record {
        Record::from_rdata(
            self.apex.clone(),
            300,
            RData::DNSSEC(DNSSECRData::DNSKEY(self.dnskey.clone())),
        )
    }

    /// Sign an RRset with a validity window around `now` shifted by the
    /// given offsets
    fn sign(&self, records: &[Record], inception_offset: i64, expiration_offset: i64) -> Record {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let first = &records[0];

        let input = SigInput {
            type_covered: first.record_type(),
            algorithm: Algorithm::ED25519,
            num_labels: first.name().num_labels(),
            original_ttl: first.ttl(),
            sig_expiration: SerialNumber((now + expiration_offset) as u32),
            sig_inception: SerialNumber((now + inception_offset) as u32),
            key_tag: self.dnskey.calculate_key_tag().unwrap(),
            signer_name: self.apex.clone(),
        };

        let tbs =
            TBS::from_input(first.name(), DNSClass::IN, &input, records.iter()).unwrap();
        let sig = self.keypair.sign(tbs.as_ref()).as_ref().to_vec();

        Record::from_rdata(
            first.name().clone(),
            first.ttl(),
            RData::DNSSEC(DNSSECRData::RRSIG(RRSIG::new(input, sig))),
        )
    }

    fn trust_anchors(&self) -> TrustAnchors {
        let mut anchors = TrustAnchors::empty();
        anchors.insert_dnskey(self.apex.clone(), self.dnskey.clone());
        anchors
    }
}

fn signed_zone_handler(zone: Arc<SignedZone>, rrsig_offsets: (i64, i64)) -> Handler {
    Arc::new(move |request: &Message| {
        let query = request.queries().first()?;
        let mut response = Message::response_from_request(request.header());
        response.add_query(query.clone());
        response.header_mut().set_authoritative(true);

        if query.name() == &zone.apex && query.query_type() == RecordType::DNSKEY {
            let dnskey_rrset = vec![zone.dnskey_record()];
            // the DNSKEY RRset stays verifiable even when the zone serves
            // broken signatures for its data
            let rrsig = zone.sign(&dnskey_rrset, -3600, 3600);
            for record in dnskey_rrset {
                response.add_answer(record);
            }
            response.add_answer(rrsig);
        } else if query.name() == &name("secure.test.") && query.query_type() == RecordType::A {
            let rrset = vec![Record::from_rdata(
                name("secure.test."),
                300,
                RData::A(A::new(203, 0, 113, 5)),
            )];
            let rrsig = zone.sign(&rrset, rrsig_offsets.0, rrsig_offsets.1);
            for record in rrset {
                response.add_answer(record);
            }
            response.add_answer(rrsig);
        }

        Some(response)
    })
}

#[tokio::test]
async fn test_secure_answer() {
    let port = free_port().await;
    let auth_ip = IpAddr::V4(Ipv4Addr::new(127, 3, 4, 1));

    let zone = Arc::new(SignedZone::generate(name("test.")));
    let handler = signed_zone_handler(Arc::clone(&zone), (-3600, 3600));
    let auth = MockServer::start(auth_ip, port, handler).await;

    let recursor = Recursor::new(
        RecursorOpts {
            dns_port: port,
            ..RecursorOpts::default()
        },
        RecursorHints::from_roots(vec![auth.addr]).with_trust_anchors(zone.trust_anchors()),
    );

    let (records, proof) = recursor
        .resolve_secure::<A>(name("secure.test."), RecordType::A, DNSClass::IN)
        .await
        .unwrap();

    assert_eq!(proof, Proof::Secure);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data(), Some(&A::new(203, 0, 113, 5)));
}

#[tokio::test]
async fn test_expired_signature_is_bogus() {
    let port = free_port().await;
    let auth_ip = IpAddr::V4(Ipv4Addr::new(127, 3, 4, 2));

    let zone = Arc::new(SignedZone::generate(name("test.")));
    // the signature over the A RRset expired an hour ago
    let handler = signed_zone_handler(Arc::clone(&zone), (-7200, -3600));
    let auth = MockServer::start(auth_ip, port, handler).await;

    let recursor = Recursor::new(
        RecursorOpts {
            dns_port: port,
            ..RecursorOpts::default()
        },
        RecursorHints::from_roots(vec![auth.addr]).with_trust_anchors(zone.trust_anchors()),
    );

    let err = recursor
        .resolve_secure::<A>(name("secure.test."), RecordType::A, DNSClass::IN)
        .await
        .unwrap_err();

    match err.kind() {
        ErrorKind::Validation { proof, .. } => assert_eq!(*proof, Proof::Bogus),
        other => panic!("expected a validation error, got {other}"),
    }
}

#[tokio::test]
async fn test_unvalidated_resolve_ignores_signatures() {
    let port = free_port().await;
    let auth_ip = IpAddr::V4(Ipv4Addr::new(127, 3, 4, 3));

    let zone = Arc::new(SignedZone::generate(name("test.")));
    // broken signatures do not bother a plain resolve
    let handler = signed_zone_handler(Arc::clone(&zone), (-7200, -3600));
    let auth = MockServer::start(auth_ip, port, handler).await;

    let recursor = Recursor::new(
        RecursorOpts {
            dns_port: port,
            ..RecursorOpts::default()
        },
        RecursorHints::from_roots(vec![auth.addr]).with_trust_anchors(zone.trust_anchors()),
    );

    let records: Vec<Record<A>> = recursor
        .resolve(name("secure.test."), RecordType::A, DNSClass::IN)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}
