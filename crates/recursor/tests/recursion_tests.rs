//! end-to-end tests driving the recursor against in-process fake servers

mod server_harness;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use server_harness::{Handler, MockServer, free_port};

use quill_recursor::proto::op::{Message, Query, ResponseCode};
use quill_recursor::proto::rr::rdata::{A, CNAME, NS, SOA, TXT};
use quill_recursor::proto::rr::{DNSClass, Name, RData, Record, RecordType};
use quill_recursor::{Recursor, RecursorHints, RecursorOpts};

fn name(s: &str) -> Name {
    Name::from_ascii(s).unwrap()
}

fn subscribe() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn response_to(request: &Message) -> Message {
    let mut response = Message::response_from_request(request.header());
    if let Some(query) = request.queries().first() {
        response.add_query(query.clone());
    }
    response
}

fn query_of(request: &Message) -> Option<&Query> {
    request.queries().first()
}

fn recursor_opts(port: u16) -> RecursorOpts {
    RecursorOpts {
        dns_port: port,
        ..RecursorOpts::default()
    }
}

#[tokio::test]
async fn test_unsigned_a_lookup_through_referral() {
    subscribe();
    let port = free_port().await;

    let root_ip = IpAddr::V4(Ipv4Addr::new(127, 3, 0, 1));
    let auth_ip = IpAddr::V4(Ipv4Addr::new(127, 3, 0, 2));

    // the fake root refers every query to the example. nameserver, glue
    // included
    let root_handler: Handler = Arc::new(move |request| {
        let mut response = response_to(request);
        response.add_name_server(Record::from_rdata(
            name("example."),
            300,
            RData::NS(NS(name("ns.example."))),
        ));
        response.add_additional(Record::from_rdata(
            name("ns.example."),
            300,
            RData::A(A(match auth_ip {
                IpAddr::V4(v4) => v4,
                IpAddr::V6(_) => unreachable!(),
            })),
        ));
        Some(response)
    });

    let auth_handler: Handler = Arc::new(|request| {
        let query = query_of(request)?;
        if query.name() != &name("example.") || query.query_type() != RecordType::A {
            return None;
        }
        let mut response = response_to(request);
        response.header_mut().set_authoritative(true);
        response.add_answer(Record::from_rdata(
            name("example."),
            300,
            RData::A(A::new(192, 0, 2, 42)),
        ));
        Some(response)
    });

    let root = MockServer::start(root_ip, port, root_handler).await;
    let auth = MockServer::start(auth_ip, port, auth_handler).await;

    let recursor = Recursor::new(
        recursor_opts(port),
        RecursorHints::from_roots(vec![root.addr]),
    );

    let records: Vec<Record<A>> = recursor
        .resolve(name("example."), RecordType::A, DNSClass::IN)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data(), Some(&A::new(192, 0, 2, 42)));

    // a second lookup within the TTL is served from the cache
    let root_queries = root.queries_served();
    let auth_queries = auth.queries_served();

    let records: Vec<Record<A>> = recursor
        .resolve(name("example."), RecordType::A, DNSClass::IN)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);

    assert_eq!(root.queries_served(), root_queries);
    assert_eq!(auth.queries_served(), auth_queries);

    // clear_cache forgets both records and delegations
    recursor.clear_cache();
    let _: Vec<Record<A>> = recursor
        .resolve(name("example."), RecordType::A, DNSClass::IN)
        .await
        .unwrap();
    assert!(root.queries_served() > root_queries);
}

#[tokio::test]
async fn test_cname_chain() {
    subscribe();
    let port = free_port().await;
    let auth_ip = IpAddr::V4(Ipv4Addr::new(127, 3, 1, 1));

    let handler: Handler = Arc::new(|request| {
        let query = query_of(request)?;
        let mut response = response_to(request);
        response.header_mut().set_authoritative(true);

        if query.name() == &name("alias.test.") {
            response.add_answer(Record::from_rdata(
                name("alias.test."),
                300,
                RData::CNAME(CNAME(name("target.test."))),
            ));
            response.add_answer(Record::from_rdata(
                name("target.test."),
                300,
                RData::A(A::new(198, 51, 100, 7)),
            ));
        }
        Some(response)
    });

    let auth = MockServer::start(auth_ip, port, handler).await;
    let recursor = Recursor::new(
        recursor_opts(port),
        RecursorHints::from_roots(vec![auth.addr]),
    );

    let records: Vec<Record<A>> = recursor
        .resolve(name("alias.test."), RecordType::A, DNSClass::IN)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data(), Some(&A::new(198, 51, 100, 7)));

    // both hops were cached: the alias resolves again without traffic, and
    // the target is directly available
    let served = auth.queries_served();

    let chained: Vec<Record<A>> = recursor
        .resolve(name("alias.test."), RecordType::A, DNSClass::IN)
        .await
        .unwrap();
    assert_eq!(chained.len(), 1);

    let direct: Vec<Record<A>> = recursor
        .resolve(name("target.test."), RecordType::A, DNSClass::IN)
        .await
        .unwrap();
    assert_eq!(direct.len(), 1);

    assert_eq!(auth.queries_served(), served);
}

#[tokio::test]
async fn test_negative_caching() {
    subscribe();
    let port = free_port().await;
    let auth_ip = IpAddr::V4(Ipv4Addr::new(127, 3, 2, 1));

    let handler: Handler = Arc::new(|request| {
        let query = query_of(request)?;
        let mut response = response_to(request);
        response.header_mut().set_authoritative(true);

        if query.name() == &name("missing.test.") {
            response
                .header_mut()
                .set_response_code(ResponseCode::NXDomain);
            response.add_name_server(Record::from_rdata(
                name("test."),
                3600,
                RData::SOA(SOA::new(
                    name("ns.test."),
                    name("hostmaster.test."),
                    1,
                    7200,
                    3600,
                    1209600,
                    60,
                )),
            ));
        }
        Some(response)
    });

    let auth = MockServer::start(auth_ip, port, handler).await;
    let recursor = Recursor::new(
        recursor_opts(port),
        RecursorHints::from_roots(vec![auth.addr]),
    );

    let records: Vec<Record<A>> = recursor
        .resolve(name("missing.test."), RecordType::A, DNSClass::IN)
        .await
        .unwrap();
    assert!(records.is_empty());

    // the negative answer is served from the cache for the SOA MINIMUM
    let served = auth.queries_served();
    let records: Vec<Record<A>> = recursor
        .resolve(name("missing.test."), RecordType::A, DNSClass::IN)
        .await
        .unwrap();
    assert!(records.is_empty());
    assert_eq!(auth.queries_served(), served);
}

#[tokio::test]
async fn test_truncation_falls_back_to_tcp() {
    subscribe();
    let port = free_port().await;
    let auth_ip = IpAddr::V4(Ipv4Addr::new(127, 3, 3, 1));

    // a TXT RRset whose wire form exceeds the 512-octet datagram ceiling
    let big_strings: Vec<String> = (0..4)
        .map(|i| format!("{i}").repeat(200))
        .collect();

    let strings = big_strings.clone();
    let handler: Handler = Arc::new(move |request| {
        let query = query_of(request)?;
        let mut response = response_to(request);
        response.header_mut().set_authoritative(true);

        if query.name() == &name("big.test.") {
            for s in &strings {
                response.add_answer(Record::from_rdata(
                    name("big.test."),
                    300,
                    RData::TXT(TXT::new([s.as_str()]).unwrap()),
                ));
            }
        }
        Some(response)
    });

    let auth = MockServer::start(auth_ip, port, handler).await;
    let recursor = Recursor::new(
        recursor_opts(port),
        RecursorHints::from_roots(vec![auth.addr]),
    );

    let records: Vec<Record<TXT>> = recursor
        .resolve(name("big.test."), RecordType::TXT, DNSClass::IN)
        .await
        .unwrap();

    // the assembled answer is complete, which only the TCP path delivers
    assert_eq!(records.len(), big_strings.len());
    let mut texts: Vec<String> = records
        .iter()
        .map(|r| String::from_utf8(r.data().unwrap().txt_data()[0].to_vec()).unwrap())
        .collect();
    texts.sort();
    let mut expected = big_strings.clone();
    expected.sort();
    assert_eq!(texts, expected);

    // both the UDP attempt and the TCP retry hit the server
    assert!(auth.queries_served() >= 2);
}
