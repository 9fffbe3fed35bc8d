// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::net::SocketAddr;
use std::time::Duration;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dnssec::{Algorithm, DigestType, Nsec3HashAlgorithm};
use crate::error::{ProtoError, ProtoErrorKind, ProtoResult};
use crate::op::{Message, Query, tsig_of};
use crate::rr::rdata::opt::EdnsOption;
use crate::rr::rdata::tsig::{TSIG, TsigSigner, strip_tsig};
use crate::rr::{RData, Record, RecordType};
use crate::serialize::binary::BinDecodable;
use crate::tcp::TcpClientStream;
use crate::udp::UdpClientStream;

/// Configuration of the single-query engine
#[derive(Clone)]
pub struct ClientOptions {
    /// Ask the servers to recurse; a resolver driving iteration clears this
    pub recursion_desired: bool,
    /// Set the CD bit, asking upstreams not to validate on our behalf
    pub checking_disabled: bool,
    /// Attach an OPT record to outbound queries
    pub use_edns: bool,
    /// Set the DO bit and advertise the supported algorithm sets
    pub dnssec_ok: bool,
    /// The EDNS maximum payload size; clamped to 512..=4096
    pub edns_payload_size: u16,
    /// Randomize the letter case of the question name (0x20 encoding)
    pub case_randomization: bool,
    /// Require the response question to match the query; with case
    /// randomization enabled the match is case-exact
    pub validate_response_identity: bool,
    /// Per-query time budget, applied per server attempt
    pub timeout: Duration,
    /// Sign queries and verify responses with this key
    pub tsig: Option<TsigSigner>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            recursion_desired: true,
            checking_disabled: false,
            use_edns: true,
            dnssec_ok: false,
            edns_payload_size: 1232,
            case_randomization: false,
            validate_response_identity: true,
            timeout: Duration::from_secs(5),
            tsig: None,
        }
    }
}

/// The single-query DNS client
#[derive(Clone, Default)]
pub struct Client {
    options: ClientOptions,
}

impl Client {
    /// Construct a client with the given options
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }

    /// The options of this client
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Issue `query` to the configured servers and await one response.
    ///
    /// Transfers (AXFR/IXFR) and ANY queries start on TCP; everything else
    /// starts on UDP and falls back to TCP when the accepted response has
    /// the TC bit set. On a transport failure the next server is tried
    /// once; there is no backoff.
    pub async fn query(
        &self,
        query: Query,
        servers: &[SocketAddr],
        cancel: &CancellationToken,
    ) -> ProtoResult<Message> {
        if servers.is_empty() {
            return Err(ProtoErrorKind::NoResponse.into());
        }

        let (message, sent_query) = self.build_message(query)?;
        let bytes = message.to_bytes()?;
        let reliable = sent_query.query_type().needs_reliable_transport();

        let mut last_error = ProtoError::from(ProtoErrorKind::NoResponse);
        for server in servers {
            if cancel.is_cancelled() {
                return Err(ProtoErrorKind::Canceled.into());
            }

            let attempt = if reliable {
                self.tcp_attempt(&bytes, &sent_query, message.id(), *server, cancel)
                    .await
            } else {
                self.udp_attempt(&bytes, &sent_query, message.id(), *server, cancel)
                    .await
            };

            match attempt {
                Ok(response) => return Ok(response),
                Err(e) if e.is_malformed() || matches!(e.kind(), ProtoErrorKind::TsigFailure(_)) => {
                    // parse and signature failures are never retried
                    return Err(e);
                }
                Err(e) => {
                    warn!("no response from {server}: {e}");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Issue a zone transfer and collect every message of the stream.
    ///
    /// Per RFC 5936 the stream ends when the opening SOA record is seen
    /// again as the last answer of a message.
    pub async fn transfer(
        &self,
        query: Query,
        server: SocketAddr,
        cancel: &CancellationToken,
    ) -> ProtoResult<Vec<Message>> {
        let (message, sent_query) = self.build_message(query)?;
        let bytes = message.to_bytes()?;

        let mut stream = self.connect_tcp(server).await?;
        stream.send(&bytes, cancel).await?;

        let mut messages = Vec::new();
        let mut opening_serial = None;

        while let Some(frame) = stream.read(cancel).await? {
            let response = Message::from_bytes(frame.bytes())?;
            self.validate_response(&response, frame.bytes(), &sent_query, message.id(), &bytes)?;

            let last_soa_serial = response
                .answers()
                .last()
                .and_then(|r| r.data())
                .and_then(RData::as_soa)
                .map(|soa| soa.serial());

            if opening_serial.is_none() {
                opening_serial = response
                    .answers()
                    .first()
                    .and_then(|r| r.data())
                    .and_then(RData::as_soa)
                    .map(|soa| soa.serial());
            }

            let first_frame = messages.is_empty();
            messages.push(response);

            // single-record first frame: opening and terminal SOA coincide
            if let (Some(open), Some(last)) = (opening_serial, last_soa_serial) {
                if open == last && !(first_frame && messages[0].answers().len() == 1) {
                    break;
                }
            }
        }

        if messages.is_empty() {
            return Err(ProtoErrorKind::NoResponse.into());
        }
        Ok(messages)
    }

    /// Build the outbound message; returns it with the query as sent,
    /// case randomization applied.
    fn build_message(&self, query: Query) -> ProtoResult<(Message, Query)> {
        let opts = &self.options;

        let sent_query = if opts.case_randomization {
            query.randomize_case()
        } else {
            query
        };

        let mut message = Message::query();
        message
            .header_mut()
            .set_id(rand::random())
            .set_recursion_desired(opts.recursion_desired)
            .set_checking_disabled(opts.checking_disabled);
        message.add_query(sent_query.clone());

        if opts.use_edns {
            let edns = message.edns_mut();
            edns.set_max_payload(opts.edns_payload_size.clamp(512, 4096));
            edns.set_dnssec_ok(opts.dnssec_ok);

            if opts.dnssec_ok {
                let options = edns.options_mut();
                options.insert(EdnsOption::DAU(Algorithm::supported().to_vec()));
                options.insert(EdnsOption::DHU(DigestType::supported().to_vec()));
                options.insert(EdnsOption::N3U(Nsec3HashAlgorithm::supported().to_vec()));
            }
        }

        // the TSIG is computed over the serialized unsigned message and
        // attached last
        if let Some(signer) = &opts.tsig {
            let unsigned = message.to_bytes()?;
            let now = OffsetDateTime::now_utc().unix_timestamp() as u64;

            let provisional = TSIG::new(
                signer.algorithm().clone(),
                now,
                signer.fudge(),
                Vec::new(),
                message.id(),
                0,
                Vec::new(),
            );
            let mac = signer.sign(&provisional.signed_data(&unsigned, signer.name(), None)?)?;
            let tsig = TSIG::new(
                signer.algorithm().clone(),
                now,
                signer.fudge(),
                mac,
                message.id(),
                0,
                Vec::new(),
            );

            message.set_signature(Record::from_rdata(
                signer.name().clone(),
                0,
                RData::TSIG(tsig),
            ));
        }

        Ok((message, sent_query))
    }

    async fn udp_attempt(
        &self,
        bytes: &[u8],
        sent_query: &Query,
        id: u16,
        server: SocketAddr,
        cancel: &CancellationToken,
    ) -> ProtoResult<Message> {
        if cancel.is_cancelled() {
            return Err(ProtoErrorKind::Canceled.into());
        }

        let stream = UdpClientStream::connect(server).await?;
        stream.send(bytes).await?;

        let deadline = tokio::time::Instant::now() + self.options.timeout;
        loop {
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())
                .ok_or(ProtoErrorKind::Timeout)?;

            let datagram = stream.receive(remaining, cancel).await?;
            let response = match Message::from_bytes(datagram.bytes()) {
                Ok(response) => response,
                Err(e) => {
                    debug!("dropping unparseable datagram from {server}: {e}");
                    continue;
                }
            };

            if let Err(e) = self.validate_response(&response, datagram.bytes(), sent_query, id, bytes)
            {
                match e.kind() {
                    // identity mismatches may be off-path noise, keep waiting
                    ProtoErrorKind::QueryIdMismatch { .. } | ProtoErrorKind::QuestionMismatch => {
                        debug!("dropping mismatched datagram from {server}: {e}");
                        continue;
                    }
                    _ => return Err(e),
                }
            }

            if response.header().truncated() {
                debug!("response from {server} truncated, retrying over tcp");
                return self.tcp_attempt(bytes, sent_query, id, server, cancel).await;
            }

            return Ok(response);
        }
    }

    async fn tcp_attempt(
        &self,
        bytes: &[u8],
        sent_query: &Query,
        id: u16,
        server: SocketAddr,
        cancel: &CancellationToken,
    ) -> ProtoResult<Message> {
        if cancel.is_cancelled() {
            return Err(ProtoErrorKind::Canceled.into());
        }

        let mut stream = self.connect_tcp(server).await?;
        stream.send(bytes, cancel).await?;

        let frame = stream
            .read(cancel)
            .await?
            .ok_or(ProtoErrorKind::NoResponse)?;

        let response = Message::from_bytes(frame.bytes())?;
        self.validate_response(&response, frame.bytes(), sent_query, id, bytes)?;
        Ok(response)
    }

    async fn connect_tcp(&self, server: SocketAddr) -> ProtoResult<TcpClientStream> {
        TcpClientStream::connect(
            server,
            self.options.timeout,
            self.options.timeout,
            self.options.timeout,
        )
        .await
    }

    /// Validate response identity and the TSIG, when configured.
    ///
    /// `raw_response` is the response exactly as received; the MAC covers
    /// the wire bytes, so a re-serialization cannot stand in for them.
    /// `request_bytes` is the query as transmitted, whose MAC chains into
    /// the response MAC.
    fn validate_response(
        &self,
        response: &Message,
        raw_response: &[u8],
        sent_query: &Query,
        id: u16,
        request_bytes: &[u8],
    ) -> ProtoResult<()> {
        if response.id() != id {
            return Err(ProtoErrorKind::QueryIdMismatch {
                expected: id,
                got: response.id(),
            }
            .into());
        }

        if self.options.validate_response_identity {
            let matches = match response.queries().first() {
                Some(echoed) if self.options.case_randomization => {
                    sent_query.matches_case(echoed)
                }
                Some(echoed) => echoed == sent_query,
                None => false,
            };
            if !matches {
                return Err(ProtoErrorKind::QuestionMismatch.into());
            }
        }

        if let Some(signer) = &self.options.tsig {
            let Some(tsig) = tsig_of(response) else {
                return Err(ProtoErrorKind::TsigFailure("response is not signed").into());
            };

            // recover the MAC of our request to chain into the response MAC
            let (_, _, request_tsig) = strip_tsig(request_bytes)?;

            let (unsigned, record_name, response_tsig) = strip_tsig(raw_response)?;
            let data = response_tsig.signed_data(
                &unsigned,
                &record_name,
                Some(request_tsig.mac()),
            )?;
            signer.verify(&data, tsig.mac())?;
        }

        Ok(())
    }
}
