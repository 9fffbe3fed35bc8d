// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The DNS message: header, question, answer, authority and additional
//! sections, with the OPT pseudo-record interpreted into [`Edns`] and a
//! trailing TSIG surfaced separately from the additional section.

use std::fmt;

use tracing::debug;

use crate::error::{ProtoErrorKind, ProtoResult};
use crate::op::{Edns, Header, MessageType, Query, ResponseCode};
use crate::rr::rdata::TSIG;
use crate::rr::{RData, Record, RecordType};
use crate::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder};

/// The root container of the DNS protocol.
///
/// A message moves through a lifecycle of construction (parsed from bytes or
/// built by a client), optional TSIG signing, serialization, transmission,
/// and parsing on the remote end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    header: Header,
    queries: Vec<Query>,
    answers: Vec<Record>,
    name_servers: Vec<Record>,
    additionals: Vec<Record>,
    signature: Option<Record>,
    edns: Option<Edns>,
}

impl Message {
    /// Construct a new query message
    pub fn query() -> Self {
        Self::default()
    }

    /// Construct a response message echoing the request's id, opcode, RD and
    /// CD bits, per RFC 6895 section 2.
    pub fn response_from_request(request: &Header) -> Self {
        let mut header = Header::new();
        header
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired())
            .set_checking_disabled(request.checking_disabled());

        Self {
            header,
            ..Self::default()
        }
    }

    /// The header of the message
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Mutable access to the header; section counts are recomputed on emit
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// The transaction id
    pub fn id(&self) -> u16 {
        self.header.id()
    }

    /// The combined 12-bit response code, extended bits from EDNS included
    pub fn response_code(&self) -> ResponseCode {
        match &self.edns {
            Some(edns) => {
                ResponseCode::from_low_high(self.header.response_code().low(), edns.rcode_high())
            }
            None => self.header.response_code(),
        }
    }

    /// The entries of the Question section
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// The records of the Answer section
    pub fn answers(&self) -> &[Record] {
        &self.answers
    }

    /// Mutable access to the Answer section
    pub fn answers_mut(&mut self) -> &mut Vec<Record> {
        &mut self.answers
    }

    /// Take the Answer section, leaving it empty
    pub fn take_answers(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.answers)
    }

    /// The records of the Authority section
    pub fn name_servers(&self) -> &[Record] {
        &self.name_servers
    }

    /// The records of the Additional section, OPT and TSIG excluded
    pub fn additionals(&self) -> &[Record] {
        &self.additionals
    }

    /// All records of the answer, authority and additional sections
    pub fn all_sections(&self) -> impl Iterator<Item = &Record> {
        self.answers
            .iter()
            .chain(self.name_servers.iter())
            .chain(self.additionals.iter())
    }

    /// The TSIG record stripped from the additional section, if the message
    /// was signed
    pub fn signature(&self) -> Option<&Record> {
        self.signature.as_ref()
    }

    /// Attach a TSIG record; it is emitted as the last additional record
    pub fn set_signature(&mut self, signature: Record) -> &mut Self {
        self.signature = Some(signature);
        self
    }

    /// The EDNS state, if an OPT record was attached
    pub fn edns(&self) -> Option<&Edns> {
        self.edns.as_ref()
    }

    /// The EDNS state, created with defaults when absent
    pub fn edns_mut(&mut self) -> &mut Edns {
        self.edns.get_or_insert_with(Edns::new)
    }

    /// Replace the EDNS state
    pub fn set_edns(&mut self, edns: Edns) -> &mut Self {
        self.edns = Some(edns);
        self
    }

    /// Add an entry to the Question section
    pub fn add_query(&mut self, query: Query) -> &mut Self {
        self.queries.push(query);
        self
    }

    /// Add a record to the Answer section
    pub fn add_answer(&mut self, record: Record) -> &mut Self {
        self.answers.push(record);
        self
    }

    /// Add a record to the Authority section
    pub fn add_name_server(&mut self, record: Record) -> &mut Self {
        self.name_servers.push(record);
        self
    }

    /// Add a record to the Additional section
    pub fn add_additional(&mut self, record: Record) -> &mut Self {
        self.additionals.push(record);
        self
    }

    /// Serialize without a size limit (TCP framing bounds messages at 64 KiB
    /// by construction).
    pub fn to_bytes(&self) -> ProtoResult<Vec<u8>> {
        self.to_bytes_with_limit(u16::MAX)
    }

    /// Serialize within `max_size` octets.
    ///
    /// When the sections do not fit, whole records are dropped and the TC
    /// bit is set: the cut happens in the Answer section first, then the
    /// Authority section, then the Additional section. OPT and TSIG records
    /// are never dropped; their space is reserved up front and they are
    /// re-appended unmodified after the cut.
    pub fn to_bytes_with_limit(&self, max_size: u16) -> ProtoResult<Vec<u8>> {
        // pre-encode the tail that must survive truncation
        let mut tail = Vec::new();
        {
            let mut tail_encoder = BinEncoder::new(&mut tail);
            let mut tail_count = 0_u16;
            if let Some(edns) = &self.edns {
                edns.emit(&mut tail_encoder)?;
                tail_count += 1;
            }
            if let Some(signature) = &self.signature {
                signature.emit(&mut tail_encoder)?;
                tail_count += 1;
            }
            debug_assert!(tail_count <= 2);
        }

        let record_budget = (max_size as usize)
            .checked_sub(tail.len())
            .ok_or(ProtoErrorKind::MaxBufferSizeExceeded(max_size as usize))?;

        let mut buf = Vec::with_capacity(512);
        let mut truncated = false;
        let (answer_count, name_server_count, additional_count);
        {
            let mut encoder = BinEncoder::new(&mut buf);
            encoder.set_max_size(record_budget as u16);

            // the real header is patched in once the counts are known
            Header::new().emit(&mut encoder)?;

            for query in &self.queries {
                query.emit(&mut encoder)?;
            }

            answer_count = encoder.emit_all(self.answers.iter())?;
            truncated |= answer_count < self.answers.len();

            name_server_count = if truncated {
                0
            } else {
                let count = encoder.emit_all(self.name_servers.iter())?;
                truncated |= count < self.name_servers.len();
                count
            };

            additional_count = if truncated {
                0
            } else {
                let count = encoder.emit_all(self.additionals.iter())?;
                truncated |= count < self.additionals.len();
                count
            };

            if truncated {
                debug!("message truncated to {} bytes", encoder.len());
            }

            // lift the limit back up for the reserved tail
            encoder.set_max_size(max_size);
            encoder.emit_vec(&tail)?;

            let mut tail_records = 0_u16;
            if self.edns.is_some() {
                tail_records += 1;
            }
            if self.signature.is_some() {
                tail_records += 1;
            }

            let mut header = self.header;
            header
                .set_truncated(self.header.truncated() || truncated)
                .set_query_count(self.queries.len() as u16)
                .set_answer_count(answer_count as u16)
                .set_name_server_count(name_server_count as u16)
                .set_additional_count(additional_count as u16 + tail_records);

            let end = encoder.offset();
            encoder.set_offset(0);
            header.emit(&mut encoder)?;
            encoder.set_offset(end);
        }

        Ok(buf)
    }
}

impl BinEncodable for Message {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        let bytes = self.to_bytes()?;
        encoder.emit_vec(&bytes)
    }
}

impl<'r> BinDecodable<'r> for Message {
    fn read(decoder: &mut BinDecoder<'r>) -> ProtoResult<Self> {
        let mut header = Header::read(decoder)?;

        let mut queries = Vec::with_capacity(header.query_count() as usize);
        for _ in 0..header.query_count() {
            queries.push(Query::read(decoder)?);
        }

        let read_records = |decoder: &mut BinDecoder<'r>, count: u16| -> ProtoResult<Vec<Record>> {
            let mut records = Vec::with_capacity(count as usize);
            for _ in 0..count {
                records.push(Record::read(decoder)?);
            }
            Ok(records)
        };

        let answers = read_records(decoder, header.answer_count())?;
        let name_servers = read_records(decoder, header.name_server_count())?;

        let mut additionals = Vec::with_capacity(header.additional_count() as usize);
        let mut edns = None;
        let mut signature = None;
        for index in 0..header.additional_count() {
            let record = Record::read(decoder)?;

            match record.record_type() {
                RecordType::OPT => {
                    if edns.is_some() {
                        return Err(ProtoErrorKind::DuplicateEdns.into());
                    }
                    header.merge_response_code(Edns::from(&record).rcode_high());
                    edns = Some(Edns::from(&record));
                }
                RecordType::TSIG => {
                    if index + 1 != header.additional_count() {
                        return Err(ProtoErrorKind::TsigFailure(
                            "tsig must be the last additional record",
                        )
                        .into());
                    }
                    signature = Some(record);
                }
                _ => additionals.push(record),
            }
        }

        Ok(Self {
            header,
            queries,
            answers,
            name_servers,
            additionals,
            signature,
            edns,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; header {}", self.header)?;
        if let Some(edns) = &self.edns {
            writeln!(f, "; edns {edns}")?;
        }
        for query in &self.queries {
            writeln!(f, "; query {query}")?;
        }
        for record in &self.answers {
            writeln!(f, "{record}")?;
        }
        for record in &self.name_servers {
            writeln!(f, "{record}")?;
        }
        for record in &self.additionals {
            writeln!(f, "{record}")?;
        }
        Ok(())
    }
}

/// Returns the TSIG data of a message's signature record, if present
pub fn tsig_of(message: &Message) -> Option<&TSIG> {
    match message.signature()?.data() {
        Some(RData::TSIG(tsig)) => Some(tsig),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::rdata::{A, TXT};
    use crate::rr::Name;

    fn query_message() -> Message {
        let mut message = Message::query();
        message.header_mut().set_id(0x1234);
        message.add_query(Query::query(
            Name::from_ascii("www.example.com.").unwrap(),
            RecordType::A,
        ));
        message
    }

    #[test]
    fn test_round_trip() {
        let mut message = query_message();
        message.header_mut().set_message_type(MessageType::Response);
        message.add_answer(Record::from_rdata(
            Name::from_ascii("www.example.com.").unwrap(),
            300,
            RData::A(A::new(192, 0, 2, 1)),
        ));
        message.edns_mut().set_max_payload(4096).set_dnssec_ok(true);

        let bytes = message.to_bytes().unwrap();
        let read = Message::from_bytes(&bytes).unwrap();

        assert_eq!(read.id(), 0x1234);
        assert_eq!(read.queries(), message.queries());
        assert_eq!(read.answers(), message.answers());
        assert!(read.edns().unwrap().dnssec_ok());
        assert_eq!(read.edns().unwrap().max_payload(), 4096);
    }

    #[test]
    fn test_counts_mismatch_fails() {
        let mut bytes = query_message().to_bytes().unwrap();
        // claim one answer that is not present
        bytes[7] = 1;
        assert!(Message::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_truncation_drops_whole_records() {
        let mut message = query_message();
        message.header_mut().set_message_type(MessageType::Response);
        for i in 0..50 {
            message.add_answer(Record::from_rdata(
                Name::from_ascii("www.example.com.").unwrap(),
                300,
                RData::TXT(TXT::new([format!("record number {i} with some padding")]).unwrap()),
            ));
        }

        let bytes = message.to_bytes_with_limit(512).unwrap();
        assert!(bytes.len() <= 512);

        let read = Message::from_bytes(&bytes).unwrap();
        assert!(read.header().truncated());
        assert!(!read.answers().is_empty());
        assert!(read.answers().len() < 50);
    }

    #[test]
    fn test_truncation_keeps_edns() {
        let mut message = query_message();
        message.header_mut().set_message_type(MessageType::Response);
        message.edns_mut().set_max_payload(1232);
        for _ in 0..100 {
            message.add_answer(Record::from_rdata(
                Name::from_ascii("www.example.com.").unwrap(),
                300,
                RData::TXT(TXT::new(["some text that occupies space"]).unwrap()),
            ));
        }

        let bytes = message.to_bytes_with_limit(512).unwrap();
        let read = Message::from_bytes(&bytes).unwrap();
        assert!(read.header().truncated());
        assert_eq!(read.edns().unwrap().max_payload(), 1232);
    }

    #[test]
    fn test_duplicate_opt_fails() {
        let mut message = query_message();
        let opt_record = Record::from(&Edns::new());
        // bypass the edns slot and place two OPT records directly
        message.add_additional(opt_record.clone());
        message.add_additional(opt_record);

        let bytes = message.to_bytes().unwrap();
        let err = Message::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err.kind(), ProtoErrorKind::DuplicateEdns));
    }

    #[test]
    fn test_authority_dropped_when_answers_cut() {
        let mut message = query_message();
        message.header_mut().set_message_type(MessageType::Response);
        for _ in 0..60 {
            message.add_answer(Record::from_rdata(
                Name::from_ascii("www.example.com.").unwrap(),
                300,
                RData::TXT(TXT::new(["padding padding padding"]).unwrap()),
            ));
        }
        message.add_name_server(Record::from_rdata(
            Name::from_ascii("example.com.").unwrap(),
            300,
            RData::A(A::new(192, 0, 2, 53)),
        ));

        let bytes = message.to_bytes_with_limit(512).unwrap();
        let read = Message::from_bytes(&bytes).unwrap();
        assert!(read.header().truncated());
        assert!(read.name_servers().is_empty());
    }
}
