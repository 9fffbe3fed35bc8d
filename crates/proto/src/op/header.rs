// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Message metadata
//!
//! [RFC 1035](https://tools.ietf.org/html/rfc1035) section 4.1.1:
//!
//! ```text
//!                                    1  1  1  1  1  1
//!      0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                      ID                       |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |QR|   Opcode  |AA|TC|RD|RA|ZZ|AD|CD|   RCODE   |   AD/CD from RFC 4035
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    QDCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    ANCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    NSCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    ARCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```

use std::fmt;

use crate::error::ProtoResult;
use crate::op::{OpCode, ResponseCode};
use crate::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder};

/// Metadata of a `Message`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Header {
    id: u16,
    message_type: MessageType,
    op_code: OpCode,
    authoritative: bool,
    truncation: bool,
    recursion_desired: bool,
    recursion_available: bool,
    authentic_data: bool,
    checking_disabled: bool,
    response_code: ResponseCode,
    query_count: u16,
    answer_count: u16,
    name_server_count: u16,
    additional_count: u16,
}

/// Messages are either queries (which includes updates) or responses
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum MessageType {
    /// A client request
    Query,
    /// A server response
    Response,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "QUERY",
            Self::Response => "RESPONSE",
        })
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl Header {
    /// The encoded length of a header, always 12 octets
    pub const LEN: usize = 12;

    /// A default query header with id 0
    pub const fn new() -> Self {
        Self {
            id: 0,
            message_type: MessageType::Query,
            op_code: OpCode::Query,
            authoritative: false,
            truncation: false,
            recursion_desired: false,
            recursion_available: false,
            authentic_data: false,
            checking_disabled: false,
            response_code: ResponseCode::NoError,
            query_count: 0,
            answer_count: 0,
            name_server_count: 0,
            additional_count: 0,
        }
    }

    /// The transaction id
    pub fn id(&self) -> u16 {
        self.id
    }

    /// QR: query or response
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The kind of query
    pub fn op_code(&self) -> OpCode {
        self.op_code
    }

    /// AA: the responding server is an authority for the question name
    pub fn authoritative(&self) -> bool {
        self.authoritative
    }

    /// TC: the message was truncated to fit the transport
    pub fn truncated(&self) -> bool {
        self.truncation
    }

    /// RD: the client asks the server to pursue the query recursively
    pub fn recursion_desired(&self) -> bool {
        self.recursion_desired
    }

    /// RA: recursive service is available from the responder
    pub fn recursion_available(&self) -> bool {
        self.recursion_available
    }

    /// AD: all response data was authenticated by the responder (RFC 4035)
    pub fn authentic_data(&self) -> bool {
        self.authentic_data
    }

    /// CD: the responder must not perform signature validation (RFC 4035)
    pub fn checking_disabled(&self) -> bool {
        self.checking_disabled
    }

    /// The low 4 bits of the response code; extended bits live in EDNS
    pub fn response_code(&self) -> ResponseCode {
        self.response_code
    }

    /// Number of entries in the Question section
    pub fn query_count(&self) -> u16 {
        self.query_count
    }

    /// Number of records in the Answer section
    pub fn answer_count(&self) -> u16 {
        self.answer_count
    }

    /// Number of records in the Authority section
    pub fn name_server_count(&self) -> u16 {
        self.name_server_count
    }

    /// Number of records in the Additional section
    pub fn additional_count(&self) -> u16 {
        self.additional_count
    }

    /// Sets the transaction id; queries should use a random id
    pub fn set_id(&mut self, id: u16) -> &mut Self {
        self.id = id;
        self
    }

    /// Sets QR
    pub fn set_message_type(&mut self, message_type: MessageType) -> &mut Self {
        self.message_type = message_type;
        self
    }

    /// Sets the opcode
    pub fn set_op_code(&mut self, op_code: OpCode) -> &mut Self {
        self.op_code = op_code;
        self
    }

    /// Sets AA
    pub fn set_authoritative(&mut self, authoritative: bool) -> &mut Self {
        self.authoritative = authoritative;
        self
    }

    /// Sets TC
    pub fn set_truncated(&mut self, truncated: bool) -> &mut Self {
        self.truncation = truncated;
        self
    }

    /// Sets RD
    pub fn set_recursion_desired(&mut self, recursion_desired: bool) -> &mut Self {
        self.recursion_desired = recursion_desired;
        self
    }

    /// Sets RA
    pub fn set_recursion_available(&mut self, recursion_available: bool) -> &mut Self {
        self.recursion_available = recursion_available;
        self
    }

    /// Sets AD
    pub fn set_authentic_data(&mut self, authentic_data: bool) -> &mut Self {
        self.authentic_data = authentic_data;
        self
    }

    /// Sets CD
    pub fn set_checking_disabled(&mut self, checking_disabled: bool) -> &mut Self {
        self.checking_disabled = checking_disabled;
        self
    }

    /// Sets the low response code
    pub fn set_response_code(&mut self, response_code: ResponseCode) -> &mut Self {
        self.response_code = response_code;
        self
    }

    /// Merge the EDNS extended rcode bits over the low bits from the header.
    /// Used during decoding once the OPT record has been found.
    pub fn merge_response_code(&mut self, high_response_code: u8) {
        self.response_code =
            ResponseCode::from_low_high(self.response_code.low(), high_response_code);
    }

    /// Sets QDCOUNT
    pub fn set_query_count(&mut self, query_count: u16) -> &mut Self {
        self.query_count = query_count;
        self
    }

    /// Sets ANCOUNT
    pub fn set_answer_count(&mut self, answer_count: u16) -> &mut Self {
        self.answer_count = answer_count;
        self
    }

    /// Sets NSCOUNT
    pub fn set_name_server_count(&mut self, name_server_count: u16) -> &mut Self {
        self.name_server_count = name_server_count;
        self
    }

    /// Sets ARCOUNT
    pub fn set_additional_count(&mut self, additional_count: u16) -> &mut Self {
        self.additional_count = additional_count;
        self
    }
}

impl BinEncodable for Header {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        encoder.emit_u16(self.id)?;

        let mut flags_high = 0b0000_0000_u8;
        if self.message_type == MessageType::Response {
            flags_high |= 0b1000_0000;
        }
        flags_high |= u8::from(self.op_code) << 3;
        if self.authoritative {
            flags_high |= 0b0000_0100;
        }
        if self.truncation {
            flags_high |= 0b0000_0010;
        }
        if self.recursion_desired {
            flags_high |= 0b0000_0001;
        }

        let mut flags_low = 0b0000_0000_u8;
        if self.recursion_available {
            flags_low |= 0b1000_0000;
        }
        if self.authentic_data {
            flags_low |= 0b0010_0000;
        }
        if self.checking_disabled {
            flags_low |= 0b0001_0000;
        }
        flags_low |= self.response_code.low();

        encoder.emit(flags_high)?;
        encoder.emit(flags_low)?;

        encoder.emit_u16(self.query_count)?;
        encoder.emit_u16(self.answer_count)?;
        encoder.emit_u16(self.name_server_count)?;
        encoder.emit_u16(self.additional_count)
    }
}

impl<'r> BinDecodable<'r> for Header {
    fn read(decoder: &mut BinDecoder<'r>) -> ProtoResult<Self> {
        let id = decoder.read_u16()?.unverified(/*valid as any u16*/);

        let flags_high = decoder.read_u8()?.unverified(/*every bit is decoded*/);
        let message_type = if flags_high & 0b1000_0000 != 0 {
            MessageType::Response
        } else {
            MessageType::Query
        };
        let op_code = OpCode::from_u8((flags_high & 0b0111_1000) >> 3)?;
        let authoritative = flags_high & 0b0000_0100 != 0;
        let truncation = flags_high & 0b0000_0010 != 0;
        let recursion_desired = flags_high & 0b0000_0001 != 0;

        let flags_low = decoder.read_u8()?.unverified(/*every assigned bit is decoded*/);
        let recursion_available = flags_low & 0b1000_0000 != 0;
        let authentic_data = flags_low & 0b0010_0000 != 0;
        let checking_disabled = flags_low & 0b0001_0000 != 0;
        let response_code = ResponseCode::from_u16(u16::from(flags_low & 0b0000_1111));

        Ok(Self {
            id,
            message_type,
            op_code,
            authoritative,
            truncation,
            recursion_desired,
            recursion_available,
            authentic_data,
            checking_disabled,
            response_code,
            query_count: decoder.read_u16()?.unverified(/*validated against sections*/),
            answer_count: decoder.read_u16()?.unverified(/*validated against sections*/),
            name_server_count: decoder.read_u16()?.unverified(/*validated against sections*/),
            additional_count: decoder.read_u16()?.unverified(/*validated against sections*/),
        })
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{id}:{message_type}:{code}:{op_code}:{answers}/{authorities}/{additionals}",
            id = self.id,
            message_type = self.message_type,
            code = self.response_code,
            op_code = self.op_code,
            answers = self.answer_count,
            authorities = self.name_server_count,
            additionals = self.additional_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::binary::BinDecoder;

    #[test]
    fn test_round_trip() {
        let mut header = Header::new();
        header
            .set_id(0xBEEF)
            .set_message_type(MessageType::Response)
            .set_op_code(OpCode::Update)
            .set_authoritative(true)
            .set_truncated(true)
            .set_recursion_desired(true)
            .set_recursion_available(true)
            .set_authentic_data(true)
            .set_checking_disabled(true)
            .set_response_code(ResponseCode::Refused)
            .set_query_count(1)
            .set_answer_count(2)
            .set_name_server_count(3)
            .set_additional_count(4);

        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), Header::LEN);

        let mut decoder = BinDecoder::new(&bytes);
        let read = Header::read(&mut decoder).unwrap();
        assert_eq!(read, header);
    }

    #[test]
    fn test_flag_positions() {
        let mut header = Header::new();
        header.set_recursion_desired(true);
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes[2], 0b0000_0001);

        let mut header = Header::new();
        header.set_checking_disabled(true);
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes[3], 0b0001_0000);
    }
}
