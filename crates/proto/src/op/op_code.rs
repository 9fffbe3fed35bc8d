// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! operation code for queries, updates, and responses

use std::fmt;

use crate::error::{ProtoError, ProtoResult};

/// The 4-bit opcode of the header, RFC 6895 section 2.2
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
#[non_exhaustive]
pub enum OpCode {
    /// A standard query
    Query,
    /// A server status request, RFC 1035
    Status,
    /// A zone change notification, RFC 1996
    Notify,
    /// A dynamic update, RFC 2136
    Update,
}

impl OpCode {
    /// Decode the opcode, failing on unassigned values
    pub fn from_u8(value: u8) -> ProtoResult<Self> {
        match value {
            0 => Ok(Self::Query),
            2 => Ok(Self::Status),
            4 => Ok(Self::Notify),
            5 => Ok(Self::Update),
            _ => Err(ProtoError::from(format!("unknown opcode: {value}"))),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op_code: OpCode) -> Self {
        match op_code {
            OpCode::Query => 0,
            OpCode::Status => 2,
            OpCode::Notify => 4,
            OpCode::Update => 5,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Query => "QUERY",
            Self::Status => "STATUS",
            Self::Notify => "NOTIFY",
            Self::Update => "UPDATE",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for op in [OpCode::Query, OpCode::Status, OpCode::Notify, OpCode::Update] {
            assert_eq!(OpCode::from_u8(u8::from(op)).unwrap(), op);
        }
        assert!(OpCode::from_u8(3).is_err());
    }
}
