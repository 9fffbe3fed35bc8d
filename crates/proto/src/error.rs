// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Error types for the crate

#![deny(missing_docs)]

use std::{fmt, io, sync::Arc};

use enum_as_inner::EnumAsInner;
use thiserror::Error;

use crate::rr::Name;

/// An alias for results returned by functions of this crate
pub type ProtoResult<T> = Result<T, ProtoError>;

/// The error kind for errors that get returned in the crate
#[derive(Clone, Debug, EnumAsInner, Error)]
#[non_exhaustive]
pub enum ProtoErrorKind {
    /// An error with an arbitrary message, referenced as &'static str
    #[error("{0}")]
    Message(&'static str),

    /// An error with an arbitrary message, stored as String
    #[error("{0}")]
    Msg(String),

    /// Character data length exceeded the limit
    #[error("char data length exceeds {max}: {len}")]
    CharacterDataTooLong {
        /// Specified maximum
        max: usize,
        /// Actual length
        len: usize,
    },

    /// The label bytes exceeded the limit of 63
    #[error("label bytes exceed 63: {0}")]
    LabelBytesTooLong(usize),

    /// The domain name was too long after expansion
    #[error("domain name too long: {0}")]
    DomainNameTooLong(usize),

    /// A label code of `01` or `10` in the high bits is reserved
    #[error("unrecognized label code: {0:b}")]
    UnrecognizedLabelCode(u8),

    /// More compression pointers were followed than the per-name budget allows
    #[error("compression pointer budget exceeded while reading name")]
    PointerBudgetExceeded,

    /// A compression pointer that does not point backwards in the message
    #[error("bad compression pointer: {0}")]
    BadPointer(u16),

    /// The maximum configured buffer size was exceeded while encoding
    #[error("maximal buffer size exceeded: {0}")]
    MaxBufferSizeExceeded(usize),

    /// An OPT record was found with a non-root name
    #[error("edns record must have the root name: {0}")]
    EdnsNameNotRoot(Name),

    /// More than one OPT record appeared in a message
    #[error("more than one edns record present in message")]
    DuplicateEdns,

    /// The wire form of a record could not be decoded
    #[error("malformed record: {0}")]
    MalformedRecord(&'static str),

    /// Message bytes ended before the counts in the header were satisfied
    #[error("malformed message: {0}")]
    MalformedMessage(&'static str),

    /// A response arrived whose id does not match the query
    #[error("query id mismatch, expected: {expected} got: {got}")]
    QueryIdMismatch {
        /// id sent with the query
        expected: u16,
        /// id found in the response
        got: u16,
    },

    /// A response arrived whose question section does not match the query
    #[error("response question does not match query")]
    QuestionMismatch,

    /// A TSIG record failed verification or was missing where required
    #[error("tsig verification failure: {0}")]
    TsigFailure(&'static str),

    /// The TSIG algorithm name is not one this implementation can compute
    #[error("unsupported tsig algorithm: {0}")]
    TsigUnsupportedAlgorithm(Name),

    /// The DNSSEC algorithm is not supported for verification
    #[error("unsupported dnssec algorithm: {0}")]
    UnsupportedAlgorithm(u8),

    /// A request did not complete within the configured window
    #[error("request timed out")]
    Timeout,

    /// A cancellation signal was observed at a suspension point
    #[error("request canceled")]
    Canceled,

    /// The remote closed the stream before a full message arrived
    #[error("connection closed by remote")]
    ConnectionClosed,

    /// No response was received from any of the configured servers
    #[error("no response from any server")]
    NoResponse,

    /// An error got returned from IO
    #[error("io error: {0}")]
    Io(#[from] Arc<io::Error>),

    /// A signature verification failed in ring
    #[error("signature verification failed")]
    SignatureInvalid,
}

/// The error type for errors that get returned in the crate
#[derive(Error, Clone, Debug)]
#[non_exhaustive]
pub struct ProtoError {
    /// Kind of error that occurred
    pub kind: Box<ProtoErrorKind>,
}

impl ProtoError {
    /// Get the kind of the error
    pub fn kind(&self) -> &ProtoErrorKind {
        &self.kind
    }

    /// Returns true if the request will never succeed on retry
    pub fn is_malformed(&self) -> bool {
        matches!(
            self.kind(),
            ProtoErrorKind::MalformedRecord(_)
                | ProtoErrorKind::MalformedMessage(_)
                | ProtoErrorKind::PointerBudgetExceeded
                | ProtoErrorKind::BadPointer(_)
                | ProtoErrorKind::UnrecognizedLabelCode(_)
                | ProtoErrorKind::LabelBytesTooLong(_)
                | ProtoErrorKind::DomainNameTooLong(_)
        )
    }

    /// Returns true if this error was caused by a timeout or cancellation
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.kind(),
            ProtoErrorKind::Timeout | ProtoErrorKind::Canceled
        )
    }
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl<E> From<E> for ProtoError
where
    E: Into<ProtoErrorKind>,
{
    fn from(error: E) -> Self {
        Self {
            kind: Box::new(error.into()),
        }
    }
}

impl From<&'static str> for ProtoError {
    fn from(msg: &'static str) -> Self {
        ProtoErrorKind::Message(msg).into()
    }
}

impl From<String> for ProtoError {
    fn from(msg: String) -> Self {
        ProtoErrorKind::Msg(msg).into()
    }
}

impl From<io::Error> for ProtoError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut => ProtoErrorKind::Timeout.into(),
            _ => ProtoErrorKind::Io(Arc::new(e)).into(),
        }
    }
}

impl From<ring::error::Unspecified> for ProtoError {
    fn from(_: ring::error::Unspecified) -> Self {
        ProtoErrorKind::SignatureInvalid.into()
    }
}

impl From<ProtoError> for io::Error {
    fn from(e: ProtoError) -> Self {
        match e.kind() {
            ProtoErrorKind::Timeout => Self::new(io::ErrorKind::TimedOut, e),
            _ => Self::other(e),
        }
    }
}
