// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Error types for the crate

#![deny(missing_docs)]

use std::fmt;

use enum_as_inner::EnumAsInner;
use thiserror::Error;

use quill_proto::dnssec::Proof;
use quill_proto::op::Query;
use quill_proto::rr::Name;
use quill_proto::{ProtoError, ProtoErrorKind};

/// An alias for results returned by functions of this crate
pub type Result<T> = std::result::Result<T, Error>;

/// The error kind for errors that get returned in the crate
#[derive(Debug, EnumAsInner, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An error with an arbitrary message, referenced as &'static str
    #[error("{0}")]
    Message(&'static str),

    /// An error with an arbitrary message, stored as String
    #[error("{0}")]
    Msg(String),

    /// The query is already being resolved further up the active stack
    #[error("resolution loop detected for {0}")]
    LoopDetected(Query),

    /// More referrals were followed than the configured maximum
    #[error("referral limit exceeded after {count} referrals")]
    ReferralLimitExceeded {
        /// the configured limit that was reached
        count: u8,
    },

    /// No nameserver produced a usable response for the query
    #[error("nameservers unreachable for {0}")]
    Unreachable(Query),

    /// A referral pointed at nameservers whose addresses cannot be resolved
    #[error("no usable delegation for zone {0}")]
    NoDelegation(Name),

    /// An authoritative response neither answered, referred, nor denied
    #[error("no answer for {0}")]
    NoAnswer(Query),

    /// Validation was requested and the chain of trust is broken
    #[error("dnssec validation failed for {query}: {proof}")]
    Validation {
        /// the query whose answer failed validation
        query: Query,
        /// the verdict that was reached
        proof: Proof,
    },

    /// The operation was cancelled
    #[error("request canceled")]
    Canceled,

    /// A request timed out
    #[error("request timed out")]
    Timeout,

    /// An error from the protocol layer
    #[error("proto error: {0}")]
    Proto(#[from] ProtoError),
}

/// The error type for errors that get returned in the crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub struct Error {
    /// Kind of error that occurred
    pub kind: Box<ErrorKind>,
}

impl Error {
    /// Get the kind of the error
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns true if this error was caused by a timeout or cancellation
    pub fn is_timeout(&self) -> bool {
        match self.kind() {
            ErrorKind::Timeout | ErrorKind::Canceled => true,
            ErrorKind::Proto(proto) => proto.is_timeout(),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl<E> From<E> for Error
where
    E: Into<ErrorKind>,
{
    fn from(error: E) -> Self {
        let kind: ErrorKind = error.into();

        // keep the protocol layer's cancellation and timeout kinds visible
        let kind = match kind {
            ErrorKind::Proto(proto) => match proto.kind() {
                ProtoErrorKind::Canceled => ErrorKind::Canceled,
                ProtoErrorKind::Timeout => ErrorKind::Timeout,
                _ => ErrorKind::Proto(proto),
            },
            other => other,
        };

        Self {
            kind: Box::new(kind),
        }
    }
}

impl From<&'static str> for Error {
    fn from(msg: &'static str) -> Self {
        ErrorKind::Message(msg).into()
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        ErrorKind::Msg(msg).into()
    }
}
