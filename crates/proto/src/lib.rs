// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! quill-proto is the wire-protocol core of the quill-dns library: the
//! message and resource-record codecs, EDNS(0), TSIG, the DNSSEC record
//! types and signature primitives, UDP and TCP transports, and the
//! single-query client that ties them together.
//!
//! The iterative, validating resolver built on top of this crate lives in
//! quill-recursor.

#![warn(
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::unimplemented,
    missing_docs,
    unreachable_pub
)]
#![recursion_limit = "2048"]

pub mod client;
pub mod dnssec;
pub mod error;
pub mod op;
pub mod rr;
pub mod serialize;
pub mod tcp;
pub mod udp;
pub mod xfer;

pub use error::{ProtoError, ProtoErrorKind, ProtoResult};
