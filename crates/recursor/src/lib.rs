// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A recursive DNS resolver for the quill-dns library.
//!
//! The [`Recursor`] walks from the configured root hints toward an
//! authoritative answer, learning and caching delegations as it goes,
//! following CNAME chains with loop protection, and, when trust anchors are
//! configured, validating every answer against the DNSSEC chain of trust.

#![warn(
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::unimplemented,
    missing_docs,
    unreachable_pub
)]
#![recursion_limit = "256"]

mod cache;
mod config;
mod denial;
pub mod error;
mod ns_cache;
mod recursor;
mod stack;
mod validator;

pub use cache::{CachedRrset, RecordCache};
pub use config::{RecursorHints, RecursorOpts, TrustAnchors};
pub use error::{Error, ErrorKind};
pub use ns_cache::NameServerCache;
pub use recursor::Recursor;

/// re-export of the protocol crate this resolver is built on
pub use quill_proto as proto;
