// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! DNSSEC primitives: algorithms, digests, key material, signature
//! verification, and the canonical to-be-signed serialization.
//!
//! The chain-of-trust walk that uses these primitives lives in the recursor
//! crate; this module is policy-free.

mod algorithm;
mod digest;
mod proof;
mod public_key;
pub mod rdata;
mod tbs;

pub use self::algorithm::Algorithm;
pub use self::digest::DigestType;
pub use self::proof::Proof;
pub use self::public_key::PublicKey;
pub use self::rdata::Nsec3HashAlgorithm;
pub use self::tbs::{TBS, determine_name};

use crate::error::{ProtoError, ProtoResult};
use crate::rr::Record;

use self::rdata::{DNSKEY, RRSIG};

/// Verify `rrsig` over `records` with `dnskey`.
///
/// This checks only the cryptography; the caller is responsible for the
/// consistency checks between the RRSIG fields, the RRset, and the key
/// (owner, class, type covered, label count, validity window, key tag).
pub fn verify_rrsig<'a>(
    dnskey: &DNSKEY,
    rrsig: &Record<RRSIG>,
    records: impl Iterator<Item = &'a Record>,
) -> ProtoResult<()> {
    let rrsig_data = rrsig
        .data()
        .ok_or_else(|| ProtoError::from("rrsig record has no rdata"))?;

    let tbs = TBS::from_input(
        rrsig.name(),
        rrsig.dns_class(),
        rrsig_data.input(),
        records,
    )?;

    dnskey.key()?.verify(tbs.as_ref(), rrsig_data.sig())
}
