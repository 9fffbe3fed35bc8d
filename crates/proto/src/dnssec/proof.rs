// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! DNSSEC Proof of record authenticity

use std::fmt;

/// The security status of a validated RRset, RFC 4035 section 4.3.
///
/// The ordering reflects strength: a composite result, such as a CNAME
/// chain, takes the weakest proof of its parts.
#[must_use = "the proof should be interrogated before records are used"]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
pub enum Proof {
    /// A chain of signed DNSKEY and DS RRsets connects a configured trust
    /// anchor to the RRset, and the signatures verify.
    Secure = 4,

    /// The RRset provably lies below an unsigned delegation; no chain of
    /// trust can exist and none is expected.
    Insecure = 3,

    /// Validation was not attempted; the records came from an unvalidated
    /// resolution.
    Unsigned = 2,

    /// A chain of trust ought to exist, but signatures failed to validate or
    /// data the DNSSEC records promise is missing.
    Bogus = 1,

    /// No applicable trust anchor, or the records needed to decide could not
    /// be obtained.
    #[default]
    Indeterminate = 0,
}

impl Proof {
    /// Returns true if this Proof represents a validated DNSSEC record
    #[inline]
    pub fn is_secure(&self) -> bool {
        *self == Self::Secure
    }

    /// Returns true if the zone is proven to be unsigned
    #[inline]
    pub fn is_insecure(&self) -> bool {
        *self == Self::Insecure
    }

    /// Returns true if validation was attempted and failed
    #[inline]
    pub fn is_bogus(&self) -> bool {
        *self == Self::Bogus
    }

    /// Returns true if no verdict could be reached
    #[inline]
    pub fn is_indeterminate(&self) -> bool {
        *self == Self::Indeterminate
    }

    /// Combine with the proof of another link in a chain: a Bogus link
    /// poisons the whole chain, otherwise the weaker of the two wins.
    #[inline]
    pub fn combine(self, other: Self) -> Self {
        if self.is_bogus() || other.is_bogus() {
            Self::Bogus
        } else {
            self.min(other)
        }
    }
}

impl fmt::Display for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Secure => "Secure",
            Self::Insecure => "Insecure",
            Self::Unsigned => "Unsigned",
            Self::Bogus => "Bogus",
            Self::Indeterminate => "Indeterminate",
        };

        f.write_str(s)
    }
}

impl std::error::Error for Proof {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order() {
        assert!(Proof::Secure > Proof::Insecure);
        assert!(Proof::Insecure > Proof::Unsigned);
        assert!(Proof::Unsigned > Proof::Bogus);
        assert!(Proof::Bogus > Proof::Indeterminate);
    }

    #[test]
    fn test_combine() {
        assert_eq!(Proof::Secure.combine(Proof::Secure), Proof::Secure);
        assert_eq!(Proof::Secure.combine(Proof::Insecure), Proof::Insecure);
        assert_eq!(Proof::Secure.combine(Proof::Unsigned), Proof::Unsigned);
        assert_eq!(Proof::Insecure.combine(Proof::Bogus), Proof::Bogus);
        assert_eq!(Proof::Secure.combine(Proof::Bogus), Proof::Bogus);
        // Bogus dominates even the lowest verdict
        assert_eq!(Proof::Indeterminate.combine(Proof::Bogus), Proof::Bogus);
    }
}
