// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! message digests used by DS records and NSEC3 hashing

use std::fmt;

use ring::digest::{self, Context, SHA256, SHA384, SHA1_FOR_LEGACY_USE_ONLY};

use crate::error::{ProtoError, ProtoResult};

/// DS record digest types, RFC 4034 appendix A.2 and RFC 4509
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, PartialOrd, Ord)]
#[non_exhaustive]
pub enum DigestType {
    /// SHA-1 (legacy)
    SHA1,
    /// SHA-256, RFC 4509
    SHA256,
    /// SHA-384, RFC 6605
    SHA384,
    /// Unassigned or unsupported digest numbers
    Unknown(u8),
}

impl DigestType {
    /// Convert from the wire-form digest number
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::SHA1,
            2 => Self::SHA256,
            4 => Self::SHA384,
            _ => Self::Unknown(value),
        }
    }

    /// Returns true if this implementation can compute this digest
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// The set of computable digests, advertised via the EDNS DHU option
    pub fn supported() -> &'static [Self] {
        &[Self::SHA1, Self::SHA256, Self::SHA384]
    }

    fn ring_algorithm(self) -> ProtoResult<&'static digest::Algorithm> {
        match self {
            Self::SHA1 => Ok(&SHA1_FOR_LEGACY_USE_ONLY),
            Self::SHA256 => Ok(&SHA256),
            Self::SHA384 => Ok(&SHA384),
            Self::Unknown(value) => Err(ProtoError::from(format!(
                "unsupported digest type: {value}"
            ))),
        }
    }

    /// Digest a single block of data
    pub fn digest(self, data: &[u8]) -> ProtoResult<Vec<u8>> {
        Ok(digest::digest(self.ring_algorithm()?, data).as_ref().to_vec())
    }

    /// Digest the concatenation of several blocks of data
    pub fn digest_all(self, data: &[&[u8]]) -> ProtoResult<Vec<u8>> {
        let mut context = Context::new(self.ring_algorithm()?);
        for block in data {
            context.update(block);
        }
        Ok(context.finish().as_ref().to_vec())
    }
}

impl From<DigestType> for u8 {
    fn from(digest_type: DigestType) -> Self {
        match digest_type {
            DigestType::SHA1 => 1,
            DigestType::SHA256 => 2,
            DigestType::SHA384 => 4,
            DigestType::Unknown(value) => value,
        }
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SHA1 => "SHA1",
            Self::SHA256 => "SHA256",
            Self::SHA384 => "SHA384",
            Self::Unknown(value) => return write!(f, "{value}"),
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_vector() {
        // SHA-256 of the empty string
        let digest = DigestType::SHA256.digest(b"").unwrap();
        assert_eq!(
            digest[..4],
            [0xe3, 0xb0, 0xc4, 0x42],
        );
        assert_eq!(digest.len(), 32);
    }

    #[test]
    fn test_unknown_fails() {
        assert!(DigestType::Unknown(200).digest(b"data").is_err());
    }
}
