// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Public key decoding and signature verification for DNSKEY material

use ring::signature::{
    self, ECDSA_P256_SHA256_FIXED, ECDSA_P384_SHA384_FIXED, ED25519,
    RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY, RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY,
    RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY, RsaPublicKeyComponents, UnparsedPublicKey,
};

use super::Algorithm;
use crate::error::{ProtoError, ProtoErrorKind, ProtoResult};

/// A public key decoded from DNSKEY rdata, ready to verify signatures
pub enum PublicKey<'k> {
    /// RSA modulus and exponent, RFC 3110 wire layout
    Rsa {
        /// public exponent
        exponent: &'k [u8],
        /// modulus
        modulus: &'k [u8],
        /// the RSA variant, selecting the hash
        algorithm: Algorithm,
    },
    /// ECDSA uncompressed curve point, RFC 6605
    Ec {
        /// the point, with the uncompressed-form tag prepended
        prefixed_bytes: Vec<u8>,
        /// P-256 or P-384
        algorithm: Algorithm,
    },
    /// Ed25519 raw 32-octet key, RFC 8080
    Ed25519(&'k [u8]),
}

impl<'k> PublicKey<'k> {
    /// Decode a public key from the key field of a DNSKEY record.
    ///
    /// ```text
    /// RFC 3110, section 2, RSA public keys:
    ///    exponent length   1 or 3 octets
    ///    exponent          as specified by length field
    ///    modulus           remaining space
    /// ```
    pub fn from_dnskey(public_key: &'k [u8], algorithm: Algorithm) -> ProtoResult<Self> {
        match algorithm {
            Algorithm::RSASHA1
            | Algorithm::RSASHA1NSEC3SHA1
            | Algorithm::RSASHA256
            | Algorithm::RSASHA512 => {
                let (exponent, modulus) = split_rsa_key(public_key)?;
                Ok(Self::Rsa {
                    exponent,
                    modulus,
                    algorithm,
                })
            }
            Algorithm::ECDSAP256SHA256 | Algorithm::ECDSAP384SHA384 => {
                let expected = if algorithm == Algorithm::ECDSAP256SHA256 {
                    64
                } else {
                    96
                };
                if public_key.len() != expected {
                    return Err(format!(
                        "expected {expected} byte ec point, got {}",
                        public_key.len()
                    )
                    .into());
                }

                // ring expects the uncompressed form with the 0x04 tag, the
                // DNSKEY stores the bare x | y coordinates
                let mut prefixed_bytes = Vec::with_capacity(public_key.len() + 1);
                prefixed_bytes.push(0x04);
                prefixed_bytes.extend_from_slice(public_key);

                Ok(Self::Ec {
                    prefixed_bytes,
                    algorithm,
                })
            }
            Algorithm::ED25519 => {
                if public_key.len() != 32 {
                    return Err(format!(
                        "expected 32 byte ed25519 key, got {}",
                        public_key.len()
                    )
                    .into());
                }
                Ok(Self::Ed25519(public_key))
            }
            Algorithm::Unknown(value) => {
                Err(ProtoErrorKind::UnsupportedAlgorithm(value).into())
            }
        }
    }

    /// Verify `signature` over `message` with this key.
    ///
    /// ECDSA signatures are the fixed-width `r | s` concatenation of RFC
    /// 6605; RSA is PKCS#1 v1.5.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> ProtoResult<()> {
        match self {
            Self::Rsa {
                exponent,
                modulus,
                algorithm,
            } => {
                let params = match algorithm {
                    Algorithm::RSASHA1 | Algorithm::RSASHA1NSEC3SHA1 => {
                        &RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY
                    }
                    Algorithm::RSASHA256 => &RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY,
                    Algorithm::RSASHA512 => &RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY,
                    _ => return Err("not an rsa algorithm".into()),
                };
                let components = RsaPublicKeyComponents {
                    n: modulus,
                    e: exponent,
                };
                components
                    .verify(params, message, signature)
                    .map_err(Into::into)
            }
            Self::Ec {
                prefixed_bytes,
                algorithm,
            } => {
                let params = match algorithm {
                    Algorithm::ECDSAP256SHA256 => &ECDSA_P256_SHA256_FIXED,
                    Algorithm::ECDSAP384SHA384 => &ECDSA_P384_SHA384_FIXED,
                    _ => return Err("not an ecdsa algorithm".into()),
                };
                UnparsedPublicKey::new(params, prefixed_bytes)
                    .verify(message, signature)
                    .map_err(Into::into)
            }
            Self::Ed25519(raw) => UnparsedPublicKey::new(&ED25519, raw)
                .verify(message, signature)
                .map_err(Into::into),
        }
    }
}

fn split_rsa_key(public_key: &[u8]) -> ProtoResult<(&[u8], &[u8])> {
    let first = *public_key
        .first()
        .ok_or_else(|| ProtoError::from("empty rsa public key"))?;

    let (exponent_len, offset) = if first == 0 {
        if public_key.len() < 3 {
            return Err("rsa public key too short".into());
        }
        (
            usize::from(u16::from_be_bytes([public_key[1], public_key[2]])),
            3,
        )
    } else {
        (usize::from(first), 1)
    };

    if public_key.len() < offset + exponent_len + 1 {
        return Err("rsa public key too short".into());
    }

    let exponent = &public_key[offset..offset + exponent_len];
    let modulus = &public_key[offset + exponent_len..];
    Ok((exponent, modulus))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_rsa_key_short_form() {
        // exponent length 3, exponent 0x010001, 4 byte modulus
        let key = [3, 0x01, 0x00, 0x01, 0xDE, 0xAD, 0xBE, 0xEF];
        let (e, n) = split_rsa_key(&key).unwrap();
        assert_eq!(e, &[0x01, 0x00, 0x01]);
        assert_eq!(n, &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_split_rsa_key_long_form() {
        let mut key = vec![0, 0x01, 0x00];
        key.extend_from_slice(&[0xAA; 256]);
        key.extend_from_slice(&[0xBB; 8]);
        let (e, n) = split_rsa_key(&key).unwrap();
        assert_eq!(e.len(), 256);
        assert_eq!(n, &[0xBB; 8]);
    }

    #[test]
    fn test_bad_lengths_rejected() {
        assert!(split_rsa_key(&[]).is_err());
        assert!(split_rsa_key(&[3, 1, 2]).is_err());
        assert!(PublicKey::from_dnskey(&[0u8; 31], Algorithm::ED25519).is_err());
        assert!(PublicKey::from_dnskey(&[0u8; 63], Algorithm::ECDSAP256SHA256).is_err());
    }
}
