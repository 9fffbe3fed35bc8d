// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! construction of the data a DNSSEC signature is computed over

use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::rr::{DNSClass, Record};
use crate::serialize::binary::{BinEncodable, BinEncoder};

use super::rdata::SigInput;

/// Data To Be Signed: the RFC 4034 section 3.1.8.1 serialization of an RRset
/// together with the RRSIG fields that cover it.
pub struct TBS(Vec<u8>);

impl TBS {
    /// Build the signed data for `records` under `input`:
    ///
    /// ```text
    /// signed_data = RRSIG_RDATA | RR(1) | RR(2)...
    ///
    /// RRSIG_RDATA is the wire format of the RRSIG RDATA fields with the
    /// Signature field excluded and the Signer's Name in canonical form.
    ///
    /// RR(i) = name | type | class | OrigTTL | RDATA length | RDATA
    /// ```
    ///
    /// Records are filtered to the covered RRset, sorted into canonical
    /// order, and emitted with their owner reduced per the label count
    /// (wildcard reconstruction, RFC 4035 section 5.3.2).
    pub fn from_input<'a>(
        name: &Name,
        dns_class: DNSClass,
        input: &SigInput,
        records: impl Iterator<Item = &'a Record>,
    ) -> ProtoResult<Self> {
        let mut rrset: Vec<&Record> = records
            .filter(|rr| {
                rr.dns_class() == dns_class
                    && rr.record_type() == input.type_covered
                    && rr.name() == name
            })
            .collect();
        rrset.sort();
        if rrset.is_empty() {
            return Err("no records in rrset to sign".into());
        }

        let name = determine_name(name, input.num_labels)?;

        let mut buf = Vec::with_capacity(512);
        {
            let mut encoder = BinEncoder::new(&mut buf);
            encoder.set_canonical_form(true);
            input.emit(&mut encoder)?;

            for record in rrset {
                name.to_lowercase().emit_as_canonical(&mut encoder, true)?;
                input.type_covered.emit(&mut encoder)?;
                dns_class.emit(&mut encoder)?;
                encoder.emit_u32(input.original_ttl)?;

                // RDATA length is not known until the names inside have been
                // written in canonical (uncompressed) form
                let place = encoder.place_u16()?;
                if let Some(rdata) = record.data() {
                    rdata.emit(&mut encoder)?;
                }
                let len = encoder.len_since_place(&place);
                place.replace(&mut encoder, len as u16)?;
            }
        }

        Ok(Self(buf))
    }
}

impl AsRef<[u8]> for TBS {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// Reduce an owner name per the RRSIG label count, RFC 4035 section 5.3.2:
///
/// ```text
/// if rrsig_labels = fqdn_labels, name = fqdn
/// if rrsig_labels < fqdn_labels, name = "*." | the rightmost rrsig_label
///                                       labels of the fqdn
/// if rrsig_labels > fqdn_labels, the RRSIG RR did not pass the necessary
///                                validation checks
/// ```
pub fn determine_name(name: &Name, num_labels: u8) -> ProtoResult<Name> {
    let fqdn_labels = name.num_labels();

    if fqdn_labels == num_labels {
        return Ok(name.clone());
    }

    if num_labels < fqdn_labels {
        let rightmost = name.trim_to(num_labels as usize);
        let star = Name::from_labels([&b"*"[..]])?;
        return star.append_domain(&rightmost);
    }

    Err(ProtoError::from(format!(
        "rrsig labels greater than the rrset owner name: {name}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::{RData, rdata::A};

    #[test]
    fn test_determine_name() {
        let name = Name::from_ascii("www.example.com.").unwrap();
        assert_eq!(determine_name(&name, 3).unwrap(), name);
        assert_eq!(
            determine_name(&name, 2).unwrap(),
            Name::from_ascii("*.example.com.").unwrap()
        );
        assert!(determine_name(&name, 4).is_err());

        // a wildcard owner keeps its star label
        let wildcard = Name::from_ascii("*.example.com.").unwrap();
        assert_eq!(determine_name(&wildcard, 2).unwrap(), wildcard);
    }

    #[test]
    fn test_tbs_is_insertion_order_independent() {
        use crate::dnssec::Algorithm;
        use crate::rr::{RecordType, SerialNumber};

        let name = Name::from_ascii("example.com.").unwrap();
        let input = SigInput {
            type_covered: RecordType::A,
            algorithm: Algorithm::ED25519,
            num_labels: 2,
            original_ttl: 300,
            sig_expiration: SerialNumber(100),
            sig_inception: SerialNumber(0),
            key_tag: 1,
            signer_name: name.clone(),
        };

        let r1 = Record::from_rdata(name.clone(), 300, RData::A(A::new(192, 0, 2, 1)));
        let r2 = Record::from_rdata(name.clone(), 300, RData::A(A::new(192, 0, 2, 2)));

        let forward = [r1.clone(), r2.clone()];
        let backward = [r2, r1];

        let a = TBS::from_input(&name, DNSClass::IN, &input, forward.iter()).unwrap();
        let b = TBS::from_input(&name, DNSClass::IN, &input, backward.iter()).unwrap();
        assert_eq!(a.as_ref(), b.as_ref());
    }
}
