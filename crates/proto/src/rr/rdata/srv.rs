// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! service records for defining the location of services, RFC 2782

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::{ProtoError, ProtoResult};
use crate::rr::domain::Name;
use crate::serialize::binary::{
    BinDecodable, BinDecoder, BinEncodable, BinEncoder, RecordDataDecodable, Restrict,
};

/// The SRV record type
///
/// The target name is never compressed on the wire (RFC 2782), though the
/// codec tolerates compressed targets from noncompliant senders on read.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SRV {
    priority: u16,
    weight: u16,
    port: u16,
    target: Name,
}

impl SRV {
    /// Create a new SRV record
    pub fn new(priority: u16, weight: u16, port: u16, target: Name) -> Self {
        Self {
            priority,
            weight,
            port,
            target,
        }
    }

    /// Clients contact the lowest-priority targets first
    pub fn priority(&self) -> u16 {
        self.priority
    }

    /// Selection weight among targets of equal priority
    pub fn weight(&self) -> u16 {
        self.weight
    }

    /// The port of the service on the target
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The host of the service
    pub fn target(&self) -> &Name {
        &self.target
    }

    /// Parse the zone-file form: `priority weight port target`
    pub fn parse<'i>(
        mut tokens: impl Iterator<Item = &'i str>,
        origin: Option<&Name>,
    ) -> ProtoResult<Self> {
        let mut next_u16 = |field: &'static str| {
            tokens
                .next()
                .ok_or(ProtoError::from(field))
                .and_then(|t| u16::from_str(t).map_err(|e| format!("{field}: {e}").into()))
        };
        let priority = next_u16("priority not present")?;
        let weight = next_u16("weight not present")?;
        let port = next_u16("port not present")?;

        let target = tokens
            .next()
            .ok_or_else(|| ProtoError::from("target not present"))
            .and_then(|t| Name::parse(t, origin))?;

        Ok(Self::new(priority, weight, port, target))
    }
}

/// Order SRV targets for use: ascending priority, and within each priority a
/// weight-proportional random selection per RFC 2782.
///
/// The wire codec preserves listed order; this is a selection helper for
/// consumers of a queried RRset.
pub fn weighted_order(records: &[SRV]) -> Vec<SRV> {
    let mut rng = rand::thread_rng();
    let mut remaining: Vec<&SRV> = records.iter().collect();
    // zero-weight entries first within a priority gives them a small but
    // non-zero chance of selection, per the RFC
    remaining.sort_by_key(|srv| (srv.priority, srv.weight));

    let mut ordered = Vec::with_capacity(records.len());
    while !remaining.is_empty() {
        let priority = remaining[0].priority;
        let group_len = remaining
            .iter()
            .take_while(|srv| srv.priority == priority)
            .count();

        let mut group: Vec<&SRV> = remaining.drain(..group_len).collect();
        while !group.is_empty() {
            let total: u32 = group.iter().map(|srv| u32::from(srv.weight)).sum();
            let pick = if total == 0 {
                0
            } else {
                let mut roll = rng.gen_range(0..=total);
                group
                    .iter()
                    .position(|srv| {
                        roll = roll.saturating_sub(u32::from(srv.weight));
                        roll == 0
                    })
                    .unwrap_or(0)
            };
            ordered.push(group.remove(pick).clone());
        }
    }

    ordered
}

impl BinEncodable for SRV {
    fn emit(&self, encoder: &mut BinEncoder<'_>) -> ProtoResult<()> {
        encoder.emit_u16(self.priority)?;
        encoder.emit_u16(self.weight)?;
        encoder.emit_u16(self.port)?;
        self.target
            .emit_as_canonical(encoder, encoder.is_canonical_form())
    }
}

impl RecordDataDecodable<'_> for SRV {
    fn read_data(decoder: &mut BinDecoder<'_>, _length: Restrict<u16>) -> ProtoResult<Self> {
        Ok(Self {
            priority: decoder.read_u16()?.unverified(/*any u16 is valid*/),
            weight: decoder.read_u16()?.unverified(/*any u16 is valid*/),
            port: decoder.read_u16()?.unverified(/*any u16 is valid*/),
            target: Name::read(decoder)?,
        })
    }
}

impl fmt::Display for SRV {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn srv(priority: u16, weight: u16, port: u16) -> SRV {
        SRV::new(
            priority,
            weight,
            port,
            Name::from_ascii("srv.example.com.").unwrap(),
        )
    }

    #[test]
    fn test_round_trip() {
        let rdata = srv(1, 2, 8080);
        let bytes = rdata.to_bytes().unwrap();
        let mut decoder = BinDecoder::new(&bytes);
        let read = SRV::read_data(&mut decoder, Restrict::new(bytes.len() as u16)).unwrap();
        assert_eq!(read, rdata);
    }

    #[test]
    fn test_weighted_order_priorities() {
        let records = vec![srv(20, 0, 3), srv(10, 1, 1), srv(10, 100, 2), srv(5, 0, 0)];

        for _ in 0..16 {
            let ordered = weighted_order(&records);
            assert_eq!(ordered.len(), records.len());
            let priorities: Vec<u16> = ordered.iter().map(SRV::priority).collect();
            let mut sorted = priorities.clone();
            sorted.sort_unstable();
            // priorities always ascend, whatever the weighted choice was
            assert_eq!(priorities, sorted);
        }
    }

    #[test]
    fn test_weighted_order_all_zero_weights() {
        let records = vec![srv(1, 0, 1), srv(1, 0, 2), srv(1, 0, 3)];
        let ordered = weighted_order(&records);
        assert_eq!(ordered.len(), 3);
    }
}
