// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Resource record related components, e.g. `Name` aka label, `Record` and
//! `RData`, the 16-bit type and class enums, and the per-type codecs.

mod dns_class;
pub mod domain;
pub mod rdata;
mod record_data;
pub mod record_type;
mod resource;
mod rr_set;
mod serial_number;
pub mod type_bit_map;

pub use self::dns_class::DNSClass;
pub use self::domain::Name;
pub use self::record_data::{RData, RecordData};
pub use self::record_type::RecordType;
pub use self::resource::Record;
pub use self::rr_set::RecordSet;
pub use self::serial_number::SerialNumber;
