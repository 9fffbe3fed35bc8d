// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! All record data structures and the codec for each

mod a;
mod aaaa;
mod hip;
pub mod mx;
mod name;
mod null;
pub mod opt;
mod soa;
pub mod srv;
mod tkey;
pub mod tsig;
mod txt;

pub use self::a::A;
pub use self::aaaa::AAAA;
pub use self::hip::HIP;
pub use self::mx::MX;
pub use self::name::{CNAME, NS, PTR};
pub use self::null::NULL;
pub use self::opt::OPT;
pub use self::soa::SOA;
pub use self::srv::SRV;
pub use self::tkey::{TKEY, TkeyMode};
pub use self::tsig::{TSIG, TsigAlgorithm, TsigSigner};
pub use self::txt::TXT;
