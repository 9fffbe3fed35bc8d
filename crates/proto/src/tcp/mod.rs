// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! TCP streaming transport for DNS with 2-octet length framing

mod tcp_client_stream;
mod tcp_server;

pub use self::tcp_client_stream::TcpClientStream;
pub use self::tcp_server::TcpServer;
