// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Framed byte buffers exchanged with remote endpoints

use std::net::SocketAddr;

/// A DNS message in serialized form, tagged with the remote address it was
/// received from or will be sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialMessage {
    message: Vec<u8>,
    addr: SocketAddr,
}

impl SerialMessage {
    /// Construct a new message from its bytes and peer address
    pub fn new(message: Vec<u8>, addr: SocketAddr) -> Self {
        Self { message, addr }
    }

    /// The bytes of the message
    pub fn bytes(&self) -> &[u8] {
        &self.message
    }

    /// The remote address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Deconstruct into bytes and address
    pub fn into_parts(self) -> (Vec<u8>, SocketAddr) {
        (self.message, self.addr)
    }
}
