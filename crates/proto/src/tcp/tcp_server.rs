// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! the accept side of the TCP transport
//!
//! A higher-level server loop is out of scope for this library; this type
//! only hands out framed connections so that collaborators (and this
//! crate's own tests) speak the same length-prefixed stream discipline as
//! the client side.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::error::ProtoResult;
use crate::tcp::TcpClientStream;

/// A listener accepting framed DNS connections
pub struct TcpServer {
    listener: TcpListener,
    keepalive: Duration,
    read_timeout: Duration,
}

impl TcpServer {
    /// Bind `addr` for accepting connections; the timeouts apply to every
    /// accepted connection's read path.
    pub async fn bind(
        addr: SocketAddr,
        keepalive: Duration,
        read_timeout: Duration,
    ) -> ProtoResult<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
            keepalive,
            read_timeout,
        })
    }

    /// The bound local address
    pub fn local_addr(&self) -> ProtoResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept the next connection as a framed stream
    pub async fn accept_connection(&self) -> ProtoResult<TcpClientStream<TcpStream>> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;

        Ok(TcpClientStream::from_stream(
            stream,
            peer,
            self.keepalive,
            self.read_timeout,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_accept_and_echo() {
        let keepalive = Duration::from_secs(5);
        let read_timeout = Duration::from_secs(5);

        let server = TcpServer::bind("127.0.0.1:0".parse().unwrap(), keepalive, read_timeout)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        tokio::spawn(async move {
            let cancel = CancellationToken::new();
            let mut connection = server.accept_connection().await.unwrap();
            while let Some(frame) = connection.read(&cancel).await.unwrap() {
                connection.send(frame.bytes(), &cancel).await.unwrap();
            }
        });

        let cancel = CancellationToken::new();
        let mut client = TcpClientStream::connect(addr, keepalive, keepalive, read_timeout)
            .await
            .unwrap();

        client.send(b"over and back", &cancel).await.unwrap();
        let frame = client.read(&cancel).await.unwrap().unwrap();
        assert_eq!(frame.bytes(), b"over and back");
    }
}
