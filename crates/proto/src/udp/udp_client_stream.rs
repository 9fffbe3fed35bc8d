// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! one-shot UDP exchange with a single server

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ProtoErrorKind, ProtoResult};
use crate::udp::MAX_RECEIVE_BUFFER_SIZE;
use crate::xfer::SerialMessage;

/// A UDP socket bound for one query/response exchange.
///
/// A fresh socket, and with it a fresh ephemeral port, is used per query so
/// that the port number contributes entropy against off-path spoofing.
pub struct UdpClientStream {
    socket: UdpSocket,
    server: SocketAddr,
}

impl UdpClientStream {
    /// Bind an ephemeral local socket for an exchange with `server`
    pub async fn connect(server: SocketAddr) -> ProtoResult<Self> {
        let bind_addr: SocketAddr = match server {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        Ok(Self { socket, server })
    }

    /// The server this stream exchanges datagrams with
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Send one datagram to the server
    pub async fn send(&self, message: &[u8]) -> ProtoResult<()> {
        let sent = self.socket.send_to(message, self.server).await?;
        if sent != message.len() {
            return Err("datagram was sent partially".into());
        }
        Ok(())
    }

    /// Receive one datagram within `timeout`.
    ///
    /// Datagrams from any address other than the queried server are
    /// discarded and the wait continues against the same deadline;
    /// cancellation or an elapsed timeout reports the corresponding error
    /// kind.
    pub async fn receive(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ProtoResult<SerialMessage> {
        let mut buf = [0_u8; MAX_RECEIVE_BUFFER_SIZE];
        let deadline = time::Instant::now() + timeout;

        loop {
            if cancel.is_cancelled() {
                return Err(ProtoErrorKind::Canceled.into());
            }

            let recv = time::timeout_at(deadline, self.socket.recv_from(&mut buf));
            let (len, from) = tokio::select! {
                _ = cancel.cancelled() => return Err(ProtoErrorKind::Canceled.into()),
                recv = recv => match recv {
                    Ok(result) => result?,
                    Err(_elapsed) => return Err(ProtoErrorKind::Timeout.into()),
                },
            };

            if from != self.server {
                debug!("dropping datagram from unexpected source {from}");
                continue;
            }

            return Ok(SerialMessage::new(buf[..len].to_vec(), from));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exchange() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0_u8; 512];
            let (len, from) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(&buf[..len], from).await.unwrap();
        });

        let stream = UdpClientStream::connect(server_addr).await.unwrap();
        stream.send(b"ping").await.unwrap();

        let cancel = CancellationToken::new();
        let response = stream
            .receive(Duration::from_secs(5), &cancel)
            .await
            .unwrap();
        assert_eq!(response.bytes(), b"ping");
        assert_eq!(response.addr(), server_addr);
    }

    #[tokio::test]
    async fn test_receive_times_out() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let stream = UdpClientStream::connect(server.local_addr().unwrap())
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let err = stream
            .receive(Duration::from_millis(50), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ProtoErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_cancellation() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let stream = UdpClientStream::connect(server.local_addr().unwrap())
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = stream
            .receive(Duration::from_secs(5), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ProtoErrorKind::Canceled));
    }
}
