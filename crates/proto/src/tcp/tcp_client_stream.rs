// Copyright 2024 the quill-dns project contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! length-framed TCP stream to a single DNS server
//!
//! Every message on the stream is prefixed with its length as a 16-bit
//! big-endian integer (RFC 1035 section 4.2.2). The read path is a two-state
//! machine, awaiting-length then awaiting-body, so partial reads at any
//! point simply continue the same state.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ProtoErrorKind, ProtoResult};
use crate::xfer::SerialMessage;

/// A connection to a DNS peer carrying length-prefixed messages.
///
/// Several responses may arrive for one query (AXFR/IXFR); `read` returns
/// them one frame at a time until the peer closes or the caller stops.
///
/// The stream type is generic so that a collaborator can supply a wrapped
/// transport, e.g. a TLS session, in place of a plain socket.
pub struct TcpClientStream<S = TcpStream> {
    stream: S,
    peer: SocketAddr,
    keepalive: Duration,
    read_timeout: Duration,
}

impl TcpClientStream<TcpStream> {
    /// Connect to `peer` within `connect_timeout`.
    ///
    /// `keepalive` bounds the wait for the first octet of each frame;
    /// `read_timeout` bounds every later read and each write.
    pub async fn connect(
        peer: SocketAddr,
        connect_timeout: Duration,
        keepalive: Duration,
        read_timeout: Duration,
    ) -> ProtoResult<Self> {
        let stream = time::timeout(connect_timeout, TcpStream::connect(peer))
            .await
            .map_err(|_| ProtoErrorKind::Timeout)??;
        stream.set_nodelay(true)?;

        Ok(Self::from_stream(stream, peer, keepalive, read_timeout))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> TcpClientStream<S> {
    /// Frame an already-established stream, e.g. an accepted connection or
    /// a TLS-wrapped session.
    pub fn from_stream(
        stream: S,
        peer: SocketAddr,
        keepalive: Duration,
        read_timeout: Duration,
    ) -> Self {
        Self {
            stream,
            peer,
            keepalive,
            read_timeout,
        }
    }

    /// The peer on the other end of the connection
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Write one length-prefixed message
    pub async fn send(&mut self, message: &[u8], cancel: &CancellationToken) -> ProtoResult<()> {
        if message.len() > u16::MAX as usize {
            return Err("message larger than framing allows".into());
        }

        let length = (message.len() as u16).to_be_bytes();

        let write = async {
            self.stream.write_all(&length).await?;
            self.stream.write_all(message).await?;
            self.stream.flush().await
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ProtoErrorKind::Canceled.into()),
            result = time::timeout(self.read_timeout, write) => match result {
                Ok(io_result) => io_result.map_err(Into::into),
                Err(_elapsed) => Err(ProtoErrorKind::Timeout.into()),
            },
        }
    }

    /// Read the next frame from the stream.
    ///
    /// Returns `Ok(None)` for a clean end of stream: the peer closed, the
    /// keepalive or read window elapsed, or the operation was cancelled. A
    /// frame that started arriving but was cut off mid-body is an error.
    pub async fn read(&mut self, cancel: &CancellationToken) -> ProtoResult<Option<SerialMessage>> {
        // awaiting-length: up to the keepalive window for the length prefix
        let mut length_bytes = [0_u8; 2];
        let length = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            result = time::timeout(self.keepalive, self.stream.read_exact(&mut length_bytes)) => {
                match result {
                    Ok(Ok(_)) => u16::from_be_bytes(length_bytes) as usize,
                    // between frames, a dropped connection is simply the end
                    // of the stream
                    Ok(Err(e)) => {
                        debug!("tcp stream from {} ended: {e}", self.peer);
                        return Ok(None);
                    }
                    Err(_elapsed) => return Ok(None),
                }
            }
        };

        if length == 0 {
            return Ok(None);
        }

        // awaiting-body: the announced length within the read window
        let mut body = vec![0_u8; length];
        tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            result = time::timeout(self.read_timeout, self.stream.read_exact(&mut body)) => {
                match result {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                        return Err(ProtoErrorKind::ConnectionClosed.into());
                    }
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_elapsed) => return Err(ProtoErrorKind::Timeout.into()),
                }
            }
        }

        Ok(Some(SerialMessage::new(body, self.peer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn echo_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut length = [0_u8; 2];
            socket.read_exact(&mut length).await.unwrap();
            let mut body = vec![0_u8; u16::from_be_bytes(length) as usize];
            socket.read_exact(&mut body).await.unwrap();

            socket.write_all(&length).await.unwrap();
            socket.write_all(&body).await.unwrap();
        });

        addr
    }

    fn timeouts() -> (Duration, Duration, Duration) {
        (
            Duration::from_secs(5),
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_framed_round_trip() {
        let addr = echo_server().await;
        let (connect, keepalive, read) = timeouts();
        let mut stream = TcpClientStream::connect(addr, connect, keepalive, read)
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        stream.send(b"hello framing", &cancel).await.unwrap();

        let frame = stream.read(&cancel).await.unwrap().unwrap();
        assert_eq!(frame.bytes(), b"hello framing");

        // server closes after one echo: clean end of stream
        assert!(stream.read(&cancel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keepalive_elapse_is_clean_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // accept and hold the connection open without writing
            let _socket = listener.accept().await.unwrap();
            time::sleep(Duration::from_secs(2)).await;
        });

        let mut stream = TcpClientStream::connect(
            addr,
            Duration::from_secs(5),
            Duration::from_millis(50),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let cancel = CancellationToken::new();
        assert!(stream.read(&cancel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancellation_is_clean_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _socket = listener.accept().await.unwrap();
            time::sleep(Duration::from_secs(2)).await;
        });

        let (connect, keepalive, read) = timeouts();
        let mut stream = TcpClientStream::connect(addr, connect, keepalive, read)
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(stream.read(&cancel).await.unwrap().is_none());
    }
}
