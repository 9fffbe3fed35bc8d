//! an in-process fake DNS server for driving the recursor end to end
//!
//! Each server listens on its own loopback address with both a UDP socket
//! and a TCP listener, answering from a caller-supplied handler. UDP
//! responses larger than the classic 512-octet ceiling are truncated the
//! way a real server would, which is what drives the TCP fallback tests.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;

use quill_recursor::proto::op::Message;
use quill_recursor::proto::serialize::binary::BinDecodable;
use quill_recursor::proto::tcp::TcpServer;

pub type Handler = Arc<dyn Fn(&Message) -> Option<Message> + Send + Sync>;

pub struct MockServer {
    pub addr: IpAddr,
    pub queries_served: Arc<AtomicUsize>,
}

impl MockServer {
    /// Spawn UDP and TCP listeners on `ip:port` answering via `handler`
    pub async fn start(ip: IpAddr, port: u16, handler: Handler) -> Self {
        let queries_served = Arc::new(AtomicUsize::new(0));
        let bind: SocketAddr = (ip, port).into();

        let udp = UdpSocket::bind(bind).await.expect("udp bind failed");
        let tcp = TcpServer::bind(bind, Duration::from_secs(5), Duration::from_secs(5))
            .await
            .expect("tcp bind failed");

        let udp_handler = Arc::clone(&handler);
        let udp_count = Arc::clone(&queries_served);
        tokio::spawn(async move {
            let mut buf = [0_u8; 4096];
            loop {
                let Ok((len, from)) = udp.recv_from(&mut buf).await else {
                    return;
                };
                let Ok(request) = Message::from_bytes(&buf[..len]) else {
                    continue;
                };
                udp_count.fetch_add(1, Ordering::SeqCst);

                if let Some(response) = udp_handler(&request) {
                    // respect the classic datagram ceiling; the client is
                    // expected to fall back to TCP on TC
                    let Ok(bytes) = response.to_bytes_with_limit(512) else {
                        continue;
                    };
                    let _ = udp.send_to(&bytes, from).await;
                }
            }
        });

        let tcp_handler = Arc::clone(&handler);
        let tcp_count = Arc::clone(&queries_served);
        tokio::spawn(async move {
            loop {
                let Ok(mut connection) = tcp.accept_connection().await else {
                    return;
                };
                let handler = Arc::clone(&tcp_handler);
                let count = Arc::clone(&tcp_count);

                tokio::spawn(async move {
                    let cancel = CancellationToken::new();
                    while let Ok(Some(frame)) = connection.read(&cancel).await {
                        let Ok(request) = Message::from_bytes(frame.bytes()) else {
                            return;
                        };
                        count.fetch_add(1, Ordering::SeqCst);

                        if let Some(response) = handler(&request) {
                            let Ok(bytes) = response.to_bytes() else {
                                return;
                            };
                            if connection.send(&bytes, &cancel).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr: ip,
            queries_served,
        }
    }

    pub fn queries_served(&self) -> usize {
        self.queries_served.load(Ordering::SeqCst)
    }
}

/// Find a port that is currently free for both UDP and TCP on loopback.
///
/// The mock servers all share one port across distinct 127.0.0.0/8
/// addresses, because the resolver derives server addresses from glue IPs
/// plus a single configured port.
pub async fn free_port() -> u16 {
    use rand::Rng;

    for _ in 0..32 {
        let candidate: u16 = rand::thread_rng().gen_range(20_000..60_000);
        let udp_ok = UdpSocket::bind(("127.0.0.1", candidate)).await.is_ok();
        let tcp_ok = TcpListener::bind(("127.0.0.1", candidate)).await.is_ok();
        if udp_ok && tcp_ok {
            return candidate;
        }
    }
    panic!("no free loopback port found");
}
