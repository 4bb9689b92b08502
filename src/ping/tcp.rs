use super::resolve::{Resolver, Target};
use super::{Cancel, PingError, PingResult, Pinger};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpSocket;
use tracing::debug;

/// TCP connect ping: the handshake time to `host:port`.
pub struct TcpPinger {
    target: Target,
    port: u16,
    timeout: Duration,
    resolver: Arc<dyn Resolver>,
}

impl TcpPinger {
    pub fn new(host: &str, port: u16, timeout: Duration, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            target: Target::new(host),
            port,
            timeout,
            resolver,
        }
    }

    async fn attempt(&self) -> PingResult {
        let ip = match self.target.resolve(self.resolver.as_ref()).await {
            Ok(ip) => ip,
            Err(e) => return PingResult::failure(e),
        };
        let addr = SocketAddr::new(ip, self.port);

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        };
        let socket = match socket.and_then(|s| s.set_keepalive(false).map(|_| s)) {
            Ok(s) => s,
            Err(source) => return PingResult::failure(PingError::Connect { addr, source }),
        };

        let start = Instant::now();
        match socket.connect(addr).await {
            Ok(stream) => {
                let rtt = start.elapsed();
                drop(stream);
                debug!(%addr, rtt_us = rtt.as_micros() as u64, "tcp connected");
                PingResult::success(ip, rtt)
            }
            Err(source) => {
                debug!(%addr, error = %source, "tcp connect failed");
                PingResult::failure(PingError::Connect { addr, source })
            }
        }
    }
}

impl Pinger for TcpPinger {
    fn host(&self) -> &str {
        self.target.host()
    }

    fn set_host(&mut self, host: &str) {
        self.target = Target::new(host);
    }

    fn target(&self) -> String {
        super::join_host_port(self.target.host(), self.port)
    }

    async fn ping_with(&self, cancel: &Cancel) -> PingResult {
        super::bounded(self.timeout, cancel, self.attempt()).await
    }
}
