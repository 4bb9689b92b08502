use super::resolve::{Resolver, Target};
use super::{Cancel, PingError, PingResult, Pinger};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Magic bytes for UDP ping packets
const MAGIC: &[u8; 4] = b"PING";

/// Default port for the UDP echo pair
pub const DEFAULT_PORT: u16 = 44444;

/// UDP packet structure (20 bytes total):
/// - Magic: 4 bytes "PING"
/// - Sequence: 8 bytes (u64 big-endian)
/// - Timestamp: 8 bytes (microseconds since probe creation, u64 big-endian)
fn encode_packet(seq: u64, timestamp_us: u64) -> [u8; 20] {
    let mut buf = [0u8; 20];
    buf[0..4].copy_from_slice(MAGIC);
    buf[4..12].copy_from_slice(&seq.to_be_bytes());
    buf[12..20].copy_from_slice(&timestamp_us.to_be_bytes());
    buf
}

fn decode_packet(buf: &[u8]) -> Option<(u64, u64)> {
    if buf.len() < 20 {
        return None;
    }
    if &buf[0..4] != MAGIC {
        return None;
    }
    let seq = u64::from_be_bytes(buf[4..12].try_into().ok()?);
    let timestamp = u64::from_be_bytes(buf[12..20].try_into().ok()?);
    Some((seq, timestamp))
}

/// UDP echo ping against a [`UdpServer`].
pub struct UdpPinger {
    target: Target,
    port: u16,
    timeout: Duration,
    resolver: Arc<dyn Resolver>,
    seq: AtomicU64,
    epoch: Instant,
}

impl UdpPinger {
    pub fn new(host: &str, port: u16, timeout: Duration, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            target: Target::new(host),
            port,
            timeout,
            resolver,
            seq: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    async fn attempt(&self) -> PingResult {
        let ip = match self.target.resolve(self.resolver.as_ref()).await {
            Ok(ip) => ip,
            Err(e) => return PingResult::failure(e),
        };
        let addr = SocketAddr::new(ip, self.port);

        match self.exchange(addr).await {
            Ok(rtt) => {
                debug!(%addr, rtt_us = rtt.as_micros() as u64, "udp echo");
                PingResult::success(ip, rtt)
            }
            Err(e) => PingResult::failure(e),
        }
    }

    async fn exchange(&self, addr: SocketAddr) -> Result<Duration, PingError> {
        // Bind to matching address family (IPv4 or IPv6)
        let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(addr).await?;

        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let packet = encode_packet(seq, self.epoch.elapsed().as_micros() as u64);

        let start = Instant::now();
        socket.send(&packet).await?;

        // Late or duplicated echoes of earlier packets are skipped; the caller bounds the wait.
        let mut buf = [0u8; 32];
        loop {
            let len = socket.recv(&mut buf).await?;
            match decode_packet(&buf[..len]) {
                Some((echoed, _)) if echoed == seq => return Ok(start.elapsed()),
                Some((echoed, _)) => debug!(%addr, seq, echoed, "skipping stale echo"),
                None => debug!(%addr, len, "skipping non-echo datagram"),
            }
        }
    }
}

impl Pinger for UdpPinger {
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

/// UDP server that echoes ping packets back
pub struct UdpServer {
    bind: Option<String>,
    port: u16,
}

impl UdpServer {
    pub fn new(bind: Option<String>, port: u16) -> Self {
        Self { bind, port }
    }

    async fn handle_packet(socket: &UdpSocket, buf: &[u8], src: SocketAddr) {
        if decode_packet(buf).is_some()
            && let Err(e) = socket.send_to(buf, src).await
        {
            warn!(%src, error = %e, "failed to send echo");
        }
    }

    /// Echo on an already bound socket until `cancel` fires.
    pub async fn serve(socket: &UdpSocket, cancel: &Cancel) {
        let mut buf = [0u8; 32];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = socket.recv_from(&mut buf) => {
                    if let Ok((len, src)) = result {
                        Self::handle_packet(socket, &buf[..len], src).await;
                    }
                }
            }
        }
    }

    pub async fn run(&self, cancel: &Cancel) -> anyhow::Result<()> {
        // If a specific bind address is provided, use only that
        if let Some(bind_addr) = &self.bind {
            let addr = super::join_host_port(bind_addr, self.port);
            let socket = UdpSocket::bind(&addr).await?;
            println!("UDP ping server listening on {}", socket.local_addr()?);
            println!("Press Ctrl+C to stop");

            Self::serve(&socket, cancel).await;
            return Ok(());
        }

        // Default: bind to both IPv4 and IPv6 on all interfaces
        let socket_v4 = UdpSocket::bind(format!("0.0.0.0:{}", self.port)).await?;
        let socket_v6 = match UdpSocket::bind(format!("[::]:{}", self.port)).await {
            Ok(s) => Some(s),
            Err(e) => {
                info!(error = %e, "IPv6 bind failed, serving IPv4 only");
                None
            }
        };

        if socket_v6.is_some() {
            println!("UDP ping server listening on port {} (IPv4 + IPv6)", self.port);
        } else {
            println!("UDP ping server listening on port {} (IPv4 only)", self.port);
        }
        println!("Press Ctrl+C to stop");

        match &socket_v6 {
            Some(v6) => {
                tokio::join!(Self::serve(&socket_v4, cancel), Self::serve(v6, cancel));
            }
            None => Self::serve(&socket_v4, cancel).await,
        }

        Ok(())
    }
}
