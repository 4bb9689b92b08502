pub mod cancel;
pub mod error;
pub mod http;
pub mod icmp;
pub mod resolve;
pub mod stats;
pub mod tcp;
pub mod udp;

use std::fmt::{self, Write};
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, Local};

pub use cancel::Cancel;
pub use error::PingError;
pub use stats::PingStats;

use http::HttpPinger;
use icmp::IcmpPinger;
use tcp::TcpPinger;
use udp::UdpPinger;

/// A timed reply from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// Address actually contacted
    pub addr: IpAddr,
    /// Round-trip time
    pub rtt: Duration,
}

/// Result of a single ping attempt: either a timed reply or the reason there was none.
#[derive(Debug)]
pub struct PingResult {
    outcome: Result<Reply, PingError>,
    /// Wall-clock time when the attempt finished (for display)
    pub timestamp: DateTime<Local>,
}

impl PingResult {
    pub fn success(addr: IpAddr, rtt: Duration) -> Self {
        Self {
            outcome: Ok(Reply { addr, rtt }),
            timestamp: Local::now(),
        }
    }

    pub fn failure(err: PingError) -> Self {
        Self {
            outcome: Err(err),
            timestamp: Local::now(),
        }
    }

    pub fn reply(&self) -> Option<&Reply> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&PingError> {
        self.outcome.as_ref().err()
    }

    pub fn addr(&self) -> Option<IpAddr> {
        self.reply().map(|r| r.addr)
    }

    /// Whole milliseconds, 0 for a failed attempt.
    pub fn elapsed_ms(&self) -> u64 {
        self.reply()
            .map(|r| r.rtt.as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, Err(PingError::Cancelled))
    }

    /// Format timestamp as HH:MM:SS.mmm
    pub fn timestamp_str(&self) -> String {
        self.timestamp.format("%H:%M:%S%.3f").to_string()
    }
}

impl fmt::Display for PingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(reply) => write!(f, "{}: time={} ms", reply.addr, self.elapsed_ms()),
            Err(err) => write!(f, "{}", err),
        }
    }
}

/// A reusable probe that can run one timed attempt at a time.
pub trait Pinger: Send + Sync {
    /// Target as configured, unaffected by resolution.
    fn host(&self) -> &str;

    /// Replace the target, re-deriving any cached literal address.
    fn set_host(&mut self, host: &str);

    /// Label for headers and summaries.
    fn target(&self) -> String {
        self.host().to_string()
    }

    /// Run one attempt. Returns within the probe's timeout, or promptly once
    /// `cancel` fires.
    fn ping_with(&self, cancel: &Cancel) -> impl Future<Output = PingResult> + Send;

    /// Run one attempt bounded only by the probe's own timeout.
    fn ping(&self) -> impl Future<Output = PingResult> + Send {
        async move { self.ping_with(&Cancel::new()).await }
    }
}

/// Every probe kind the engine can drive.
pub enum Probe {
    Tcp(TcpPinger),
    Http(HttpPinger),
    Icmp(IcmpPinger),
    Udp(UdpPinger),
}

impl Pinger for Probe {
    fn host(&self) -> &str {
        match self {
            Probe::Tcp(p) => p.host(),
            Probe::Http(p) => p.host(),
            Probe::Icmp(p) => p.host(),
            Probe::Udp(p) => p.host(),
        }
    }

    fn set_host(&mut self, host: &str) {
        match self {
            Probe::Tcp(p) => p.set_host(host),
            Probe::Http(p) => p.set_host(host),
            Probe::Icmp(p) => p.set_host(host),
            Probe::Udp(p) => p.set_host(host),
        }
    }

    fn target(&self) -> String {
        match self {
            Probe::Tcp(p) => p.target(),
            Probe::Http(p) => p.target(),
            Probe::Icmp(p) => p.target(),
            Probe::Udp(p) => p.target(),
        }
    }

    async fn ping_with(&self, cancel: &Cancel) -> PingResult {
        match self {
            Probe::Tcp(p) => p.ping_with(cancel).await,
            Probe::Http(p) => p.ping_with(cancel).await,
            Probe::Icmp(p) => p.ping_with(cancel).await,
            Probe::Udp(p) => p.ping_with(cancel).await,
        }
    }
}

/// Runs `attempt` under the probe's timeout and the caller's cancellation.
pub(crate) async fn bounded<F>(timeout: Duration, cancel: &Cancel, attempt: F) -> PingResult
where
    F: Future<Output = PingResult>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => PingResult::failure(PingError::Cancelled),
        result = tokio::time::timeout(timeout, attempt) => {
            result.unwrap_or_else(|_| PingResult::failure(PingError::Timeout(timeout)))
        }
    }
}

/// `host:port`, bracketing IPv6 literals.
pub(crate) fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Flattens an error and its sources into one line.
pub(crate) fn report_chain(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, ": {}", src);
        err = src;
    }
    s
}
