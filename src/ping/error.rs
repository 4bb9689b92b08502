use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Why a single ping attempt failed.
///
/// Attempts never return these as `Err`; they travel inside a
/// [`PingResult`](super::PingResult) so every probe type reports the same way.
#[derive(Debug, Error)]
pub enum PingError {
    #[error("lookup {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("lookup {host}: no {family} address found")]
    NoAddress { host: String, family: &'static str },

    #[error("dial tcp {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("{}", crate::ping::report_chain(.0))]
    Http(#[from] reqwest::Error),

    #[error("invalid url {0}")]
    InvalidUrl(String),

    #[error("icmp {addr}: {reason}")]
    Icmp { addr: std::net::IpAddr, reason: String },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl PingError {
    /// True when the attempt ran out of time rather than being refused.
    pub fn is_timeout(&self) -> bool {
        match self {
            PingError::Timeout(_) => true,
            PingError::Http(e) => e.is_timeout(),
            PingError::Connect { source, .. } | PingError::Io(source) => {
                source.kind() == std::io::ErrorKind::TimedOut
            }
            _ => false,
        }
    }
}
