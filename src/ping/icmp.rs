use super::resolve::{Resolver, Target};
use super::{Cancel, PingError, PingResult, Pinger};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// ICMP echo ping using ping_rs
pub struct IcmpPinger {
    target: Target,
    timeout: Duration,
    payload: Vec<u8>,
    resolver: Arc<dyn Resolver>,
}

impl IcmpPinger {
    pub fn new(host: &str, timeout: Duration, size: usize, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            target: Target::new(host),
            timeout,
            payload: payload(size),
            resolver,
        }
    }

    async fn attempt(&self) -> PingResult {
        let ip = match self.target.resolve(self.resolver.as_ref()).await {
            Ok(ip) => ip,
            Err(e) => return PingResult::failure(e),
        };
        let timeout = self.timeout;
        let payload = self.payload.clone();

        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            ping_rs::send_ping(&ip, timeout, &payload, None)
        })
        .await;

        match result {
            Ok(Ok(_reply)) => {
                // Measure RTT ourselves; ping_rs only reports whole milliseconds on some platforms.
                let rtt = start.elapsed();
                debug!(%ip, rtt_us = rtt.as_micros() as u64, "icmp echo reply");
                PingResult::success(ip, rtt)
            }
            Ok(Err(e)) => PingResult::failure(PingError::Icmp {
                addr: ip,
                reason: format!("{:?}", e),
            }),
            Err(e) => PingResult::failure(PingError::Icmp {
                addr: ip,
                reason: e.to_string(),
            }),
        }
    }
}

impl Pinger for IcmpPinger {
    fn host(&self) -> &str {
        self.target.host()
    }

    fn set_host(&mut self, host: &str) {
        self.target = Target::new(host);
    }

    async fn ping_with(&self, cancel: &Cancel) -> PingResult {
        // The blocking echo keeps running after a cancel or timeout; only the wait is abandoned.
        super::bounded(self.timeout, cancel, self.attempt()).await
    }
}

/// Echo payload of `size` bytes in a repeating a-w pattern.
fn payload(size: usize) -> Vec<u8> {
    (b'a'..=b'w').cycle().take(size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ping::resolve::StaticResolver;

    #[test]
    fn test_payload_pattern() {
        assert_eq!(payload(0), Vec::<u8>::new());
        assert_eq!(payload(4), b"abcd".to_vec());
        let long = payload(32);
        assert_eq!(long.len(), 32);
        assert_eq!(long[23], b'a');
    }

    #[tokio::test]
    async fn test_unresolvable_host() {
        let pinger = IcmpPinger::new("nowhere.test", Duration::from_secs(1), 32, Arc::new(StaticResolver::new()));
        let result = pinger.ping().await;
        assert!(matches!(result.error(), Some(PingError::Resolve { .. })));
    }

    #[tokio::test]
    async fn test_loopback_returns_within_timeout() {
        // Raw ICMP may be denied without privileges; either way the attempt must report.
        let timeout = Duration::from_millis(500);
        let pinger = IcmpPinger::new("127.0.0.1", timeout, 32, Arc::new(StaticResolver::new()));

        let started = Instant::now();
        let result = pinger.ping().await;
        assert!(started.elapsed() < timeout + Duration::from_millis(500));
        if result.error().is_none() {
            assert_eq!(result.addr(), Some("127.0.0.1".parse().unwrap()));
        }
    }

    #[tokio::test]
    async fn test_set_host() {
        let mut pinger = IcmpPinger::new("a.test", Duration::from_secs(1), 32, Arc::new(StaticResolver::new()));
        pinger.set_host("::1");
        assert_eq!(pinger.host(), "::1");
        assert_eq!(pinger.target(), "::1");
    }
}
