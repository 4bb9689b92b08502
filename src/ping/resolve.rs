use std::net::IpAddr;

use async_trait::async_trait;

use super::PingError;

/// Which address family a lookup may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpFamily {
    #[default]
    Any,
    V4,
    V6,
}

impl IpFamily {
    pub fn matches(self, ip: &IpAddr) -> bool {
        match self {
            IpFamily::Any => true,
            IpFamily::V4 => ip.is_ipv4(),
            IpFamily::V6 => ip.is_ipv6(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            IpFamily::Any => "IP",
            IpFamily::V4 => "IPv4",
            IpFamily::V6 => "IPv6",
        }
    }
}

/// Hostname to address lookup used by every probe.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn lookup(&self, host: &str) -> Result<IpAddr, PingError>;
}

/// Resolves through the operating system's resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver {
    family: IpFamily,
}

impl SystemResolver {
    pub fn new(family: IpFamily) -> Self {
        Self { family }
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup(&self, host: &str) -> Result<IpAddr, PingError> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|source| PingError::Resolve {
                host: host.to_string(),
                source,
            })?;

        addrs
            .map(|addr| addr.ip())
            .find(|ip| self.family.matches(ip))
            .ok_or_else(|| PingError::NoAddress {
                host: host.to_string(),
                family: self.family.label(),
            })
    }
}

/// Fixed host table standing in for DNS in tests.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    table: std::collections::HashMap<String, IpAddr>,
}

#[cfg(test)]
impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, host: &str, ip: IpAddr) -> Self {
        self.table.insert(host.to_string(), ip);
        self
    }
}

#[cfg(test)]
#[async_trait]
impl Resolver for StaticResolver {
    async fn lookup(&self, host: &str) -> Result<IpAddr, PingError> {
        self.table
            .get(host)
            .copied()
            .ok_or_else(|| PingError::Resolve {
                host: host.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such host"),
            })
    }
}

/// A configured target together with its pre-parsed literal address.
///
/// Only built through [`Target::new`], so the pair always agrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    literal: Option<IpAddr>,
}

impl Target {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            literal: parse_literal(host),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn literal(&self) -> Option<IpAddr> {
        self.literal
    }

    /// Literal address if there is one, otherwise a fresh lookup.
    pub async fn resolve(&self, resolver: &dyn Resolver) -> Result<IpAddr, PingError> {
        match self.literal {
            Some(ip) => Ok(ip),
            None => resolver.lookup(&self.host).await,
        }
    }
}

/// Parses `host` as an IP literal, accepting the bracketed IPv6 form used in URLs.
fn parse_literal(host: &str) -> Option<IpAddr> {
    let trimmed = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    trimmed.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingResolver;

    #[async_trait]
    impl Resolver for FailingResolver {
        async fn lookup(&self, host: &str) -> Result<IpAddr, PingError> {
            Err(PingError::NoAddress {
                host: host.to_string(),
                family: "IP",
            })
        }
    }

    #[test]
    fn test_literal_detection() {
        assert_eq!(
            Target::new("10.0.0.1").literal(),
            Some("10.0.0.1".parse().unwrap())
        );
        assert_eq!(Target::new("[::1]").literal(), Some("::1".parse().unwrap()));
        assert_eq!(Target::new("example.com").literal(), None);
    }

    #[tokio::test]
    async fn test_literal_bypasses_resolver() {
        let target = Target::new("192.0.2.7");
        let ip = target.resolve(&FailingResolver).await.unwrap();
        assert_eq!(ip, "192.0.2.7".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_hostname_goes_through_resolver() {
        let target = Target::new("db.internal");
        assert!(target.resolve(&FailingResolver).await.is_err());

        let resolver = StaticResolver::new().with("db.internal", "10.1.2.3".parse().unwrap());
        let ip = target.resolve(&resolver).await.unwrap();
        assert_eq!(ip, "10.1.2.3".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_system_resolver_family_filter() {
        let v4 = SystemResolver::new(IpFamily::V4);
        let ip = v4.lookup("localhost").await.unwrap();
        assert!(ip.is_ipv4());
    }

    #[test]
    fn test_family_matches() {
        let v4: IpAddr = "127.0.0.1".parse().unwrap();
        let v6: IpAddr = "::1".parse().unwrap();
        assert!(IpFamily::Any.matches(&v4) && IpFamily::Any.matches(&v6));
        assert!(IpFamily::V4.matches(&v4) && !IpFamily::V4.matches(&v6));
        assert!(IpFamily::V6.matches(&v6) && !IpFamily::V6.matches(&v4));
    }
}
