use std::io::IsTerminal;
use std::net::IpAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reqwest::Method;

use crate::color::{ColorScale, ColorScheme};
use crate::ping::http::HttpOptions;
use crate::ping::resolve::IpFamily;
use crate::ping::udp;

#[derive(Parser, Debug, Clone)]
#[command(name = "pping")]
#[command(about = "TCP, HTTP, ICMP and UDP ping with loss and jitter statistics")]
#[command(version)]
pub struct Config {
    #[command(flatten)]
    pub run: RunOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every probe kind
#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    /// Stop after this many attempts (default: until interrupted)
    #[arg(short = 'c', long, global = true)]
    pub count: Option<u64>,

    /// Delay between attempt starts, e.g. 500ms, 1s, 2m
    #[arg(short = 'i', long, global = true, default_value = "1s", value_parser = parse_duration)]
    pub interval: Duration,

    /// Resolve names to IPv4 addresses only
    #[arg(short = '4', global = true, conflicts_with = "ipv6")]
    pub ipv4: bool,

    /// Resolve names to IPv6 addresses only
    #[arg(short = '6', global = true)]
    pub ipv6: bool,

    /// Prefix each reply with the local time
    #[arg(short = 'D', long, global = true)]
    pub timestamp: bool,

    /// When to colour round-trip times
    #[arg(long, global = true, value_enum, default_value = "auto")]
    pub color: ColorMode,

    /// Color scale - RTT (ms) that is considered "bad"
    #[arg(short = 's', long, global = true, default_value = "200")]
    pub scale: u64,

    /// Color scheme for round-trip times
    #[arg(long, global = true, value_enum, default_value = "classic")]
    pub scheme: ColorScheme,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Colour when stdout is a terminal
    Auto,
    Always,
    Never,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// TCP connect ping
    Tcp {
        /// Target host (IP address or hostname)
        host: String,

        /// Target port
        #[arg(default_value = "80")]
        port: u16,

        /// Timeout per attempt
        #[arg(short = 'w', long, default_value = "3s", value_parser = parse_duration)]
        timeout: Duration,
    },

    /// HTTP ping
    Http {
        /// URL to fetch; `http://` is assumed when no scheme is given
        url: String,

        /// Connect to this address instead of resolving the URL host
        ip: Option<IpAddr>,

        /// Timeout per attempt
        #[arg(short = 'w', long, default_value = "3s", value_parser = parse_duration)]
        timeout: Duration,

        #[command(flatten)]
        request: HttpArgs,
    },

    /// ICMP echo ping (may require elevated privileges)
    Icmp {
        /// Target host (IP address or hostname)
        host: String,

        /// Timeout per attempt
        #[arg(short = 'w', long, default_value = "3s", value_parser = parse_duration)]
        timeout: Duration,

        /// Echo payload size in bytes
        #[arg(short = 'l', long, default_value = "32")]
        size: usize,
    },

    /// UDP echo ping against a `pping udp-server`
    Udp {
        /// Target host (IP address or hostname)
        host: String,

        /// Target port
        #[arg(default_value_t = udp::DEFAULT_PORT)]
        port: u16,

        /// Timeout per attempt
        #[arg(short = 'w', long, default_value = "3s", value_parser = parse_duration)]
        timeout: Duration,
    },

    /// Echo UDP ping packets back to clients
    UdpServer {
        /// Bind address (e.g., 0.0.0.0, ::, 192.168.1.1); both families when omitted
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on
        #[arg(short = 'p', long, default_value_t = udp::DEFAULT_PORT)]
        port: u16,
    },
}

/// Request shape and client toggles of the `http` subcommand
#[derive(Args, Debug, Clone)]
pub struct HttpArgs {
    /// Request method
    #[arg(short = 'm', long, default_value = "GET", value_parser = parse_method)]
    method: Method,

    /// Disable HTTP/2
    #[arg(short = 'd', long)]
    nohttp2: bool,

    /// Disable compression
    #[arg(short = 'x', long)]
    nocompression: bool,

    /// Allow insecure server connections when using TLS
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Referer header
    #[arg(short = 'r', long)]
    referrer: Option<String>,

    /// User-Agent header
    #[arg(short = 'u', long)]
    useragent: Option<String>,
}

impl HttpArgs {
    pub fn options(&self) -> HttpOptions {
        HttpOptions {
            method: self.method.clone(),
            disable_http2: self.nohttp2,
            disable_compression: self.nocompression,
            insecure: self.insecure,
            referrer: self.referrer.clone().filter(|r| !r.is_empty()),
            user_agent: self.useragent.clone().filter(|u| !u.is_empty()),
        }
    }
}

impl Command {
    fn timeout(&self) -> Option<Duration> {
        match self {
            Command::Tcp { timeout, .. }
            | Command::Http { timeout, .. }
            | Command::Icmp { timeout, .. }
            | Command::Udp { timeout, .. } => Some(*timeout),
            Command::UdpServer { .. } => None,
        }
    }
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.command.timeout().is_some_and(|t| t.is_zero()) {
            anyhow::bail!("Timeout must be greater than 0");
        }

        if self.run.scale == 0 {
            anyhow::bail!("Scale must be greater than 0");
        }

        if let Command::Http { ip: Some(ip), .. } = &self.command
            && !self.family().matches(ip)
        {
            anyhow::bail!("Address {} does not match the requested IP version", ip);
        }

        Ok(())
    }

    pub fn family(&self) -> IpFamily {
        if self.run.ipv4 {
            IpFamily::V4
        } else if self.run.ipv6 {
            IpFamily::V6
        } else {
            IpFamily::Any
        }
    }

    /// Colour scale to use, or `None` for plain output
    pub fn color_scale(&self) -> Option<ColorScale> {
        let enabled = match self.run.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        };
        enabled.then(|| ColorScale::new(self.run.scale, self.run.scheme))
    }

    /// Filter directive derived from `-v`
    pub fn log_level(&self) -> &'static str {
        match self.run.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Parse `500ms`, `3s`, `2m`, `1h`, or a bare number of milliseconds
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit() && c != '.').unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{}'", s))?;
    let millis = match unit {
        "" | "ms" => value,
        "s" => value * 1000.0,
        "m" => value * 60_000.0,
        "h" => value * 3_600_000.0,
        other => return Err(format!("unknown duration unit '{}' in '{}'", other, s)),
    };

    Duration::try_from_secs_f64(millis / 1000.0).map_err(|e| format!("invalid duration '{}': {}", s, e))
}

fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_bytes(s.to_ascii_uppercase().as_bytes()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("pping").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("3s"), Ok(Duration::from_secs(3)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("1500"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1.5s"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert!(parse_duration("3 parsecs").is_err());
        assert!(parse_duration("s").is_err());
    }

    fn request_options(config: &Config) -> HttpOptions {
        match &config.command {
            Command::Http { request, .. } => request.options(),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_http_defaults() {
        let config = parse(&["http", "example.com"]);
        config.validate().unwrap();
        assert_eq!(config.run.count, None);
        assert_eq!(config.run.interval, Duration::from_secs(1));

        match &config.command {
            Command::Http { url, ip, timeout, .. } => {
                assert_eq!(url, "example.com");
                assert_eq!(*ip, None);
                assert_eq!(*timeout, Duration::from_secs(3));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let options = request_options(&config);
        assert_eq!(options.method, Method::GET);
        assert!(!options.disable_http2 && !options.disable_compression && !options.insecure);
        assert_eq!(options.referrer, None);
    }

    #[test]
    fn test_http_flags() {
        let config = parse(&[
            "http", "-w", "500ms", "-m", "head", "-d", "-x", "-k", "-r", "https://r.test",
            "-u", "probe/1.0", "https://example.com", "93.184.216.34",
        ]);
        let options = request_options(&config);
        assert_eq!(options.method, Method::HEAD);
        assert!(options.disable_http2 && options.disable_compression && options.insecure);
        assert_eq!(options.referrer.as_deref(), Some("https://r.test"));
        assert_eq!(options.user_agent.as_deref(), Some("probe/1.0"));

        match &config.command {
            Command::Http { ip, timeout, .. } => {
                assert_eq!(*ip, Some("93.184.216.34".parse().unwrap()));
                assert_eq!(*timeout, Duration::from_millis(500));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_tcp_and_global_options() {
        let config = parse(&["tcp", "db.local", "5432", "-c", "4", "-i", "200ms", "-4", "-D"]);
        assert_eq!(config.run.count, Some(4));
        assert_eq!(config.run.interval, Duration::from_millis(200));
        assert!(config.run.timestamp);
        assert_eq!(config.family(), IpFamily::V4);

        match &config.command {
            Command::Tcp { host, port, timeout } => {
                assert_eq!(host, "db.local");
                assert_eq!(*port, 5432);
                assert_eq!(*timeout, Duration::from_secs(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_tcp_port_defaults_to_80() {
        let config = parse(&["tcp", "example.com"]);
        assert!(matches!(config.command, Command::Tcp { port: 80, .. }));
    }

    #[test]
    fn test_udp_defaults() {
        let config = parse(&["udp", "10.0.0.2"]);
        assert!(matches!(config.command, Command::Udp { port: udp::DEFAULT_PORT, .. }));

        let config = parse(&["udp-server", "--bind", "127.0.0.1", "-p", "9000"]);
        match &config.command {
            Command::UdpServer { bind, port } => {
                assert_eq!(bind.as_deref(), Some("127.0.0.1"));
                assert_eq!(*port, 9000);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_ip_versions_conflict() {
        let result = Config::try_parse_from(["pping", "-4", "-6", "tcp", "example.com"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = parse(&["tcp", "example.com", "-w", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_pinned_family_mismatch() {
        let config = parse(&["-6", "http", "example.com", "127.0.0.1"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_method_rejected() {
        let result = Config::try_parse_from(["pping", "http", "-m", "GE T", "example.com"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_color_modes() {
        assert!(parse(&["--color", "never", "tcp", "h"]).color_scale().is_none());
        let scale = parse(&["--color", "always", "--scheme", "fire", "-s", "80", "tcp", "h"])
            .color_scale()
            .unwrap();
        assert_eq!(scale.max_rtt, 80);
        assert_eq!(scale.scheme, ColorScheme::Fire);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["tcp", "h"]).log_level(), "warn");
        assert_eq!(parse(&["-vv", "tcp", "h"]).log_level(), "debug");
    }
}
