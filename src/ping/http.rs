use super::resolve::{Resolver, Target};
use super::{Cancel, PingError, PingResult, Pinger};
use reqwest::header::{REFERER, USER_AGENT};
use reqwest::{Client, Method};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Request shape and client toggles, fixed for the life of the pinger.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub method: Method,
    pub disable_http2: bool,
    pub disable_compression: bool,
    pub insecure: bool,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            disable_http2: false,
            disable_compression: false,
            insecure: false,
            referrer: None,
            user_agent: None,
        }
    }
}

/// Parsed URL plus the literal-address cache of its host.
#[derive(Debug, Clone)]
struct Endpoint {
    url: Url,
    target: Target,
}

impl Endpoint {
    fn parse(url: &str) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        let target = Target::new(url.host_str()?);
        Some(Self { url, target })
    }
}

/// HTTP ping: the time to send one request and read the whole response.
pub struct HttpPinger {
    url: String,
    endpoint: Option<Endpoint>,
    pinned: Option<IpAddr>,
    options: HttpOptions,
    timeout: Duration,
    resolver: Arc<dyn Resolver>,
}

impl HttpPinger {
    /// `pinned` overrides DNS for the URL host on every attempt.
    pub fn new(
        url: &str,
        pinned: Option<IpAddr>,
        options: HttpOptions,
        timeout: Duration,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        let url = normalize_url(url);
        let pinger = Self {
            endpoint: Endpoint::parse(&url),
            url,
            pinned,
            options,
            timeout,
            resolver,
        };
        pinger.warn_ignored_options();
        pinger
    }

    fn warn_ignored_options(&self) {
        if let Some(endpoint) = &self.endpoint {
            for option in ignored_options(&endpoint.url, &self.options) {
                warn!(url = %endpoint.url, option, "option has no effect without TLS");
            }
        }
    }

    fn client(&self, endpoint: &Endpoint, ip: IpAddr) -> reqwest::Result<Client> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(self.options.insecure);

        if self.options.disable_http2 {
            builder = builder.http1_only();
        }
        if self.options.disable_compression {
            builder = builder.no_gzip().no_brotli().no_deflate();
        }
        if endpoint.target.literal().is_none() {
            // Port is taken from the URL.
            builder = builder.resolve(endpoint.target.host(), SocketAddr::new(ip, 0));
        }

        builder.build()
    }

    async fn attempt(&self) -> PingResult {
        let Some(endpoint) = &self.endpoint else {
            return PingResult::failure(PingError::InvalidUrl(self.url.clone()));
        };

        let ip = match (endpoint.target.literal(), self.pinned) {
            (Some(ip), _) | (None, Some(ip)) => ip,
            (None, None) => match self.resolver.lookup(endpoint.target.host()).await {
                Ok(ip) => ip,
                Err(e) => return PingResult::failure(e),
            },
        };

        let client = match self.client(endpoint, ip) {
            Ok(client) => client,
            Err(e) => return PingResult::failure(e.into()),
        };

        let mut request = client.request(self.options.method.clone(), endpoint.url.clone());
        if let Some(referrer) = &self.options.referrer {
            request = request.header(REFERER, referrer);
        }
        if let Some(user_agent) = &self.options.user_agent {
            request = request.header(USER_AGENT, user_agent);
        }

        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %endpoint.url, error = %e, "http request failed");
                return PingResult::failure(e.into());
            }
        };
        let peer = response.remote_addr().map(|addr| addr.ip()).unwrap_or(ip);
        let status = response.status();
        let version = response.version();

        // Drain the body so the timing covers the full fetch.
        match response.bytes().await {
            Ok(body) => {
                let rtt = start.elapsed();
                debug!(
                    url = %endpoint.url,
                    %peer,
                    status = status.as_u16(),
                    ?version,
                    bytes = body.len(),
                    "http response"
                );
                PingResult::success(peer, rtt)
            }
            Err(e) => PingResult::failure(e.into()),
        }
    }
}

impl Pinger for HttpPinger {
    fn host(&self) -> &str {
        &self.url
    }

    fn set_host(&mut self, host: &str) {
        let url = normalize_url(host);
        self.endpoint = Endpoint::parse(&url);
        self.url = url;
        self.warn_ignored_options();
    }

    async fn ping_with(&self, cancel: &Cancel) -> PingResult {
        super::bounded(self.timeout, cancel, self.attempt()).await
    }
}

/// Flags that plain `http://` cannot honour: HTTP/2 is only negotiated over TLS,
/// and there is no certificate to skip.
fn ignored_options(url: &Url, options: &HttpOptions) -> Vec<&'static str> {
    let mut ignored = Vec::new();
    if url.scheme() == "http" {
        if options.disable_http2 {
            ignored.push("nohttp2");
        }
        if options.insecure {
            ignored.push("insecure");
        }
    }
    ignored
}

/// Prefix `http://` when the URL carries no scheme.
pub fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}
