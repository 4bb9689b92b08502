mod color;
mod config;
mod engine;
mod ping;
mod report;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Command, Config};
use engine::Engine;
use ping::http::HttpPinger;
use ping::icmp::IcmpPinger;
use ping::resolve::{Resolver, SystemResolver};
use ping::tcp::TcpPinger;
use ping::udp::{UdpPinger, UdpServer};
use ping::{Cancel, Pinger, Probe};
use report::Report;

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Build the probe for the selected subcommand.
fn build_probe(config: &Config, resolver: Arc<dyn Resolver>) -> Result<Probe> {
    let probe = match &config.command {
        Command::Tcp {
            host,
            port,
            timeout,
        } => Probe::Tcp(TcpPinger::new(host, *port, *timeout, resolver)),
        Command::Http {
            url,
            ip,
            timeout,
            request,
        } => Probe::Http(HttpPinger::new(
            url,
            *ip,
            request.options(),
            *timeout,
            resolver,
        )),
        Command::Icmp {
            host,
            timeout,
            size,
        } => Probe::Icmp(IcmpPinger::new(host, *timeout, *size, resolver)),
        Command::Udp {
            host,
            port,
            timeout,
        } => Probe::Udp(UdpPinger::new(host, *port, *timeout, resolver)),
        Command::UdpServer { .. } => anyhow::bail!("udp-server does not send probes"),
    };
    Ok(probe)
}

async fn run_probe(config: &Config, cancel: &Cancel) -> Result<()> {
    let resolver: Arc<dyn Resolver> = Arc::new(SystemResolver::new(config.family()));
    let probe = build_probe(config, resolver)?;

    let engine = Engine::new(config.run.interval, config.run.count);
    let mut report = Report::new(io::stdout())
        .with_timestamps(config.run.timestamp)
        .with_colors(config.color_scale());

    let summary = engine.run(&probe, cancel, &mut report).await?;
    info!(
        probe = %probe.target(),
        stop = ?summary.stop,
        sent = summary.stats.sent,
        received = summary.stats.received,
        "ping finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(config.log_level());
    config.validate()?;

    // Ctrl+C fires the shared signal; the handler lives only as long as the run.
    let cancel = Cancel::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let outcome = match &config.command {
        Command::UdpServer { bind, port } => UdpServer::new(bind.clone(), *port).run(&cancel).await,
        _ => run_probe(&config, &cancel).await,
    };

    interrupt.abort();
    outcome
}
