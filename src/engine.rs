//! The repeat/measure/aggregate loop shared by every probe kind.

use std::io::{self, Write};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::ping::{Cancel, PingError, PingStats, Pinger};
use crate::report::Report;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured attempt count was reached
    Limit,
    /// The cancellation signal fired
    Interrupted,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub stop: StopReason,
    pub stats: PingStats,
}

/// Drives a [`Pinger`] one attempt at a time at a fixed cadence.
#[derive(Debug, Clone, Copy)]
pub struct Engine {
    interval: Duration,
    count: Option<u64>,
}

impl Engine {
    /// `count` of `None` runs until cancelled.
    pub fn new(interval: Duration, count: Option<u64>) -> Self {
        Self { interval, count }
    }

    /// Run a fresh session: header, one line per attempt, then the summary.
    ///
    /// `cancel` stops the loop before the next tick and aborts an attempt in
    /// flight. An aborted attempt is still printed and counted as lost.
    pub async fn run<P, W>(
        &self,
        pinger: &P,
        cancel: &Cancel,
        report: &mut Report<W>,
    ) -> io::Result<Summary>
    where
        P: Pinger,
        W: Write,
    {
        let target = pinger.target();
        report.header(&target)?;

        let mut session = Session::new(*self);
        let stop = session.drive(pinger, cancel, report).await?;

        report.summary(&target, &session.stats)?;
        Ok(Summary {
            stop,
            stats: session.stats,
        })
    }
}

/// Per-run state. Lives only for one call to [`Engine::run`].
struct Session {
    engine: Engine,
    stats: PingStats,
}

impl Session {
    fn new(engine: Engine) -> Self {
        Self {
            engine,
            stats: PingStats::new(),
        }
    }

    fn limit_reached(&self) -> bool {
        self.engine.count.is_some_and(|max| self.stats.sent >= max)
    }

    async fn drive<P, W>(
        &mut self,
        pinger: &P,
        cancel: &Cancel,
        report: &mut Report<W>,
    ) -> io::Result<StopReason>
    where
        P: Pinger,
        W: Write,
    {
        let mut next_tick: Option<Instant> = None;

        loop {
            if self.limit_reached() {
                return Ok(StopReason::Limit);
            }

            if let Some(tick) = next_tick {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(StopReason::Interrupted),
                    _ = sleep_until(tick) => {}
                }
            }
            if cancel.is_cancelled() {
                return Ok(StopReason::Interrupted);
            }

            // A slow attempt pushes the next tick back rather than overlapping it.
            let started = Instant::now();
            next_tick = Some(started + self.engine.interval);

            let result = pinger.ping_with(cancel).await;
            debug!(
                seq = self.stats.sent + 1,
                addr = ?result.addr(),
                timed_out = result.error().is_some_and(PingError::is_timeout),
                outcome = %result,
                "attempt finished"
            );
            self.stats.record(&result);
            report.attempt(&result)?;

            if result.is_cancelled() && cancel.is_cancelled() {
                debug!("in-flight attempt aborted by interrupt");
                return Ok(StopReason::Interrupted);
            }
        }
    }
}
