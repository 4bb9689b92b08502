use super::PingResult;

/// Running totals over one session's attempts.
///
/// Only successful attempts feed the timing figures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PingStats {
    pub sent: u64,
    pub received: u64,
    pub min_ms: Option<u64>,
    pub max_ms: Option<u64>,
    sum_ms: u128,
    sum_sq_ms: u128,
}

impl PingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &PingResult) {
        match result.error() {
            None => self.record_success(result.elapsed_ms()),
            Some(_) => self.record_failure(),
        }
    }

    pub fn record_success(&mut self, ms: u64) {
        self.sent += 1;
        self.received += 1;
        self.sum_ms += ms as u128;
        self.sum_sq_ms += (ms as u128) * (ms as u128);

        self.min_ms = Some(self.min_ms.map_or(ms, |min| min.min(ms)));
        self.max_ms = Some(self.max_ms.map_or(ms, |max| max.max(ms)));
    }

    pub fn record_failure(&mut self) {
        self.sent += 1;
    }

    pub fn lost(&self) -> u64 {
        self.sent - self.received
    }

    pub fn loss_percent(&self) -> f64 {
        if self.sent > 0 {
            (self.lost() as f64 / self.sent as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn avg_ms(&self) -> Option<f64> {
        if self.received > 0 {
            Some(self.sum_ms as f64 / self.received as f64)
        } else {
            None
        }
    }

    /// Population standard deviation of successful round-trip times.
    pub fn jitter_ms(&self) -> Option<f64> {
        let avg = self.avg_ms()?;
        let n = self.received as f64;
        let variance = (self.sum_sq_ms as f64 / n - avg * avg).max(0.0);
        Some(variance.sqrt())
    }

    pub fn format_stats(&self) -> String {
        let min = self.min_ms.map(|ms| ms.to_string());
        let avg = self.avg_ms().map(format_ms);
        let max = self.max_ms.map(|ms| ms.to_string());
        let jitter = self.jitter_ms().map(format_ms);
        let dash = || "-".to_string();

        format!(
            "sent={} received={} loss={}% min={} avg={} max={} jitter={} ms",
            self.sent,
            self.received,
            format_ms(self.loss_percent()),
            min.unwrap_or_else(dash),
            avg.unwrap_or_else(dash),
            max.unwrap_or_else(dash),
            jitter.unwrap_or_else(dash),
        )
    }
}

/// Whole numbers without decimals, everything else to one decimal place.
fn format_ms(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}
