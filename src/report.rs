use std::io::{self, Write};

use crossterm::style::Stylize;

use crate::color::ColorScale;
use crate::ping::{PingResult, PingStats};

/// Streams attempt lines and the closing summary to a writer.
pub struct Report<W: Write> {
    out: W,
    timestamps: bool,
    colors: Option<ColorScale>,
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            timestamps: false,
            colors: None,
        }
    }

    /// Prefix each attempt line with the local time it finished.
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn with_colors(mut self, colors: Option<ColorScale>) -> Self {
        self.colors = colors;
        self
    }

    pub fn header(&mut self, target: &str) -> io::Result<()> {
        writeln!(self.out, "Ping {}:", target)?;
        self.out.flush()
    }

    pub fn attempt(&mut self, result: &PingResult) -> io::Result<()> {
        if self.timestamps {
            write!(self.out, "[{}] ", result.timestamp_str())?;
        }

        match (&self.colors, result.reply()) {
            (None, _) => writeln!(self.out, "{}", result)?,
            (Some(scale), Some(reply)) => {
                let ms = result.elapsed_ms();
                let time = ms.to_string().with(scale.color_for_rtt(ms));
                writeln!(self.out, "{}: time={} ms", reply.addr, time)?;
            }
            (Some(scale), None) => {
                writeln!(self.out, "{}", result.to_string().with(scale.failure_color()))?;
            }
        }
        self.out.flush()
    }

    pub fn summary(&mut self, target: &str, stats: &PingStats) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "--- {} ping statistics ---", target)?;
        writeln!(self.out, "{}", stats.format_stats())?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorScheme;
    use crate::ping::PingError;
    use std::time::Duration;

    fn render(report: Report<Vec<u8>>) -> String {
        String::from_utf8(report.into_inner()).unwrap()
    }

    #[test]
    fn test_plain_lines() {
        let mut report = Report::new(Vec::new());
        report.header("example.com:443").unwrap();
        report
            .attempt(&PingResult::success("10.0.0.1".parse().unwrap(), Duration::from_millis(7)))
            .unwrap();
        report
            .attempt(&PingResult::failure(PingError::Timeout(Duration::from_secs(3))))
            .unwrap();

        assert_eq!(
            render(report),
            "Ping example.com:443:\n10.0.0.1: time=7 ms\ntimeout after 3000ms\n"
        );
    }

    #[test]
    fn test_summary_block() {
        let mut stats = PingStats::new();
        stats.record_success(4);
        stats.record_failure();

        let mut report = Report::new(Vec::new());
        report.summary("host", &stats).unwrap();
        assert_eq!(
            render(report),
            "\n--- host ping statistics ---\nsent=2 received=1 loss=50% min=4 avg=4 max=4 jitter=0 ms\n"
        );
    }

    #[test]
    fn test_timestamp_prefix() {
        let mut report = Report::new(Vec::new()).with_timestamps(true);
        let result = PingResult::success("10.0.0.1".parse().unwrap(), Duration::from_millis(1));
        report.attempt(&result).unwrap();

        let out = render(report);
        assert!(out.starts_with(&format!("[{}] ", result.timestamp_str())));
        assert!(out.ends_with("10.0.0.1: time=1 ms\n"));
    }

    #[test]
    fn test_colored_output_keeps_text() {
        let scale = ColorScale::new(100, ColorScheme::Classic);
        let mut report = Report::new(Vec::new()).with_colors(Some(scale));
        report
            .attempt(&PingResult::success("10.0.0.1".parse().unwrap(), Duration::from_millis(50)))
            .unwrap();

        let out = render(report);
        assert!(out.starts_with("10.0.0.1: time="));
        assert!(out.contains("50"));
        assert!(out.ends_with(" ms\n"));
    }
}
