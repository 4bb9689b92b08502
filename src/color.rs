use clap::ValueEnum;
use crossterm::style::Color;

/// Available color schemes for the `time=` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ColorScheme {
    /// Classic green-yellow-red gradient
    #[default]
    Classic,
    /// Thermal camera style - blue to cyan to green to yellow to red
    Thermal,
    /// Fire theme - dark red to orange to pale yellow
    Fire,
    /// Ocean blue theme - blue to cyan to white
    Ocean,
}

impl std::fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorScheme::Classic => write!(f, "Classic"),
            ColorScheme::Thermal => write!(f, "Thermal"),
            ColorScheme::Fire => write!(f, "Fire"),
            ColorScheme::Ocean => write!(f, "Ocean"),
        }
    }
}

/// Linear interpolation between two values
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Interpolate between two RGB colors
fn lerp_rgb(c1: (u8, u8, u8), c2: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    (
        lerp(c1.0 as f64, c2.0 as f64, t) as u8,
        lerp(c1.1 as f64, c2.1 as f64, t) as u8,
        lerp(c1.2 as f64, c2.2 as f64, t) as u8,
    )
}

/// Interpolate through a list of color stops
fn gradient(stops: &[(f64, (u8, u8, u8))], t: f64) -> (u8, u8, u8) {
    let t = t.clamp(0.0, 1.0);

    for pair in stops.windows(2) {
        let (t1, c1) = pair[0];
        let (t2, c2) = pair[1];

        if t >= t1 && t <= t2 {
            let local_t = (t - t1) / (t2 - t1);
            return lerp_rgb(c1, c2, local_t);
        }
    }

    stops.last().map(|(_, c)| *c).unwrap_or((255, 255, 255))
}

/// Maps round-trip times onto a terminal colour.
///
/// Stops are chosen to stay readable on a dark terminal background.
#[derive(Debug, Clone, Copy)]
pub struct ColorScale {
    /// RTT value (ms) that is considered "bad"
    pub max_rtt: u64,
    pub scheme: ColorScheme,
}

impl ColorScale {
    pub fn new(max_rtt: u64, scheme: ColorScheme) -> Self {
        Self { max_rtt, scheme }
    }

    /// Each stop is (position 0.0-1.0, RGB color)
    fn stops(&self) -> &'static [(f64, (u8, u8, u8))] {
        match self.scheme {
            ColorScheme::Classic => &[
                (0.0, (0, 255, 0)),
                (0.25, (128, 255, 0)),
                (0.5, (255, 255, 0)),
                (0.75, (255, 128, 0)),
                (1.0, (255, 0, 0)),
            ],
            ColorScheme::Thermal => &[
                (0.0, (60, 120, 255)),
                (0.2, (0, 160, 255)),
                (0.35, (0, 200, 200)),
                (0.5, (0, 210, 90)),
                (0.65, (180, 220, 0)),
                (0.8, (255, 180, 0)),
                (1.0, (255, 60, 60)),
            ],
            ColorScheme::Fire => &[
                (0.0, (200, 40, 0)),
                (0.4, (255, 100, 0)),
                (0.7, (255, 200, 0)),
                (1.0, (255, 255, 200)),
            ],
            ColorScheme::Ocean => &[
                (0.0, (0, 120, 220)),
                (0.5, (0, 190, 230)),
                (0.8, (120, 225, 255)),
                (1.0, (255, 255, 255)),
            ],
        }
    }

    pub fn color_for_rtt(&self, rtt_ms: u64) -> Color {
        let ratio = (rtt_ms as f64 / self.max_rtt.max(1) as f64).min(1.0);
        let (r, g, b) = gradient(self.stops(), ratio);
        Color::Rgb { r, g, b }
    }

    /// Colour for failed attempts
    pub fn failure_color(&self) -> Color {
        Color::AnsiValue(240)
    }
}
