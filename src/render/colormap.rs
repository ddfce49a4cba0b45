//! Colour scales for routes and scores.

/// ColorBrewer Set1, nine classes.
pub const SET1: &[&str] = &[
    "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00", "#ffff33", "#a65628", "#f781bf",
    "#999999",
];

/// ColorBrewer YlGnBu, nine classes.
pub const YLGNBU: &[&str] = &[
    "#ffffd9", "#edf8b1", "#c7e9b4", "#7fcdbb", "#41b6c4", "#1d91c0", "#225ea8", "#253494",
    "#081d58",
];

/// Piecewise-linear scale mapping `[min, max]` onto a list of colour stops.
#[derive(Debug, Clone)]
pub struct LinearColormap {
    stops: Vec<(u8, u8, u8)>,
    min: f64,
    max: f64,
}

impl LinearColormap {
    pub fn new(stops: &[&str], min: f64, max: f64) -> Self {
        Self {
            stops: stops.iter().filter_map(|s| parse_hex(s)).collect(),
            min,
            max,
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Colour for `value`; values outside the range are clamped. A degenerate
    /// range maps everything to the first stop.
    pub fn color(&self, value: f64) -> String {
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return "#000000".to_string(),
        };
        let span = self.max - self.min;
        if span.is_nan() || span <= 0.0 || !value.is_finite() {
            return to_hex(first);
        }

        let t = ((value - self.min) / span).clamp(0.0, 1.0);
        if t >= 1.0 {
            return to_hex(last);
        }
        let scaled = t * (self.stops.len() - 1) as f64;
        let idx = scaled.floor() as usize;
        let frac = scaled - idx as f64;
        let (a, b) = (self.stops[idx], self.stops[(idx + 1).min(self.stops.len() - 1)]);
        let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
        to_hex((lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2)))
    }

    /// The colour stops as hex strings, low to high.
    pub fn hex_stops(&self) -> Vec<String> {
        self.stops.iter().copied().map(to_hex).collect()
    }
}

/// `n` evenly spaced hues around the colour wheel.
pub fn hsv_palette(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| hsv_to_hex(i as f64 / n as f64 * 360.0, 1.0, 1.0))
        .collect()
}

fn hsv_to_hex(hue: f64, saturation: f64, value: f64) -> String {
    let c = value * saturation;
    let h = (hue % 360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    let channel = |v: f64| ((v + m) * 255.0).round() as u8;
    to_hex((channel(r), channel(g), channel(b)))
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn to_hex((r, g, b): (u8, u8, u8)) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}
