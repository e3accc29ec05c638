//! Color scales for the choropleths.
//!
//! Continuous metrics go through a zero-anchored linear scale into `[0, 1]`
//! and then the Viridis ramp (multi-stop linear interpolation). Mortgage
//! volume uses a fixed threshold palette.

use crate::domain::Domain;
use crate::scale::linear::LinearScale;

/// RGB color with channels in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Fill for features that have no joined value.
pub const NO_DATA: Rgb = Rgb::new(211, 211, 211);

/// Position in `[0, 1]` mapped to a color.
#[derive(Debug, Clone, Copy)]
struct ColorStop {
    t: f64,
    color: Rgb,
}

impl ColorStop {
    const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

const VIRIDIS_STOPS: &[ColorStop] = &[
    ColorStop::new(0.000, 68, 1, 84),
    ColorStop::new(0.125, 72, 36, 117),
    ColorStop::new(0.250, 65, 68, 135),
    ColorStop::new(0.375, 53, 95, 141),
    ColorStop::new(0.500, 42, 120, 142),
    ColorStop::new(0.625, 33, 145, 140),
    ColorStop::new(0.750, 34, 168, 132),
    ColorStop::new(0.875, 122, 209, 81),
    ColorStop::new(1.000, 253, 231, 37),
];

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

fn multi_stop(stops: &[ColorStop], t: f64) -> Rgb {
    if t <= 0.0 {
        return stops[0].color;
    }
    if t >= 1.0 {
        return stops[stops.len() - 1].color;
    }
    for i in 1..stops.len() {
        if t <= stops[i].t {
            let ratio = (t - stops[i - 1].t) / (stops[i].t - stops[i - 1].t);
            return lerp_color(stops[i - 1].color, stops[i].color, ratio);
        }
    }
    stops[stops.len() - 1].color
}

/// Viridis at `t`, clamped to `[0, 1]`. `NaN` maps to [`NO_DATA`].
pub fn viridis(t: f64) -> Rgb {
    if t.is_nan() {
        return NO_DATA;
    }
    multi_stop(VIRIDIS_STOPS, t)
}

/// Zero-anchored linear scale `[0, max] -> [0, 1]` followed by Viridis.
///
/// Both choropleths share one instance so equal colors mean equal rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    scale: LinearScale,
}

impl ColorScale {
    pub fn zero_anchored(domain: &Domain) -> Self {
        Self {
            scale: LinearScale::zero_anchored(domain, [0.0, 1.0]),
        }
    }

    /// Scale input in `[0, 1]` (unclamped) for `value`.
    pub fn normalize(&self, value: f64) -> f64 {
        self.scale.apply(value)
    }

    pub fn color(&self, value: f64) -> Rgb {
        viridis(self.normalize(value))
    }

    /// Color for an optional joined value.
    pub fn color_or_no_data(&self, value: Option<f64>) -> Rgb {
        value.map(|v| self.color(v)).unwrap_or(NO_DATA)
    }

    pub fn domain(&self) -> [f64; 2] {
        self.scale.domain
    }
}

/// Threshold palette: first step whose lower bound the value exceeds.
#[derive(Debug, Clone, PartialEq)]
pub struct StepScale {
    /// `(exclusive lower bound, color)`, descending by bound.
    steps: Vec<(f64, Rgb)>,
    fallback: Rgb,
}

impl StepScale {
    /// Palette for mortgage origination counts.
    pub fn volume() -> Self {
        Self {
            steps: vec![
                (1000.0, Rgb::new(0x80, 0x00, 0x26)),
                (500.0, Rgb::new(0xbd, 0x00, 0x26)),
                (200.0, Rgb::new(0xe3, 0x1a, 0x1c)),
                (100.0, Rgb::new(0xfc, 0x4e, 0x2a)),
                (50.0, Rgb::new(0xfd, 0x8d, 0x3c)),
                (20.0, Rgb::new(0xfe, 0xb2, 0x4c)),
                (10.0, Rgb::new(0xfe, 0xd9, 0x76)),
            ],
            fallback: Rgb::new(0xff, 0xed, 0xa0),
        }
    }

    pub fn color(&self, value: f64) -> Rgb {
        self.steps
            .iter()
            .find(|(bound, _)| value > *bound)
            .map(|(_, c)| *c)
            .unwrap_or(self.fallback)
    }

    /// `(label, color)` pairs for a legend, highest step first.
    pub fn legend(&self) -> Vec<(String, Rgb)> {
        let mut out: Vec<(String, Rgb)> = self
            .steps
            .iter()
            .map(|(bound, c)| (format!("> {bound:.0}"), *c))
            .collect();
        let lowest = self.steps.last().map(|(b, _)| *b).unwrap_or(0.0);
        out.push((format!("<= {lowest:.0}"), self.fallback));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_scale_normalizes_against_zero() {
        let scale = ColorScale::zero_anchored(&Domain { min: 2.0, max: 4.0 });
        assert!((scale.normalize(2.0) - 0.5).abs() < 1e-12);
        assert!((scale.normalize(4.0) - 1.0).abs() < 1e-12);
        assert_eq!(scale.color(4.0), Rgb::new(253, 231, 37));
        assert_eq!(scale.color(0.0), Rgb::new(68, 1, 84));
    }

    #[test]
    fn viridis_clamps_out_of_range() {
        assert_eq!(viridis(-1.0), viridis(0.0));
        assert_eq!(viridis(2.0), viridis(1.0));
        assert_eq!(viridis(f64::NAN), NO_DATA);
    }

    #[test]
    fn viridis_interpolates_between_stops() {
        let mid = viridis(0.0625);
        assert_eq!(mid, Rgb::new(70, 19, 101));
    }

    #[test]
    fn missing_value_gets_no_data_fill() {
        let scale = ColorScale::zero_anchored(&Domain { min: 1.0, max: 2.0 });
        assert_eq!(scale.color_or_no_data(None), NO_DATA);
    }

    #[test]
    fn volume_steps_use_exclusive_bounds() {
        let s = StepScale::volume();
        assert_eq!(s.color(1001.0).to_hex(), "#800026");
        assert_eq!(s.color(1000.0).to_hex(), "#bd0026");
        assert_eq!(s.color(10.0).to_hex(), "#ffeda0");
        assert_eq!(s.color(11.0).to_hex(), "#fed976");
        assert_eq!(s.legend().len(), 8);
    }
}
