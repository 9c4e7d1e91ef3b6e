// ============================================================================
// LAYER CATALOGUE: identities and pure colour transforms
// ============================================================================

use image::Rgb;
use serde::{Deserialize, Serialize};

/// RGB triple a cell shows.
pub type Color = Rgb<u8>;

/// Amount `lighten` / `darken` shift each channel by.
const SHIFT: u8 = 40;

/// A paint layer type.
///
/// Layers are identities: two values are equal iff they name the same layer
/// type.  Stores hold them by value (they are `Copy`), never own any state
/// behind them.  `index` fixes the compositing order used by the sequence
/// store and `name` is the lexicographic key its special mode uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Rainbow,
    Black,
    Lighten,
    Invert,
    Red,
    Green,
    Blue,
    Greyscale,
    Sparkle,
    Darken,
}

impl Layer {
    /// Every layer, in ascending `index` order.
    pub fn all() -> &'static [Layer] {
        &[
            Layer::Rainbow,
            Layer::Black,
            Layer::Lighten,
            Layer::Invert,
            Layer::Red,
            Layer::Green,
            Layer::Blue,
            Layer::Greyscale,
            Layer::Sparkle,
            Layer::Darken,
        ]
    }

    /// Stable type ordinal.
    pub fn index(&self) -> u8 {
        match self {
            Layer::Rainbow => 0,
            Layer::Black => 1,
            Layer::Lighten => 2,
            Layer::Invert => 3,
            Layer::Red => 4,
            Layer::Green => 5,
            Layer::Blue => 6,
            Layer::Greyscale => 7,
            Layer::Sparkle => 8,
            Layer::Darken => 9,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Layer::Rainbow => "rainbow",
            Layer::Black => "black",
            Layer::Lighten => "lighten",
            Layer::Invert => "invert",
            Layer::Red => "red",
            Layer::Green => "green",
            Layer::Blue => "blue",
            Layer::Greyscale => "greyscale",
            Layer::Sparkle => "sparkle",
            Layer::Darken => "darken",
        }
    }

    pub fn from_index(v: u8) -> Option<Self> {
        Self::all().get(v as usize).copied()
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        Self::all().iter().copied().find(|l| l.name() == lower)
    }

    /// Apply this layer's transform to `color` for the cell at `(x, y)` at
    /// time `timestamp`.  Pure: the same inputs always give the same output.
    pub fn apply(&self, color: Color, timestamp: u64, x: usize, y: usize) -> Color {
        let Rgb([r, g, b]) = color;
        match self {
            Layer::Rainbow => {
                let hue = ((x as u64 + y as u64) * 20 + timestamp * 10) % 360;
                let (hr, hg, hb) = hsv_to_rgb(hue as f32, 1.0, 1.0);
                Rgb([
                    average(r, unit_to_u8(hr)),
                    average(g, unit_to_u8(hg)),
                    average(b, unit_to_u8(hb)),
                ])
            }
            Layer::Black => Rgb([0, 0, 0]),
            Layer::Lighten => Rgb([
                r.saturating_add(SHIFT),
                g.saturating_add(SHIFT),
                b.saturating_add(SHIFT),
            ]),
            Layer::Invert => invert(color),
            Layer::Red => Rgb([255, g, b]),
            Layer::Green => Rgb([r, 255, b]),
            Layer::Blue => Rgb([r, g, 255]),
            Layer::Greyscale => {
                let mean = ((r as u16 + g as u16 + b as u16) / 3) as u8;
                Rgb([mean, mean, mean])
            }
            Layer::Sparkle => {
                if sparkle_mix(x, y, timestamp) % 5 == 0 {
                    Rgb([255, 255, 255])
                } else {
                    color
                }
            }
            Layer::Darken => Rgb([
                r.saturating_sub(SHIFT),
                g.saturating_sub(SHIFT),
                b.saturating_sub(SHIFT),
            ]),
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `255 - channel` on every channel.  Also used by the set store's special mode.
pub fn invert(color: Color) -> Color {
    let Rgb([r, g, b]) = color;
    Rgb([255 - r, 255 - g, 255 - b])
}

fn average(a: u8, b: u8) -> u8 {
    ((a as u16 + b as u16) / 2) as u8
}

fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn sparkle_mix(x: usize, y: usize, timestamp: u64) -> u64 {
    (x as u64).wrapping_mul(73_856_093)
        ^ (y as u64).wrapping_mul(19_349_663)
        ^ timestamp.wrapping_mul(83_492_791)
}

/// HSV (H: 0..360, S: 0..1, V: 0..1) → RGB (0..1)
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = if h < 60.0 { (c, x, 0.0) }
        else if h < 120.0 { (x, c, 0.0) }
        else if h < 180.0 { (0.0, c, x) }
        else if h < 240.0 { (0.0, x, c) }
        else if h < 300.0 { (x, 0.0, c) }
        else { (c, 0.0, x) };
    (r + m, g + m, b + m)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREY: Color = Rgb([100, 100, 100]);

    #[test]
    fn index_matches_catalogue_position() {
        for (i, layer) in Layer::all().iter().enumerate() {
            assert_eq!(layer.index() as usize, i);
            assert_eq!(Layer::from_index(i as u8), Some(*layer));
        }
        assert_eq!(Layer::from_index(10), None);
    }

    #[test]
    fn names_round_trip_and_ignore_case() {
        for layer in Layer::all() {
            assert_eq!(Layer::from_name(layer.name()), Some(*layer));
        }
        assert_eq!(Layer::from_name("  Lighten "), Some(Layer::Lighten));
        assert_eq!(Layer::from_name("glitter"), None);
    }

    #[test]
    fn simple_transforms() {
        assert_eq!(Layer::Black.apply(GREY, 0, 0, 0), Rgb([0, 0, 0]));
        assert_eq!(Layer::Lighten.apply(GREY, 0, 0, 0), Rgb([140, 140, 140]));
        assert_eq!(Layer::Lighten.apply(Rgb([250, 0, 10]), 0, 0, 0), Rgb([255, 40, 50]));
        assert_eq!(Layer::Darken.apply(Rgb([30, 100, 255]), 0, 0, 0), Rgb([0, 60, 215]));
        assert_eq!(Layer::Invert.apply(GREY, 0, 0, 0), Rgb([155, 155, 155]));
        assert_eq!(Layer::Red.apply(GREY, 0, 0, 0), Rgb([255, 100, 100]));
        assert_eq!(Layer::Green.apply(GREY, 0, 0, 0), Rgb([100, 255, 100]));
        assert_eq!(Layer::Blue.apply(GREY, 0, 0, 0), Rgb([100, 100, 255]));
        assert_eq!(Layer::Greyscale.apply(Rgb([10, 20, 60]), 0, 0, 0), Rgb([30, 30, 30]));
    }

    #[test]
    fn rainbow_blends_with_hue_of_position_and_time() {
        // hue 0 → pure red
        assert_eq!(Layer::Rainbow.apply(GREY, 0, 0, 0), Rgb([177, 50, 50]));
        // (1 + 2) * 20 = 60 → yellow
        assert_eq!(Layer::Rainbow.apply(GREY, 0, 1, 2), Rgb([177, 177, 50]));
        // 12 * 10 = 120 → green
        assert_eq!(Layer::Rainbow.apply(GREY, 12, 0, 0), Rgb([50, 177, 50]));
    }

    #[test]
    fn sparkle_is_deterministic() {
        assert_eq!(Layer::Sparkle.apply(GREY, 0, 0, 0), Rgb([255, 255, 255]));
        for t in 0..20 {
            let a = Layer::Sparkle.apply(GREY, t, 3, 4);
            let b = Layer::Sparkle.apply(GREY, t, 3, 4);
            assert_eq!(a, b);
            assert!(a == GREY || a == Rgb([255, 255, 255]));
        }
    }
}
