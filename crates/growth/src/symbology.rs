use serde::Serialize;

/// RGBA color as deck.gl expects it.
pub type Rgba = [u8; 4];

/// Paint settings of one map layer.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct LayerStyle {
    pub fill: Rgba,
    pub line: Rgba,
    pub line_width_min_pixels: f32,
}

impl LayerStyle {
    pub const fn new(fill: Rgba, line: Rgba, line_width_min_pixels: f32) -> Self {
        Self {
            fill,
            line,
            line_width_min_pixels,
        }
    }
}

pub const GROWTH_STYLE: LayerStyle = LayerStyle::new([0, 200, 255, 160], [0, 0, 0, 255], 0.0);
pub const BOUNDARY_STYLE: LayerStyle =
    LayerStyle::new([100, 100, 100, 40], [200, 200, 200, 255], 1.0);

/// Sequential color scales used by the charts (CARTO palettes).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ColorScale {
    Teal,
    Tealgrn,
    Aggrnyl,
    Purp,
}

impl ColorScale {
    fn stops(self) -> &'static [[u8; 3]; 7] {
        match self {
            ColorScale::Teal => &[
                [209, 238, 234],
                [168, 219, 217],
                [133, 196, 201],
                [104, 171, 184],
                [79, 144, 166],
                [59, 115, 143],
                [42, 86, 116],
            ],
            ColorScale::Tealgrn => &[
                [176, 242, 188],
                [137, 232, 172],
                [103, 219, 165],
                [76, 200, 163],
                [56, 178, 163],
                [44, 152, 160],
                [37, 125, 152],
            ],
            ColorScale::Aggrnyl => &[
                [36, 86, 104],
                [15, 114, 121],
                [13, 143, 129],
                [57, 171, 126],
                [110, 197, 116],
                [169, 220, 103],
                [237, 239, 93],
            ],
            ColorScale::Purp => &[
                [243, 224, 247],
                [228, 199, 241],
                [209, 175, 232],
                [185, 152, 221],
                [159, 130, 206],
                [130, 109, 186],
                [99, 88, 159],
            ],
        }
    }

    /// Linear interpolation along the scale, `t` in [0, 1].
    pub fn sample(self, t: f64) -> [u8; 3] {
        let stops = self.stops();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let pos = t * (stops.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(stops.len() - 1);
        let frac = pos - lo as f64;
        let mut out = [0u8; 3];
        for (c, slot) in out.iter_mut().enumerate() {
            let a = f64::from(stops[lo][c]);
            let b = f64::from(stops[hi][c]);
            *slot = (a + (b - a) * frac).round() as u8;
        }
        out
    }

    /// Color of `value` on a scale spanning `[min, max]`; a flat range maps
    /// to the top of the scale.
    pub fn color_for(self, value: f64, min: f64, max: f64) -> String {
        let t = if max > min {
            (value - min) / (max - min)
        } else {
            1.0
        };
        hex(self.sample(t))
    }
}

pub fn hex([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}
