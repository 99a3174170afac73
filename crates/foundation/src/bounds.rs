/// Axis-aligned bounding box in lon/lat degrees (x = lon, y = lat).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// An inverted box that any `extend_point` call will replace.
    pub fn empty() -> Self {
        Aabb2 {
            min: [f64::INFINITY, f64::INFINITY],
            max: [f64::NEG_INFINITY, f64::NEG_INFINITY],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1]
    }

    pub fn extend_point(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        self.min[0] = self.min[0].min(x);
        self.min[1] = self.min[1].min(y);
        self.max[0] = self.max[0].max(x);
        self.max[1] = self.max[1].max(y);
    }

    pub fn extend(&mut self, other: &Aabb2) {
        if other.is_empty() {
            return;
        }
        self.extend_point(other.min[0], other.min[1]);
        self.extend_point(other.max[0], other.max[1]);
    }

    pub fn width(&self) -> f64 {
        (self.max[0] - self.min[0]).abs()
    }

    pub fn height(&self) -> f64 {
        (self.max[1] - self.min[1]).abs()
    }

    /// Returns (x, y) of the box midpoint.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        )
    }

    /// `[min_x, min_y, max_x, max_y]`, the layout GeoJSON uses for `bbox`.
    pub fn as_array(&self) -> [f64; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }
}

impl Default for Aabb2 {
    fn default() -> Self {
        Self::empty()
    }
}
