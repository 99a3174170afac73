use foundation::Aabb2;
use serde::Serialize;

/// Zoom used when the filtered rows collapse to a point.
pub const DEGENERATE_ZOOM: i32 = 15;
pub const MIN_ZOOM: i32 = 9;
pub const MAX_ZOOM: i32 = 16;
pub const DEFAULT_PITCH_DEG: f64 = 45.0;

/// Camera parameters for the 3D map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: i32,
    pub pitch: f64,
    pub bearing: f64,
}

/// `8 - log2(max_dim)` before rounding and clamping; `None` when the box
/// has no positive extent or no points at all.
pub fn raw_zoom(bounds: &Aabb2) -> Option<f64> {
    if bounds.is_empty() {
        return None;
    }
    let max_dim = bounds.width().max(bounds.height());
    (max_dim > 0.0).then(|| 8.0 - max_dim.log2())
}

/// Integer zoom level that frames `bounds` (degrees).
pub fn zoom_level(bounds: &Aabb2) -> i32 {
    match raw_zoom(bounds) {
        None => DEGENERATE_ZOOM,
        Some(z) => (z.round_ties_even() as i32).clamp(MIN_ZOOM, MAX_ZOOM),
    }
}

impl Viewport {
    pub fn for_bounds(bounds: &Aabb2) -> Self {
        let (longitude, latitude) = bounds.center();
        Self {
            latitude,
            longitude,
            zoom: zoom_level(bounds),
            pitch: DEFAULT_PITCH_DEG,
            bearing: 0.0,
        }
    }
}
