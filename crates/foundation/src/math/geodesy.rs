/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 semi-minor axis (meters).
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// Geodetic coordinates in radians.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Geodetic {
    pub lat_rad: f64,
    pub lon_rad: f64,
}

impl Geodetic {
    pub fn new(lat_rad: f64, lon_rad: f64) -> Self {
        Self { lat_rad, lon_rad }
    }

    pub fn from_degrees(lat_deg: f64, lon_deg: f64) -> Self {
        Self::new(lat_deg.to_radians(), lon_deg.to_radians())
    }

    pub fn lat_deg(&self) -> f64 {
        self.lat_rad.to_degrees()
    }

    /// Longitude in degrees, wrapped to [-180, 180).
    pub fn lon_deg(&self) -> f64 {
        let deg = self.lon_rad.to_degrees();
        (deg + 180.0).rem_euclid(360.0) - 180.0
    }
}
