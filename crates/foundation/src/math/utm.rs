//! Inverse Universal Transverse Mercator on the WGS84 ellipsoid.
//!
//! Uses the Krüger series truncated at third order in the third flattening
//! `n`, which stays well below a millimetre inside a zone.

use super::geodesy::{Geodetic, WGS84_A, WGS84_F};

/// UTM central scale factor.
pub const UTM_K0: f64 = 0.9996;
/// UTM false easting (meters).
pub const UTM_FALSE_EASTING: f64 = 500_000.0;
/// False northing used for southern-hemisphere zones (meters).
pub const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    North,
    South,
}

/// A UTM zone: 1..=60 plus hemisphere.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UtmZone {
    pub number: u8,
    pub hemisphere: Hemisphere,
}

impl UtmZone {
    pub fn new(number: u8, hemisphere: Hemisphere) -> Option<Self> {
        if (1..=60).contains(&number) {
            Some(Self { number, hemisphere })
        } else {
            None
        }
    }

    pub fn central_meridian_deg(&self) -> f64 {
        f64::from(self.number) * 6.0 - 183.0
    }
}

struct KruegerSeries {
    rectifying_radius: f64,
    beta: [f64; 3],
    delta: [f64; 3],
}

fn krueger_series() -> KruegerSeries {
    let n = WGS84_F / (2.0 - WGS84_F);
    let n2 = n * n;
    let n3 = n2 * n;
    KruegerSeries {
        rectifying_radius: WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
        beta: [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
            n2 / 48.0 + n3 / 15.0,
            17.0 * n3 / 480.0,
        ],
        delta: [
            2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
            7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
            56.0 * n3 / 15.0,
        ],
    }
}

/// Converts UTM easting/northing (meters) in `zone` to geodetic coordinates.
pub fn utm_to_geodetic(easting: f64, northing: f64, zone: UtmZone) -> Geodetic {
    let series = krueger_series();
    let false_northing = match zone.hemisphere {
        Hemisphere::North => 0.0,
        Hemisphere::South => UTM_FALSE_NORTHING_SOUTH,
    };

    let scale = UTM_K0 * series.rectifying_radius;
    let xi = (northing - false_northing) / scale;
    let eta = (easting - UTM_FALSE_EASTING) / scale;

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, beta) in series.beta.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        xi_p -= beta * (k * xi).sin() * (k * eta).cosh();
        eta_p -= beta * (k * xi).cos() * (k * eta).sinh();
    }

    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let mut lat = chi;
    for (j, delta) in series.delta.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        lat += delta * (k * chi).sin();
    }

    let lon = zone.central_meridian_deg().to_radians() + eta_p.sinh().atan2(xi_p.cos());
    Geodetic::new(lat, lon)
}

#[cfg(test)]
mod tests {
    use super::{Hemisphere, UtmZone, utm_to_geodetic};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn zone_18n() -> UtmZone {
        UtmZone::new(18, Hemisphere::North).unwrap()
    }

    #[test]
    fn false_origin_maps_to_equator_on_central_meridian() {
        let geo = utm_to_geodetic(500_000.0, 0.0, zone_18n());
        assert_close(geo.lat_deg(), 0.0, 1e-12);
        assert_close(geo.lon_deg(), -75.0, 1e-12);
    }

    #[test]
    fn published_fortieth_parallel_point() {
        // 40N 75W lies on the zone 18 central meridian.
        let geo = utm_to_geodetic(500_000.0, 4_427_757.218_7, zone_18n());
        assert_close(geo.lat_deg(), 40.0, 1e-6);
        assert_close(geo.lon_deg(), -75.0, 1e-9);
    }

    #[test]
    fn medellin_off_meridian() {
        let geo = utm_to_geodetic(435_707.043_965, 690_234.556_451, zone_18n());
        assert_close(geo.lat_deg(), 6.2442, 1e-6);
        assert_close(geo.lon_deg(), -75.5812, 1e-6);
    }

    #[test]
    fn southern_zone_uses_false_northing() {
        let zone = UtmZone::new(18, Hemisphere::South).unwrap();
        let geo = utm_to_geodetic(500_000.0, 10_000_000.0, zone);
        assert_close(geo.lat_deg(), 0.0, 1e-12);
        let below = utm_to_geodetic(500_000.0, 9_000_000.0, zone);
        assert!(below.lat_deg() < -9.0);
    }

    #[test]
    fn zone_number_is_validated() {
        assert!(UtmZone::new(0, Hemisphere::North).is_none());
        assert!(UtmZone::new(61, Hemisphere::North).is_none());
        assert_eq!(zone_18n().central_meridian_deg(), -75.0);
    }
}
