//! Coordinate reference systems the loaders know how to bring into WGS 84.

use crate::math::{Hemisphere, UtmZone, utm_to_geodetic};

pub const EPSG_WGS84: u32 = 4326;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Geographic WGS 84 (EPSG:4326); x = lon, y = lat in degrees.
    Wgs84,
    /// WGS 84 / UTM (EPSG:326zz north, EPSG:327zz south); x/y in meters.
    Utm(UtmZone),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrsError {
    UnsupportedEpsg(u32),
    UnrecognizedWkt(String),
}

impl std::fmt::Display for CrsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrsError::UnsupportedEpsg(code) => write!(f, "unsupported EPSG code: {code}"),
            CrsError::UnrecognizedWkt(name) => {
                write!(f, "unrecognized projection definition: {name}")
            }
        }
    }
}

impl std::error::Error for CrsError {}

impl Crs {
    pub fn from_epsg(code: u32) -> Result<Self, CrsError> {
        let utm = |offset: u32, hemisphere| {
            u8::try_from(code - offset)
                .ok()
                .and_then(|n| UtmZone::new(n, hemisphere))
                .map(Crs::Utm)
                .ok_or(CrsError::UnsupportedEpsg(code))
        };
        match code {
            EPSG_WGS84 => Ok(Crs::Wgs84),
            32601..=32660 => utm(32600, Hemisphere::North),
            32701..=32760 => utm(32700, Hemisphere::South),
            _ => Err(CrsError::UnsupportedEpsg(code)),
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => EPSG_WGS84,
            Crs::Utm(zone) => {
                let base = match zone.hemisphere {
                    Hemisphere::North => 32600,
                    Hemisphere::South => 32700,
                };
                base + u32::from(zone.number)
            }
        }
    }

    /// Detects the CRS from ESRI/OGC WKT as found in a shapefile `.prj`.
    ///
    /// An explicit `AUTHORITY["EPSG", ...]` on the outermost node wins;
    /// otherwise the `PROJCS` name is matched against the usual
    /// "WGS 84 / UTM zone 18N" spellings, and a bare WGS 84 `GEOGCS` is
    /// geographic.
    pub fn from_wkt(wkt: &str) -> Result<Self, CrsError> {
        let wkt = wkt.trim();
        let head = wkt.split('[').next().unwrap_or("").trim().to_ascii_uppercase();
        let name = first_quoted(wkt).unwrap_or_default();

        if let Some(code) = outer_authority_code(wkt) {
            return Self::from_epsg(code);
        }

        match head.as_str() {
            "GEOGCS" | "GEOGCRS" => {
                let upper = name.to_ascii_uppercase();
                if upper.contains("WGS") && upper.contains("84") {
                    Ok(Crs::Wgs84)
                } else {
                    Err(CrsError::UnrecognizedWkt(name))
                }
            }
            "PROJCS" | "PROJCRS" => parse_utm_name(&name)
                .map(Crs::Utm)
                .ok_or(CrsError::UnrecognizedWkt(name)),
            _ => Err(CrsError::UnrecognizedWkt(name)),
        }
    }

    /// Transforms a native (x, y) pair into (lon, lat) degrees.
    pub fn to_lon_lat(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Crs::Wgs84 => (x, y),
            Crs::Utm(zone) => {
                let geo = utm_to_geodetic(x, y, *zone);
                (geo.lon_deg(), geo.lat_deg())
            }
        }
    }
}

fn first_quoted(s: &str) -> Option<String> {
    let start = s.find('"')? + 1;
    let len = s[start..].find('"')?;
    Some(s[start..start + len].to_string())
}

/// The AUTHORITY node belonging to the root element is the last one that
/// closes right before the final bracket.
fn outer_authority_code(wkt: &str) -> Option<u32> {
    let body = wkt.strip_suffix(']')?;
    let idx = body.rfind("AUTHORITY[")?;
    let tail = &body[idx..];
    // Nested nodes close inside `tail`; only accept it when nothing follows
    // the authority node itself.
    let close = tail.find(']')?;
    if !tail[close + 1..].trim().is_empty() {
        return None;
    }
    let parts: Vec<&str> = tail["AUTHORITY[".len()..close]
        .split(',')
        .map(|p| p.trim().trim_matches('"'))
        .collect();
    match parts.as_slice() {
        [auth, code] if auth.eq_ignore_ascii_case("EPSG") => code.parse().ok(),
        _ => None,
    }
}

fn parse_utm_name(name: &str) -> Option<UtmZone> {
    let upper = name.to_ascii_uppercase().replace('_', " ");
    if !upper.contains("WGS") || !upper.contains("84") {
        return None;
    }
    let idx = upper.find("UTM ZONE ")?;
    let rest = &upper[idx + "UTM ZONE ".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let number: u8 = digits.parse().ok()?;
    let hemisphere = match rest[digits.len()..].chars().next()? {
        'N' => Hemisphere::North,
        'S' => Hemisphere::South,
        _ => return None,
    };
    UtmZone::new(number, hemisphere)
}
