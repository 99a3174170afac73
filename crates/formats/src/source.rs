//! Reading vector layers from disk and bringing them into WGS 84.
//!
//! Shapefiles (`.shp` + `.shx` + `.dbf`, optional `.prj`) are the primary
//! input; GeoJSON FeatureCollections are accepted too and are assumed to be
//! WGS 84 unless a source CRS is configured.
//!
//! Attribute text is decoded with the code page named in the sidecar `.cpg`
//! when there is one, else with the code page mark in the `.dbf` header.

use std::fs;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use dbase::encoding::LossyCodePage;
use dbase::yore::code_pages::{CP437, CP850, CP1250, CP1252};
use dbase::{CodePageMark, FieldValue, UnicodeLossy};
use foundation::{Crs, CrsError};
use serde_json::{Map, Number, Value};
use shapefile::{PolygonRing, Shape, ShapeReader};

use crate::features::{Feature, FeatureCollection, GeoJsonError, Geometry, LonLat, Ring};

/// Column name dBase readers report for the record deletion marker.
const DELETION_FLAG: &str = "DeletionFlag";

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Overrides `.prj` detection when set.
    pub source_crs: Option<Crs>,
}

#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Shapefile {
        path: PathBuf,
        source: shapefile::Error,
    },
    Dbase {
        path: PathBuf,
        source: dbase::Error,
    },
    GeoJson {
        path: PathBuf,
        source: GeoJsonError,
    },
    Crs {
        path: PathBuf,
        source: CrsError,
    },
    MissingProjection(PathBuf),
    UnsupportedExtension(PathBuf),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            LoadError::Shapefile { path, source } => {
                write!(f, "failed to read shapefile {}: {source}", path.display())
            }
            LoadError::Dbase { path, source } => {
                write!(f, "failed to read attribute table {}: {source}", path.display())
            }
            LoadError::GeoJson { path, source } => {
                write!(f, "failed to parse {}: {source}", path.display())
            }
            LoadError::Crs { path, source } => {
                write!(f, "cannot reproject {}: {source}", path.display())
            }
            LoadError::MissingProjection(path) => write!(
                f,
                "{} has no .prj and no source CRS was configured",
                path.display()
            ),
            LoadError::UnsupportedExtension(path) => {
                write!(f, "unsupported vector format: {}", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Shapefile { source, .. } => Some(source),
            LoadError::Dbase { source, .. } => Some(source),
            LoadError::GeoJson { source, .. } => Some(source),
            LoadError::Crs { source, .. } => Some(source),
            LoadError::MissingProjection(_) | LoadError::UnsupportedExtension(_) => None,
        }
    }
}

/// Text encodings a `.dbf` attribute table is read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// Also used for ISO-8859-1, whose printable range it shares.
    Windows1252,
    Windows1250,
    Cp850,
    Cp437,
}

impl TextEncoding {
    /// Parses the label found in a `.cpg` file; `None` when unrecognised.
    pub fn from_cpg(label: &str) -> Option<Self> {
        let compact: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match compact.as_str() {
            "UTF8" | "65001" => Some(Self::Utf8),
            "ISO88591" | "88591" | "LATIN1" | "28591" | "1252" | "CP1252" | "WINDOWS1252"
            | "ANSI1252" => Some(Self::Windows1252),
            "1250" | "CP1250" | "WINDOWS1250" | "ANSI1250" => Some(Self::Windows1250),
            "850" | "CP850" | "OEM850" | "IBM850" => Some(Self::Cp850),
            "437" | "CP437" | "OEM437" | "IBM437" => Some(Self::Cp437),
            _ => None,
        }
    }

    /// Falls back on the header mark; an unmarked table is read as Latin-1
    /// the way GDAL does.
    pub fn from_code_page_mark(mark: CodePageMark) -> Self {
        match mark {
            CodePageMark::Undefined | CodePageMark::CP1252 => Self::Windows1252,
            CodePageMark::CP1250 => Self::Windows1250,
            CodePageMark::CP850 => Self::Cp850,
            CodePageMark::CP437 => Self::Cp437,
            _ => Self::Utf8,
        }
    }

    fn apply<T: Read + Seek>(self, reader: &mut dbase::Reader<T>) {
        match self {
            Self::Utf8 => reader.set_encoding(UnicodeLossy),
            Self::Windows1252 => reader.set_encoding(LossyCodePage(CP1252)),
            Self::Windows1250 => reader.set_encoding(LossyCodePage(CP1250)),
            Self::Cp850 => reader.set_encoding(LossyCodePage(CP850)),
            Self::Cp437 => reader.set_encoding(LossyCodePage(CP437)),
        }
    }
}

/// Reads the sidecar `.cpg`; a missing file or unknown label yields `None`.
pub fn cpg_encoding(path: &Path) -> Result<Option<TextEncoding>, LoadError> {
    let cpg = path.with_extension("cpg");
    match fs::read_to_string(&cpg) {
        Ok(label) => Ok(TextEncoding::from_cpg(&label)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LoadError::Io {
            path: cpg,
            source: e,
        }),
    }
}

/// Loads a vector layer and reprojects every coordinate to WGS 84 degrees.
pub fn load_layer(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<FeatureCollection, LoadError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("shp") => load_shapefile(path, options),
        Some("geojson") | Some("json") => load_geojson(path, options),
        _ => Err(LoadError::UnsupportedExtension(path.to_path_buf())),
    }
}

/// Resolves the source CRS of a shapefile: explicit override first, then
/// the sidecar `.prj`.
pub fn shapefile_crs(path: &Path, options: &LoadOptions) -> Result<Crs, LoadError> {
    if let Some(crs) = options.source_crs {
        return Ok(crs);
    }
    let prj = path.with_extension("prj");
    let wkt = match fs::read_to_string(&prj) {
        Ok(wkt) => wkt,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoadError::MissingProjection(path.to_path_buf()));
        }
        Err(e) => {
            return Err(LoadError::Io {
                path: prj,
                source: e,
            });
        }
    };
    Crs::from_wkt(&wkt).map_err(|e| LoadError::Crs {
        path: prj,
        source: e,
    })
}

fn load_shapefile(path: &Path, options: &LoadOptions) -> Result<FeatureCollection, LoadError> {
    let crs = shapefile_crs(path, options)?;

    let dbf = path.with_extension("dbf");
    let mut table = dbase::Reader::from_path(&dbf).map_err(|e| LoadError::Dbase {
        path: dbf.clone(),
        source: e,
    })?;
    let encoding = match cpg_encoding(path)? {
        Some(encoding) => encoding,
        None => TextEncoding::from_code_page_mark(table.header().code_page_mark),
    };
    encoding.apply(&mut table);

    let columns: Vec<String> = table
        .fields()
        .iter()
        .map(|field| field.name().to_string())
        .filter(|name| name != DELETION_FLAG)
        .collect();

    let shp_err = |e| LoadError::Shapefile {
        path: path.to_path_buf(),
        source: e,
    };
    let shapes = ShapeReader::from_path(path).map_err(shp_err)?;
    let mut reader = shapefile::Reader::new(shapes, table);

    let mut features = Vec::new();
    for (index, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item.map_err(shp_err)?;
        let Some(geometry) = shape_to_geometry(&shape, &crs) else {
            continue;
        };

        let mut properties = Map::new();
        for column in &columns {
            if let Some(value) = record.get(column) {
                properties.insert(column.clone(), field_to_json(value));
            }
        }

        features.push(Feature {
            id: Some(index.to_string()),
            properties,
            geometry,
        });
    }

    Ok(FeatureCollection::new(features, columns))
}

fn load_geojson(path: &Path, options: &LoadOptions) -> Result<FeatureCollection, LoadError> {
    let payload = fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut collection =
        FeatureCollection::from_geojson_str(&payload).map_err(|e| LoadError::GeoJson {
            path: path.to_path_buf(),
            source: e,
        })?;

    if let Some(crs) = options.source_crs
        && crs != Crs::Wgs84
    {
        for feature in &mut collection.features {
            reproject_geometry(&mut feature.geometry, &crs);
        }
    }
    Ok(collection)
}

fn reproject_geometry(geometry: &mut Geometry, crs: &Crs) {
    let fix = |p: &mut LonLat| {
        let (lon, lat) = crs.to_lon_lat(p.lon_deg, p.lat_deg);
        *p = LonLat::new(lon, lat);
    };
    match geometry {
        Geometry::Point(p) => fix(p),
        Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter_mut().for_each(fix),
        Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
            lines.iter_mut().flatten().for_each(fix)
        }
        Geometry::MultiPolygon(polys) => polys.iter_mut().flatten().flatten().for_each(fix),
    }
}

trait PlanarPoint {
    fn xy(&self) -> (f64, f64);
}

impl PlanarPoint for shapefile::Point {
    fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl PlanarPoint for shapefile::PointM {
    fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl PlanarPoint for shapefile::PointZ {
    fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

fn to_lon_lat<P: PlanarPoint>(p: &P, crs: &Crs) -> LonLat {
    let (x, y) = p.xy();
    let (lon, lat) = crs.to_lon_lat(x, y);
    LonLat::new(lon, lat)
}

fn line<P: PlanarPoint>(points: &[P], crs: &Crs) -> Vec<LonLat> {
    points.iter().map(|p| to_lon_lat(p, crs)).collect()
}

/// Shapefile polygons are a flat ring list: each outer ring opens a new
/// polygon and the inner rings that follow are its holes.
fn polygon_rings<P: PlanarPoint>(rings: &[PolygonRing<P>], crs: &Crs) -> Option<Geometry> {
    let mut polygons: Vec<Vec<Ring>> = Vec::new();
    for ring in rings {
        let coords = line(ring.points(), crs);
        if matches!(ring, PolygonRing::Inner(_))
            && let Some(current) = polygons.last_mut()
        {
            current.push(coords);
            continue;
        }
        polygons.push(vec![coords]);
    }
    match polygons.len() {
        0 => None,
        1 => polygons.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(polygons)),
    }
}

fn multi_line(parts: Vec<Vec<LonLat>>) -> Option<Geometry> {
    match parts.len() {
        0 => None,
        1 => parts.into_iter().next().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(parts)),
    }
}

fn shape_to_geometry(shape: &Shape, crs: &Crs) -> Option<Geometry> {
    match shape {
        Shape::NullShape => None,
        Shape::Point(p) => Some(Geometry::Point(to_lon_lat(p, crs))),
        Shape::PointM(p) => Some(Geometry::Point(to_lon_lat(p, crs))),
        Shape::PointZ(p) => Some(Geometry::Point(to_lon_lat(p, crs))),
        Shape::Multipoint(mp) => Some(Geometry::MultiPoint(line(mp.points(), crs))),
        Shape::MultipointM(mp) => Some(Geometry::MultiPoint(line(mp.points(), crs))),
        Shape::MultipointZ(mp) => Some(Geometry::MultiPoint(line(mp.points(), crs))),
        Shape::Polyline(pl) => multi_line(pl.parts().iter().map(|p| line(p, crs)).collect()),
        Shape::PolylineM(pl) => multi_line(pl.parts().iter().map(|p| line(p, crs)).collect()),
        Shape::PolylineZ(pl) => multi_line(pl.parts().iter().map(|p| line(p, crs)).collect()),
        Shape::Polygon(pg) => polygon_rings(pg.rings(), crs),
        Shape::PolygonM(pg) => polygon_rings(pg.rings(), crs),
        Shape::PolygonZ(pg) => polygon_rings(pg.rings(), crs),
        Shape::Multipatch(_) => None,
    }
}

fn number(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

fn field_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Character(Some(s)) => Value::String(s.trim().to_string()),
        FieldValue::Memo(s) => Value::String(s.trim().to_string()),
        FieldValue::Numeric(Some(v)) => number(*v),
        FieldValue::Float(Some(v)) => number(f64::from(*v)),
        FieldValue::Double(v) | FieldValue::Currency(v) => number(*v),
        FieldValue::Integer(v) => Value::from(*v),
        FieldValue::Logical(Some(b)) => Value::Bool(*b),
        _ => Value::Null,
    }
}
