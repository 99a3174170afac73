use foundation::Aabb2;
use serde_json::{Map, Value};

/// A position in WGS 84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl LonLat {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

pub type Ring = Vec<LonLat>;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(LonLat),
    MultiPoint(Vec<LonLat>),
    LineString(Vec<LonLat>),
    MultiLineString(Vec<Vec<LonLat>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    pub fn bounds(&self) -> Aabb2 {
        let mut b = Aabb2::empty();
        self.for_each_position(|p| b.extend_point(p.lon_deg, p.lat_deg));
        b
    }

    fn for_each_position(&self, mut f: impl FnMut(&LonLat)) {
        match self {
            Geometry::Point(p) => f(p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter().for_each(f),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().for_each(f)
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().for_each(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

impl Feature {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).filter(|v| !v.is_null())
    }

    pub fn to_geojson_value(&self) -> Value {
        self.to_geojson_value_with(self.properties.clone())
    }

    /// Emits the feature with `properties` replacing its own attribute map.
    pub fn to_geojson_value_with(&self, properties: Map<String, Value>) -> Value {
        let mut fobj = Map::new();
        fobj.insert("type".to_string(), Value::String("Feature".to_string()));
        if let Some(id) = &self.id {
            fobj.insert("id".to_string(), Value::String(id.clone()));
        }
        fobj.insert("properties".to_string(), Value::Object(properties));
        fobj.insert(
            "geometry".to_string(),
            geometry_to_geojson_value(&self.geometry),
        );
        Value::Object(fobj)
    }
}

/// A set of features sharing one coordinate reference (always WGS 84 once
/// loaded) plus the attribute columns the source declared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub columns: Vec<String>,
}

#[derive(Debug)]
pub enum GeoJsonError {
    Json(serde_json::Error),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Json(e) => write!(f, "JSON parse error: {e}"),
            GeoJsonError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            GeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoJsonError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>, columns: Vec<String>) -> Self {
        Self { features, columns }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn bounds(&self) -> Aabb2 {
        let mut b = Aabb2::empty();
        for feat in &self.features {
            b.extend(&feat.geometry.bounds());
        }
        b
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_str(payload).map_err(GeoJsonError::Json)?;
        Self::from_geojson_value(&value)
    }

    /// Parses a FeatureCollection. Columns are the union of property keys
    /// in first-seen order, since GeoJSON has no schema of its own.
    pub fn from_geojson_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value.as_object().ok_or(GeoJsonError::NotAFeatureCollection)?;
        if obj.get("type").and_then(|v| v.as_str()) != Some("FeatureCollection") {
            return Err(GeoJsonError::NotAFeatureCollection);
        }
        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        let mut columns: Vec<String> = Vec::new();
        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let invalid = |reason: &str| GeoJsonError::InvalidFeature {
                index,
                reason: reason.to_string(),
            };
            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| invalid("feature must be an object"))?;
            if feat_obj.get("type").and_then(|v| v.as_str()) != Some("Feature") {
                return Err(invalid("feature type must be \"Feature\""));
            }

            let id = match feat_obj.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            let properties = feat_obj
                .get("properties")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();
            for key in properties.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }

            let geometry_val = feat_obj
                .get("geometry")
                .ok_or_else(|| invalid("feature missing geometry"))?;
            let geometry = parse_geometry(geometry_val)
                .map_err(|reason| GeoJsonError::InvalidFeature { index, reason })?;

            features.push(Feature {
                id,
                properties,
                geometry,
            });
        }

        Ok(Self { features, columns })
    }

    pub fn to_geojson_value(&self) -> Value {
        feature_collection_value(self.features.iter().map(Feature::to_geojson_value).collect())
    }
}

/// Wraps already-encoded features into a FeatureCollection object.
pub fn feature_collection_value(features: Vec<Value>) -> Value {
    let mut root = Map::new();
    root.insert(
        "type".to_string(),
        Value::String("FeatureCollection".to_string()),
    );
    root.insert("features".to_string(), Value::Array(features));
    Value::Object(root)
}

fn geometry_to_geojson_value(geom: &Geometry) -> Value {
    let (ty, coords) = match geom {
        Geometry::Point(p) => ("Point", position(p)),
        Geometry::MultiPoint(ps) => ("MultiPoint", positions(ps)),
        Geometry::LineString(ps) => ("LineString", positions(ps)),
        Geometry::MultiLineString(lines) => (
            "MultiLineString",
            Value::Array(lines.iter().map(|l| positions(l)).collect()),
        ),
        Geometry::Polygon(rings) => ("Polygon", rings_value(rings)),
        Geometry::MultiPolygon(polys) => (
            "MultiPolygon",
            Value::Array(polys.iter().map(|p| rings_value(p)).collect()),
        ),
    };
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String(ty.to_string()));
    obj.insert("coordinates".to_string(), coords);
    Value::Object(obj)
}

fn position(p: &LonLat) -> Value {
    Value::Array(vec![Value::from(p.lon_deg), Value::from(p.lat_deg)])
}

fn positions(ps: &[LonLat]) -> Value {
    Value::Array(ps.iter().map(position).collect())
}

fn rings_value(rings: &[Ring]) -> Value {
    Value::Array(rings.iter().map(|r| positions(r)).collect())
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;
    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_position(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_positions(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_positions(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_nested(
            coords,
            parse_positions,
        )?)),
        "Polygon" => Ok(Geometry::Polygon(parse_nested(coords, parse_positions)?)),
        "MultiPolygon" => Ok(Geometry::MultiPolygon(parse_nested(coords, |p| {
            parse_nested(p, parse_positions)
        })?)),
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_position(coords: &Value) -> Result<LonLat, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    match (arr.first().and_then(Value::as_f64), arr.get(1).and_then(Value::as_f64)) {
        (Some(lon), Some(lat)) => Ok(LonLat::new(lon, lat)),
        _ => Err("position must have numeric [lon, lat]".to_string()),
    }
}

fn parse_positions(coords: &Value) -> Result<Vec<LonLat>, String> {
    parse_nested(coords, parse_position)
}

fn parse_nested<T>(
    coords: &Value,
    item: impl Fn(&Value) -> Result<T, String>,
) -> Result<Vec<T>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(item).collect()
}

#[cfg(test)]
mod tests {
    use super::{FeatureCollection, Geometry, GeoJsonError};
    use serde_json::json;

    fn square(x0: f64, y0: f64, side: f64) -> serde_json::Value {
        json!([[[x0, y0], [x0 + side, y0], [x0 + side, y0 + side], [x0, y0 + side], [x0, y0]]])
    }

    #[test]
    fn parses_collection_and_tracks_columns() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 7, "properties": {"NOMBRE": "Prado"},
                 "geometry": {"type": "Polygon", "coordinates": square(-75.57, 6.25, 0.01)}},
                {"type": "Feature", "properties": {"NOMBRE": "Boston", "SUBTIPO_BA": 1},
                 "geometry": {"type": "MultiPolygon", "coordinates": [square(-75.56, 6.24, 0.02)]}}
            ]
        });
        let fc = FeatureCollection::from_geojson_value(&doc).unwrap();
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.columns, vec!["NOMBRE".to_string(), "SUBTIPO_BA".to_string()]);
        assert_eq!(fc.features[0].id.as_deref(), Some("7"));
        assert!(matches!(fc.features[1].geometry, Geometry::MultiPolygon(_)));
        assert!(fc.has_column("SUBTIPO_BA"));
        assert!(!fc.has_column("LIMITECOMU"));

        let b = fc.bounds();
        assert!((b.min[0] + 75.57).abs() < 1e-12);
        assert!((b.max[0] + 75.54).abs() < 1e-12);
        assert!((b.max[1] - 6.26).abs() < 1e-12);
    }

    #[test]
    fn null_properties_read_as_missing() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"NOMBRE": null},
                          "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}]
        });
        let fc = FeatureCollection::from_geojson_value(&doc).unwrap();
        assert!(fc.features[0].property("NOMBRE").is_none());
    }

    #[test]
    fn emits_geojson_with_replaced_properties() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"a": 1},
                          "geometry": {"type": "Point", "coordinates": [1.5, 2.5]}}]
        });
        let fc = FeatureCollection::from_geojson_value(&doc).unwrap();
        let mut props = serde_json::Map::new();
        props.insert("tooltip".to_string(), json!("x"));
        let out = fc.features[0].to_geojson_value_with(props);
        assert_eq!(
            out,
            json!({"type": "Feature", "properties": {"tooltip": "x"},
                   "geometry": {"type": "Point", "coordinates": [1.5, 2.5]}})
        );
        assert_eq!(fc.to_geojson_value(), doc);
    }

    #[test]
    fn rejects_non_collections_and_bad_geometry() {
        assert!(matches!(
            FeatureCollection::from_geojson_str(r#"{"type": "Feature"}"#),
            Err(GeoJsonError::NotAFeatureCollection)
        ));
        let bad = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "geometry": {"type": "Circle", "coordinates": []}}]
        });
        assert!(matches!(
            FeatureCollection::from_geojson_value(&bad),
            Err(GeoJsonError::InvalidFeature { index: 0, .. })
        ));
    }
}
