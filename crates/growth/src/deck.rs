//! deck.gl description of the 3D growth map.
//!
//! Layer fields are camelCase so the page can hand them straight to
//! `GeoJsonLayer`; colors are RGBA arrays.

use formats::feature_collection_value;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::symbology::{BOUNDARY_STYLE, GROWTH_STYLE, LayerStyle, Rgba};
use crate::table::{GrowthRecord, total_bounds};
use crate::viewport::Viewport;

pub const DEFAULT_ELEVATION_DIVISOR: f64 = 50.0;
pub const DEFAULT_MAP_STYLE: &str = "mapbox://styles/mapbox/dark-v10";
pub const BOUNDARY_LAYER_ID: &str = "barrios-veredas";
pub const GROWTH_LAYER_ID: &str = "crecimiento-urbano";
/// Where the page fetches the boundary context layer from.
pub const BOUNDARY_DATA_URL: &str = "/api/boundaries.geojson";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapLayer {
    pub id: &'static str,
    /// Inline FeatureCollection or a URL deck.gl fetches itself.
    pub data: Value,
    pub filled: bool,
    pub stroked: bool,
    pub extruded: bool,
    pub get_fill_color: Rgba,
    pub get_line_color: Rgba,
    pub line_width_min_pixels: f32,
    /// Feature property holding the extrusion height, if extruded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_property: Option<&'static str>,
    pub pickable: bool,
    pub auto_highlight: bool,
}

impl MapLayer {
    fn styled(id: &'static str, data: Value, style: LayerStyle) -> Self {
        Self {
            id,
            data,
            filled: true,
            stroked: true,
            extruded: false,
            get_fill_color: style.fill,
            get_line_color: style.line,
            line_width_min_pixels: style.line_width_min_pixels,
            elevation_property: None,
            pickable: false,
            auto_highlight: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckSpec {
    pub map_style: String,
    pub initial_view_state: Viewport,
    /// Draw order: boundaries underneath, growth on top.
    pub layers: Vec<MapLayer>,
    /// deck.gl tooltip template; `{tooltip}` reads the feature property.
    pub tooltip: Value,
}

/// Hover text for one growth polygon.
pub fn tooltip_text(row: &GrowthRecord) -> String {
    format!(
        "{}\nÁrea: {:.2} ha\n% crecimiento: {:.2}%",
        row.name.as_deref().unwrap_or_default(),
        row.growth_ha.unwrap_or(f64::NAN),
        row.growth_pct.unwrap_or(f64::NAN),
    )
}

fn growth_feature(row: &GrowthRecord, elevation_divisor: f64) -> Value {
    let elevation = row
        .growth_raw
        .map(|raw| raw / elevation_divisor)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0);

    let mut props = Map::new();
    props.insert("name".into(), json!(row.name));
    props.insert("area_id".into(), json!(row.area_id));
    props.insert("subtype".into(), json!(row.subtype));
    props.insert("growth_ha".into(), json!(row.growth_ha));
    props.insert("growth_pct".into(), json!(row.growth_pct));
    props.insert("elevation".into(), json!(elevation));
    props.insert("tooltip".into(), json!(tooltip_text(row)));
    row.feature.to_geojson_value_with(props)
}

/// Growth polygons as an extruded, pickable layer.
pub fn growth_layer(rows: &[&GrowthRecord], elevation_divisor: f64) -> MapLayer {
    let features = rows
        .iter()
        .map(|row| growth_feature(row, elevation_divisor))
        .collect();
    MapLayer {
        extruded: true,
        elevation_property: Some("elevation"),
        pickable: true,
        auto_highlight: true,
        ..MapLayer::styled(GROWTH_LAYER_ID, feature_collection_value(features), GROWTH_STYLE)
    }
}

pub fn boundary_layer() -> MapLayer {
    MapLayer::styled(BOUNDARY_LAYER_ID, json!(BOUNDARY_DATA_URL), BOUNDARY_STYLE)
}

/// Map description for a non-empty filtered set, framed on its bounds.
pub fn build_deck(rows: &[&GrowthRecord], elevation_divisor: f64, map_style: &str) -> DeckSpec {
    let bounds = total_bounds(rows.iter().copied());
    DeckSpec {
        map_style: map_style.to_string(),
        initial_view_state: Viewport::for_bounds(&bounds),
        layers: vec![boundary_layer(), growth_layer(rows, elevation_divisor)],
        tooltip: json!({ "text": "{tooltip}" }),
    }
}
