//! One dashboard render: cascade the filters, then build the map and charts.

use serde::Serialize;

use crate::charts::{Chart, build_charts};
use crate::deck::{DEFAULT_ELEVATION_DIVISOR, DEFAULT_MAP_STYLE, DeckSpec, build_deck};
use crate::filter::{Selection, SliderBounds, apply_cascade};
use crate::table::Datasets;

pub const EMPTY_RESULT_WARNING: &str = "No hay datos que coincidan con los filtros seleccionados.";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub elevation_divisor: f64,
    pub map_style: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            elevation_divisor: DEFAULT_ELEVATION_DIVISOR,
            map_style: DEFAULT_MAP_STYLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub growth_rows: usize,
    pub boundary_rows: usize,
    pub filtered_rows: usize,
}

/// Sidebar state only; what `/api/options` answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub area_options: Vec<String>,
    pub name_options: Vec<String>,
    pub slider: SliderBounds,
    pub range: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderResponse {
    #[serde(flatten)]
    pub options: FilterOptions,
    pub summary: DatasetSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<DeckSpec>,
    pub charts: Vec<Chart>,
}

pub fn filter_options(data: &Datasets, selection: &Selection) -> FilterOptions {
    let cascade = apply_cascade(&data.growth.records, selection);
    FilterOptions {
        area_options: cascade.area_options,
        name_options: cascade.name_options,
        slider: cascade.slider,
        range: cascade.range,
    }
}

pub fn render_dashboard(
    data: &Datasets,
    selection: &Selection,
    settings: &RenderSettings,
) -> RenderResponse {
    let cascade = apply_cascade(&data.growth.records, selection);
    let summary = DatasetSummary {
        growth_rows: data.growth.len(),
        boundary_rows: data.boundaries.len(),
        filtered_rows: cascade.rows.len(),
    };
    let options = FilterOptions {
        area_options: cascade.area_options,
        name_options: cascade.name_options,
        slider: cascade.slider,
        range: cascade.range,
    };

    if cascade.rows.is_empty() {
        return RenderResponse {
            options,
            summary,
            warning: Some(EMPTY_RESULT_WARNING.to_string()),
            map: None,
            charts: Vec::new(),
        };
    }

    RenderResponse {
        options,
        summary,
        warning: None,
        map: Some(build_deck(
            &cascade.rows,
            settings.elevation_divisor,
            &settings.map_style,
        )),
        charts: build_charts(&cascade.rows, data.growth.has_subtype),
    }
}
