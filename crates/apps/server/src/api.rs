use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::Query;
use growth::{filter_options, render_dashboard, FilterOptions, RenderResponse, Selection};
use http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::AppState;

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message.into() })))
}

/// Raw widget state as it arrives in the query string. Multi-valued
/// fields repeat their key: `names=Prado&names=El%20Llano`.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    #[serde(default)]
    pub areas: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub min: Option<String>,
    #[serde(default)]
    pub max: Option<String>,
    /// Slider extent the page showed when `min`/`max` were picked.
    #[serde(default)]
    pub slider_min: Option<String>,
    #[serde(default)]
    pub slider_max: Option<String>,
}

fn clean_list(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bound(key: &str, raw: Option<&str>) -> Result<Option<f64>, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(format!("{key} must be a finite number, got {raw:?}")),
    }
}

impl SelectionQuery {
    /// A one-sided range leaves the other side open; clamping into the
    /// slider extent closes it.
    pub fn to_selection(&self) -> Result<Selection, String> {
        let min = parse_bound("min", self.min.as_deref())?;
        let max = parse_bound("max", self.max.as_deref())?;
        let range = match (min, max) {
            (None, None) => None,
            (lo, hi) => Some((lo.unwrap_or(f64::NEG_INFINITY), hi.unwrap_or(f64::INFINITY))),
        };
        let range_bounds = match (
            parse_bound("slider_min", self.slider_min.as_deref())?,
            parse_bound("slider_max", self.slider_max.as_deref())?,
        ) {
            (Some(lo), Some(hi)) => Some((lo, hi)),
            _ => None,
        };
        Ok(Selection {
            areas: clean_list(&self.areas),
            names: clean_list(&self.names),
            range,
            range_bounds,
        })
    }
}

async fn datasets(state: &AppState) -> ApiResult<std::sync::Arc<growth::Datasets>> {
    state.cache.get().await.map_err(|e| {
        error!("{e}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

pub async fn get_options(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> ApiResult<Json<FilterOptions>> {
    let selection = query
        .to_selection()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let data = datasets(&state).await?;
    Ok(Json(filter_options(&data, &selection)))
}

pub async fn get_render(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> ApiResult<Json<RenderResponse>> {
    let selection = query
        .to_selection()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let data = datasets(&state).await?;
    Ok(Json(render_dashboard(&data, &selection, &state.settings)))
}

pub async fn get_boundaries(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = datasets(&state).await?;
    Ok(Json(data.boundaries.to_geojson_value()))
}

pub async fn clear_cache(State(state): State<AppState>) -> impl IntoResponse {
    let cleared = state.cache.clear().await;
    info!("dataset cache cleared (was loaded: {cleared})");
    Json(json!({ "cleared": cleared }))
}
