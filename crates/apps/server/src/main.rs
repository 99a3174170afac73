use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use foundation::Crs;
use growth::{
    ColumnMapping, DatasetSources, RenderSettings, DEFAULT_ELEVATION_DIVISOR, DEFAULT_MAP_STYLE,
};
use http::{header, Method, StatusCode};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod datasets;

use datasets::DatasetCache;

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Clone)]
struct AppState {
    cache: Arc<DatasetCache>,
    settings: Arc<RenderSettings>,
    index_html: Arc<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr: SocketAddr = env::var("DASHBOARD_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8501".to_string())
        .parse()
        .expect("invalid DASHBOARD_ADDR");

    let sources = DatasetSources {
        growth_path: env_var_path("GROWTH_SHP", "crecimiento_urbano_con_porcentajes_v2.shp"),
        growth_crs: env_var_crs("GROWTH_SOURCE_EPSG"),
        boundary_path: env_var_path("BOUNDARY_SHP", "BarrioVereda.shp"),
        boundary_crs: env_var_crs("BOUNDARY_SOURCE_EPSG"),
        columns: column_mapping_from_env(),
    };

    let mut elevation_divisor =
        env_var_f64("GROWTH_ELEVATION_DIVISOR", DEFAULT_ELEVATION_DIVISOR);
    if !(elevation_divisor.is_finite() && elevation_divisor > 0.0) {
        warn!("GROWTH_ELEVATION_DIVISOR must be positive; using {DEFAULT_ELEVATION_DIVISOR}");
        elevation_divisor = DEFAULT_ELEVATION_DIVISOR;
    }
    let settings = RenderSettings {
        elevation_divisor,
        map_style: env::var("MAPBOX_STYLE").unwrap_or_else(|_| DEFAULT_MAP_STYLE.to_string()),
    };

    let mapbox_key = env::var("MAPBOX_API_KEY").unwrap_or_default();
    let index_html = INDEX_HTML.replace(
        "__MAPBOX_API_KEY__",
        &serde_json::to_string(&mapbox_key).unwrap_or_else(|_| "\"\"".to_string()),
    );

    info!(
        "growth layer: {:?}, boundary layer: {:?}",
        sources.growth_path, sources.boundary_path
    );

    let state = AppState {
        cache: Arc::new(DatasetCache::new(sources)),
        settings: Arc::new(settings),
        index_html: Arc::new(index_html),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    let app = Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/options", get(api::get_options))
        .route("/api/render", get(api::get_render))
        .route("/api/boundaries.geojson", get(api::get_boundaries))
        .route("/api/cache/clear", post(api::clear_cache))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("growth dashboard listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

async fn index(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-cache")],
        Html(state.index_html.as_ref().clone()),
    )
}

fn column_mapping_from_env() -> ColumnMapping {
    let defaults = ColumnMapping::default();
    ColumnMapping {
        area: env::var("COLUMN_AREA").unwrap_or(defaults.area),
        name: env::var("COLUMN_NAME").unwrap_or(defaults.name),
        subtype: env::var("COLUMN_SUBTYPE").unwrap_or(defaults.subtype),
        growth_ha: env::var("COLUMN_GROWTH_HA").unwrap_or(defaults.growth_ha),
        growth_raw: env::var("COLUMN_GROWTH_RAW").unwrap_or(defaults.growth_raw),
        growth_pct: env::var("COLUMN_GROWTH_PCT").unwrap_or(defaults.growth_pct),
    }
}

fn env_var_path(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

/// Unset means "read the `.prj`"; an unusable code is logged and ignored.
fn env_var_crs(key: &str) -> Option<Crs> {
    let raw = env::var(key).ok()?;
    let parsed = raw
        .trim()
        .parse::<u32>()
        .map_err(|e| e.to_string())
        .and_then(|code| Crs::from_epsg(code).map_err(|e| e.to_string()));
    match parsed {
        Ok(crs) => Some(crs),
        Err(err) => {
            warn!("ignoring {key}={raw:?}: {err}");
            None
        }
    }
}

fn env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
