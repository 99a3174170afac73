use std::path::PathBuf;

use formats::{Feature, FeatureCollection, LoadError, LoadOptions, load_layer};
use foundation::{Aabb2, Crs};
use serde_json::Value;

/// Attribute names of the growth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Administrative area (comuna / corregimiento) identifier.
    pub area: String,
    /// Sub-area (barrio / vereda) name.
    pub name: String,
    /// Sub-type code: 1 = barrio, 2 = vereda. May be absent from the layer.
    pub subtype: String,
    /// Growth area in hectares; drives the range filter and treemaps.
    pub growth_ha: String,
    /// Raw growth measure; drives map extrusion.
    pub growth_raw: String,
    /// Growth percentage.
    pub growth_pct: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            area: "LIMITECOMU".to_string(),
            name: "NOMBRE".to_string(),
            subtype: "SUBTIPO_BA".to_string(),
            growth_ha: "area_cre_1".to_string(),
            growth_raw: "area_creci".to_string(),
            growth_pct: "porcentaje".to_string(),
        }
    }
}

/// One urban-growth polygon with its typed attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthRecord {
    pub area_id: Option<String>,
    pub name: Option<String>,
    pub subtype: Option<i64>,
    pub growth_ha: Option<f64>,
    pub growth_raw: Option<f64>,
    pub growth_pct: Option<f64>,
    pub feature: Feature,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrowthTable {
    pub records: Vec<GrowthRecord>,
    /// Whether the layer declares the sub-type column at all.
    pub has_subtype: bool,
}

#[derive(Debug)]
pub enum DatasetError {
    Load(LoadError),
    MissingColumn {
        dataset: &'static str,
        column: String,
    },
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Load(e) => write!(f, "{e}"),
            DatasetError::MissingColumn { dataset, column } => {
                write!(f, "{dataset} layer has no column named {column:?}")
            }
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Load(e) => Some(e),
            DatasetError::MissingColumn { .. } => None,
        }
    }
}

impl From<LoadError> for DatasetError {
    fn from(e: LoadError) -> Self {
        DatasetError::Load(e)
    }
}

impl GrowthTable {
    pub fn from_collection(
        collection: FeatureCollection,
        columns: &ColumnMapping,
    ) -> Result<Self, DatasetError> {
        // A schema-less empty GeoJSON layer has nothing to validate.
        if !(collection.is_empty() && collection.columns.is_empty()) {
            for required in [
                &columns.area,
                &columns.name,
                &columns.growth_ha,
                &columns.growth_raw,
                &columns.growth_pct,
            ] {
                if !collection.has_column(required) {
                    return Err(DatasetError::MissingColumn {
                        dataset: "growth",
                        column: required.clone(),
                    });
                }
            }
        }

        let has_subtype = collection.has_column(&columns.subtype);
        let records = collection
            .features
            .into_iter()
            .map(|feature| GrowthRecord {
                area_id: feature.property(&columns.area).and_then(text),
                name: feature.property(&columns.name).and_then(text),
                subtype: feature.property(&columns.subtype).and_then(code),
                growth_ha: feature.property(&columns.growth_ha).and_then(number),
                growth_raw: feature.property(&columns.growth_raw).and_then(number),
                growth_pct: feature.property(&columns.growth_pct).and_then(number),
                feature,
            })
            .collect();

        Ok(Self {
            records,
            has_subtype,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Total bounds of a set of growth rows (the `total_bounds` of the view).
pub fn total_bounds<'a>(rows: impl IntoIterator<Item = &'a GrowthRecord>) -> Aabb2 {
    let mut b = Aabb2::empty();
    for row in rows {
        b.extend(&row.feature.geometry.bounds());
    }
    b
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => match n.as_f64() {
            Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => Some(format!("{}", v as i64)),
            _ => Some(n.to_string()),
        },
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn code(value: &Value) -> Option<i64> {
    number(value).filter(|v| v.fract() == 0.0).map(|v| v as i64)
}

/// Where the two layers live and how to read them.
#[derive(Debug, Clone)]
pub struct DatasetSources {
    pub growth_path: PathBuf,
    pub growth_crs: Option<Crs>,
    pub boundary_path: PathBuf,
    pub boundary_crs: Option<Crs>,
    pub columns: ColumnMapping,
}

/// The two immutable input tables, loaded once and shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Datasets {
    pub growth: GrowthTable,
    pub boundaries: FeatureCollection,
    pub columns: ColumnMapping,
}

impl Datasets {
    pub fn load(sources: &DatasetSources) -> Result<Self, DatasetError> {
        let growth = load_layer(
            &sources.growth_path,
            &LoadOptions {
                source_crs: sources.growth_crs,
            },
        )?;
        let boundaries = load_layer(
            &sources.boundary_path,
            &LoadOptions {
                source_crs: sources.boundary_crs,
            },
        )?;
        Self::from_collections(growth, boundaries, sources.columns.clone())
    }

    pub fn from_collections(
        growth: FeatureCollection,
        boundaries: FeatureCollection,
        columns: ColumnMapping,
    ) -> Result<Self, DatasetError> {
        Ok(Self {
            growth: GrowthTable::from_collection(growth, &columns)?,
            boundaries,
            columns,
        })
    }
}
