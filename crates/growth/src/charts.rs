//! Chart payloads for the aggregate panels below the map.

use serde::Serialize;

use crate::aggregate::{GroupTotal, TOP_N, sum_by_name, top_n_desc};
use crate::symbology::ColorScale;
use crate::table::GrowthRecord;
use crate::treemap::{Rect, squarify};

/// Treemap canvas in CSS pixels; the page scales the SVG to fit.
pub const TREEMAP_WIDTH: f64 = 1000.0;
pub const TREEMAP_HEIGHT: f64 = 450.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubType {
    Barrio,
    Vereda,
}

impl SubType {
    pub fn code(self) -> i64 {
        match self {
            SubType::Barrio => 1,
            SubType::Vereda => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubType::Barrio => "Barrio",
            SubType::Vereda => "Vereda",
        }
    }

    fn treemap_title(self) -> &'static str {
        match self {
            SubType::Barrio => "📊 Treemap de Barrios con Mayor Área Urbanizada",
            SubType::Vereda => "🌳 Treemap de Veredas con Mayor Área Urbanizada",
        }
    }

    fn treemap_scale(self) -> ColorScale {
        match self {
            SubType::Barrio => ColorScale::Teal,
            SubType::Vereda => ColorScale::Aggrnyl,
        }
    }

    fn bar_scale(self) -> ColorScale {
        match self {
            SubType::Barrio => ColorScale::Tealgrn,
            SubType::Vereda => ColorScale::Purp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreemapTile {
    pub name: String,
    pub value: f64,
    pub label: String,
    pub color: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub name: String,
    pub value: f64,
    pub text: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chart {
    Treemap {
        title: String,
        subtype: SubType,
        scale: ColorScale,
        width: f64,
        height: f64,
        tiles: Vec<TreemapTile>,
    },
    Bar {
        title: String,
        subtype: SubType,
        scale: ColorScale,
        x_label: String,
        y_label: String,
        /// Bars are listed largest first; the page draws them
        /// "total ascending" so the largest ends up on top.
        bars: Vec<Bar>,
    },
}

/// Rows of one sub-type; every row when the layer has no sub-type column.
pub fn rows_of_subtype<'a>(
    rows: &[&'a GrowthRecord],
    has_subtype: bool,
    subtype: SubType,
) -> Vec<&'a GrowthRecord> {
    if !has_subtype {
        return rows.to_vec();
    }
    rows.iter()
        .copied()
        .filter(|r| r.subtype == Some(subtype.code()))
        .collect()
}

fn value_range(totals: &[GroupTotal]) -> (f64, f64) {
    totals.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
        (lo.min(t.value), hi.max(t.value))
    })
}

/// Growth area (ha) summed per name, laid out as a squarified treemap.
pub fn treemap_chart(rows: &[&GrowthRecord], subtype: SubType) -> Chart {
    let totals = sum_by_name(rows.iter().copied(), |r| r.growth_ha);
    let (lo, hi) = value_range(&totals);
    let scale = subtype.treemap_scale();
    let values: Vec<f64> = totals.iter().map(|t| t.value).collect();
    let rects = squarify(&values, Rect::new(0.0, 0.0, TREEMAP_WIDTH, TREEMAP_HEIGHT));

    let tiles = totals
        .into_iter()
        .zip(rects)
        .map(|(t, rect)| TreemapTile {
            label: format!("{}\n{:.2} ha", t.name, t.value),
            color: scale.color_for(t.value, lo, hi),
            name: t.name,
            value: t.value,
            rect,
        })
        .collect();

    Chart::Treemap {
        title: subtype.treemap_title().to_string(),
        subtype,
        scale,
        width: TREEMAP_WIDTH,
        height: TREEMAP_HEIGHT,
        tiles,
    }
}

/// Growth percentage summed per name, top 15 descending.
pub fn bar_chart(rows: &[&GrowthRecord], subtype: SubType) -> Chart {
    let top = top_n_desc(sum_by_name(rows.iter().copied(), |r| r.growth_pct), TOP_N);
    let (lo, hi) = value_range(&top);
    let scale = subtype.bar_scale();

    let bars = top
        .into_iter()
        .map(|t| Bar {
            text: format!("{:.2}%", t.value),
            color: scale.color_for(t.value, lo, hi),
            name: t.name,
            value: t.value,
        })
        .collect();

    Chart::Bar {
        title: format!("📈 Porcentaje de crecimiento por {}", subtype.label()),
        subtype,
        scale,
        x_label: "% Crecimiento".to_string(),
        y_label: subtype.label().to_string(),
        bars,
    }
}

/// Treemap + ranked bars for barrios, then for veredas; a sub-type with no
/// rows contributes nothing.
pub fn build_charts(rows: &[&GrowthRecord], has_subtype: bool) -> Vec<Chart> {
    let mut charts = Vec::new();
    for subtype in [SubType::Barrio, SubType::Vereda] {
        let group = rows_of_subtype(rows, has_subtype, subtype);
        if group.is_empty() {
            continue;
        }
        charts.push(treemap_chart(&group, subtype));
        charts.push(bar_chart(&group, subtype));
    }
    charts
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Chart, SubType, bar_chart, build_charts, rows_of_subtype, treemap_chart};
    use crate::table::fixtures::{growth_collection, sample_rows};
    use crate::table::{ColumnMapping, GrowthRecord, GrowthTable};

    fn table(with_subtype: bool) -> GrowthTable {
        GrowthTable::from_collection(
            growth_collection(&sample_rows(), with_subtype),
            &ColumnMapping::default(),
        )
        .unwrap()
    }

    fn kinds(charts: &[Chart]) -> Vec<(&'static str, SubType)> {
        charts
            .iter()
            .map(|c| match c {
                Chart::Treemap { subtype, .. } => ("treemap", *subtype),
                Chart::Bar { subtype, .. } => ("bar", *subtype),
            })
            .collect()
    }

    #[test]
    fn four_charts_in_fixed_order() {
        let t = table(true);
        let rows: Vec<&GrowthRecord> = t.records.iter().collect();
        let charts = build_charts(&rows, true);
        assert_eq!(
            kinds(&charts),
            vec![
                ("treemap", SubType::Barrio),
                ("bar", SubType::Barrio),
                ("treemap", SubType::Vereda),
                ("bar", SubType::Vereda),
            ]
        );
    }

    #[test]
    fn empty_subtype_group_is_skipped() {
        let t = table(true);
        let barrios: Vec<&GrowthRecord> = t
            .records
            .iter()
            .filter(|r| r.subtype == Some(1))
            .collect();
        let charts = build_charts(&barrios, true);
        assert_eq!(charts.len(), 2);
        assert!(build_charts(&[], true).is_empty());
    }

    #[test]
    fn missing_subtype_column_uses_all_rows_for_both_groups() {
        let t = table(false);
        let rows: Vec<&GrowthRecord> = t.records.iter().collect();
        assert_eq!(rows_of_subtype(&rows, false, SubType::Barrio).len(), 6);
        assert_eq!(rows_of_subtype(&rows, false, SubType::Vereda).len(), 6);
        assert_eq!(build_charts(&rows, false).len(), 4);
    }

    #[test]
    fn treemap_sums_area_and_formats_labels() {
        let t = table(true);
        let rows: Vec<&GrowthRecord> = t.records.iter().collect();
        let barrios = rows_of_subtype(&rows, true, SubType::Barrio);
        let Chart::Treemap { tiles, title, .. } = treemap_chart(&barrios, SubType::Barrio) else {
            panic!("expected treemap");
        };
        assert!(title.contains("Barrios"));
        let popular = tiles.iter().find(|t| t.name == "Popular").unwrap();
        assert_eq!(popular.value, 5.0);
        assert_eq!(popular.label, "Popular\n5.00 ha");
        // Largest tile takes the top of the color scale.
        assert_eq!(popular.color, "#2a5674");
        let covered: f64 = tiles.iter().map(|t| t.rect.area()).sum();
        assert!((covered - 1000.0 * 450.0).abs() < 1e-6);
    }

    #[test]
    fn bars_rank_percentages_descending() {
        let t = table(true);
        let rows: Vec<&GrowthRecord> = t.records.iter().collect();
        let Chart::Bar { bars, y_label, .. } = bar_chart(&rows, SubType::Vereda) else {
            panic!("expected bar chart");
        };
        assert_eq!(y_label, "Vereda");
        let ranked: Vec<(&str, &str)> = bars
            .iter()
            .map(|b| (b.name.as_str(), b.text.as_str()))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("El Llano", "20.00%"),
                ("Popular", "15.00%"),
                ("Santo Domingo", "7.50%"),
                ("Travesias", "3.00%"),
                ("Prado", "1.00%"),
            ]
        );
    }

    #[test]
    fn bars_keep_only_top_fifteen() {
        let rows: Vec<_> = (0..20_i32)
            .map(|i| ("Comuna 1", format!("Barrio {i:02}"), 1, 1.0, f64::from(i), -75.5, 6.2))
            .collect();
        let borrowed: Vec<_> = rows
            .iter()
            .map(|(a, n, s, ha, pct, lon, lat)| (*a, n.as_str(), *s, *ha, *pct, *lon, *lat))
            .collect();
        let t = GrowthTable::from_collection(
            growth_collection(&borrowed, true),
            &ColumnMapping::default(),
        )
        .unwrap();
        let all: Vec<&GrowthRecord> = t.records.iter().collect();
        let Chart::Bar { bars, .. } = bar_chart(&all, SubType::Barrio) else {
            panic!("expected bar chart");
        };
        assert_eq!(bars.len(), 15);
        assert_eq!(bars[0].name, "Barrio 19");
        assert_eq!(bars[14].name, "Barrio 05");
    }
}
