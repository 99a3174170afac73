//! The three cascading sidebar filters.
//!
//! Each stage narrows the rows handed to the next one, and the choices a
//! stage offers are derived from what survived the previous stage.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::table::GrowthRecord;

/// Bounds used for the range control when nothing is left to measure.
pub const EMPTY_RANGE_BOUNDS: (f64, f64) = (0.0, 1.0);

/// Widget state for one render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub areas: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    /// Requested growth-area range; `None` means the full slider extent.
    #[serde(default)]
    pub range: Option<(f64, f64)>,
    /// Slider extent `range` was picked on. When the extent has moved since,
    /// the range starts over at the full extent.
    #[serde(default)]
    pub range_bounds: Option<(f64, f64)>,
}

fn same_bound(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

impl Selection {
    /// The requested range, or `None` once it is stale for `slider`.
    pub fn range_for(&self, slider: SliderBounds) -> Option<(f64, f64)> {
        match self.range_bounds {
            Some((lo, hi)) if !(same_bound(lo, slider.min) && same_bound(hi, slider.max)) => None,
            _ => self.range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SliderBounds {
    pub min: f64,
    pub max: f64,
}

/// Everything the sidebar needs plus the surviving rows.
#[derive(Debug, Clone)]
pub struct CascadeResult<'a> {
    pub area_options: Vec<String>,
    pub name_options: Vec<String>,
    pub slider: SliderBounds,
    /// The range actually applied, after clamping into the slider extent.
    pub range: (f64, f64),
    pub rows: Vec<&'a GrowthRecord>,
}

/// Numeric codes order by value and ahead of text; text orders as text.
fn option_order(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn sorted_unique<'a>(values: impl Iterator<Item = Option<&'a String>>) -> Vec<String> {
    let mut out: Vec<String> = values.flatten().cloned().collect();
    out.sort_by(|a, b| option_order(a, b));
    out.dedup();
    out
}

pub fn area_options<'a>(rows: impl IntoIterator<Item = &'a GrowthRecord>) -> Vec<String> {
    sorted_unique(rows.into_iter().map(|r| r.area_id.as_ref()))
}

pub fn name_options<'a>(rows: impl IntoIterator<Item = &'a GrowthRecord>) -> Vec<String> {
    sorted_unique(rows.into_iter().map(|r| r.name.as_ref()))
}

fn keep_in<'a>(
    rows: &[&'a GrowthRecord],
    selected: &[String],
    key: impl Fn(&GrowthRecord) -> Option<&String>,
) -> Vec<&'a GrowthRecord> {
    if selected.is_empty() {
        return rows.to_vec();
    }
    rows.iter()
        .copied()
        .filter(|r| key(r).is_some_and(|v| selected.contains(v)))
        .collect()
}

pub fn filter_by_area<'a>(rows: &[&'a GrowthRecord], areas: &[String]) -> Vec<&'a GrowthRecord> {
    keep_in(rows, areas, |r| r.area_id.as_ref())
}

pub fn filter_by_name<'a>(rows: &[&'a GrowthRecord], names: &[String]) -> Vec<&'a GrowthRecord> {
    keep_in(rows, names, |r| r.name.as_ref())
}

/// Min/max growth area over `rows`, ignoring missing values.
pub fn slider_bounds(rows: &[&GrowthRecord]) -> SliderBounds {
    let mut values = rows.iter().filter_map(|r| r.growth_ha);
    let Some(first) = values.next() else {
        return SliderBounds {
            min: EMPTY_RANGE_BOUNDS.0,
            max: EMPTY_RANGE_BOUNDS.1,
        };
    };
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    SliderBounds { min, max }
}

/// Keeps rows whose growth area lies in the closed interval `[lo, hi]`.
pub fn filter_by_range<'a>(rows: &[&'a GrowthRecord], (lo, hi): (f64, f64)) -> Vec<&'a GrowthRecord> {
    rows.iter()
        .copied()
        .filter(|r| r.growth_ha.is_some_and(|v| v >= lo && v <= hi))
        .collect()
}

/// Clamps a requested range into the slider extent. Omitted ranges select
/// the whole extent.
pub fn effective_range(slider: SliderBounds, requested: Option<(f64, f64)>) -> (f64, f64) {
    match requested {
        None => (slider.min, slider.max),
        Some((lo, hi)) => (
            lo.clamp(slider.min, slider.max),
            hi.clamp(slider.min, slider.max),
        ),
    }
}

/// Runs area -> name -> range over `rows`.
///
/// Selected names that the area stage no longer offers are dropped before
/// the name filter runs, so they never empty the result on their own.
pub fn apply_cascade<'a>(rows: &'a [GrowthRecord], selection: &Selection) -> CascadeResult<'a> {
    let all: Vec<&GrowthRecord> = rows.iter().collect();
    let area_options = area_options(all.iter().copied());

    let by_area = filter_by_area(&all, &selection.areas);
    let name_options = name_options(by_area.iter().copied());

    let names: Vec<String> = selection
        .names
        .iter()
        .filter(|n| name_options.contains(n))
        .cloned()
        .collect();
    let by_name = filter_by_name(&by_area, &names);
    let slider = slider_bounds(&by_name);
    let range = effective_range(slider, selection.range_for(slider));

    CascadeResult {
        area_options,
        name_options,
        slider,
        range,
        rows: filter_by_range(&by_name, range),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        EMPTY_RANGE_BOUNDS, Selection, SliderBounds, apply_cascade, area_options,
        effective_range, filter_by_area, filter_by_name, filter_by_range,
    };
    use crate::table::fixtures::sample_datasets;
    use crate::table::GrowthRecord;

    fn names(rows: &[&GrowthRecord]) -> Vec<String> {
        rows.iter().filter_map(|r| r.name.clone()).collect()
    }

    fn selection(areas: &[&str], names: &[&str], range: Option<(f64, f64)>) -> Selection {
        Selection {
            areas: areas.iter().map(|s| s.to_string()).collect(),
            names: names.iter().map(|s| s.to_string()).collect(),
            range,
            range_bounds: None,
        }
    }

    #[test]
    fn no_selection_passes_everything_through() {
        let data = sample_datasets();
        let out = apply_cascade(&data.growth.records, &Selection::default());
        assert_eq!(out.rows.len(), 6);
        assert_eq!(
            out.area_options,
            vec!["Comuna 1", "Comuna 10", "Corregimiento 60"]
        );
        assert_eq!(out.slider, SliderBounds { min: 0.25, max: 4.0 });
        assert_eq!(out.range, (0.25, 4.0));
    }

    #[test]
    fn area_only_selection_keeps_every_row_of_that_area() {
        let data = sample_datasets();
        let out = apply_cascade(&data.growth.records, &selection(&["Comuna 1"], &[], None));
        assert_eq!(out.rows.len(), 3);
        assert!(out.rows.iter().all(|r| r.area_id.as_deref() == Some("Comuna 1")));
    }

    #[test]
    fn name_options_cascade_from_area_selection() {
        let data = sample_datasets();
        let out = apply_cascade(
            &data.growth.records,
            &selection(&["Comuna 1", "Comuna 10"], &[], None),
        );
        assert_eq!(out.name_options, vec!["Popular", "Prado", "Santo Domingo"]);
        // Area options always come from the full table.
        assert_eq!(out.area_options.len(), 3);
    }

    #[test]
    fn slider_bounds_follow_the_cascaded_rows() {
        let data = sample_datasets();
        let out = apply_cascade(&data.growth.records, &selection(&["Comuna 1"], &["Popular"], None));
        assert_eq!(out.slider, SliderBounds { min: 2.0, max: 3.0 });
        assert_eq!(names(&out.rows), vec!["Popular", "Popular"]);
    }

    #[test]
    fn degenerate_range_keeps_rows_equal_to_min() {
        let data = sample_datasets();
        let out = apply_cascade(
            &data.growth.records,
            &selection(&["Comuna 1"], &[], Some((1.0, 1.0))),
        );
        assert_eq!(names(&out.rows), vec!["Santo Domingo"]);
    }

    #[test]
    fn empty_cascade_uses_unit_bounds() {
        let mut data = sample_datasets();
        for row in &mut data.growth.records {
            if row.area_id.as_deref() == Some("Comuna 10") {
                row.growth_ha = None;
            }
        }
        let out = apply_cascade(&data.growth.records, &selection(&["Comuna 10"], &[], None));
        assert!(out.rows.is_empty());
        assert_eq!(
            (out.slider.min, out.slider.max),
            EMPTY_RANGE_BOUNDS
        );
    }

    #[test]
    fn names_from_another_area_are_ignored() {
        let data = sample_datasets();
        let out = apply_cascade(
            &data.growth.records,
            &selection(&["Comuna 10"], &["El Llano"], None),
        );
        assert_eq!(out.name_options, vec!["Prado"]);
        assert_eq!(names(&out.rows), vec!["Prado"]);
        assert_eq!(out.slider, SliderBounds { min: 0.5, max: 0.5 });

        // A name that is still offered keeps narrowing.
        let out = apply_cascade(
            &data.growth.records,
            &selection(&["Comuna 1"], &["El Llano", "Santo Domingo"], None),
        );
        assert_eq!(names(&out.rows), vec!["Santo Domingo"]);
    }

    #[test]
    fn range_picked_on_other_bounds_starts_over() {
        let data = sample_datasets();
        // Picked on the full table, whose extent is 0.25..4.0.
        let mut sel = selection(&["Comuna 1"], &[], Some((3.5, f64::INFINITY)));
        sel.range_bounds = Some((0.25, 4.0));
        let out = apply_cascade(&data.growth.records, &sel);
        assert_eq!(out.slider, SliderBounds { min: 1.0, max: 3.0 });
        assert_eq!(out.range, (1.0, 3.0));
        assert_eq!(out.rows.len(), 3);

        // Same extent: the request still applies.
        sel.range = Some((1.5, 3.0));
        sel.range_bounds = Some((1.0, 3.0));
        let out = apply_cascade(&data.growth.records, &sel);
        assert_eq!(out.range, (1.5, 3.0));
        assert_eq!(names(&out.rows), vec!["Popular", "Popular"]);

        // Without bounds the request is clamped.
        sel.range = Some((3.5, f64::INFINITY));
        sel.range_bounds = None;
        let out = apply_cascade(&data.growth.records, &sel);
        assert_eq!(out.range, (3.0, 3.0));
        assert_eq!(out.rows.len(), 1);
    }

    #[test]
    fn numeric_codes_sort_by_value() {
        let mut data = sample_datasets();
        let codes = ["10", "2", "1", "Sin código", "2", "60"];
        for (row, code) in data.growth.records.iter_mut().zip(codes) {
            row.area_id = Some(code.to_string());
        }
        assert_eq!(
            area_options(&data.growth.records),
            vec!["1", "2", "10", "60", "Sin código"]
        );
    }

    #[test]
    fn requested_range_is_clamped_and_inverted_range_is_empty() {
        let slider = SliderBounds { min: 1.0, max: 5.0 };
        assert_eq!(effective_range(slider, Some((-3.0, 9.0))), (1.0, 5.0));
        assert_eq!(effective_range(slider, None), (1.0, 5.0));

        let data = sample_datasets();
        let all: Vec<&GrowthRecord> = data.growth.records.iter().collect();
        assert!(filter_by_range(&all, (3.0, 2.0)).is_empty());
    }

    #[test]
    fn filters_are_idempotent() {
        let data = sample_datasets();
        let all: Vec<&GrowthRecord> = data.growth.records.iter().collect();
        let areas = vec!["Corregimiento 60".to_string()];
        let once = filter_by_area(&all, &areas);
        assert_eq!(filter_by_area(&once, &areas), once);

        let picked = vec!["Prado".to_string(), "El Llano".to_string()];
        let once = filter_by_name(&all, &picked);
        assert_eq!(filter_by_name(&once, &picked), once);

        let once = filter_by_range(&all, (0.5, 2.0));
        assert_eq!(filter_by_range(&once, (0.5, 2.0)), once);

        let sel = selection(&["Comuna 1"], &["Popular"], Some((2.5, 3.0)));
        let first = apply_cascade(&data.growth.records, &sel);
        let again = apply_cascade(&data.growth.records, &sel);
        assert_eq!(first.rows, again.rows);
    }

    #[test]
    fn null_keys_pass_without_selection_but_never_match_one() {
        let mut data = sample_datasets();
        data.growth.records[0].area_id = None;
        let all: Vec<&GrowthRecord> = data.growth.records.iter().collect();
        assert_eq!(filter_by_area(&all, &[]).len(), 6);
        assert_eq!(filter_by_area(&all, &["Comuna 1".to_string()]).len(), 2);

        data.growth.records[1].growth_ha = None;
        let all: Vec<&GrowthRecord> = data.growth.records.iter().collect();
        assert_eq!(filter_by_range(&all, (0.0, 100.0)).len(), 5);
    }
}
