use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::table::GrowthRecord;

/// Bars kept in each ranked chart.
pub const TOP_N: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub name: String,
    pub value: f64,
}

/// Sums `value` per sub-area name. Rows without a name are dropped and
/// missing values count as zero. Output is ordered by name.
pub fn sum_by_name<'a>(
    rows: impl IntoIterator<Item = &'a GrowthRecord>,
    value: impl Fn(&GrowthRecord) -> Option<f64>,
) -> Vec<GroupTotal> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        let Some(name) = row.name.as_deref() else {
            continue;
        };
        *totals.entry(name).or_insert(0.0) += value(row).unwrap_or(0.0);
    }
    totals
        .into_iter()
        .map(|(name, value)| GroupTotal {
            name: name.to_string(),
            value,
        })
        .collect()
}

/// The `n` largest totals, descending. Ties keep name order.
pub fn top_n_desc(mut totals: Vec<GroupTotal>, n: usize) -> Vec<GroupTotal> {
    totals.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    totals.truncate(n);
    totals
}
