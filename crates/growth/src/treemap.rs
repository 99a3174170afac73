//! Squarified treemap layout (Bruls, Huizing & van Wijk).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }
}

/// Worst aspect ratio of a row of `areas` laid along a side of length `side`.
fn worst_ratio(areas: &[f64], side: f64) -> f64 {
    let sum: f64 = areas.iter().sum();
    if sum <= 0.0 || side <= 0.0 {
        return f64::INFINITY;
    }
    let max = areas.iter().copied().fold(f64::MIN, f64::max);
    let min = areas.iter().copied().fold(f64::MAX, f64::min);
    let s2 = side * side;
    let sum2 = sum * sum;
    (s2 * max / sum2).max(sum2 / (s2 * min))
}

/// Places one row along the shorter side of `free` and returns what is left.
fn place_row(row: &[(usize, f64)], free: Rect, out: &mut [Rect]) -> Rect {
    let sum: f64 = row.iter().map(|(_, a)| a).sum();
    if free.w >= free.h {
        let col_w = if free.h > 0.0 { sum / free.h } else { 0.0 };
        let mut y = free.y;
        for &(idx, area) in row {
            let h = if col_w > 0.0 { area / col_w } else { 0.0 };
            out[idx] = Rect::new(free.x, y, col_w, h);
            y += h;
        }
        Rect::new(free.x + col_w, free.y, (free.w - col_w).max(0.0), free.h)
    } else {
        let row_h = if free.w > 0.0 { sum / free.w } else { 0.0 };
        let mut x = free.x;
        for &(idx, area) in row {
            let w = if row_h > 0.0 { area / row_h } else { 0.0 };
            out[idx] = Rect::new(x, free.y, w, row_h);
            x += w;
        }
        Rect::new(free.x, free.y + row_h, free.w, (free.h - row_h).max(0.0))
    }
}

/// Lays `values` out inside `bounds`, returning one rectangle per value in
/// input order. Non-positive values get an empty rectangle at the origin of
/// `bounds`.
pub fn squarify(values: &[f64], bounds: Rect) -> Vec<Rect> {
    let mut out = vec![Rect::new(bounds.x, bounds.y, 0.0, 0.0); values.len()];
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    if total <= 0.0 || bounds.area() <= 0.0 {
        return out;
    }

    let scale = bounds.area() / total;
    let mut order: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > 0.0)
        .map(|(i, v)| (i, v * scale))
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut free = bounds;
    let mut row: Vec<(usize, f64)> = Vec::new();
    let mut row_areas: Vec<f64> = Vec::new();
    let mut next = 0;
    while next < order.len() {
        let side = free.w.min(free.h);
        let item = order[next];
        let current = worst_ratio(&row_areas, side);
        row_areas.push(item.1);
        if row.is_empty() || worst_ratio(&row_areas, side) <= current {
            row.push(item);
            next += 1;
        } else {
            row_areas.pop();
            free = place_row(&row, free, &mut out);
            row.clear();
            row_areas.clear();
        }
    }
    if !row.is_empty() {
        place_row(&row, free, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Rect, squarify};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn classic_example_fills_the_canvas() {
        // The 6x4 example from Bruls et al.
        let values = [6.0, 6.0, 4.0, 3.0, 2.0, 2.0, 1.0];
        let bounds = Rect::new(0.0, 0.0, 6.0, 4.0);
        let rects = squarify(&values, bounds);

        let covered: f64 = rects.iter().map(Rect::area).sum();
        assert_close(covered, 24.0, 1e-9);
        for (rect, value) in rects.iter().zip(values) {
            assert_close(rect.area(), value, 1e-9);
            assert!(rect.x >= -1e-9 && rect.y >= -1e-9);
            assert!(rect.x + rect.w <= 6.0 + 1e-9);
            assert!(rect.y + rect.h <= 4.0 + 1e-9);
        }
        // First two tiles stack into a 3-wide column.
        assert_close(rects[0].w, 3.0, 1e-9);
        assert_close(rects[1].w, 3.0, 1e-9);
    }

    #[test]
    fn areas_are_proportional_in_input_order() {
        let values = [1.0, 5.0, 2.0];
        let rects = squarify(&values, Rect::new(10.0, 20.0, 100.0, 40.0));
        assert_close(rects[0].area(), 500.0, 1e-6);
        assert_close(rects[1].area(), 2500.0, 1e-6);
        assert_close(rects[2].area(), 1000.0, 1e-6);
    }

    #[test]
    fn non_positive_values_get_empty_tiles() {
        let rects = squarify(&[0.0, 3.0, -1.0], Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(rects[0].area(), 0.0);
        assert_eq!(rects[2].area(), 0.0);
        assert_close(rects[1].area(), 4.0, 1e-12);
        assert!(squarify(&[0.0], Rect::new(0.0, 0.0, 1.0, 1.0))[0].area() == 0.0);
    }
}
