// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::geometry::{CellBounds, Point, Ray};

/// Absolute tolerance for merging candidate points.
pub const POINT_TOLERANCE: f64 = 1e-9;

/// Length of the part of `ray` lying inside `cell`.
///
/// Axis-aligned rays are clipped against the cell span directly. Oblique rays
/// collect candidate points in a fixed order (left edge, right edge, top edge,
/// bottom edge, then segment endpoints strictly inside the cell), merge them
/// within [`POINT_TOLERANCE`], and return the distance between the first two
/// distinct points. Fewer than two points gives 0.
pub fn intersection_length(ray: &Ray, cell: &CellBounds) -> f64 {
    let Point { x: x1, y: y1 } = ray.start;
    let Point { x: x2, y: y2 } = ray.end;

    if x1 == x2 {
        if cell.owns_x(x1) {
            return span_overlap(y1, y2, cell.y_top, cell.y_bottom);
        }
        return 0.0;
    }

    if y1 == y2 {
        if cell.owns_y(y1) {
            return span_overlap(x1, x2, cell.x_left, cell.x_right);
        }
        return 0.0;
    }

    oblique_length(ray, cell)
}

/// Overlap of `[min(a1, a2), max(a1, a2)]` with `[lo, hi]`, or 0 if it is empty.
fn span_overlap(a1: f64, a2: f64, lo: f64, hi: f64) -> f64 {
    let enter = a1.min(a2).max(lo);
    let exit = a1.max(a2).min(hi);
    if enter < exit {
        exit - enter
    } else {
        0.0
    }
}

/// Closed interval of ray parameters between two boundary crossings.
#[derive(Debug, Clone, Copy)]
struct Slab {
    lo: f64,
    hi: f64,
}

impl Slab {
    fn new(a: f64, b: f64) -> Self {
        Slab {
            lo: a.min(b),
            hi: a.max(b),
        }
    }

    #[inline]
    fn contains(&self, t: f64) -> bool {
        self.lo <= t && t <= self.hi
    }
}

fn push_distinct(points: &mut Vec<Point>, p: Point) {
    let duplicate = points.iter().any(|q| {
        (q.x - p.x).abs() <= POINT_TOLERANCE && (q.y - p.y).abs() <= POINT_TOLERANCE
    });
    if !duplicate {
        points.push(p);
    }
}

// Candidates are accepted by their ray parameter t in [0, 1]. A boundary
// shared by two cells yields the same t in both, so neighbouring cells split
// the ray at exactly the same point.
fn oblique_length(ray: &Ray, cell: &CellBounds) -> f64 {
    let Point { x: x1, y: y1 } = ray.start;
    let dx = ray.end.x - x1;
    let dy = ray.end.y - y1;

    let t_left = (cell.x_left - x1) / dx;
    let t_right = (cell.x_right - x1) / dx;
    let t_top = (cell.y_top - y1) / dy;
    let t_bottom = (cell.y_bottom - y1) / dy;

    let segment = Slab::new(0.0, 1.0);
    let columns = Slab::new(t_left, t_right);
    let rows = Slab::new(t_top, t_bottom);

    let mut points = Vec::with_capacity(6);

    // Left, then right
    for (x_edge, t) in [(cell.x_left, t_left), (cell.x_right, t_right)] {
        if segment.contains(t) && rows.contains(t) {
            push_distinct(&mut points, Point::new(x_edge, y1 + t * dy));
        }
    }

    // Top, then bottom
    for (y_edge, t) in [(cell.y_top, t_top), (cell.y_bottom, t_bottom)] {
        if segment.contains(t) && columns.contains(t) {
            push_distinct(&mut points, Point::new(x1 + t * dx, y_edge));
        }
    }

    for p in [ray.start, ray.end] {
        let inside = cell.x_left < p.x
            && p.x < cell.x_right
            && cell.y_top < p.y
            && p.y < cell.y_bottom;
        if inside {
            push_distinct(&mut points, p);
        }
    }

    if points.len() >= 2 {
        points[0].distance(&points[1])
    } else {
        0.0
    }
}
