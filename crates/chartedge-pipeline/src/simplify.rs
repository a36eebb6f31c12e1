//! Closed-polygon simplification using the Ramer-Douglas-Peucker
//! algorithm.
//!
//! Traced contours are closed rings with no designated endpoints, so the
//! ring is first split at the vertex farthest from its first point and
//! each half is simplified as an open chain. Both split vertices are
//! always kept.

use crate::types::{Point, Polyline};

/// Simplify a closed contour so no removed vertex lies farther than
/// `epsilon` pixels from the simplified outline.
///
/// Contours with fewer than 3 points are returned unchanged.
#[must_use = "returns the simplified polygon"]
pub fn simplify_closed(contour: &Polyline, epsilon: f64) -> Polyline {
    let points = contour.points();
    let n = points.len();
    if n < 3 {
        return contour.clone();
    }

    let first = points[0];
    let split = (1..n)
        .max_by(|&a, &b| {
            first
                .distance_squared(points[a])
                .total_cmp(&first.distance_squared(points[b]))
        })
        .unwrap_or(n / 2);

    // Close the ring so the second half runs split -> ... -> first.
    let mut ring = points.to_vec();
    ring.push(first);

    let mut kept = vec![false; ring.len()];
    kept[0] = true;
    kept[split] = true;
    rdp_recurse(&ring, 0, split, epsilon, &mut kept);
    rdp_recurse(&ring, split, n, epsilon, &mut kept);

    let simplified: Vec<Point> = ring[..n]
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    Polyline::new(simplified)
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
