// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Validity Repair
//!
//! Resolves self-intersections, overlapping parts and degenerate rings with
//! the i_overlay crate. Rings are oriented (outer counter-clockwise, holes
//! clockwise) and the whole set is run through a non-zero union against an
//! empty clip, which rebuilds clean, non-overlapping contours.

use geo::{Coord, LineString, Polygon};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;

/// Minimum area threshold - contours smaller than this are considered degenerate
const MIN_AREA_THRESHOLD: f64 = 1e-18;

/// Repair a set of polygons into valid, non-overlapping simple polygons
///
/// Parts that overlap are fused, bow-tie rings are split into their lobes
/// and zero-area slivers disappear. An empty result means nothing polygonal
/// survived.
pub fn repair_polygons(polygons: &[Polygon<f64>]) -> Vec<Polygon<f64>> {
    let subject: Vec<Vec<[f64; 2]>> = polygons.iter().flat_map(polygon_to_paths).collect();

    if subject.is_empty() {
        return Vec::new();
    }

    let clip: Vec<Vec<[f64; 2]>> = Vec::new();
    let result = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);

    shapes_to_polygons(result)
}

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn compute_signed_area(contour: &[[f64; 2]]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = contour.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i][0] * contour[j][1];
        area -= contour[j][0] * contour[i][1];
    }

    area * 0.5
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

/// Outer ring counter-clockwise, holes clockwise, closing point dropped
fn polygon_to_paths(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    let mut paths = Vec::with_capacity(1 + polygon.interiors().len());

    if let Some(outer) = ring_to_path(polygon.exterior(), true) {
        paths.push(outer);
    } else {
        return paths;
    }

    for hole in polygon.interiors() {
        if let Some(path) = ring_to_path(hole, false) {
            paths.push(path);
        }
    }

    paths
}

fn ring_to_path(ring: &LineString<f64>, ccw: bool) -> Option<Vec<[f64; 2]>> {
    let mut path: Vec<[f64; 2]> = ring
        .0
        .iter()
        .filter(|c| c.x.is_finite() && c.y.is_finite())
        .map(|c| [c.x, c.y])
        .collect();

    if path.len() > 1 && path.first() == path.last() {
        path.pop();
    }

    if path.len() < 3 {
        return None;
    }

    // A bow-tie nets to zero area but still has two lobes to keep
    let area = compute_signed_area(&path);
    if (ccw && area < 0.0) || (!ccw && area > 0.0) {
        path.reverse();
    }

    Some(path)
}

/// Each i_overlay shape is a list of contours: the first is the outer
/// boundary, the rest are holes
fn shapes_to_polygons(shapes: Vec<Vec<Vec<[f64; 2]>>>) -> Vec<Polygon<f64>> {
    let mut polygons = Vec::with_capacity(shapes.len());

    for shape in shapes {
        let mut contours = shape
            .into_iter()
            .filter(|c| c.len() >= 3 && compute_signed_area(c).abs() > MIN_AREA_THRESHOLD);

        let outer = match contours.next() {
            Some(outer) => outer,
            None => continue,
        };

        let holes: Vec<LineString<f64>> = contours.map(path_to_ring).collect();
        polygons.push(Polygon::new(path_to_ring(outer), holes));
    }

    polygons
}

fn path_to_ring(path: Vec<[f64; 2]>) -> LineString<f64> {
    LineString::new(path.into_iter().map(|[x, y]| Coord { x, y }).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::rectangle;
    use approx::assert_relative_eq;
    use geo::Area;

    fn total_area(polygons: &[Polygon<f64>]) -> f64 {
        polygons.iter().map(|p| p.unsigned_area()).sum()
    }

    #[test]
    fn test_signed_area_orientation() {
        let ccw = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let cw = [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]];
        assert_relative_eq!(compute_signed_area(&ccw), 1.0);
        assert_relative_eq!(compute_signed_area(&cw), -1.0);
    }

    #[test]
    fn test_valid_polygon_is_preserved() {
        let repaired = repair_polygons(&[rectangle(0.0, 0.0, 2.0, 3.0)]);
        assert_eq!(repaired.len(), 1);
        assert_relative_eq!(total_area(&repaired), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_overlapping_parts_are_fused() {
        let repaired = repair_polygons(&[
            rectangle(0.0, 0.0, 2.0, 2.0),
            rectangle(1.0, 0.0, 3.0, 2.0),
        ]);
        assert_eq!(repaired.len(), 1);
        assert_relative_eq!(total_area(&repaired), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hole_survives_repair() {
        let outer = rectangle(0.0, 0.0, 4.0, 4.0);
        let hole = rectangle(1.0, 1.0, 2.0, 2.0);
        let polygon = Polygon::new(outer.exterior().clone(), vec![hole.exterior().clone()]);

        let repaired = repair_polygons(&[polygon]);
        assert_eq!(repaired.len(), 1);
        assert_eq!(repaired[0].interiors().len(), 1);
        assert_relative_eq!(total_area(&repaired), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bow_tie_is_split() {
        // Self-intersecting at (1, 1)
        let bow_tie = Polygon::new(
            vec![(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0), (0.0, 0.0)].into(),
            vec![],
        );

        let repaired = repair_polygons(&[bow_tie]);
        assert_eq!(repaired.len(), 2);
        assert_relative_eq!(total_area(&repaired), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_ring_is_dropped() {
        let line = Polygon::new(
            vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.0, 0.0)].into(),
            vec![],
        );
        assert!(repair_polygons(&[line]).is_empty());
        assert!(repair_polygons(&[]).is_empty());
    }
}
