// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygonal geometry values.
//!
//! Every geometry operation returns a new [`Shape`]; nothing is mutated in
//! place. Callers branch on the variant explicitly instead of inspecting the
//! runtime type of a result.

use geo::{Area, BoundingRect, MultiPolygon, Polygon};

use crate::bounds::BoundingBox;

/// A simple polygon or a collection of simple polygons
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Simple(Polygon<f64>),
    Multi(Vec<Polygon<f64>>),
}

impl Shape {
    /// An empty multi-polygon
    pub fn empty() -> Self {
        Shape::Multi(Vec::new())
    }

    /// Collapse a `MultiPolygon` result into the tightest variant
    pub fn from_multi(multi: MultiPolygon<f64>) -> Self {
        let mut polygons = multi.0;
        if polygons.len() == 1 {
            Shape::Simple(polygons.remove(0))
        } else {
            Shape::Multi(polygons)
        }
    }

    /// True if there is no polygon, or no polygon has an exterior ring
    pub fn is_empty(&self) -> bool {
        match self {
            Shape::Simple(polygon) => polygon.exterior().0.is_empty(),
            Shape::Multi(polygons) => polygons.iter().all(|p| p.exterior().0.is_empty()),
        }
    }

    /// Number of simple polygons held
    pub fn polygon_count(&self) -> usize {
        match self {
            Shape::Simple(_) => 1,
            Shape::Multi(polygons) => polygons.len(),
        }
    }

    /// Explode into individual simple polygons
    pub fn explode(self) -> Vec<Polygon<f64>> {
        match self {
            Shape::Simple(polygon) => vec![polygon],
            Shape::Multi(polygons) => polygons,
        }
    }

    /// Borrowing iterator over the simple polygons
    pub fn polygons(&self) -> std::slice::Iter<'_, Polygon<f64>> {
        match self {
            Shape::Simple(polygon) => std::slice::from_ref(polygon).iter(),
            Shape::Multi(polygons) => polygons.iter(),
        }
    }

    /// Convert to a `MultiPolygon` for the geo kernel
    pub fn to_multi(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.polygons().cloned().collect())
    }

    /// Planar area in the units of the current coordinates
    pub fn area(&self) -> f64 {
        match self {
            Shape::Simple(polygon) => polygon.unsigned_area(),
            Shape::Multi(polygons) => polygons.iter().map(|p| p.unsigned_area()).sum(),
        }
    }

    /// Bounding box, or `None` for an empty shape
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            Shape::Simple(polygon) => polygon.bounding_rect().map(BoundingBox::from),
            Shape::Multi(polygons) => polygons
                .iter()
                .filter_map(|p| p.bounding_rect())
                .map(BoundingBox::from)
                .reduce(|a, b| a.merge(&b)),
        }
    }
}

impl From<Polygon<f64>> for Shape {
    fn from(polygon: Polygon<f64>) -> Self {
        Shape::Simple(polygon)
    }
}

impl From<MultiPolygon<f64>> for Shape {
    fn from(multi: MultiPolygon<f64>) -> Self {
        Shape::from_multi(multi)
    }
}

/// Axis-aligned rectangle polygon, mostly useful for tiles and tests
pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    Polygon::new(
        vec![
            (min_x, min_y),
            (max_x, min_y),
            (max_x, max_y),
            (min_x, max_y),
            (min_x, min_y),
        ]
        .into(),
        vec![],
    )
}
