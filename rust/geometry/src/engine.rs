// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Engine
//!
//! The merge engine never touches a geometric kernel directly. It is handed a
//! [`GeometryEngine`] and only calls these operations, all of which take
//! shapes by reference and return new values.

use geo::{BooleanOps, Buffer, Intersects, Simplify};

use crate::bool2d::repair_polygons;
use crate::bounds::BoundingBox;
use crate::shape::Shape;

/// Computational-geometry capability injected into the merge engine
///
/// Implementations must be safe to share between worker threads.
pub trait GeometryEngine: Send + Sync {
    /// Grow (positive) or shrink (negative) a shape by `distance` in the
    /// units of its coordinates
    fn buffer(&self, shape: &Shape, distance: f64) -> Shape;

    /// Union of two shapes
    fn union(&self, a: &Shape, b: &Shape) -> Shape;

    /// True if the shapes share any point, boundaries included
    fn intersects(&self, a: &Shape, b: &Shape) -> bool;

    /// Rebuild a well-formed shape; may come back empty
    fn repair_validity(&self, shape: &Shape) -> Shape;

    /// Reduce vertex count within `tolerance`
    fn simplify(&self, shape: &Shape, tolerance: f64) -> Shape;

    fn bounding_box(&self, shape: &Shape) -> Option<BoundingBox> {
        shape.bounding_box()
    }

    fn area(&self, shape: &Shape) -> f64 {
        shape.area()
    }
}

/// Default engine backed by the geo crate, with i_overlay validity repair
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoEngine;

impl GeoEngine {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryEngine for GeoEngine {
    fn buffer(&self, shape: &Shape, distance: f64) -> Shape {
        if distance == 0.0 || shape.is_empty() {
            return shape.clone();
        }

        let buffered = match shape {
            Shape::Simple(polygon) => polygon.buffer(distance),
            Shape::Multi(_) => shape.to_multi().buffer(distance),
        };
        Shape::from_multi(buffered)
    }

    fn union(&self, a: &Shape, b: &Shape) -> Shape {
        if a.is_empty() {
            return b.clone();
        }
        if b.is_empty() {
            return a.clone();
        }

        let merged = match (a, b) {
            (Shape::Simple(p), Shape::Simple(q)) => p.union(q),
            _ => a.to_multi().union(&b.to_multi()),
        };
        Shape::from_multi(merged)
    }

    fn intersects(&self, a: &Shape, b: &Shape) -> bool {
        a.polygons()
            .any(|p| b.polygons().any(|q| p.intersects(q)))
    }

    fn repair_validity(&self, shape: &Shape) -> Shape {
        let mut repaired = match shape {
            Shape::Simple(polygon) => repair_polygons(std::slice::from_ref(polygon)),
            Shape::Multi(polygons) => repair_polygons(polygons),
        };

        if repaired.len() == 1 {
            Shape::Simple(repaired.remove(0))
        } else {
            Shape::Multi(repaired)
        }
    }

    fn simplify(&self, shape: &Shape, tolerance: f64) -> Shape {
        if tolerance <= 0.0 {
            return shape.clone();
        }

        match shape {
            Shape::Simple(polygon) => Shape::Simple(polygon.simplify(tolerance)),
            Shape::Multi(polygons) => {
                Shape::Multi(polygons.iter().map(|p| p.simplify(tolerance)).collect())
            }
        }
    }
}
