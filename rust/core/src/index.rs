// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounding-box index over the input shapes.
//!
//! Bulk-loaded once into an R-tree and read-only afterwards, so concurrent
//! queries from the adjacency workers need no locking. Queries return every
//! id whose box intersects the query box: no false negatives, possibly
//! false positives.

use rstar::{RTree, RTreeObject, AABB};
use tilemerge_geometry::{BoundingBox, GeometryEngine, Shape};

use crate::graph::VertexId;

/// An indexed bounding box for R-tree storage.
#[derive(Debug, Clone, Copy)]
pub struct IndexedBounds {
    /// Box of the shape
    pub bounds: BoundingBox,
    /// Position of the shape in the input list
    pub id: VertexId,
}

impl RTreeObject for IndexedBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bounds.min(), self.bounds.max())
    }
}

/// R-tree of input bounding boxes keyed by [`VertexId`]
pub struct SpatialIndex {
    tree: RTree<IndexedBounds>,
}

impl SpatialIndex {
    /// Bulk-load the boxes of all shapes. Empty shapes have no box and are
    /// never returned by a query.
    pub fn build<E: GeometryEngine + ?Sized>(shapes: &[Shape], engine: &E) -> Self {
        let indexed: Vec<IndexedBounds> = shapes
            .iter()
            .enumerate()
            .filter_map(|(id, shape)| {
                engine
                    .bounding_box(shape)
                    .map(|bounds| IndexedBounds { bounds, id })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    /// Ids whose box intersects `query`, boundaries included
    pub fn query(&self, query: &BoundingBox) -> Vec<VertexId> {
        let envelope = AABB::from_corners(query.min(), query.max());
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.id)
            .collect()
    }

    /// Number of indexed boxes
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilemerge_geometry::{rectangle, GeoEngine};

    fn grid(n: usize) -> Vec<Shape> {
        let mut shapes = Vec::new();
        for row in 0..n {
            for col in 0..n {
                let x = col as f64 * 2.0;
                let y = row as f64 * 2.0;
                shapes.push(Shape::from(rectangle(x, y, x + 1.0, y + 1.0)));
            }
        }
        shapes
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::build(&[], &GeoEngine::new());
        assert!(index.is_empty());
        assert!(index.query(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_query_finds_overlapping_boxes() {
        let shapes = grid(3);
        let index = SpatialIndex::build(&shapes, &GeoEngine::new());
        assert_eq!(index.len(), 9);

        let mut hits = index.query(&BoundingBox::new(0.5, 0.5, 2.5, 0.8));
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn test_query_includes_touching_boxes() {
        let shapes = grid(2);
        let index = SpatialIndex::build(&shapes, &GeoEngine::new());

        let hits = index.query(&BoundingBox::new(1.0, 0.0, 2.0, 1.0));
        assert!(hits.contains(&0));
        assert!(hits.contains(&1));
    }

    #[test]
    fn test_no_false_negatives_against_brute_force() {
        let shapes = grid(6);
        let engine = GeoEngine::new();
        let index = SpatialIndex::build(&shapes, &engine);

        let query = BoundingBox::new(3.2, 1.7, 8.9, 6.1);
        let mut expected: Vec<VertexId> = shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.bounding_box().unwrap().intersects(&query))
            .map(|(i, _)| i)
            .collect();
        let mut actual = index.query(&query);

        expected.sort_unstable();
        actual.sort_unstable();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_empty_shapes_are_not_indexed() {
        let shapes = vec![Shape::empty(), Shape::from(rectangle(0.0, 0.0, 1.0, 1.0))];
        let index = SpatialIndex::build(&shapes, &GeoEngine::new());
        assert_eq!(index.len(), 1);
        assert_eq!(index.query(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)), vec![1]);
    }
}
