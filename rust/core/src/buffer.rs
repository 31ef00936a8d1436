// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Metric buffering of shapes held in a geographic CRS.
//!
//! Every buffer is a round trip: project into the metric CRS, buffer there,
//! project back. A fixed-degree buffer would mean a different real distance
//! at every latitude.

use tilemerge_geometry::{GeometryEngine, Projector, Shape};

use crate::error::Result;

/// Buffer by a fixed metric distance through a projector
pub struct MetricBuffer<'a, E: GeometryEngine + ?Sized> {
    engine: &'a E,
    projector: &'a Projector,
    distance: f64,
}

impl<'a, E: GeometryEngine + ?Sized> MetricBuffer<'a, E> {
    pub fn new(engine: &'a E, projector: &'a Projector, distance: f64) -> Self {
        Self {
            engine,
            projector,
            distance,
        }
    }

    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Grow `shape` outward by the distance
    pub fn expand(&self, shape: &Shape) -> Result<Shape> {
        self.buffered(shape, self.distance)
    }

    /// Shrink `shape` inward by the distance
    pub fn shrink(&self, shape: &Shape) -> Result<Shape> {
        self.buffered(shape, -self.distance)
    }

    /// Area of `shape` measured in the metric CRS
    pub fn metric_area(&self, shape: &Shape) -> Result<f64> {
        let projected = self.projector.project(shape)?;
        Ok(self.engine.area(&projected))
    }

    fn buffered(&self, shape: &Shape, distance: f64) -> Result<Shape> {
        if distance == 0.0 {
            return Ok(shape.clone());
        }

        let projected = self.projector.project(shape)?;
        let buffered = self.engine.buffer(&projected, distance);
        Ok(self.projector.unproject(&buffered)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tilemerge_geometry::{rectangle, Crs, GeoEngine};

    #[test]
    fn test_planar_expand_matches_engine_buffer() {
        let engine = GeoEngine::new();
        let projector = Projector::identity(Crs::Planar);
        let buffer = MetricBuffer::new(&engine, &projector, 0.5);
        let square = Shape::from(rectangle(0.0, 0.0, 1.0, 1.0));

        let grown = buffer.expand(&square).unwrap();
        assert_eq!(grown, engine.buffer(&square, 0.5));

        let closed = buffer.shrink(&grown).unwrap();
        assert_relative_eq!(closed.area(), 1.0, epsilon = 1e-2);
    }

    #[test]
    fn test_geographic_buffer_is_metric() {
        let engine = GeoEngine::new();
        let projector = Projector::new(Crs::Epsg4326, Crs::Epsg3395).unwrap();
        let buffer = MetricBuffer::new(&engine, &projector, 100.0);

        // ~100m square near Kathmandu
        let square = Shape::from(rectangle(85.3000, 27.7000, 85.3010, 27.7009));
        let grown = buffer.expand(&square).unwrap();

        let before = square.bounding_box().unwrap();
        let after = grown.bounding_box().unwrap();

        // x is linear in longitude on Mercator: 100 m = 100 / (a * pi / 180) degrees
        let expected = 100.0 / (6_378_137.0 * std::f64::consts::PI / 180.0);
        assert_relative_eq!(before.min_x - after.min_x, expected, max_relative = 1e-3);
        assert_relative_eq!(after.max_x - before.max_x, expected, max_relative = 1e-3);

        // latitude growth is smaller than longitude growth away from the equator
        assert!(after.max_y - before.max_y < expected);
        assert!(after.max_y - before.max_y > 0.0);
    }

    #[test]
    fn test_zero_distance_is_identity() {
        let engine = GeoEngine::new();
        let projector = Projector::new(Crs::Epsg4326, Crs::Epsg3395).unwrap();
        let buffer = MetricBuffer::new(&engine, &projector, 0.0);
        let square = Shape::from(rectangle(10.0, 10.0, 10.001, 10.001));

        assert_eq!(buffer.expand(&square).unwrap(), square);
        assert_eq!(buffer.shrink(&square).unwrap(), square);
    }

    #[test]
    fn test_projection_failure_propagates() {
        let engine = GeoEngine::new();
        let projector = Projector::new(Crs::Epsg4326, Crs::Epsg3395).unwrap();
        let buffer = MetricBuffer::new(&engine, &projector, 1.0);
        let polar = Shape::from(rectangle(0.0, 89.0, 1.0, 90.0));

        assert!(buffer.expand(&polar).is_err());
    }
}
