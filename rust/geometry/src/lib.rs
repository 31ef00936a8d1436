// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tilemerge Geometry
//!
//! The geometry capability the merge engine is built on: a tagged polygon
//! value, an injectable [`GeometryEngine`] (geo for buffer/union/predicates,
//! i_overlay for validity repair) and CRS projection between WGS84 and the
//! Mercator systems used for metric buffering.

pub mod bool2d;
pub mod bounds;
pub mod crs;
pub mod engine;
pub mod error;
pub mod shape;

// Re-export geo types for convenience
pub use geo::{Coord, LineString, MultiPolygon, Polygon};

pub use bounds::BoundingBox;
pub use crs::{Crs, Projector};
pub use engine::{GeoEngine, GeometryEngine};
pub use error::{Error, Result};
pub use shape::{rectangle, Shape};
