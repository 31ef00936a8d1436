// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinate Reference Systems and Projection
//!
//! Geographic coordinates (degrees) are not isometric, so a distance given
//! in meters only means something after projecting into a metric CRS. The
//! [`Projector`] carries a geographic/metric pair and moves shapes between
//! them.
//!
//! Supported systems:
//! - EPSG:4326 - WGS84 longitude/latitude in degrees
//! - EPSG:3395 - World Mercator on the WGS84 ellipsoid
//! - EPSG:3857 - Web (spherical) Mercator
//! - Planar - unitless cartesian plane, only projectable onto itself

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;
use std::str::FromStr;

use geo::{Coord, MapCoords, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::shape::Shape;

/// WGS84 semi-major axis in meters
const WGS84_A: f64 = 6_378_137.0;

/// WGS84 first eccentricity
const WGS84_E: f64 = 0.081_819_190_842_621_5;

/// Convergence threshold for the inverse ellipsoidal Mercator (radians)
const INVERSE_EPSILON: f64 = 1e-12;

/// Iteration cap for the inverse ellipsoidal Mercator
const INVERSE_MAX_ITERATIONS: usize = 16;

/// A coordinate reference system known to the projector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Crs {
    /// WGS84 geographic, degrees
    Epsg4326,
    /// World Mercator, meters
    Epsg3395,
    /// Web Mercator, meters
    Epsg3857,
    /// Cartesian plane without a datum
    Planar,
}

impl Crs {
    /// EPSG code, if the system has one
    pub fn epsg_code(&self) -> Option<u32> {
        match self {
            Crs::Epsg4326 => Some(4326),
            Crs::Epsg3395 => Some(3395),
            Crs::Epsg3857 => Some(3857),
            Crs::Planar => None,
        }
    }

    /// OGC URN used in the GeoJSON `crs` member
    pub fn urn(&self) -> String {
        match self {
            Crs::Epsg4326 => "urn:ogc:def:crs:OGC:1.3:CRS84".to_string(),
            Crs::Epsg3395 | Crs::Epsg3857 => {
                format!("urn:ogc:def:crs:EPSG::{}", self.epsg_code().unwrap_or_default())
            }
            Crs::Planar => "planar".to_string(),
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Crs::Epsg4326),
            3395 => Some(Crs::Epsg3395),
            3857 | 900913 => Some(Crs::Epsg3857),
            _ => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg_code() {
            Some(code) => write!(f, "EPSG:{}", code),
            None => write!(f, "PLANAR"),
        }
    }
}

impl FromStr for Crs {
    type Err = Error;

    /// Accepts `EPSG:4326`, `epsg:3395`, `urn:ogc:def:crs:EPSG::3857`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84`, `CRS84` and `planar`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper == "PLANAR" {
            return Ok(Crs::Planar);
        }
        if upper.ends_with("CRS84") {
            return Ok(Crs::Epsg4326);
        }

        // URNs may carry a version segment before the code
        let digits = if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            upper.rsplit(':').next()
        } else {
            upper.strip_prefix("EPSG:")
        };
        let code = digits.and_then(|d| d.parse::<u32>().ok());

        code.and_then(Crs::from_code)
            .ok_or_else(|| Error::UnsupportedCrs(trimmed.to_string()))
    }
}

impl TryFrom<String> for Crs {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

/// Moves shapes between a source CRS and a target CRS
///
/// `project` goes source -> target, `unproject` goes target -> source. When
/// both sides are the same system the projector is the identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    source: Crs,
    target: Crs,
}

impl Projector {
    /// Create a projector, rejecting pairs with no transform between them
    pub fn new(source: Crs, target: Crs) -> Result<Self> {
        if source != target && (source == Crs::Planar || target == Crs::Planar) {
            return Err(Error::UnsupportedCrs(format!(
                "no transform between {} and {}",
                source, target
            )));
        }
        Ok(Self { source, target })
    }

    /// Projector that leaves coordinates untouched
    pub fn identity(crs: Crs) -> Self {
        Self {
            source: crs,
            target: crs,
        }
    }

    #[inline]
    pub fn source(&self) -> Crs {
        self.source
    }

    #[inline]
    pub fn target(&self) -> Crs {
        self.target
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    /// Transform a shape from the source CRS into the target CRS
    pub fn project(&self, shape: &Shape) -> Result<Shape> {
        transform_shape(shape, self.source, self.target)
    }

    /// Transform a shape from the target CRS back into the source CRS
    pub fn unproject(&self, shape: &Shape) -> Result<Shape> {
        transform_shape(shape, self.target, self.source)
    }

    /// Transform a single coordinate from source to target
    pub fn project_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        transform_coord(coord, self.source, self.target)
    }

    /// Transform a single coordinate from target to source
    pub fn unproject_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        transform_coord(coord, self.target, self.source)
    }
}

fn transform_shape(shape: &Shape, from: Crs, to: Crs) -> Result<Shape> {
    if from == to {
        return Ok(shape.clone());
    }

    let transform_polygon = |polygon: &Polygon<f64>| -> Result<Polygon<f64>> {
        polygon.try_map_coords(|coord| transform_coord(coord, from, to))
    };

    match shape {
        Shape::Simple(polygon) => Ok(Shape::Simple(transform_polygon(polygon)?)),
        Shape::Multi(polygons) => Ok(Shape::Multi(
            polygons
                .iter()
                .map(transform_polygon)
                .collect::<Result<Vec<_>>>()?,
        )),
    }
}

/// Route a coordinate through geographic WGS84 when the systems differ
fn transform_coord(coord: Coord<f64>, from: Crs, to: Crs) -> Result<Coord<f64>> {
    if from == to {
        return Ok(coord);
    }

    let geographic = match from {
        Crs::Epsg4326 => coord,
        Crs::Epsg3395 => ellipsoidal_mercator_inverse(coord)?,
        Crs::Epsg3857 => spherical_mercator_inverse(coord)?,
        Crs::Planar => return Err(Error::UnsupportedCrs(format!("{} -> {}", from, to))),
    };

    let out = match to {
        Crs::Epsg4326 => geographic,
        Crs::Epsg3395 => ellipsoidal_mercator_forward(geographic)?,
        Crs::Epsg3857 => spherical_mercator_forward(geographic)?,
        Crs::Planar => return Err(Error::UnsupportedCrs(format!("{} -> {}", from, to))),
    };

    if out.x.is_finite() && out.y.is_finite() {
        Ok(out)
    } else {
        Err(Error::Projection(format!(
            "({}, {}) has no finite image in {}",
            coord.x, coord.y, to
        )))
    }
}

fn check_latitude(coord: Coord<f64>) -> Result<()> {
    if !coord.x.is_finite() || !coord.y.is_finite() || coord.y.abs() >= 90.0 {
        return Err(Error::Projection(format!(
            "latitude {} outside the Mercator domain",
            coord.y
        )));
    }
    Ok(())
}

fn check_finite(coord: Coord<f64>) -> Result<()> {
    if coord.x.is_finite() && coord.y.is_finite() {
        Ok(())
    } else {
        Err(Error::Projection(format!(
            "non-finite coordinate ({}, {})",
            coord.x, coord.y
        )))
    }
}

/// EPSG:4326 -> EPSG:3395
#[inline]
fn ellipsoidal_mercator_forward(coord: Coord<f64>) -> Result<Coord<f64>> {
    check_latitude(coord)?;
    let lambda = coord.x.to_radians();
    let phi = coord.y.to_radians();
    let e_sin = WGS84_E * phi.sin();

    let x = WGS84_A * lambda;
    let y = WGS84_A
        * ((FRAC_PI_4 + phi / 2.0).tan() * ((1.0 - e_sin) / (1.0 + e_sin)).powf(WGS84_E / 2.0))
            .ln();

    Ok(Coord { x, y })
}

/// EPSG:3395 -> EPSG:4326, fixed-point iteration on the conformal latitude
fn ellipsoidal_mercator_inverse(coord: Coord<f64>) -> Result<Coord<f64>> {
    check_finite(coord)?;
    let t = (-coord.y / WGS84_A).exp();
    let mut phi = FRAC_PI_2 - 2.0 * t.atan();

    for _ in 0..INVERSE_MAX_ITERATIONS {
        let e_sin = WGS84_E * phi.sin();
        let next =
            FRAC_PI_2 - 2.0 * (t * ((1.0 - e_sin) / (1.0 + e_sin)).powf(WGS84_E / 2.0)).atan();
        let delta = (next - phi).abs();
        phi = next;
        if delta < INVERSE_EPSILON {
            break;
        }
    }

    Ok(Coord {
        x: (coord.x / WGS84_A).to_degrees(),
        y: phi.to_degrees(),
    })
}

/// EPSG:4326 -> EPSG:3857
#[inline]
fn spherical_mercator_forward(coord: Coord<f64>) -> Result<Coord<f64>> {
    check_latitude(coord)?;
    let phi = coord.y.to_radians();
    Ok(Coord {
        x: WGS84_A * coord.x.to_radians(),
        y: WGS84_A * (FRAC_PI_4 + phi / 2.0).tan().ln(),
    })
}

/// EPSG:3857 -> EPSG:4326
#[inline]
fn spherical_mercator_inverse(coord: Coord<f64>) -> Result<Coord<f64>> {
    check_finite(coord)?;
    Ok(Coord {
        x: (coord.x / WGS84_A).to_degrees(),
        y: (2.0 * (coord.y / WGS84_A).exp().atan() - FRAC_PI_2).to_degrees(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::rectangle;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_crs_identifiers() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::Epsg4326);
        assert_eq!("epsg:3395".parse::<Crs>().unwrap(), Crs::Epsg3395);
        assert_eq!("urn:ogc:def:crs:EPSG::3857".parse::<Crs>().unwrap(), Crs::Epsg3857);
        assert_eq!(
            "urn:ogc:def:crs:OGC:1.3:CRS84".parse::<Crs>().unwrap(),
            Crs::Epsg4326
        );
        assert_eq!("planar".parse::<Crs>().unwrap(), Crs::Planar);

        assert!(matches!(
            "EPSG:27700".parse::<Crs>(),
            Err(Error::UnsupportedCrs(_))
        ));
        assert!("not a crs".parse::<Crs>().is_err());
        assert_eq!(
            "urn:ogc:def:crs:EPSG:6.3:3395".parse::<Crs>().unwrap(),
            Crs::Epsg3395
        );
    }

    #[test]
    fn test_display_round_trips() {
        for crs in [Crs::Epsg4326, Crs::Epsg3395, Crs::Epsg3857, Crs::Planar] {
            assert_eq!(crs.to_string().parse::<Crs>().unwrap(), crs);
        }
    }

    #[test]
    fn test_origin_maps_to_origin() {
        let projector = Projector::new(Crs::Epsg4326, Crs::Epsg3395).unwrap();
        let p = projector.project_coord(Coord { x: 0.0, y: 0.0 }).unwrap();
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_one_degree_of_longitude() {
        let projector = Projector::new(Crs::Epsg4326, Crs::Epsg3395).unwrap();
        let p = projector.project_coord(Coord { x: 1.0, y: 0.0 }).unwrap();
        assert_relative_eq!(p.x, 111_319.490_793_273_6, epsilon = 1e-6);
    }

    #[test]
    fn test_ellipsoid_is_flatter_than_sphere() {
        let world = Projector::new(Crs::Epsg4326, Crs::Epsg3395).unwrap();
        let web = Projector::new(Crs::Epsg4326, Crs::Epsg3857).unwrap();
        let c = Coord { x: 0.0, y: 45.0 };

        let y_world = world.project_coord(c).unwrap().y;
        let y_web = web.project_coord(c).unwrap().y;

        assert!(y_world < y_web);
        assert_relative_eq!(y_web, 5_621_521.486, epsilon = 1e-2);
    }

    #[test]
    fn test_round_trip_world_mercator() {
        let projector = Projector::new(Crs::Epsg4326, Crs::Epsg3395).unwrap();
        for &(lon, lat) in &[(10.0, 45.0), (-122.4, 37.8), (85.3, 27.7), (0.0, -80.0)] {
            let c = Coord { x: lon, y: lat };
            let back = projector
                .unproject_coord(projector.project_coord(c).unwrap())
                .unwrap();
            assert_relative_eq!(back.x, lon, epsilon = 1e-9);
            assert_relative_eq!(back.y, lat, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_between_mercators_goes_through_geographic() {
        let projector = Projector::new(Crs::Epsg3395, Crs::Epsg3857).unwrap();
        let world = Projector::new(Crs::Epsg4326, Crs::Epsg3395).unwrap();
        let c = world.project_coord(Coord { x: 12.0, y: 50.0 }).unwrap();

        let web = projector.project_coord(c).unwrap();
        let back = projector.unproject_coord(web).unwrap();
        assert_relative_eq!(back.x, c.x, epsilon = 1e-6);
        assert_relative_eq!(back.y, c.y, epsilon = 1e-6);
    }

    #[test]
    fn test_pole_is_a_projection_error() {
        let projector = Projector::new(Crs::Epsg4326, Crs::Epsg3395).unwrap();
        let result = projector.project_coord(Coord { x: 0.0, y: 90.0 });
        assert!(matches!(result, Err(Error::Projection(_))));
    }

    #[test]
    fn test_planar_only_projects_onto_itself() {
        assert!(Projector::new(Crs::Planar, Crs::Planar).is_ok());
        assert!(matches!(
            Projector::new(Crs::Epsg4326, Crs::Planar),
            Err(Error::UnsupportedCrs(_))
        ));
    }

    #[test]
    fn test_identity_returns_equal_shape() {
        let shape = Shape::from(rectangle(0.0, 0.0, 1.0, 1.0));
        let projector = Projector::identity(Crs::Planar);
        assert!(projector.is_identity());
        assert_eq!(projector.project(&shape).unwrap(), shape);
        assert_eq!(projector.unproject(&shape).unwrap(), shape);
    }

    #[test]
    fn test_shape_round_trip() {
        let shape = Shape::Multi(vec![
            rectangle(85.30, 27.70, 85.31, 27.71),
            rectangle(85.32, 27.70, 85.33, 27.71),
        ]);
        let projector = Projector::new(Crs::Epsg4326, Crs::Epsg3395).unwrap();
        let projected = projector.project(&shape).unwrap();
        assert!(projected.bounding_box().unwrap().min_x > 9_000_000.0);

        let back = projector.unproject(&projected).unwrap();
        let a = shape.bounding_box().unwrap();
        let b = back.bounding_box().unwrap();
        assert_relative_eq!(a.min_x, b.min_x, epsilon = 1e-9);
        assert_relative_eq!(a.max_y, b.max_y, epsilon = 1e-9);
    }
}
