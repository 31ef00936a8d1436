// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GeoJSON feature collections.
//!
//! Only what the merge needs: Polygon and MultiPolygon geometries in, simple
//! Polygons out, and the legacy named `crs` member so that the coordinate
//! system travels with the file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tilemerge_core::MergedFeature;
use tilemerge_geometry::{Coord, Crs, LineString, Polygon, Shape};
use tracing::warn;

use crate::error::{Error, Result};

/// A GeoJSON position; elevation and extra ordinates are ignored
pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<NamedCrs>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    #[serde(other)]
    Unsupported,
}

/// `{"type": "name", "properties": {"name": "urn:ogc:def:crs:..."}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCrs {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: NamedCrsProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCrsProperties {
    pub name: String,
}

impl NamedCrs {
    pub fn new(crs: Crs) -> Self {
        Self {
            kind: "name".to_string(),
            properties: NamedCrsProperties { name: crs.urn() },
        }
    }
}

impl FeatureCollection {
    /// Declared CRS, WGS84 when the member is absent
    pub fn crs(&self) -> Result<Crs> {
        match &self.crs {
            Some(named) => Ok(named.properties.name.parse::<Crs>()?),
            None => Ok(Crs::Epsg4326),
        }
    }

    /// Flatten every feature into simple polygons, in file order
    ///
    /// Features with a null geometry are skipped; any other non-polygonal
    /// geometry is an error.
    pub fn to_shapes(&self) -> Result<Vec<Shape>> {
        let mut shapes = Vec::with_capacity(self.features.len());

        for (index, feature) in self.features.iter().enumerate() {
            match &feature.geometry {
                None => warn!(index, "Skipping feature without geometry"),
                Some(Geometry::Polygon { coordinates }) => {
                    shapes.push(Shape::Simple(polygon_from_rings(index, coordinates)?));
                }
                Some(Geometry::MultiPolygon { coordinates }) => {
                    for rings in coordinates {
                        shapes.push(Shape::Simple(polygon_from_rings(index, rings)?));
                    }
                }
                Some(Geometry::Unsupported) => {
                    return Err(Error::InvalidFeature {
                        index,
                        reason: "geometry is not a Polygon or MultiPolygon".to_string(),
                    });
                }
            }
        }

        Ok(shapes)
    }

    /// Collection of merged features tagged with `crs`
    pub fn from_features(features: &[MergedFeature], crs: Crs) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            crs: Some(NamedCrs::new(crs)),
            features: features.iter().map(Feature::from_merged).collect(),
        }
    }
}

impl Feature {
    fn from_merged(feature: &MergedFeature) -> Self {
        let mut properties = Map::new();
        properties.insert("area".to_string(), Value::from(feature.area));
        properties.insert("component".to_string(), Value::from(feature.component));
        properties.insert("sources".to_string(), Value::from(feature.sources));

        Self {
            kind: "Feature".to_string(),
            properties: Some(properties),
            geometry: Some(Geometry::Polygon {
                coordinates: polygon_to_rings(&feature.polygon),
            }),
        }
    }
}

fn polygon_from_rings(index: usize, rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| ring_from_positions(index, ring));

    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => {
            return Err(Error::InvalidFeature {
                index,
                reason: "polygon has no exterior ring".to_string(),
            })
        }
    };
    let interiors = rings.collect::<Result<Vec<_>>>()?;

    Ok(Polygon::new(exterior, interiors))
}

fn ring_from_positions(index: usize, positions: &[Position]) -> Result<LineString<f64>> {
    let coords = positions
        .iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
            _ => Err(Error::InvalidFeature {
                index,
                reason: format!("bad position {:?}", p),
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    if coords.len() < 3 {
        return Err(Error::InvalidFeature {
            index,
            reason: format!("ring has {} positions, need at least 3", coords.len()),
        });
    }

    Ok(LineString::new(coords))
}

fn polygon_to_rings(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.0.iter().map(|c| vec![c.x, c.y]).collect())
        .collect()
}
