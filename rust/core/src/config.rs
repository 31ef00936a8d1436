// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merge parameters.

use serde::{Deserialize, Serialize};
use tilemerge_geometry::Crs;

use crate::error::{Error, Result};

/// Default adjacency/merge radius in metric-CRS units (meters)
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.5;

/// Default minimum piece area
pub const DEFAULT_AREA_THRESHOLD: f64 = 1.0;

/// Default final simplification tolerance, in output-CRS units
pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 1e-6;

/// Coordinate system in which the area filter is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AreaUnits {
    /// Area of the piece as expressed in the source CRS (degrees squared
    /// for EPSG:4326)
    #[default]
    OutputCrs,
    /// Area of the piece after projecting it into the metric CRS
    Metric,
}

/// Parameters of one merge run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Pairs closer than this (metric CRS) are adjacent; also the closing radius
    pub distance_threshold: f64,
    /// Pieces with area not strictly above this are dropped
    pub area_threshold: f64,
    /// Tolerance of the final simplification pass
    pub simplify_tolerance: f64,
    pub area_units: AreaUnits,
    /// CRS of the input shapes and of the output features
    pub source_crs: Crs,
    /// CRS used for every buffer operation
    pub metric_crs: Crs,
    /// Worker count for both parallel phases; `None` uses the rayon default
    pub threads: Option<usize>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            area_threshold: DEFAULT_AREA_THRESHOLD,
            simplify_tolerance: DEFAULT_SIMPLIFY_TOLERANCE,
            area_units: AreaUnits::OutputCrs,
            source_crs: Crs::Epsg4326,
            metric_crs: Crs::Epsg3395,
            threads: None,
        }
    }
}

impl MergeConfig {
    /// Configuration for shapes on a unitless plane, no projection involved
    pub fn planar() -> Self {
        Self {
            source_crs: Crs::Planar,
            metric_crs: Crs::Planar,
            ..Self::default()
        }
    }

    pub fn with_distance_threshold(mut self, distance: f64) -> Self {
        self.distance_threshold = distance;
        self
    }

    pub fn with_area_threshold(mut self, area: f64) -> Self {
        self.area_threshold = area;
        self
    }

    pub fn with_simplify_tolerance(mut self, tolerance: f64) -> Self {
        self.simplify_tolerance = tolerance;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Reject values no run could honour
    pub fn validate(&self) -> Result<()> {
        let check = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(Error::Config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )))
            }
        };

        check("distance_threshold", self.distance_threshold)?;
        check("area_threshold", self.area_threshold)?;
        check("simplify_tolerance", self.simplify_tolerance)?;

        if self.threads == Some(0) {
            return Err(Error::Config("threads must be at least 1".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MergeConfig::default();
        assert_eq!(config.distance_threshold, 0.5);
        assert_eq!(config.area_threshold, 1.0);
        assert_eq!(config.simplify_tolerance, 1e-6);
        assert_eq!(config.source_crs, Crs::Epsg4326);
        assert_eq!(config.metric_crs, Crs::Epsg3395);
        assert_eq!(config.area_units, AreaUnits::OutputCrs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(MergeConfig::default()
            .with_distance_threshold(-1.0)
            .validate()
            .is_err());
        assert!(MergeConfig::default()
            .with_area_threshold(f64::NAN)
            .validate()
            .is_err());
        assert!(MergeConfig::default()
            .with_simplify_tolerance(f64::INFINITY)
            .validate()
            .is_err());
        assert!(MergeConfig::default().with_threads(0).validate().is_err());
        assert!(MergeConfig::default()
            .with_distance_threshold(0.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: MergeConfig = serde_json::from_str(
            r#"{"distance_threshold": 2.0, "metric_crs": "EPSG:3857", "area_units": "metric"}"#,
        )
        .unwrap();

        assert_eq!(config.distance_threshold, 2.0);
        assert_eq!(config.metric_crs, Crs::Epsg3857);
        assert_eq!(config.area_units, AreaUnits::Metric);
        assert_eq!(config.area_threshold, DEFAULT_AREA_THRESHOLD);
    }

    #[test]
    fn test_deserialize_rejects_unknown_crs() {
        let result: std::result::Result<MergeConfig, _> =
            serde_json::from_str(r#"{"metric_crs": "EPSG:99999"}"#);
        assert!(result.is_err());
    }
}
