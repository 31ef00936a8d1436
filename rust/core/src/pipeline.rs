// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merge orchestration.
//!
//! Phases, each finished before the next starts:
//! 1. bulk-load the spatial index
//! 2. build the adjacency graph (parallel per shape)
//! 3. compute components and check they partition the input
//! 4. merge components (parallel per component)
//! 5. simplify every output polygon

use std::time::Instant;

use tilemerge_geometry::{GeoEngine, GeometryEngine, Projector, Shape};
use tracing::{info, warn};

use crate::adjacency::AdjacencyGraphBuilder;
use crate::buffer::MetricBuffer;
use crate::config::MergeConfig;
use crate::error::{Error, Result};
use crate::graph::check_partition;
use crate::index::SpatialIndex;
use crate::merger::{ComponentMerger, MergedFeature};
use crate::progress::{NoProgress, Progress};

/// Counters describing one merge run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub input_shapes: usize,
    /// Undirected edges between distinct shapes
    pub edges: usize,
    pub components: usize,
    pub largest_component: usize,
    pub output_features: usize,
    pub dropped_by_area: usize,
    pub dropped_by_repair: usize,
}

/// Features of one run, in the source CRS
#[derive(Debug, Clone, Default)]
pub struct MergeOutput {
    pub features: Vec<MergedFeature>,
    pub stats: MergeStats,
}

/// Runs the whole merge over an in-memory shape list
pub struct MergePipeline<E: GeometryEngine = GeoEngine> {
    config: MergeConfig,
    projector: Projector,
    engine: E,
}

impl MergePipeline<GeoEngine> {
    /// Pipeline using the default geo-backed engine
    pub fn new(config: MergeConfig) -> Result<Self> {
        Self::with_engine(config, GeoEngine::new())
    }
}

impl<E: GeometryEngine> MergePipeline<E> {
    /// Pipeline using a caller-supplied geometry engine
    ///
    /// Fails on invalid parameters or an unsupported CRS pair before any
    /// work is done.
    pub fn with_engine(config: MergeConfig, engine: E) -> Result<Self> {
        config.validate()?;
        let projector = Projector::new(config.source_crs, config.metric_crs)?;
        Ok(Self {
            config,
            projector,
            engine,
        })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Source/metric CRS pair every buffer goes through
    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn run(&self, shapes: &[Shape]) -> Result<MergeOutput> {
        self.run_with_progress(shapes, &NoProgress)
    }

    /// Run all phases, inside a dedicated thread pool when one is configured
    pub fn run_with_progress(
        &self,
        shapes: &[Shape],
        progress: &dyn Progress,
    ) -> Result<MergeOutput> {
        match self.config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| Error::ThreadPool(e.to_string()))?;
                pool.install(|| self.run_phases(shapes, progress))
            }
            None => self.run_phases(shapes, progress),
        }
    }

    fn run_phases(&self, shapes: &[Shape], progress: &dyn Progress) -> Result<MergeOutput> {
        let start = Instant::now();
        let mut stats = MergeStats {
            input_shapes: shapes.len(),
            ..MergeStats::default()
        };

        if shapes.is_empty() {
            warn!("No input shapes, nothing to merge");
            return Ok(MergeOutput {
                features: Vec::new(),
                stats,
            });
        }

        let buffer = MetricBuffer::new(&self.engine, &self.projector, self.config.distance_threshold);

        let index = SpatialIndex::build(shapes, &self.engine);
        let adjacency =
            AdjacencyGraphBuilder::new(&self.engine, &buffer, &index).build(shapes, progress)?;
        drop(index);

        let components = adjacency.graph.components();
        check_partition(&components, shapes.len())?;

        stats.edges = adjacency.graph.edge_count();
        stats.components = components.len();
        stats.largest_component = components.iter().map(|c| c.len()).max().unwrap_or(0);

        let merger = ComponentMerger::new(
            &self.engine,
            &buffer,
            self.config.area_threshold,
            self.config.area_units,
        );
        let merged = merger.merge_all(&components, &adjacency.buffered, progress)?;

        let features = merged
            .features
            .into_iter()
            .map(|feature| self.simplified(feature, &merger))
            .collect::<Result<Vec<_>>>()?;

        stats.output_features = features.len();
        stats.dropped_by_area = merged.dropped_by_area;
        stats.dropped_by_repair = merged.dropped_by_repair;

        info!(
            input = stats.input_shapes,
            components = stats.components,
            largest = stats.largest_component,
            output = stats.output_features,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Merge finished"
        );

        Ok(MergeOutput { features, stats })
    }

    /// Simplified polygon with its area remeasured, or the original if
    /// simplification collapsed it
    fn simplified(
        &self,
        feature: MergedFeature,
        merger: &ComponentMerger<'_, E>,
    ) -> Result<MergedFeature> {
        let shape = Shape::Simple(feature.polygon.clone());

        match self.engine.simplify(&shape, self.config.simplify_tolerance) {
            Shape::Simple(polygon) if polygon.exterior().0.len() >= 4 => {
                let area = merger.piece_area(&polygon)?;
                Ok(MergedFeature {
                    polygon,
                    area,
                    ..feature
                })
            }
            _ => Ok(feature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AreaUnits;
    use approx::assert_relative_eq;
    use tilemerge_geometry::{rectangle, Crs, Polygon};

    #[test]
    fn test_rejects_invalid_config() {
        let config = MergeConfig::planar().with_distance_threshold(-0.5);
        assert!(matches!(MergePipeline::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_unprojectable_pair() {
        let config = MergeConfig {
            source_crs: Crs::Epsg4326,
            metric_crs: Crs::Planar,
            ..MergeConfig::default()
        };
        assert!(matches!(MergePipeline::new(config), Err(Error::Geometry(_))));
    }

    #[test]
    fn test_empty_input_is_success() {
        let pipeline = MergePipeline::new(MergeConfig::planar()).unwrap();
        let output = pipeline.run(&[]).unwrap();
        assert!(output.features.is_empty());
        assert_eq!(output.stats, MergeStats::default());
    }

    #[test]
    fn test_degenerate_input_counts_as_repair_drop() {
        let pipeline = MergePipeline::new(MergeConfig::planar()).unwrap();
        let shapes = vec![
            Shape::Simple(Polygon::new(
                vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (0.0, 0.0)].into(),
                vec![],
            )),
            Shape::from(rectangle(20.0, 20.0, 22.0, 22.0)),
        ];

        let output = pipeline.run(&shapes).unwrap();
        assert_eq!(output.features.len(), 1);
        assert_eq!(output.stats.components, 2);
        assert_eq!(output.stats.dropped_by_repair, 1);
        assert_eq!(output.stats.output_features, 1);
    }

    #[test]
    fn test_area_is_measured_after_simplification() {
        let config = MergeConfig::planar()
            .with_area_threshold(0.0)
            .with_simplify_tolerance(0.3);
        let pipeline = MergePipeline::new(config).unwrap();
        // 4x4 square with a 0.2 peak on every side, each within the tolerance
        let shapes = vec![Shape::Simple(Polygon::new(
            vec![
                (0.0, 0.0),
                (2.0, -0.2),
                (4.0, 0.0),
                (4.2, 2.0),
                (4.0, 4.0),
                (2.0, 4.2),
                (0.0, 4.0),
                (-0.2, 2.0),
                (0.0, 0.0),
            ]
            .into(),
            vec![],
        ))];

        let output = pipeline.run(&shapes).unwrap();
        let feature = &output.features[0];
        let written = Shape::Simple(feature.polygon.clone()).area();

        assert_relative_eq!(feature.area, written, epsilon = 1e-9);
        // unsimplified area is 17.6; at most one peak can survive as the ring start
        assert!(feature.area < 17.0);
    }

    #[test]
    fn test_projector_matches_config() {
        let pipeline = MergePipeline::new(MergeConfig::default()).unwrap();
        assert_eq!(pipeline.projector().source(), Crs::Epsg4326);
        assert_eq!(pipeline.projector().target(), Crs::Epsg3395);
    }

    #[test]
    fn test_dedicated_thread_pool() {
        let config = MergeConfig::planar().with_threads(2);
        let pipeline = MergePipeline::new(config).unwrap();
        let shapes = vec![
            Shape::from(rectangle(0.0, 0.0, 2.0, 2.0)),
            Shape::from(rectangle(2.0, 0.0, 4.0, 2.0)),
        ];

        let output = pipeline.run(&shapes).unwrap();
        assert_eq!(output.features.len(), 1);
        assert_eq!(output.stats.components, 1);
        assert_eq!(output.stats.edges, 1);
        assert_eq!(output.stats.largest_component, 2);
        assert_eq!(pipeline.config().area_units, AreaUnits::OutputCrs);
    }
}
