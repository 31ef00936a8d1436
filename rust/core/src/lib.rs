// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Tilemerge Core
//!
//! Adjacency detection and merge engine for polygon footprints that were
//! extracted tile by tile and therefore split at tile boundaries.
//!
//! ## Overview
//!
//! - **Spatial Index**: R-tree over the bounding boxes of all inputs
//! - **Adjacency Graph**: metric buffer + exact intersection test per shape,
//!   run in parallel with [rayon](https://docs.rs/rayon)
//! - **Components**: iterative depth-first search; the result must partition
//!   the input ids exactly
//! - **Merging**: buffer, union, unbuffer (morphological closing), validity
//!   repair, explode and area filter per component, also in parallel
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tilemerge_core::{MergeConfig, MergePipeline};
//! use tilemerge_geometry::{rectangle, Shape};
//!
//! let shapes = vec![
//!     Shape::from(rectangle(0.0, 0.0, 1.0, 1.0)),
//!     Shape::from(rectangle(1.0, 0.0, 2.0, 1.0)),
//! ];
//!
//! let pipeline = MergePipeline::new(MergeConfig::planar())?;
//! let output = pipeline.run(&shapes)?;
//! assert_eq!(output.features.len(), 1);
//! ```

pub mod adjacency;
pub mod buffer;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod merger;
pub mod pipeline;
pub mod progress;

pub use adjacency::{Adjacency, AdjacencyGraphBuilder};
pub use buffer::MetricBuffer;
pub use config::{AreaUnits, MergeConfig};
pub use error::{Error, Result};
pub use graph::{check_partition, Component, UndirectedGraph, VertexId};
pub use index::SpatialIndex;
pub use merger::{ComponentMerger, ComponentOutcome, MergedFeature};
pub use pipeline::{MergeOutput, MergePipeline, MergeStats};
pub use progress::{NoProgress, Phase, Progress};

use tilemerge_geometry::Shape;

/// Merge `shapes` with the default engine
pub fn merge_shapes(shapes: &[Shape], config: MergeConfig) -> Result<MergeOutput> {
    MergePipeline::new(config)?.run(shapes)
}
