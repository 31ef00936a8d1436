// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adjacency graph construction.
//!
//! For every shape `i`: buffer it by the distance threshold in metric space,
//! ask the index for candidates whose boxes meet the buffered box, and keep
//! candidate `j` if the buffered `i` intersects the raw `j`. Buffering only
//! one side thresholds on the true distance between the pair, so the relation
//! comes out symmetric even though each test is one-sided.
//!
//! Workers run in parallel and return local edge lists; a single thread then
//! folds them into the graph.

use rayon::prelude::*;
use smallvec::SmallVec;
use tilemerge_geometry::{GeometryEngine, Shape};
use tracing::{debug, info};

use crate::buffer::MetricBuffer;
use crate::error::Result;
use crate::graph::{UndirectedGraph, VertexId};
use crate::index::SpatialIndex;
use crate::progress::{Phase, Progress};

/// Neighbours found for one vertex, self-loop excluded
pub type NeighbourList = SmallVec<[VertexId; 8]>;

/// Result of the adjacency phase
#[derive(Debug, Clone)]
pub struct Adjacency {
    pub graph: UndirectedGraph,
    /// Metric-buffered copy of every input shape, by vertex id
    pub buffered: Vec<Shape>,
}

/// Builds the proximity graph over all input shapes
pub struct AdjacencyGraphBuilder<'a, E: GeometryEngine + ?Sized> {
    engine: &'a E,
    buffer: &'a MetricBuffer<'a, E>,
    index: &'a SpatialIndex,
}

impl<'a, E: GeometryEngine + ?Sized> AdjacencyGraphBuilder<'a, E> {
    pub fn new(engine: &'a E, buffer: &'a MetricBuffer<'a, E>, index: &'a SpatialIndex) -> Self {
        Self {
            engine,
            buffer,
            index,
        }
    }

    /// Neighbours of shape `i` plus its buffered copy
    pub fn neighbours(&self, i: VertexId, shapes: &[Shape]) -> Result<(NeighbourList, Shape)> {
        let embiggened = self.buffer.expand(&shapes[i])?;

        let mut neighbours = NeighbourList::new();
        if let Some(bbox) = self.engine.bounding_box(&embiggened) {
            for j in self.index.query(&bbox) {
                if j != i && self.engine.intersects(&embiggened, &shapes[j]) {
                    neighbours.push(j);
                }
            }
        }

        Ok((neighbours, embiggened))
    }

    /// Run the per-vertex phase in parallel and reduce into one graph
    ///
    /// The first failing vertex aborts the whole phase.
    pub fn build(&self, shapes: &[Shape], progress: &dyn Progress) -> Result<Adjacency> {
        progress.phase_started(Phase::BuildingGraph, shapes.len());

        let local: Vec<(NeighbourList, Shape)> = (0..shapes.len())
            .into_par_iter()
            .map(|i| {
                let result = self.neighbours(i, shapes);
                progress.advance(Phase::BuildingGraph, 1);
                result
            })
            .collect::<Result<Vec<_>>>()?;

        let mut graph = UndirectedGraph::new();
        let mut buffered = Vec::with_capacity(local.len());

        for (i, (neighbours, embiggened)) in local.into_iter().enumerate() {
            graph.add_edge(i, i);
            for j in neighbours {
                graph.add_edge(i, j);
            }
            buffered.push(embiggened);
        }

        progress.phase_finished(Phase::BuildingGraph);
        info!(
            shapes = shapes.len(),
            edges = graph.edge_count(),
            "Built adjacency graph"
        );
        debug!(distance = self.buffer.distance(), "Adjacency threshold");

        Ok(Adjacency { graph, buffered })
    }
}
