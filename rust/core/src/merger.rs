// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Component merging.
//!
//! Each connected component becomes one or more output polygons through a
//! morphological closing: union the metric-buffered members, shrink the
//! union by the same distance, repair, explode, filter by area. Growing then
//! shrinking fuses the seams left by tile splitting without leaving the
//! footprint inflated.

use rayon::prelude::*;
use tilemerge_geometry::{GeometryEngine, Polygon, Shape};
use tracing::{debug, info};

use crate::buffer::MetricBuffer;
use crate::config::AreaUnits;
use crate::error::Result;
use crate::graph::Component;
use crate::progress::{Phase, Progress};

/// One output polygon
#[derive(Debug, Clone, PartialEq)]
pub struct MergedFeature {
    /// Always a simple polygon
    pub polygon: Polygon<f64>,
    /// Area of `polygon` in the units the filter used
    pub area: f64,
    /// Index of the component the polygon came from
    pub component: usize,
    /// Number of input shapes in that component
    pub sources: usize,
}

/// Features produced by one component plus what was thrown away
#[derive(Debug, Clone, Default)]
pub struct ComponentOutcome {
    pub features: Vec<MergedFeature>,
    pub dropped_by_area: usize,
    pub dropped_by_repair: usize,
}

/// Merges the members of a component into validated simple polygons
pub struct ComponentMerger<'a, E: GeometryEngine + ?Sized> {
    engine: &'a E,
    buffer: &'a MetricBuffer<'a, E>,
    area_threshold: f64,
    area_units: AreaUnits,
}

impl<'a, E: GeometryEngine + ?Sized> ComponentMerger<'a, E> {
    pub fn new(
        engine: &'a E,
        buffer: &'a MetricBuffer<'a, E>,
        area_threshold: f64,
        area_units: AreaUnits,
    ) -> Self {
        Self {
            engine,
            buffer,
            area_threshold,
            area_units,
        }
    }

    /// Merge one component
    ///
    /// `buffered` holds the metric-buffered copy of every input shape, indexed
    /// by vertex id.
    pub fn merge(
        &self,
        index: usize,
        component: &Component,
        buffered: &[Shape],
    ) -> Result<ComponentOutcome> {
        let mut outcome = ComponentOutcome::default();

        let union = component
            .iter()
            .map(|&v| &buffered[v])
            .fold(Shape::empty(), |acc, shape| self.engine.union(&acc, shape));

        let closed = self.buffer.shrink(&union)?;
        let repaired = self.engine.repair_validity(&closed);

        if repaired.is_empty() {
            debug!(component = index, "Repair left nothing polygonal, dropping");
            outcome.dropped_by_repair += 1;
            return Ok(outcome);
        }

        for polygon in repaired.explode() {
            let area = self.piece_area(&polygon)?;

            if area > self.area_threshold {
                outcome.features.push(MergedFeature {
                    polygon,
                    area,
                    component: index,
                    sources: component.len(),
                });
            } else {
                debug!(
                    component = index,
                    area,
                    threshold = self.area_threshold,
                    "Dropping piece below area threshold"
                );
                outcome.dropped_by_area += 1;
            }
        }

        Ok(outcome)
    }

    /// Area of one output polygon in the configured units
    pub fn piece_area(&self, polygon: &Polygon<f64>) -> Result<f64> {
        let piece = Shape::Simple(polygon.clone());
        match self.area_units {
            AreaUnits::OutputCrs => Ok(self.engine.area(&piece)),
            AreaUnits::Metric => self.buffer.metric_area(&piece),
        }
    }

    /// Merge every component in parallel and collect the results in
    /// component order
    pub fn merge_all(
        &self,
        components: &[Component],
        buffered: &[Shape],
        progress: &dyn Progress,
    ) -> Result<ComponentOutcome> {
        progress.phase_started(Phase::MergingComponents, components.len());

        let outcomes: Vec<ComponentOutcome> = components
            .par_iter()
            .enumerate()
            .map(|(index, component)| {
                let result = self.merge(index, component, buffered);
                progress.advance(Phase::MergingComponents, 1);
                result
            })
            .collect::<Result<Vec<_>>>()?;

        let mut total = ComponentOutcome::default();
        for outcome in outcomes {
            total.features.extend(outcome.features);
            total.dropped_by_area += outcome.dropped_by_area;
            total.dropped_by_repair += outcome.dropped_by_repair;
        }

        progress.phase_finished(Phase::MergingComponents);
        info!(
            components = components.len(),
            features = total.features.len(),
            dropped_by_area = total.dropped_by_area,
            "Merged components"
        );

        Ok(total)
    }
}
