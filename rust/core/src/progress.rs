// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Progress hook for the two parallel phases.
//!
//! Workers call [`Progress::advance`] concurrently, so implementations must
//! be `Sync`.

use std::fmt;

/// The parallel phases of a merge run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BuildingGraph,
    MergingComponents,
}

impl Phase {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Phase::BuildingGraph => "Building graph",
            Phase::MergingComponents => "Merging components",
        }
    }

    /// Unit of work counted during the phase
    pub fn unit(&self) -> &'static str {
        match self {
            Phase::BuildingGraph => "shapes",
            Phase::MergingComponents => "components",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Receives progress notifications; every method defaults to a no-op
pub trait Progress: Sync {
    fn phase_started(&self, _phase: Phase, _total: usize) {}

    fn advance(&self, _phase: Phase, _count: usize) {}

    fn phase_finished(&self, _phase: Phase) {}
}

/// Discards all notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}
