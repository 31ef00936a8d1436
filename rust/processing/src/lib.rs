// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Tilemerge Processing
//!
//! Reads tiled polygon layers from GeoJSON, runs the merge and writes the
//! merged layer back out.
//!
//! ```rust,ignore
//! use std::path::Path;
//! use tilemerge_core::{MergeConfig, NoProgress};
//! use tilemerge_processing::merge_file;
//!
//! let stats = merge_file(
//!     Path::new("tiles.geojson"),
//!     Path::new("merged.geojson"),
//!     MergeConfig::default(),
//!     &NoProgress,
//! )?;
//! println!("{} features", stats.output_features);
//! ```

pub mod error;
pub mod geojson;
pub mod run;

pub use error::{Error, Result};
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use run::{merge_file, prepare_paths, read_collection, write_collection};
