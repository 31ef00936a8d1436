// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for file-level processing.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feature {index} is not usable: {reason}")]
    InvalidFeature { index: usize, reason: String },

    #[error("Input is in {found} but the merge expects {expected}")]
    CrsMismatch { expected: String, found: String },

    #[error("Geometry error: {0}")]
    Geometry(#[from] tilemerge_geometry::Error),

    #[error("Merge failed: {0}")]
    Merge(#[from] tilemerge_core::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
