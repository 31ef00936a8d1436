// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The computed components do not partition the input ids. This is a
    /// defect in indexing or adjacency, never something to paper over.
    #[error("Invariant violation: components cover {actual} of {expected} shapes ({detail})")]
    InvariantViolation {
        expected: usize,
        actual: usize,
        detail: String,
    },

    #[error("Geometry error: {0}")]
    Geometry(#[from] tilemerge_geometry::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl Error {
    pub fn invariant(expected: usize, actual: usize, detail: impl Into<String>) -> Self {
        Error::InvariantViolation {
            expected,
            actual,
            detail: detail.into(),
        }
    }
}
