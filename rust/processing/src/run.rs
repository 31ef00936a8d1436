// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File-to-file merge.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use tilemerge_core::{MergeConfig, MergePipeline, MergeStats, Progress};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geojson::FeatureCollection;

/// Read a GeoJSON feature collection
pub fn read_collection(path: &Path) -> Result<FeatureCollection> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write a GeoJSON feature collection, replacing any existing file
pub fn write_collection(path: &Path, collection: &FeatureCollection) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, collection)?;
    writer.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Check the input exists and make room for the output
///
/// Missing parent directories of `output` are created and a previous output
/// file is removed, so a failed run never leaves stale results behind.
pub fn prepare_paths(input: &Path, output: &Path) -> Result<()> {
    if !input.is_file() {
        return Err(Error::io(
            input,
            std::io::Error::new(std::io::ErrorKind::NotFound, "input file not found"),
        ));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    if output.exists() {
        debug!(path = %output.display(), "Removing previous output");
        fs::remove_file(output).map_err(|e| Error::io(output, e))?;
    }

    Ok(())
}

/// Merge the polygons of `input` and write the result to `output`
///
/// The input must be in `config.source_crs`; output is written in the same
/// CRS and tagged with it.
pub fn merge_file(
    input: &Path,
    output: &Path,
    config: MergeConfig,
    progress: &dyn Progress,
) -> Result<MergeStats> {
    let start = Instant::now();
    let pipeline = MergePipeline::new(config)?;
    prepare_paths(input, output)?;

    let collection = read_collection(input)?;
    let crs = collection.crs()?;
    let expected = pipeline.projector().source();
    if crs != expected {
        return Err(Error::CrsMismatch {
            expected: expected.to_string(),
            found: crs.to_string(),
        });
    }

    let shapes = collection.to_shapes()?;
    info!(
        path = %input.display(),
        features = collection.features.len(),
        shapes = shapes.len(),
        %crs,
        metric_crs = %pipeline.projector().target(),
        "Loaded input"
    );

    let merged = pipeline.run_with_progress(&shapes, progress)?;

    write_collection(output, &FeatureCollection::from_features(&merged.features, crs))?;
    info!(
        path = %output.display(),
        features = merged.features.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Wrote output"
    );

    Ok(merged.stats)
}
