// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `tilemerge` merges polygon footprints that were split at tile seams.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tilemerge_core::{config, AreaUnits, MergeConfig, Phase, Progress};
use tilemerge_geometry::Crs;
use tilemerge_processing::merge_file;

#[derive(Debug, Parser)]
#[command(name = "tilemerge", version, about)]
struct Cli {
    /// GeoJSON FeatureCollection of Polygon/MultiPolygon features
    input: PathBuf,

    /// Where to write the merged FeatureCollection (replaced if present)
    output: PathBuf,

    /// Maximum gap, in metric CRS units, across which shapes are merged
    #[arg(
        long,
        env = "TILEMERGE_DISTANCE_THRESHOLD",
        default_value_t = config::DEFAULT_DISTANCE_THRESHOLD
    )]
    distance_threshold: f64,

    /// Output polygons with area at or below this are dropped
    #[arg(
        long,
        env = "TILEMERGE_AREA_THRESHOLD",
        default_value_t = config::DEFAULT_AREA_THRESHOLD
    )]
    area_threshold: f64,

    /// Douglas-Peucker tolerance for the final simplification (0 disables it)
    #[arg(
        long,
        env = "TILEMERGE_SIMPLIFY_TOLERANCE",
        default_value_t = config::DEFAULT_SIMPLIFY_TOLERANCE
    )]
    simplify_tolerance: f64,

    /// Units in which the area threshold is compared
    #[arg(long, value_enum, default_value_t = AreaUnitsArg::Output)]
    area_units: AreaUnitsArg,

    /// CRS of the input coordinates
    #[arg(long, env = "TILEMERGE_SOURCE_CRS", default_value = "EPSG:4326")]
    source_crs: Crs,

    /// Projected CRS in which buffering happens
    #[arg(long, env = "TILEMERGE_METRIC_CRS", default_value = "EPSG:3395")]
    metric_crs: Crs,

    /// Worker threads (defaults to one per core)
    #[arg(long, env = "TILEMERGE_THREADS")]
    threads: Option<usize>,

    /// Show log output on stderr
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// No progress bars, no logs, no summary
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AreaUnitsArg {
    /// Units of the input CRS (square degrees for WGS84)
    Output,
    /// Square metres in the metric CRS
    Metric,
}

impl From<AreaUnitsArg> for AreaUnits {
    fn from(arg: AreaUnitsArg) -> Self {
        match arg {
            AreaUnitsArg::Output => AreaUnits::OutputCrs,
            AreaUnitsArg::Metric => AreaUnits::Metric,
        }
    }
}

impl Cli {
    fn merge_config(&self) -> MergeConfig {
        MergeConfig {
            distance_threshold: self.distance_threshold,
            area_threshold: self.area_threshold,
            simplify_tolerance: self.simplify_tolerance,
            area_units: self.area_units.into(),
            source_crs: self.source_crs,
            metric_crs: self.metric_crs,
            threads: self.threads,
        }
    }
}

fn init_tracing(cli: &Cli) {
    // --quiet silences everything; without --verbose the terminal only shows
    // progress bars, so RUST_LOG is honoured only together with --verbose.
    let filter = if cli.verbose && !cli.quiet {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("off")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// One bar per parallel phase
struct PhaseBars {
    graph: ProgressBar,
    merge: ProgressBar,
}

impl PhaseBars {
    fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::stderr())
        };

        let style = ProgressStyle::with_template(
            "{prefix:20} [{bar:30}] {pos:>7}/{len:7} {msg} ({elapsed})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");

        let bar = |phase: Phase| {
            let bar = multi.add(ProgressBar::new(0));
            bar.set_style(style.clone());
            bar.set_prefix(phase.label());
            bar.set_message(phase.unit());
            bar
        };

        Self {
            graph: bar(Phase::BuildingGraph),
            merge: bar(Phase::MergingComponents),
        }
    }

    fn bar(&self, phase: Phase) -> &ProgressBar {
        match phase {
            Phase::BuildingGraph => &self.graph,
            Phase::MergingComponents => &self.merge,
        }
    }
}

impl Progress for PhaseBars {
    fn phase_started(&self, phase: Phase, total: usize) {
        let bar = self.bar(phase);
        bar.set_length(total as u64);
        bar.enable_steady_tick(Duration::from_millis(120));
    }

    fn advance(&self, phase: Phase, count: usize) {
        self.bar(phase).inc(count as u64);
    }

    fn phase_finished(&self, phase: Phase) {
        self.bar(phase).finish();
    }
}

fn run(cli: &Cli) -> Result<()> {
    let start = Instant::now();
    let bars = PhaseBars::new(cli.quiet);
    let config = cli.merge_config();
    tracing::debug!(?config, "Resolved merge config");

    let stats = merge_file(&cli.input, &cli.output, config, &bars).with_context(
        || {
            format!(
                "failed to merge {} into {}",
                cli.input.display(),
                cli.output.display()
            )
        },
    )?;

    if !cli.quiet {
        eprintln!(
            "Merged {} shapes in {} components into {} features ({} dropped by area, {} by repair) in {:.2}s",
            stats.input_shapes,
            stats.components,
            stats.output_features,
            stats.dropped_by_area,
            stats.dropped_by_repair,
            start.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Merge failed");
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_library() {
        let cli = Cli::try_parse_from(["tilemerge", "in.geojson", "out.geojson"]).unwrap();
        let config = cli.merge_config();
        let defaults = MergeConfig::default();

        assert_eq!(config.distance_threshold, defaults.distance_threshold);
        assert_eq!(config.area_threshold, defaults.area_threshold);
        assert_eq!(config.source_crs, Crs::Epsg4326);
        assert_eq!(config.metric_crs, Crs::Epsg3395);
        assert_eq!(config.area_units, AreaUnits::OutputCrs);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "tilemerge",
            "in.geojson",
            "out.geojson",
            "--distance-threshold",
            "1.5",
            "--area-units",
            "metric",
            "--metric-crs",
            "EPSG:3857",
            "--threads",
            "2",
        ])
        .unwrap();
        let config = cli.merge_config();

        assert_eq!(config.distance_threshold, 1.5);
        assert_eq!(config.area_units, AreaUnits::Metric);
        assert_eq!(config.metric_crs, Crs::Epsg3857);
        assert_eq!(config.threads, Some(2));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["tilemerge", "a", "b", "-v", "-q"]).is_err());
    }
}
