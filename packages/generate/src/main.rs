#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI tool for building the county broadband summary artifacts.
//!
//! Loads local availability, tile, and boundary files, runs the staged
//! aggregation pipeline, and writes `counties.geojson` plus
//! `providers.json`. Uses `indicatif-log-bridge` so that log lines and
//! the pipeline progress bar never fight for the terminal.

use std::path::PathBuf;
use std::time::Duration;

use broadband_map_geography_models::{DefaultSpeeds, fips};
use broadband_map_ingest::availability::{AvailabilityFilter, load_availability_csv};
use broadband_map_ingest::boundaries::load_counties_geojson;
use broadband_map_ingest::tiles::load_tiles_csv;
use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

#[derive(Parser)]
#[command(name = "broadband_map_generate", about = "County broadband summary tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build `counties.geojson` and `providers.json` from local inputs
    Build {
        /// Availability CSV (FCC BDC state filing)
        #[arg(long)]
        availability: PathBuf,
        /// County boundary GeoJSON
        #[arg(long)]
        boundaries: PathBuf,
        /// Speed tile CSV (Ookla open data); measured speeds fall back to
        /// defaults when absent
        #[arg(long)]
        tiles: Option<PathBuf>,
        /// Keep only rows with this state abbreviation (e.g. TX)
        #[arg(long)]
        state: Option<String>,
        /// Keep only rows with this FCC technology code (e.g. 70)
        #[arg(long)]
        technology: Option<u8>,
        /// Directory for the output artifacts
        #[arg(long, default_value = "data/processed")]
        output_dir: PathBuf,
    },
    /// Write a deterministic mock input dataset
    MockData {
        /// Number of synthetic counties (capped at 254)
        #[arg(long, default_value_t = 16)]
        counties: usize,
        /// Directory for the mock input files
        #[arg(long, default_value = "data/mock")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();

    match Cli::parse().command {
        Commands::Build {
            availability,
            boundaries,
            tiles,
            state,
            technology,
            output_dir,
        } => build(
            &multi,
            &availability,
            &boundaries,
            tiles.as_deref(),
            state,
            technology,
            &output_dir,
        ),
        Commands::MockData {
            counties,
            output_dir,
        } => {
            broadband_map_generate::mock::write_mock_inputs(&output_dir, counties)?;
            Ok(())
        }
    }
}

/// Loads inputs, runs the pipeline, and writes both artifacts.
fn build(
    multi: &MultiProgress,
    availability: &std::path::Path,
    boundaries: &std::path::Path,
    tiles: Option<&std::path::Path>,
    state: Option<String>,
    technology: Option<u8>,
    output_dir: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let steps = steps_bar(multi, 3);

    steps.set_message("Loading inputs");
    let county_polygons = load_counties_geojson(boundaries)?;
    let states: std::collections::BTreeSet<&str> = county_polygons
        .iter()
        .filter_map(|county| fips::derive_state_fips(&county.geoid))
        .collect();
    log::info!(
        "{} counties loaded across {} state(s)",
        county_polygons.len(),
        states.len()
    );

    let filter = AvailabilityFilter {
        state_abbr: state,
        technology,
    };
    let records = load_availability_csv(availability, &filter)?;

    let speed_tiles = match tiles {
        Some(path) if path.exists() => load_tiles_csv(path)?,
        Some(path) => {
            log::warn!(
                "Tile file not found at {}; measured speeds fall back to defaults",
                path.display()
            );
            Vec::new()
        }
        None => {
            log::info!("No tile file provided; measured speeds fall back to defaults");
            Vec::new()
        }
    };
    let had_tiles = !speed_tiles.is_empty();
    steps.inc(1);

    steps.set_message("Joining and aggregating");
    let outputs = broadband_map_generate::build(
        records,
        speed_tiles,
        county_polygons,
        &DefaultSpeeds::default(),
    )?;
    steps.inc(1);

    steps.set_message("Writing artifacts");
    broadband_map_generate::write_outputs(&outputs, output_dir)?;
    steps.inc(1);

    steps.finish_with_message(format!("Done: {} counties written", outputs.counties.len()));

    if !had_tiles {
        log::info!(
            "NOTE: no tile data; overstatement ratios use the {} Mbps measured-speed baseline",
            DefaultSpeeds::default().actual_down_mbps
        );
    }

    Ok(())
}

/// Creates the pipeline step progress bar.
fn steps_bar(multi: &MultiProgress, total: u64) -> ProgressBar {
    let bar = multi.add(ProgressBar::new(total));
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_style(
        ProgressStyle::with_template("{msg} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so
/// that `log::info!` and friends are suspended while progress bars
/// redraw. Returns the [`MultiProgress`] all bars must be added to.
#[must_use]
fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
