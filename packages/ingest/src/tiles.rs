//! Ookla open-data speed tile CSV parsing.
//!
//! One row per quadkey tile: average download/upload speed plus the test
//! count that weights the tile during aggregation. A tile whose numeric
//! fields fail to parse carries no usable measurement, so the row is
//! skipped and counted rather than degraded.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use broadband_map_availability_models::SpeedTile;

use crate::{IngestError, cell, numeric_cell, resolve_columns};

/// Columns every tile CSV must carry (Ookla open-data schema).
const REQUIRED_COLUMNS: &[&str] = &["quadkey", "avg_d_mbps", "avg_u_mbps", "tests"];

/// Loads speed tiles from a CSV file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or the header lacks
/// required columns.
pub fn load_tiles_csv(path: &Path) -> Result<Vec<SpeedTile>, IngestError> {
    log::info!("Reading speed tiles from {}", path.display());
    parse_tiles(File::open(path)?)
}

/// Parses speed tiles from any CSV reader.
///
/// # Errors
///
/// Returns [`IngestError`] on unreadable input or missing required
/// columns. Rows with unparseable numerics are skipped and counted.
pub fn parse_tiles(reader: impl Read) -> Result<Vec<SpeedTile>, IngestError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let required = resolve_columns(&headers, REQUIRED_COLUMNS)?;
    let (quadkey_idx, down_idx, up_idx, tests_idx) =
        (required[0], required[1], required[2], required[3]);

    let mut tiles = Vec::new();
    let mut skipped = 0usize;

    for row in csv_reader.records() {
        let row = row?;

        let quadkey = cell(&row, quadkey_idx);
        let down = numeric_cell(&row, down_idx);
        let up = numeric_cell(&row, up_idx);
        let tests = cell(&row, tests_idx).and_then(|v| v.parse::<u64>().ok());

        match (quadkey, down, up, tests) {
            (Some(quadkey), Some(avg_down_mbps), Some(avg_up_mbps), Some(tests)) => {
                tiles.push(SpeedTile {
                    quadkey: quadkey.to_owned(),
                    avg_down_mbps,
                    avg_up_mbps,
                    tests,
                });
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} tile rows with unparseable fields");
    }
    log::info!("  {} speed tiles loaded", tiles.len());
    Ok(tiles)
}
