#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Local-file loaders for the pipeline's three input datasets.
//!
//! Availability filings and speed tiles arrive as columnar CSV; county
//! boundaries arrive as a GeoJSON `FeatureCollection`. Loaders validate
//! column presence only; malformed numeric fields degrade to "unknown"
//! on a per-row basis rather than failing the run. Parsers read from any
//! `io::Read`, so tests run against in-memory buffers.

pub mod availability;
pub mod boundaries;
pub mod tiles;

use thiserror::Error;

/// Errors that can occur while loading input datasets.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Reading the input file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV structure error (ragged rows, encoding).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// GeoJSON parsing failed.
    #[error("GeoJSON error: {0}")]
    Geojson(#[from] Box<geojson::Error>),

    /// The CSV header row lacks required columns.
    #[error("missing required columns: {columns:?}")]
    MissingColumns {
        /// The required column names absent from the header.
        columns: Vec<String>,
    },

    /// The boundary file was valid GeoJSON but not a `FeatureCollection`.
    #[error("expected a GeoJSON FeatureCollection")]
    NotFeatureCollection,
}

impl From<geojson::Error> for IngestError {
    fn from(err: geojson::Error) -> Self {
        Self::Geojson(Box::new(err))
    }
}

/// Resolves the index of each wanted column in a CSV header row.
///
/// Returns `Err` listing every missing required column at once, so a
/// user fixes the header in one pass.
fn resolve_columns(
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<Vec<usize>, IngestError> {
    let mut indexes = Vec::with_capacity(required.len());
    let mut missing = Vec::new();

    for &name in required {
        match headers.iter().position(|h| h == name) {
            Some(idx) => indexes.push(idx),
            None => missing.push(name.to_owned()),
        }
    }

    if missing.is_empty() {
        Ok(indexes)
    } else {
        Err(IngestError::MissingColumns { columns: missing })
    }
}

/// Resolves an optional column's index, `None` when absent.
fn resolve_optional(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Reads a cell as a trimmed non-empty string.
fn cell<'a>(row: &'a csv::StringRecord, idx: usize) -> Option<&'a str> {
    row.get(idx).map(str::trim).filter(|v| !v.is_empty())
}

/// Parses a cell as `f64`, degrading malformed values to `None`.
fn numeric_cell(row: &csv::StringRecord, idx: usize) -> Option<f64> {
    cell(row, idx).and_then(|v| v.parse::<f64>().ok())
}
