//! FCC BDC availability CSV parsing.
//!
//! The BDC publishes state-level availability as large CSVs (1-5 GB);
//! rows stream through the reader one at a time and optional state /
//! technology filters cut the dataset down before it ever materializes.
//! Column presence is the only schema check: unparseable speeds or
//! coordinates degrade to `None` and the row survives.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use broadband_map_availability_models::{AvailabilityRecord, Technology};

use crate::{IngestError, cell, numeric_cell, resolve_columns, resolve_optional};

/// Log a progress line every this many parsed rows.
const PROGRESS_CHUNK: usize = 500_000;

/// Columns every availability CSV must carry.
const REQUIRED_COLUMNS: &[&str] = &[
    "brand_name",
    "location_id",
    "technology",
    "max_advertised_download_speed",
    "max_advertised_upload_speed",
];

/// Row filters applied during availability ingestion.
///
/// A BDC state filing covers every technology; a typical run narrows to
/// one state and one technology code (e.g. Texas fixed wireless, code
/// 70).
#[derive(Debug, Clone, Default)]
pub struct AvailabilityFilter {
    /// Keep only rows whose `state_abbr` column equals this value.
    pub state_abbr: Option<String>,
    /// Keep only rows with this FCC technology code.
    pub technology: Option<u8>,
}

/// Loads availability records from a CSV file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or the header lacks
/// required columns.
pub fn load_availability_csv(
    path: &Path,
    filter: &AvailabilityFilter,
) -> Result<Vec<AvailabilityRecord>, IngestError> {
    log::info!("Reading availability records from {}", path.display());
    parse_availability(File::open(path)?, filter)
}

/// Parses availability records from any CSV reader.
///
/// # Errors
///
/// Returns [`IngestError`] on unreadable input or missing required
/// columns. Malformed rows never error: numeric fields degrade to
/// `None`, and filtered-out rows are skipped silently.
pub fn parse_availability(
    reader: impl Read,
    filter: &AvailabilityFilter,
) -> Result<Vec<AvailabilityRecord>, IngestError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let required = resolve_columns(&headers, REQUIRED_COLUMNS)?;
    let (brand_idx, location_idx, tech_idx, down_idx, up_idx) = (
        required[0],
        required[1],
        required[2],
        required[3],
        required[4],
    );

    let lat_idx = resolve_optional(&headers, "latitude");
    let lon_idx = resolve_optional(&headers, "longitude");
    let block_idx = resolve_optional(&headers, "block_geoid");
    let county_idx = resolve_optional(&headers, "county_geoid");
    let state_idx = resolve_optional(&headers, "state_abbr");

    let mut records = Vec::new();
    let mut scanned = 0usize;

    for row in csv_reader.records() {
        let row = row?;
        scanned += 1;
        if scanned % PROGRESS_CHUNK == 0 {
            log::info!("  scanned {scanned} rows, kept {}", records.len());
        }

        if let Some(want) = &filter.state_abbr {
            let state = state_idx.and_then(|idx| cell(&row, idx));
            if state != Some(want.as_str()) {
                continue;
            }
        }

        let tech_code = cell(&row, tech_idx)
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(0);
        if let Some(want) = filter.technology {
            if tech_code != want {
                continue;
            }
        }

        records.push(AvailabilityRecord {
            brand_name: cell(&row, brand_idx).unwrap_or_default().to_owned(),
            location_id: cell(&row, location_idx).unwrap_or_default().to_owned(),
            technology: Technology::from_code(tech_code),
            max_down_mbps: numeric_cell(&row, down_idx),
            max_up_mbps: numeric_cell(&row, up_idx),
            longitude: lon_idx.and_then(|idx| numeric_cell(&row, idx)),
            latitude: lat_idx.and_then(|idx| numeric_cell(&row, idx)),
            block_geoid: block_idx.and_then(|idx| cell(&row, idx)).map(str::to_owned),
            county_geoid: county_idx.and_then(|idx| cell(&row, idx)).map(str::to_owned),
        });
    }

    log::info!("  {} availability rows kept of {scanned} scanned", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "brand_name,location_id,technology,max_advertised_download_speed,\
                          max_advertised_upload_speed,latitude,longitude,block_geoid,state_abbr\n";

    #[test]
    fn parses_rows_with_optional_columns() {
        let csv = format!(
            "{HEADER}Acme,L1,70,100,20,31.5,-97.2,481130204023001,TX\n\
             Zephyr,L2,50,1000,1000,,,481130204023002,TX\n"
        );
        let records = parse_availability(csv.as_bytes(), &AvailabilityFilter::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].brand_name, "Acme");
        assert_eq!(records[0].technology, Technology::UnlicensedFixedWireless);
        assert_eq!(records[0].coordinates(), Some((-97.2, 31.5)));
        assert_eq!(records[1].technology, Technology::Fiber);
        assert_eq!(records[1].coordinates(), None);
    }

    #[test]
    fn malformed_numerics_degrade_to_unknown() {
        let csv = format!("{HEADER}Acme,L1,70,fast,n/a,31.5,-97.2,481130204023001,TX\n");
        let records = parse_availability(csv.as_bytes(), &AvailabilityFilter::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].max_down_mbps, None);
        assert_eq!(records[0].max_up_mbps, None);
    }

    #[test]
    fn state_and_technology_filters_apply() {
        let csv = format!(
            "{HEADER}Acme,L1,70,100,20,,,481130204023001,TX\n\
             Acme,L2,70,100,20,,,060370204023001,CA\n\
             Zephyr,L3,50,1000,1000,,,481130204023002,TX\n"
        );
        let filter = AvailabilityFilter {
            state_abbr: Some("TX".to_owned()),
            technology: Some(70),
        };
        let records = parse_availability(csv.as_bytes(), &filter).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location_id, "L1");
    }

    #[test]
    fn missing_required_columns_listed() {
        let csv = "brand_name,technology\nAcme,70\n";
        let err = parse_availability(csv.as_bytes(), &AvailabilityFilter::default()).unwrap_err();
        match err {
            IngestError::MissingColumns { columns } => {
                assert!(columns.contains(&"location_id".to_owned()));
                assert!(columns.contains(&"max_advertised_download_speed".to_owned()));
                assert!(columns.contains(&"max_advertised_upload_speed".to_owned()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
