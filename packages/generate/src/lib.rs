#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for building the county broadband summary artifacts.
//!
//! Runs the staged pipeline over fully materialized in-memory datasets
//! (join, aggregate, merge) and encodes the result as a GeoJSON feature
//! collection plus a provider directory. Each stage consumes the previous
//! stage's output by value and returns a new structure; nothing here is
//! async or shared-mutable.

pub mod mock;

use std::collections::BTreeMap;
use std::path::Path;

use broadband_map_aggregate::{RunSummary, county_stats, merge::merge_and_default, provider_directory};
use broadband_map_availability_models::{AvailabilityRecord, ProviderEntry, SpeedTile};
use broadband_map_geography_models::{CountyPolygon, CountyRecord, DefaultSpeeds};
use broadband_map_spatial::{CountyIndex, join_availability, join_tiles};
use geojson::{Feature, FeatureCollection, Geometry};
use thiserror::Error;

/// Errors that can occur while building or writing the output artifacts.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The boundary set was empty. The boundary set drives output
    /// cardinality, so an empty one aborts the run.
    #[error("no county boundaries loaded")]
    EmptyBoundaries,

    /// The availability dataset was empty; it is a mandatory input.
    #[error("no availability records loaded")]
    NoAvailabilityRecords,

    /// Writing an output file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing an output artifact failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The two output artifacts plus the run's data-quality summary.
#[derive(Debug)]
pub struct BuildOutputs {
    /// One record per boundary-set county, in boundary order.
    pub counties: Vec<CountyRecord>,
    /// County GEOID -> uncapped, name-ordered provider entries.
    pub providers: BTreeMap<String, Vec<ProviderEntry>>,
    /// Drop and match counters for the run log.
    pub summary: RunSummary,
}

/// Runs the full aggregation pipeline.
///
/// Tiles are optional in practice: an empty tile set simply leaves every
/// county's measured speeds to the defaulting policy.
///
/// # Errors
///
/// Returns [`BuildError`] when a mandatory input set is empty. Per-record
/// problems never abort the run; they surface in the returned
/// [`RunSummary`].
pub fn build(
    records: Vec<AvailabilityRecord>,
    tiles: Vec<SpeedTile>,
    boundaries: Vec<CountyPolygon>,
    defaults: &DefaultSpeeds,
) -> Result<BuildOutputs, BuildError> {
    if boundaries.is_empty() {
        return Err(BuildError::EmptyBoundaries);
    }
    if records.is_empty() {
        return Err(BuildError::NoAvailabilityRecords);
    }

    let index = CountyIndex::new(&boundaries);

    let availability = join_availability(records, &index);
    let tile_join = join_tiles(tiles, &index);

    #[allow(clippy::cast_possible_truncation)]
    let summary = RunSummary {
        matched_records: availability.matched.len() as u64,
        matched_tiles: tile_join.matched.len() as u64,
        malformed_identifiers: availability.malformed_identifiers,
        unmatched_records: availability.unmatched,
        invalid_quadkeys: tile_join.invalid_quadkeys,
        unmatched_tiles: tile_join.unmatched,
    };
    log::info!("{summary}");

    let stats = county_stats(&availability.matched, &tile_join.matched);
    let providers = provider_directory(&availability.matched);
    let counties = merge_and_default(boundaries, &stats, defaults);

    Ok(BuildOutputs {
        counties,
        providers,
        summary,
    })
}

/// Encodes county records as a GeoJSON `FeatureCollection`.
///
/// One feature per county: the boundary geometry plus the six summary
/// attributes and the capped provider list as properties.
#[must_use]
pub fn county_feature_collection(records: &[CountyRecord]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: records.iter().map(county_feature).collect(),
        foreign_members: None,
    }
}

fn county_feature(record: &CountyRecord) -> Feature {
    let mut properties = serde_json::Map::new();
    properties.insert("GEOID".to_owned(), record.geoid.clone().into());
    properties.insert("NAME".to_owned(), record.name.clone().into());
    properties.insert(
        "fcc_claimed_down_mbps".to_owned(),
        record.claimed_down_mbps.into(),
    );
    properties.insert(
        "fcc_claimed_up_mbps".to_owned(),
        record.claimed_up_mbps.into(),
    );
    properties.insert(
        "ookla_actual_down_mbps".to_owned(),
        record.actual_down_mbps.into(),
    );
    properties.insert(
        "ookla_actual_up_mbps".to_owned(),
        record.actual_up_mbps.into(),
    );
    properties.insert(
        "overstatement_ratio".to_owned(),
        record.overstatement_ratio.into(),
    );
    properties.insert(
        "top_providers".to_owned(),
        record.top_providers.clone().into(),
    );

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&record.boundary))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Writes `counties.geojson` and `providers.json` into the output
/// directory.
///
/// Both files are written atomically (tmp + rename) so a crashed run
/// never leaves a half-written artifact behind.
///
/// # Errors
///
/// Returns [`BuildError`] on serialization or filesystem failure.
pub fn write_outputs(outputs: &BuildOutputs, output_dir: &Path) -> Result<(), BuildError> {
    std::fs::create_dir_all(output_dir)?;

    let geojson_path = output_dir.join("counties.geojson");
    let collection = county_feature_collection(&outputs.counties);
    write_atomic(&geojson_path, &serde_json::to_string(&collection)?)?;
    log::info!("Wrote {}", geojson_path.display());

    let providers_path = output_dir.join("providers.json");
    write_atomic(&providers_path, &serde_json::to_string(&outputs.providers)?)?;
    log::info!("Wrote {}", providers_path.display());

    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), BuildError> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use broadband_map_availability_models::Technology;
    use geo::{MultiPolygon, polygon};

    use super::*;

    fn square(geoid: &str, name: &str, min_x: f64, min_y: f64, size: f64) -> CountyPolygon {
        let max_x = min_x + size;
        let max_y = min_y + size;
        let ring = polygon![
            (x: min_x, y: min_y),
            (x: max_x, y: min_y),
            (x: max_x, y: max_y),
            (x: min_x, y: max_y),
            (x: min_x, y: min_y),
        ];
        CountyPolygon {
            geoid: geoid.to_owned(),
            name: name.to_owned(),
            boundary: MultiPolygon(vec![ring]),
        }
    }

    fn record(geoid: &str, brand: &str, location: &str, down: f64) -> AvailabilityRecord {
        AvailabilityRecord {
            brand_name: brand.to_owned(),
            location_id: location.to_owned(),
            technology: Technology::UnlicensedFixedWireless,
            max_down_mbps: Some(down),
            max_up_mbps: Some(down / 5.0),
            longitude: None,
            latitude: None,
            block_geoid: None,
            county_geoid: Some(geoid.to_owned()),
        }
    }

    fn boundaries() -> Vec<CountyPolygon> {
        vec![
            square("48001", "Anderson", 0.0, 0.0, 1.0),
            square("48003", "Andrews", 1.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn build_produces_one_record_per_boundary_county() {
        let records = vec![record("48001", "Acme", "L1", 100.0)];
        let outputs = build(records, vec![], boundaries(), &DefaultSpeeds::default()).unwrap();

        assert_eq!(outputs.counties.len(), 2);
        assert_eq!(outputs.summary.matched_records, 1);

        // Matched county keeps its aggregate; the other falls back to
        // the defaulting policy.
        assert_eq!(outputs.counties[0].claimed_down_mbps, 100.0);
        assert_eq!(outputs.counties[1].claimed_down_mbps, 25.0);
        assert_eq!(outputs.counties[1].overstatement_ratio, 2.5);
    }

    #[test]
    fn empty_boundaries_abort_the_run() {
        let records = vec![record("48001", "Acme", "L1", 100.0)];
        assert!(matches!(
            build(records, vec![], vec![], &DefaultSpeeds::default()),
            Err(BuildError::EmptyBoundaries)
        ));
    }

    #[test]
    fn empty_availability_aborts_the_run() {
        assert!(matches!(
            build(vec![], vec![], boundaries(), &DefaultSpeeds::default()),
            Err(BuildError::NoAvailabilityRecords)
        ));
    }

    #[test]
    fn feature_properties_carry_exact_keys() {
        let records = vec![record("48001", "Acme", "L1", 100.0)];
        let outputs = build(records, vec![], boundaries(), &DefaultSpeeds::default()).unwrap();
        let collection = county_feature_collection(&outputs.counties);

        let properties = collection.features[0].properties.as_ref().unwrap();
        let keys: Vec<&str> = properties.keys().map(String::as_str).collect();
        for key in [
            "GEOID",
            "NAME",
            "fcc_claimed_down_mbps",
            "fcc_claimed_up_mbps",
            "ookla_actual_down_mbps",
            "ookla_actual_up_mbps",
            "overstatement_ratio",
            "top_providers",
        ] {
            assert!(keys.contains(&key), "missing property {key}");
        }
        assert_eq!(keys.len(), 8);

        assert_eq!(properties["GEOID"], "48001");
        assert_eq!(properties["fcc_claimed_down_mbps"], 100.0);
        assert_eq!(
            properties["top_providers"],
            serde_json::json!(["Acme"])
        );
        assert!(collection.features[0].geometry.is_some());
    }

    #[test]
    fn provider_directory_serializes_by_geoid() {
        let records = vec![
            record("48001", "Acme", "L1", 100.0),
            record("48001", "Zephyr", "L2", 50.0),
        ];
        let outputs = build(records, vec![], boundaries(), &DefaultSpeeds::default()).unwrap();
        let json = serde_json::to_value(&outputs.providers).unwrap();

        let entries = json["48001"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["name"], "Acme");
        assert_eq!(entries[0]["fcc_claimed_down"], 100.0);
        assert_eq!(entries[0]["tech_code"], 70);
    }

    #[test]
    fn tiles_feed_measured_speeds() {
        let records = vec![record("48001", "Acme", "L1", 100.0)];
        // Zoom-1 northeast quadrant covers both test squares.
        let tiles = vec![SpeedTile {
            quadkey: "1".to_owned(),
            avg_down_mbps: 40.0,
            avg_up_mbps: 8.0,
            tests: 25,
        }];
        let outputs = build(records, tiles, boundaries(), &DefaultSpeeds::default()).unwrap();

        assert_eq!(outputs.summary.matched_tiles, 2);
        assert_eq!(outputs.counties[0].actual_down_mbps, 40.0);
        assert_eq!(outputs.counties[0].overstatement_ratio, 2.5);
    }
}
