#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Per-county reductions over county-tagged records and tiles.
//!
//! All aggregation runs as explicit reduction functions over a
//! `BTreeMap` keyed by county GEOID, built incrementally in input order.
//! Keyed maps make the output deterministic and insensitive to the order
//! in which upstream work completed; no library group-by is involved.

pub mod merge;

use std::collections::{BTreeMap, BTreeSet};

use broadband_map_availability_models::{AvailabilityRecord, ProviderEntry, SpeedTile};
use broadband_map_geography_models::CountyStats;

/// Number of providers kept on a county's ranked provider list.
pub const TOP_PROVIDER_COUNT: usize = 3;

/// Aggregate drop and match counters for one pipeline run.
///
/// Per-record failures reduce the effective dataset instead of aborting
/// the run; these counters make data-quality regressions visible in the
/// run log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Availability records attributed to a county.
    pub matched_records: u64,
    /// County-tagged tile assignments (a tile straddling n counties
    /// counts n times).
    pub matched_tiles: u64,
    /// Records dropped for an unusable county identifier.
    pub malformed_identifiers: u64,
    /// Records that matched no county.
    pub unmatched_records: u64,
    /// Tiles dropped for an undecodable quadkey.
    pub invalid_quadkeys: u64,
    /// Tiles that intersected no county.
    pub unmatched_tiles: u64,
}

impl RunSummary {
    /// Total rows dropped across both inputs.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.malformed_identifiers + self.unmatched_records + self.invalid_quadkeys
            + self.unmatched_tiles
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records and {} tile assignments matched; dropped {} \
             (malformed ids: {}, unmatched records: {}, invalid quadkeys: {}, \
             unmatched tiles: {})",
            self.matched_records,
            self.matched_tiles,
            self.dropped(),
            self.malformed_identifiers,
            self.unmatched_records,
            self.invalid_quadkeys,
            self.unmatched_tiles,
        )
    }
}

/// One provider's distinct serviceable locations within a county, in
/// first-encountered order.
struct ProviderLocations {
    brand: String,
    locations: BTreeSet<String>,
}

/// Claimed-speed and provider accumulator for one county.
#[derive(Default)]
struct ClaimedAccumulator {
    claimed_down: Option<f64>,
    claimed_up: Option<f64>,
    /// Insertion order is the ranking tie-break, so this stays a `Vec`.
    providers: Vec<ProviderLocations>,
}

impl ClaimedAccumulator {
    fn push(&mut self, record: &AvailabilityRecord) {
        self.claimed_down = fold_max(self.claimed_down, record.max_down_mbps);
        self.claimed_up = fold_max(self.claimed_up, record.max_up_mbps);

        let position = self
            .providers
            .iter()
            .position(|p| p.brand == record.brand_name);
        let idx = if let Some(idx) = position {
            idx
        } else {
            self.providers.push(ProviderLocations {
                brand: record.brand_name.clone(),
                locations: BTreeSet::new(),
            });
            self.providers.len() - 1
        };
        self.providers[idx].locations.insert(record.location_id.clone());
    }

    /// Distinct brands ranked by distinct-location count descending;
    /// equal counts keep first-encountered order (stable sort over the
    /// insertion-ordered `Vec`). Truncated to [`TOP_PROVIDER_COUNT`].
    fn top_providers(&self) -> Vec<String> {
        let mut ranked: Vec<&ProviderLocations> = self.providers.iter().collect();
        ranked.sort_by(|a, b| b.locations.len().cmp(&a.locations.len()));
        ranked
            .into_iter()
            .take(TOP_PROVIDER_COUNT)
            .map(|p| p.brand.clone())
            .collect()
    }
}

/// Test-count-weighted speed accumulator for one county.
#[derive(Default)]
struct MeasuredAccumulator {
    down_sum: f64,
    up_sum: f64,
    weight: u64,
}

impl MeasuredAccumulator {
    fn push(&mut self, tile: &SpeedTile) {
        // A zero-test tile must contribute zero weight; skipping it also
        // keeps its (meaningless) average out of the sums.
        if tile.tests == 0 {
            return;
        }
        #[allow(clippy::cast_precision_loss)]
        let tests = tile.tests as f64;
        self.down_sum += tile.avg_down_mbps * tests;
        self.up_sum += tile.avg_up_mbps * tests;
        self.weight += tile.tests;
    }

    fn finish(&self) -> (Option<f64>, Option<f64>) {
        if self.weight == 0 {
            return (None, None);
        }
        #[allow(clippy::cast_precision_loss)]
        let weight = self.weight as f64;
        (Some(self.down_sum / weight), Some(self.up_sum / weight))
    }
}

/// Reduces county-tagged records and tiles into one [`CountyStats`] per
/// county GEOID appearing in either input.
///
/// Claimed speeds are per-county maxima over non-null filings; a county
/// with only null claims yields `None` (defaulted downstream). Measured
/// speeds are test-count-weighted means; an unweighted mean would bias
/// toward sparsely-tested tiles.
#[must_use]
pub fn county_stats(
    records: &[(String, AvailabilityRecord)],
    tiles: &[(String, SpeedTile)],
) -> BTreeMap<String, CountyStats> {
    let mut claimed: BTreeMap<String, ClaimedAccumulator> = BTreeMap::new();
    for (geoid, record) in records {
        claimed.entry(geoid.clone()).or_default().push(record);
    }

    let mut measured: BTreeMap<String, MeasuredAccumulator> = BTreeMap::new();
    for (geoid, tile) in tiles {
        measured.entry(geoid.clone()).or_default().push(tile);
    }

    let mut stats: BTreeMap<String, CountyStats> = BTreeMap::new();

    for (geoid, acc) in &claimed {
        let entry = stats.entry(geoid.clone()).or_default();
        entry.claimed_down_mbps = acc.claimed_down;
        entry.claimed_up_mbps = acc.claimed_up;
        entry.top_providers = acc.top_providers();
    }

    for (geoid, acc) in &measured {
        let (down, up) = acc.finish();
        let entry = stats.entry(geoid.clone()).or_default();
        entry.actual_down_mbps = down;
        entry.actual_up_mbps = up;
    }

    stats
}

/// Builds the uncapped per-county provider directory.
///
/// One entry per distinct provider actually seen in a county: maximum
/// claimed speeds over that provider's filings (`0.0` when every filing
/// was null) and the technology code of the provider's first-observed
/// filing. Entries are ordered by provider name.
#[must_use]
pub fn provider_directory(
    records: &[(String, AvailabilityRecord)],
) -> BTreeMap<String, Vec<ProviderEntry>> {
    struct ProviderAccumulator {
        down: Option<f64>,
        up: Option<f64>,
        tech_code: u8,
    }

    let mut counties: BTreeMap<String, BTreeMap<String, ProviderAccumulator>> = BTreeMap::new();

    for (geoid, record) in records {
        let provider = counties
            .entry(geoid.clone())
            .or_default()
            .entry(record.brand_name.clone())
            .or_insert_with(|| ProviderAccumulator {
                down: None,
                up: None,
                tech_code: record.technology.code(),
            });
        provider.down = fold_max(provider.down, record.max_down_mbps);
        provider.up = fold_max(provider.up, record.max_up_mbps);
    }

    counties
        .into_iter()
        .map(|(geoid, providers)| {
            let entries = providers
                .into_iter()
                .map(|(name, acc)| ProviderEntry {
                    name,
                    fcc_claimed_down: acc.down.unwrap_or(0.0),
                    fcc_claimed_up: acc.up.unwrap_or(0.0),
                    tech_code: acc.tech_code,
                })
                .collect();
            (geoid, entries)
        })
        .collect()
}

/// Folds a nullable sample into a running maximum, ignoring nulls.
fn fold_max(current: Option<f64>, sample: Option<f64>) -> Option<f64> {
    match (current, sample) {
        (Some(max), Some(value)) => Some(max.max(value)),
        (None, Some(value)) => Some(value),
        (max, None) => max,
    }
}
