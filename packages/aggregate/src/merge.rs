//! Merge per-county aggregates onto the authoritative boundary set.
//!
//! Output cardinality is driven by the boundary set, never by which
//! counties happened to have data: every [`CountyPolygon`] produces
//! exactly one [`CountyRecord`], with missing aggregates replaced by the
//! [`DefaultSpeeds`] policy. The overstatement ratio is computed after
//! defaulting, so it is always defined (measured download defaults to a
//! positive value).

use std::collections::BTreeMap;

use broadband_map_geography_models::{CountyPolygon, CountyRecord, CountyStats, DefaultSpeeds};

/// Merges aggregates onto the boundary set, filling defaults.
///
/// Consumes the boundary set; each polygon moves into its output record.
/// Counties are emitted in boundary-set order. The function is pure:
/// identical inputs produce identical output, so re-running it is safe.
#[must_use]
pub fn merge_and_default(
    counties: Vec<CountyPolygon>,
    stats: &BTreeMap<String, CountyStats>,
    defaults: &DefaultSpeeds,
) -> Vec<CountyRecord> {
    let mut defaulted = 0usize;

    let records: Vec<CountyRecord> = counties
        .into_iter()
        .map(|county| {
            let county_stats = stats.get(&county.geoid);
            if county_stats.is_none() {
                defaulted += 1;
            }

            let claimed_down = county_stats
                .and_then(|s| s.claimed_down_mbps)
                .unwrap_or(defaults.claimed_down_mbps);
            let claimed_up = county_stats
                .and_then(|s| s.claimed_up_mbps)
                .unwrap_or(defaults.claimed_up_mbps);
            let actual_down = county_stats
                .and_then(|s| s.actual_down_mbps)
                .unwrap_or(defaults.actual_down_mbps);
            let actual_up = county_stats
                .and_then(|s| s.actual_up_mbps)
                .unwrap_or(defaults.actual_up_mbps);
            let top_providers = county_stats
                .map(|s| s.top_providers.clone())
                .unwrap_or_default();

            CountyRecord {
                geoid: county.geoid,
                name: county.name,
                boundary: county.boundary,
                claimed_down_mbps: claimed_down,
                claimed_up_mbps: claimed_up,
                actual_down_mbps: actual_down,
                actual_up_mbps: actual_up,
                overstatement_ratio: round_hundredths(claimed_down / actual_down),
                top_providers,
            }
        })
        .collect();

    log::info!(
        "Merged {} counties ({defaulted} with no matched data)",
        records.len()
    );

    records
}

/// Rounds to 2 decimal places, half away from zero.
fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use geo::{MultiPolygon, polygon};

    use super::*;

    fn county(geoid: &str, name: &str, offset: f64) -> CountyPolygon {
        let ring = polygon![
            (x: offset, y: 0.0),
            (x: offset + 1.0, y: 0.0),
            (x: offset + 1.0, y: 1.0),
            (x: offset, y: 1.0),
            (x: offset, y: 0.0),
        ];
        CountyPolygon {
            geoid: geoid.to_owned(),
            name: name.to_owned(),
            boundary: MultiPolygon(vec![ring]),
        }
    }

    fn boundary_set() -> Vec<CountyPolygon> {
        vec![
            county("48001", "Anderson", 0.0),
            county("48003", "Andrews", 1.0),
            county("48005", "Angelina", 2.0),
        ]
    }

    #[test]
    fn county_without_data_gets_documented_defaults() {
        let records = merge_and_default(
            boundary_set(),
            &BTreeMap::new(),
            &DefaultSpeeds::default(),
        );

        let record = &records[0];
        assert_eq!(record.claimed_down_mbps, 25.0);
        assert_eq!(record.claimed_up_mbps, 3.0);
        assert_eq!(record.actual_down_mbps, 10.0);
        assert_eq!(record.actual_up_mbps, 2.0);
        assert_eq!(record.overstatement_ratio, 2.5);
        assert!(record.top_providers.is_empty());
    }

    #[test]
    fn cardinality_follows_boundary_set() {
        let mut stats = BTreeMap::new();
        stats.insert(
            "48003".to_owned(),
            CountyStats {
                claimed_down_mbps: Some(200.0),
                ..CountyStats::default()
            },
        );
        // A county absent from the boundary set contributes nothing.
        stats.insert(
            "99999".to_owned(),
            CountyStats {
                claimed_down_mbps: Some(1.0),
                ..CountyStats::default()
            },
        );

        let records = merge_and_default(boundary_set(), &stats, &DefaultSpeeds::default());
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.geoid != "99999"));
    }

    #[test]
    fn partial_stats_default_only_missing_fields() {
        let mut stats = BTreeMap::new();
        stats.insert(
            "48001".to_owned(),
            CountyStats {
                claimed_down_mbps: Some(150.0),
                claimed_up_mbps: None,
                top_providers: vec!["Acme".to_owned()],
                actual_down_mbps: Some(60.0),
                actual_up_mbps: None,
            },
        );

        let records = merge_and_default(boundary_set(), &stats, &DefaultSpeeds::default());
        let record = &records[0];
        assert_eq!(record.claimed_down_mbps, 150.0);
        assert_eq!(record.claimed_up_mbps, 3.0);
        assert_eq!(record.actual_down_mbps, 60.0);
        assert_eq!(record.actual_up_mbps, 2.0);
        assert_eq!(record.overstatement_ratio, 2.5);
        assert_eq!(record.top_providers, vec!["Acme"]);
    }

    #[test]
    fn ratio_is_rounded_to_hundredths() {
        let mut stats = BTreeMap::new();
        stats.insert(
            "48001".to_owned(),
            CountyStats {
                claimed_down_mbps: Some(100.0),
                actual_down_mbps: Some(3.0),
                ..CountyStats::default()
            },
        );

        let records = merge_and_default(boundary_set(), &stats, &DefaultSpeeds::default());
        // 100 / 3 = 33.333... -> 33.33
        assert_eq!(records[0].overstatement_ratio, 33.33);
    }

    #[test]
    fn ratio_is_always_positive_and_finite() {
        let records = merge_and_default(
            boundary_set(),
            &BTreeMap::new(),
            &DefaultSpeeds::default(),
        );
        for record in &records {
            assert!(record.overstatement_ratio.is_finite());
            assert!(record.overstatement_ratio > 0.0);
        }
    }

    #[test]
    fn merge_is_idempotent() {
        let mut stats = BTreeMap::new();
        stats.insert(
            "48005".to_owned(),
            CountyStats {
                claimed_down_mbps: Some(500.0),
                claimed_up_mbps: Some(50.0),
                top_providers: vec!["Acme".to_owned(), "Zephyr".to_owned()],
                actual_down_mbps: Some(95.5),
                actual_up_mbps: Some(11.25),
            },
        );
        let defaults = DefaultSpeeds::default();

        let first = merge_and_default(boundary_set(), &stats, &defaults);
        let second = merge_and_default(boundary_set(), &stats, &defaults);
        assert_eq!(first, second);
    }

    #[test]
    fn custom_defaults_are_honored() {
        let defaults = DefaultSpeeds {
            claimed_down_mbps: 100.0,
            claimed_up_mbps: 20.0,
            actual_down_mbps: 50.0,
            actual_up_mbps: 5.0,
        };
        let records = merge_and_default(boundary_set(), &BTreeMap::new(), &defaults);
        assert_eq!(records[0].claimed_down_mbps, 100.0);
        assert_eq!(records[0].overstatement_ratio, 2.0);
    }
}
