#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial index for county attribution.
//!
//! Builds an R-tree over the county boundary set and attributes raw
//! availability records (points or census-block identifiers) and decoded
//! speed tiles (polygons) to counties. Per-record failures never abort a
//! join; they are counted and returned so the run summary can surface
//! data-quality regressions.

pub mod quadkey;

use std::collections::BTreeSet;

use broadband_map_availability_models::{AvailabilityRecord, SpeedTile};
use broadband_map_geography_models::{CountyPolygon, fips};
use geo::{BoundingRect, Intersects, MultiPolygon, Polygon};
use rstar::{AABB, RTree, RTreeObject};

/// A county boundary stored in the R-tree with its metadata.
struct CountyEntry {
    geoid: String,
    /// Position in the supplied boundary-set order. Shared-edge ties
    /// resolve to the lowest position.
    position: usize,
    envelope: AABB<[f64; 2]>,
    boundary: MultiPolygon<f64>,
}

impl RTreeObject for CountyEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over the county boundary set.
///
/// Constructed once per run and shared by both join paths. Provides
/// point-in-polygon lookups, tile-polygon intersection queries, and exact
/// GEOID membership checks for the identifier-based join.
pub struct CountyIndex {
    counties: RTree<CountyEntry>,
    geoids: BTreeSet<String>,
}

impl CountyIndex {
    /// Builds the R-tree from the boundary set.
    ///
    /// Boundary order is retained: where a point sits exactly on a shared
    /// county edge, the earliest county in the supplied order wins. This
    /// is a documented approximation, not a correctness guarantee.
    #[must_use]
    pub fn new(counties: &[CountyPolygon]) -> Self {
        let geoids = counties.iter().map(|c| c.geoid.clone()).collect();

        let entries = counties
            .iter()
            .enumerate()
            .map(|(position, county)| CountyEntry {
                geoid: county.geoid.clone(),
                position,
                envelope: compute_envelope(&county.boundary),
                boundary: county.boundary.clone(),
            })
            .collect();

        Self {
            counties: RTree::bulk_load(entries),
            geoids,
        }
    }

    /// Number of indexed counties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counties.size()
    }

    /// Whether the index holds no counties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counties.size() == 0
    }

    /// Whether a county GEOID exists in the boundary set.
    #[must_use]
    pub fn contains_geoid(&self, geoid: &str) -> bool {
        self.geoids.contains(geoid)
    }

    /// Looks up the county containing a point.
    ///
    /// Matching is boundary-inclusive so that points exactly on a county
    /// edge still attribute somewhere; among multiple candidates the
    /// county earliest in the supplied boundary order wins.
    #[must_use]
    pub fn locate_point(&self, lon: f64, lat: f64) -> Option<&str> {
        let point = geo::Point::new(lon, lat);
        let query_env = AABB::from_point([lon, lat]);

        self.counties
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.boundary.intersects(&point))
            .min_by_key(|entry| entry.position)
            .map(|entry| entry.geoid.as_str())
    }

    /// Returns every county whose area intersects the tile polygon, in
    /// supplied boundary order.
    ///
    /// A 600 m tile can straddle several counties; each gets the tile's
    /// full measurement. The predicate is a real polygon intersection,
    /// not a bounding-box overlap; the R-tree envelope pass only prunes
    /// candidates.
    #[must_use]
    pub fn intersecting(&self, tile: &Polygon<f64>) -> Vec<&str> {
        let Some(rect) = tile.bounding_rect() else {
            return Vec::new();
        };
        let query_env =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        let mut matches: Vec<&CountyEntry> = self
            .counties
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.boundary.intersects(tile))
            .collect();

        matches.sort_by_key(|entry| entry.position);
        matches.iter().map(|entry| entry.geoid.as_str()).collect()
    }
}

/// Result of joining availability records to counties.
#[derive(Debug)]
pub struct AvailabilityJoin {
    /// County-tagged records, one entry per matched record.
    pub matched: Vec<(String, AvailabilityRecord)>,
    /// Records dropped because no usable county identifier could be
    /// derived (wrong width, or neither identifier nor coordinates).
    pub malformed_identifiers: u64,
    /// Records whose identifier or point matched no county.
    pub unmatched: u64,
}

/// Joins availability records to counties.
///
/// Prefers the identifier path when a record carries a county GEOID or a
/// census block GEOID: a direct key lookup is exact and avoids
/// point-in-polygon error at boundaries. Coordinate-only records fall
/// back to the spatial lookup. Consumes the records; matched rows move
/// into the result unchanged.
#[must_use]
pub fn join_availability(
    records: Vec<AvailabilityRecord>,
    index: &CountyIndex,
) -> AvailabilityJoin {
    let mut join = AvailabilityJoin {
        matched: Vec::with_capacity(records.len()),
        malformed_identifiers: 0,
        unmatched: 0,
    };

    for record in records {
        let derived = record.county_geoid.clone().or_else(|| {
            record
                .block_geoid
                .as_deref()
                .map(|block| fips::derive_county_geoid(block).unwrap_or(block).to_owned())
        });

        if let Some(geoid) = derived {
            if !fips::is_county_geoid(&geoid) {
                join.malformed_identifiers += 1;
                continue;
            }
            if index.contains_geoid(&geoid) {
                join.matched.push((geoid, record));
            } else {
                join.unmatched += 1;
            }
        } else if let Some((lon, lat)) = record.coordinates() {
            match index.locate_point(lon, lat) {
                Some(geoid) => join.matched.push((geoid.to_owned(), record)),
                None => join.unmatched += 1,
            }
        } else {
            join.malformed_identifiers += 1;
        }
    }

    join
}

/// Result of joining speed tiles to counties.
#[derive(Debug)]
pub struct TileJoin {
    /// County-tagged tiles. A tile straddling several counties appears
    /// once per county.
    pub matched: Vec<(String, SpeedTile)>,
    /// Tiles dropped because their quadkey failed to decode.
    pub invalid_quadkeys: u64,
    /// Tiles whose polygon intersected no county.
    pub unmatched: u64,
}

/// Decodes each tile's quadkey and joins the tile polygon to counties by
/// area intersection.
///
/// An undecodable quadkey drops that single tile, never the run.
#[must_use]
pub fn join_tiles(tiles: Vec<SpeedTile>, index: &CountyIndex) -> TileJoin {
    let mut join = TileJoin {
        matched: Vec::with_capacity(tiles.len()),
        invalid_quadkeys: 0,
        unmatched: 0,
    };

    for tile in tiles {
        let polygon = match quadkey::quadkey_to_polygon(&tile.quadkey) {
            Ok(polygon) => polygon,
            Err(err) => {
                log::debug!("Dropping tile: {err}");
                join.invalid_quadkeys += 1;
                continue;
            }
        };

        let geoids = index.intersecting(&polygon);
        if geoids.is_empty() {
            join.unmatched += 1;
            continue;
        }

        for geoid in geoids {
            join.matched.push((geoid.to_owned(), tile.clone()));
        }
    }

    join
}

/// Computes the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(boundary: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    boundary.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use broadband_map_availability_models::Technology;
    use geo::{LineString, polygon};

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

    fn record(location_id: &str) -> AvailabilityRecord {
        AvailabilityRecord {
            brand_name: "Test ISP".to_owned(),
            location_id: location_id.to_owned(),
            technology: Technology::UnlicensedFixedWireless,
            max_down_mbps: Some(100.0),
            max_up_mbps: Some(20.0),
            longitude: None,
            latitude: None,
            block_geoid: None,
            county_geoid: None,
        }
    }

    fn two_county_index() -> CountyIndex {
        CountyIndex::new(&[
            square("48001", "Anderson", 0.0, 0.0, 1.0),
            square("48003", "Andrews", 1.0, 0.0, 1.0),
        ])
    }

    #[test]
    fn locates_interior_point() {
        let index = two_county_index();
        assert_eq!(index.locate_point(0.5, 0.5), Some("48001"));
        assert_eq!(index.locate_point(1.5, 0.5), Some("48003"));
        assert_eq!(index.locate_point(5.0, 5.0), None);
    }

    #[test]
    fn shared_edge_resolves_to_first_supplied_county() {
        let index = two_county_index();
        // x = 1.0 lies exactly on the edge shared by both squares.
        assert_eq!(index.locate_point(1.0, 0.5), Some("48001"));
    }

    #[test]
    fn tile_straddling_two_counties_matches_both() {
        let index = two_county_index();
        let tile = polygon![
            (x: 0.8, y: 0.2),
            (x: 1.2, y: 0.2),
            (x: 1.2, y: 0.6),
            (x: 0.8, y: 0.6),
            (x: 0.8, y: 0.2),
        ];
        assert_eq!(index.intersecting(&tile), vec!["48001", "48003"]);
    }

    #[test]
    fn tile_outside_all_counties_matches_none() {
        let index = two_county_index();
        let tile = polygon![
            (x: 10.0, y: 10.0),
            (x: 11.0, y: 10.0),
            (x: 11.0, y: 11.0),
            (x: 10.0, y: 11.0),
            (x: 10.0, y: 10.0),
        ];
        assert!(index.intersecting(&tile).is_empty());
    }

    #[test]
    fn identifier_path_beats_coordinates() {
        let index = two_county_index();
        let mut r = record("L1");
        // Coordinates point into 48001, but the block GEOID derives 48003;
        // the exact identifier path must win.
        r.longitude = Some(0.5);
        r.latitude = Some(0.5);
        r.block_geoid = Some("480030204023001".to_owned());

        let join = join_availability(vec![r], &index);
        assert_eq!(join.matched.len(), 1);
        assert_eq!(join.matched[0].0, "48003");
        assert_eq!(join.unmatched, 0);
    }

    #[test]
    fn short_identifier_is_malformed() {
        let index = two_county_index();
        let mut r = record("L1");
        r.block_geoid = Some("480".to_owned());

        let join = join_availability(vec![r], &index);
        assert!(join.matched.is_empty());
        assert_eq!(join.malformed_identifiers, 1);
    }

    #[test]
    fn record_without_location_is_malformed() {
        let index = two_county_index();
        let join = join_availability(vec![record("L1")], &index);
        assert!(join.matched.is_empty());
        assert_eq!(join.malformed_identifiers, 1);
    }

    #[test]
    fn unknown_geoid_is_unmatched() {
        let index = two_county_index();
        let mut r = record("L1");
        r.county_geoid = Some("99999".to_owned());

        let join = join_availability(vec![r], &index);
        assert!(join.matched.is_empty());
        assert_eq!(join.unmatched, 1);
    }

    #[test]
    fn coordinate_fallback_matches() {
        let index = two_county_index();
        let mut r = record("L1");
        r.longitude = Some(1.5);
        r.latitude = Some(0.5);

        let join = join_availability(vec![r], &index);
        assert_eq!(join.matched.len(), 1);
        assert_eq!(join.matched[0].0, "48003");
    }

    #[test]
    fn invalid_quadkey_drops_single_tile() {
        let index = two_county_index();
        let tiles = vec![
            SpeedTile {
                quadkey: "bogus".to_owned(),
                avg_down_mbps: 50.0,
                avg_up_mbps: 10.0,
                tests: 12,
            },
            SpeedTile {
                // Zoom-1 northeast quadrant covers both test squares.
                quadkey: "1".to_owned(),
                avg_down_mbps: 80.0,
                avg_up_mbps: 16.0,
                tests: 40,
            },
        ];

        let join = join_tiles(tiles, &index);
        assert_eq!(join.invalid_quadkeys, 1);
        assert_eq!(join.matched.len(), 2);
    }

    #[test]
    fn empty_index_reports_empty() {
        let index = CountyIndex::new(&[]);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn degenerate_tile_polygon_matches_nothing() {
        let index = two_county_index();
        let empty = Polygon::new(LineString::new(Vec::new()), vec![]);
        assert!(index.intersecting(&empty).is_empty());
    }
}
