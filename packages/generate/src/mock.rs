//! Deterministic mock input generation.
//!
//! Produces a synthetic boundary set, availability CSV, and tile CSV that
//! exercise every pipeline path locally: identifier-based and
//! coordinate-based records, null claimed speeds, multi-county tiles, and
//! zero-test tiles. Values derive from index arithmetic only, so
//! re-running produces byte-identical files.

use std::fmt::Write as _;
use std::path::Path;

use broadband_map_spatial::quadkey;
use geojson::{Feature, FeatureCollection, Geometry};

use crate::BuildError;

/// Provider brands cycled across mock counties.
const PROVIDERS: &[&str] = &[
    "Lone Star Wireless",
    "Prairie Net",
    "Hill Country Broadband",
    "Bluebonnet Fiber",
    "Rio Grande Air",
];

/// Technology codes cycled across mock providers.
const TECH_CODES: &[u8] = &[70, 50, 40, 71];

/// Counties per grid row.
const GRID_COLS: usize = 8;

/// County square edge, in degrees.
const COUNTY_SIZE_DEG: f64 = 0.5;

/// Southwest corner of the mock grid (west Texas).
const ORIGIN_LON: f64 = -103.0;
const ORIGIN_LAT: f64 = 28.0;

/// Ookla publishes tiles at zoom 16.
const TILE_ZOOM: usize = 16;

/// Largest supported mock county count (Texas has 254).
pub const MAX_COUNTIES: usize = 254;

/// Writes `boundaries.geojson`, `availability.csv`, and `tiles.csv` into
/// the output directory.
///
/// # Errors
///
/// Returns [`BuildError`] on filesystem failure.
pub fn write_mock_inputs(output_dir: &Path, county_count: usize) -> Result<(), BuildError> {
    let count = county_count.min(MAX_COUNTIES);
    if count < county_count {
        log::warn!("Capping mock county count at {MAX_COUNTIES}");
    }

    std::fs::create_dir_all(output_dir)?;

    let boundaries_path = output_dir.join("boundaries.geojson");
    std::fs::write(&boundaries_path, boundaries_geojson(count)?)?;
    log::info!("Wrote {}", boundaries_path.display());

    let availability_path = output_dir.join("availability.csv");
    std::fs::write(&availability_path, availability_csv(count))?;
    log::info!("Wrote {}", availability_path.display());

    let tiles_path = output_dir.join("tiles.csv");
    std::fs::write(&tiles_path, tiles_csv(count))?;
    log::info!("Wrote {}", tiles_path.display());

    Ok(())
}

/// County GEOID in the Texas FIPS style: state 48 plus an odd county code.
fn geoid(i: usize) -> String {
    format!("48{:03}", 2 * i + 1)
}

/// Southwest corner of county `i` on the grid.
fn county_origin(i: usize) -> (f64, f64) {
    let col = f64_from(i % GRID_COLS);
    let row = f64_from(i / GRID_COLS);
    (
        COUNTY_SIZE_DEG.mul_add(col, ORIGIN_LON),
        COUNTY_SIZE_DEG.mul_add(row, ORIGIN_LAT),
    )
}

/// Center point of county `i`.
fn county_centroid(i: usize) -> (f64, f64) {
    let (lon, lat) = county_origin(i);
    (lon + COUNTY_SIZE_DEG / 2.0, lat + COUNTY_SIZE_DEG / 2.0)
}

fn boundaries_geojson(count: usize) -> Result<String, BuildError> {
    let features = (0..count)
        .map(|i| {
            let (min_lon, min_lat) = county_origin(i);
            let max_lon = min_lon + COUNTY_SIZE_DEG;
            let max_lat = min_lat + COUNTY_SIZE_DEG;

            let ring = vec![
                vec![min_lon, min_lat],
                vec![max_lon, min_lat],
                vec![max_lon, max_lat],
                vec![min_lon, max_lat],
                vec![min_lon, min_lat],
            ];

            let mut properties = serde_json::Map::new();
            properties.insert("GEOID".to_owned(), geoid(i).into());
            properties.insert("NAME".to_owned(), format!("Mock County {}", i + 1).into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::Polygon(vec![ring]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    Ok(serde_json::to_string(&collection)?)
}

fn availability_csv(count: usize) -> String {
    let mut csv = String::from(
        "brand_name,location_id,technology,max_advertised_download_speed,\
         max_advertised_upload_speed,latitude,longitude,block_geoid,county_geoid,state_abbr\n",
    );

    for i in 0..count {
        let county = geoid(i);
        let (centroid_lon, centroid_lat) = county_centroid(i);
        let provider_count = 2 + i % 3;

        for p in 0..provider_count {
            let brand = PROVIDERS[(i + p) % PROVIDERS.len()];
            let tech = TECH_CODES[(i + p) % TECH_CODES.len()];
            let locations = 1 + (i + p) % 4;

            for loc in 0..locations {
                let location_id = format!("{county}{p:02}{loc:03}");
                // Every seventh (county, provider) pairing files without
                // speeds, exercising the null-claim path.
                let (down, up) = if (i + p) % 7 == 0 {
                    (String::new(), String::new())
                } else {
                    let down = 25 + (i * 7 + p * 13) % 40 * 5;
                    (down.to_string(), (down / 5).to_string())
                };

                // Most rows join on the block GEOID; every fourth location
                // is coordinate-only to exercise point-in-polygon.
                if loc % 4 == 3 {
                    let lon = centroid_lon + 0.01 * f64_from(p + 1);
                    let lat = centroid_lat - 0.01 * f64_from(loc + 1);
                    let _ = writeln!(
                        csv,
                        "{brand},{location_id},{tech},{down},{up},{lat:.4},{lon:.4},,,TX"
                    );
                } else {
                    let block = format!("{county}{:010}", loc * 37 + p);
                    let _ = writeln!(
                        csv,
                        "{brand},{location_id},{tech},{down},{up},,,{block},,TX"
                    );
                }
            }
        }
    }

    csv
}

fn tiles_csv(count: usize) -> String {
    let mut csv = String::from("quadkey,avg_d_mbps,avg_u_mbps,tests\n");

    for i in 0..count {
        let (centroid_lon, centroid_lat) = county_centroid(i);

        // Two tiles per county: one at the centroid and one nudged toward
        // the shared corner so some tiles straddle county lines.
        for (t, (lon, lat)) in [
            (0usize, (centroid_lon, centroid_lat)),
            (1usize, (centroid_lon + COUNTY_SIZE_DEG / 2.0, centroid_lat)),
        ] {
            let Some(quadkey) = quadkey::point_to_quadkey(lon, lat, TILE_ZOOM) else {
                continue;
            };
            let down = 18 + (i * 11 + t * 17) % 45;
            let up = down / 4;
            // Zero-test tiles appear periodically and must carry no weight.
            let tests = if (i + t) % 9 == 0 { 0 } else { 5 + i * 13 % 50 };
            let _ = writeln!(csv, "{quadkey},{down},{up},{tests}");
        }
    }

    csv
}

#[allow(clippy::cast_precision_loss)]
fn f64_from(value: usize) -> f64 {
    value as f64
}
