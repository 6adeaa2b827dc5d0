//! County boundary loading from a GeoJSON `FeatureCollection`.
//!
//! Accepts both the pipeline's canonical property names (`GEOID`,
//! `NAME`) and the names found in Texas GIS county exports
//! (`FIPS_ST_CNTY_CD`, `CNTY_NM`). `Polygon` and `MultiPolygon`
//! geometries are both accepted; features missing an identifier or a
//! usable geometry are skipped with a warning.

use std::path::Path;

use broadband_map_geography_models::CountyPolygon;
use geo::MultiPolygon;
use geojson::{Feature, GeoJson};

use crate::IngestError;

/// Property names tried, in order, for the county identifier.
const GEOID_PROPERTIES: &[&str] = &["GEOID", "FIPS_ST_CNTY_CD"];

/// Property names tried, in order, for the county display name.
const NAME_PROPERTIES: &[&str] = &["NAME", "CNTY_NM"];

/// Loads county boundaries from a GeoJSON file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or is not a
/// GeoJSON `FeatureCollection`.
pub fn load_counties_geojson(path: &Path) -> Result<Vec<CountyPolygon>, IngestError> {
    log::info!("Loading county boundaries from {}", path.display());
    parse_counties(&std::fs::read_to_string(path)?)
}

/// Parses county boundaries from a GeoJSON string.
///
/// # Errors
///
/// Returns [`IngestError`] on invalid GeoJSON or a non-`FeatureCollection`
/// root. Unusable features are skipped, never fatal.
pub fn parse_counties(geojson_str: &str) -> Result<Vec<CountyPolygon>, IngestError> {
    let geojson: GeoJson = geojson_str.parse::<GeoJson>()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(IngestError::NotFeatureCollection);
    };

    let mut counties = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let Some(geoid) = string_property(&feature, GEOID_PROPERTIES) else {
            log::warn!("Skipping boundary feature without a county identifier");
            continue;
        };
        let name = string_property(&feature, NAME_PROPERTIES).unwrap_or_else(|| geoid.clone());

        let Some(boundary) = feature_multipolygon(&feature) else {
            log::warn!("Skipping boundary {geoid}: no usable polygon geometry");
            continue;
        };

        counties.push(CountyPolygon {
            geoid,
            name,
            boundary,
        });
    }

    log::info!("  {} county boundaries loaded", counties.len());
    Ok(counties)
}

/// Reads the first present property among `keys` as a string.
///
/// Numeric identifiers (some exports store FIPS codes as numbers) are
/// stringified.
fn string_property(feature: &Feature, keys: &[&str]) -> Option<String> {
    for &key in keys {
        match feature.property(key) {
            Some(serde_json::Value::String(value)) if !value.is_empty() => {
                return Some(value.clone());
            }
            Some(serde_json::Value::Number(value)) => return Some(value.to_string()),
            _ => {}
        }
    }
    None
}

/// Converts a feature's geometry into a [`MultiPolygon`], accepting both
/// `Polygon` and `MultiPolygon` geometry types.
fn feature_multipolygon(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geometry = feature.geometry.as_ref()?;
    let geo_geometry: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geometry {
        geo::Geometry::MultiPolygon(multi) => Some(multi),
        geo::Geometry::Polygon(polygon) => Some(MultiPolygon(vec![polygon])),
        _ => None,
    }
}
