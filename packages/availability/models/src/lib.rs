#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Broadband availability and speed-test measurement types.
//!
//! This crate defines the two raw input datasets of the pipeline: FCC BDC
//! availability filings (one row per provider per serviceable location) and
//! Ookla open-data speed tiles (one row per quadkey tile), plus the FCC
//! technology-code taxonomy shared across the system.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// FCC BDC technology codes for fixed broadband deployments.
///
/// The BDC publishes availability per technology; the numeric codes are
/// fixed by the FCC data specification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Technology {
    /// Code 10: Copper wire (DSL)
    Copper,
    /// Code 40: Coaxial cable
    Cable,
    /// Code 50: Optical fiber to the premises
    Fiber,
    /// Code 60: Geostationary satellite
    GsoSatellite,
    /// Code 61: Non-geostationary satellite
    NgsoSatellite,
    /// Code 70: Unlicensed terrestrial fixed wireless
    UnlicensedFixedWireless,
    /// Code 71: Licensed terrestrial fixed wireless
    LicensedFixedWireless,
    /// Code 72: Licensed-by-rule terrestrial fixed wireless
    LbrFixedWireless,
    /// Code 0: Other / unrecognized
    Other,
}

impl Technology {
    /// Returns the FCC numeric code for this technology.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Copper => 10,
            Self::Cable => 40,
            Self::Fiber => 50,
            Self::GsoSatellite => 60,
            Self::NgsoSatellite => 61,
            Self::UnlicensedFixedWireless => 70,
            Self::LicensedFixedWireless => 71,
            Self::LbrFixedWireless => 72,
            Self::Other => 0,
        }
    }

    /// Creates a technology from an FCC numeric code.
    ///
    /// Codes outside the published vocabulary map to [`Self::Other`];
    /// rows with an unknown technology are still usable availability data.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            10 => Self::Copper,
            40 => Self::Cable,
            50 => Self::Fiber,
            60 => Self::GsoSatellite,
            61 => Self::NgsoSatellite,
            70 => Self::UnlicensedFixedWireless,
            71 => Self::LicensedFixedWireless,
            72 => Self::LbrFixedWireless,
            _ => Self::Other,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Copper,
            Self::Cable,
            Self::Fiber,
            Self::GsoSatellite,
            Self::NgsoSatellite,
            Self::UnlicensedFixedWireless,
            Self::LicensedFixedWireless,
            Self::LbrFixedWireless,
            Self::Other,
        ]
    }
}

/// A single FCC BDC availability filing row.
///
/// Each row describes one provider's claimed service at one serviceable
/// location. The location is identified either by explicit coordinates or
/// by a census block GEOID (from which the enclosing county is derived),
/// or by a pre-derived county GEOID when the dataset carries one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRecord {
    /// Provider brand name as filed (e.g. "Rise Broadband").
    pub brand_name: String,
    /// BDC serviceable-location identifier.
    pub location_id: String,
    /// Deployment technology for this filing.
    pub technology: Technology,
    /// Maximum advertised download speed in Mbps. `None` when the source
    /// field was missing or unparseable.
    pub max_down_mbps: Option<f64>,
    /// Maximum advertised upload speed in Mbps.
    pub max_up_mbps: Option<f64>,
    /// Location longitude, when the row carries coordinates.
    pub longitude: Option<f64>,
    /// Location latitude, when the row carries coordinates.
    pub latitude: Option<f64>,
    /// 15-character census block GEOID, when present.
    pub block_geoid: Option<String>,
    /// 5-character county GEOID, when the dataset pre-derived it.
    pub county_geoid: Option<String>,
}

impl AvailabilityRecord {
    /// Returns the row's coordinates as `(longitude, latitude)` when both
    /// are present.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) => Some((lon, lat)),
            _ => None,
        }
    }
}

/// One Ookla open-data speed-test tile.
///
/// Tiles are addressed by Bing-scheme quadkey (zoom 16 in the published
/// data, roughly 600 m on a side) and carry speeds averaged over all tests
/// taken inside the tile during the quarter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedTile {
    /// Bing Maps quadkey; its length is the tile's zoom level.
    pub quadkey: String,
    /// Average measured download speed in Mbps.
    pub avg_down_mbps: f64,
    /// Average measured upload speed in Mbps.
    pub avg_up_mbps: f64,
    /// Number of speed tests taken in this tile. Tiles with zero tests
    /// carry no weight in aggregation.
    pub tests: u64,
}

/// One provider's entry in the per-county provider directory.
///
/// Field names are the output wire format of `providers.json` and must not
/// be renamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Provider brand name.
    pub name: String,
    /// Maximum claimed download speed attributable to this provider in the
    /// county, in Mbps. `0.0` when every filing had an unknown speed.
    pub fcc_claimed_down: f64,
    /// Maximum claimed upload speed, in Mbps.
    pub fcc_claimed_up: f64,
    /// FCC technology code of the provider's first-observed filing in the
    /// county.
    pub tech_code: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technology_code_roundtrip() {
        for tech in Technology::all() {
            if *tech == Technology::Other {
                continue;
            }
            assert_eq!(Technology::from_code(tech.code()), *tech);
        }
    }

    #[test]
    fn unknown_codes_map_to_other() {
        assert_eq!(Technology::from_code(0), Technology::Other);
        assert_eq!(Technology::from_code(99), Technology::Other);
        assert_eq!(Technology::Other.code(), 0);
    }

    #[test]
    fn coordinates_require_both_axes() {
        let mut record = AvailabilityRecord {
            brand_name: "Test ISP".to_string(),
            location_id: "L1".to_string(),
            technology: Technology::UnlicensedFixedWireless,
            max_down_mbps: Some(100.0),
            max_up_mbps: Some(20.0),
            longitude: Some(-97.5),
            latitude: None,
            block_geoid: None,
            county_geoid: None,
        };
        assert_eq!(record.coordinates(), None);

        record.latitude = Some(31.0);
        assert_eq!(record.coordinates(), Some((-97.5, 31.0)));
    }

    #[test]
    fn provider_entry_wire_field_names() {
        let entry = ProviderEntry {
            name: "Test ISP".to_string(),
            fcc_claimed_down: 100.0,
            fcc_claimed_up: 20.0,
            tech_code: 70,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("fcc_claimed_down").is_some());
        assert!(json.get("fcc_claimed_up").is_some());
        assert!(json.get("tech_code").is_some());
    }
}
