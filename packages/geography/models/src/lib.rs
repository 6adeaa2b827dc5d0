#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! County boundary and per-county summary types.
//!
//! These types carry a county's polygon boundary through the pipeline and
//! hold the derived statistics that end up on the output feature
//! collection. Boundaries are plain longitude/latitude (EPSG:4326), no
//! projection.

pub mod fips;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// An authoritative county boundary.
///
/// The boundary set drives the output cardinality: the pipeline emits
/// exactly one [`CountyRecord`] per `CountyPolygon`, whether or not any
/// data matched the county.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyPolygon {
    /// 5-character county GEOID (state FIPS + county FIPS, e.g. "48113").
    pub geoid: String,
    /// Human-readable county name (e.g. "Dallas").
    pub name: String,
    /// County boundary in longitude/latitude.
    pub boundary: MultiPolygon<f64>,
}

/// Per-county statistics aggregated from matched records and tiles.
///
/// One `CountyStats` exists per county that appeared in either input; a
/// field is `None` when no matched data could produce a value (resolved
/// later by the defaulting policy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CountyStats {
    /// Maximum claimed download speed over matched filings, in Mbps.
    pub claimed_down_mbps: Option<f64>,
    /// Maximum claimed upload speed over matched filings, in Mbps.
    pub claimed_up_mbps: Option<f64>,
    /// Up to 3 provider brand names ranked by distinct serviceable
    /// locations, descending.
    pub top_providers: Vec<String>,
    /// Test-count-weighted average measured download speed, in Mbps.
    pub actual_down_mbps: Option<f64>,
    /// Test-count-weighted average measured upload speed, in Mbps.
    pub actual_up_mbps: Option<f64>,
}

/// A finished output row: one per county in the boundary set.
///
/// Created once by the merge step with every field populated (missing
/// aggregates replaced by [`DefaultSpeeds`]) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyRecord {
    /// 5-character county GEOID.
    pub geoid: String,
    /// County name.
    pub name: String,
    /// County boundary in longitude/latitude.
    pub boundary: MultiPolygon<f64>,
    /// Claimed download speed in Mbps (defaulted when no data).
    pub claimed_down_mbps: f64,
    /// Claimed upload speed in Mbps.
    pub claimed_up_mbps: f64,
    /// Measured download speed in Mbps.
    pub actual_down_mbps: f64,
    /// Measured upload speed in Mbps.
    pub actual_up_mbps: f64,
    /// `claimed_down / actual_down`, rounded to 2 decimal places.
    /// Computed after defaulting, so always positive and finite.
    pub overstatement_ratio: f64,
    /// Up to 3 provider brand names, rank order.
    pub top_providers: Vec<String>,
}

/// Fallback speeds applied to counties with no matched data.
///
/// A single named configuration passed explicitly into the merge step so
/// the defaulting policy stays testable and overridable. The defaults are
/// the FCC's 25/3 Mbps broadband benchmark on the claimed side and a
/// conservative 10/2 Mbps baseline on the measured side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultSpeeds {
    /// Claimed download fallback, in Mbps.
    pub claimed_down_mbps: f64,
    /// Claimed upload fallback, in Mbps.
    pub claimed_up_mbps: f64,
    /// Measured download fallback, in Mbps. Must be positive: the
    /// overstatement ratio divides by it.
    pub actual_down_mbps: f64,
    /// Measured upload fallback, in Mbps.
    pub actual_up_mbps: f64,
}

impl Default for DefaultSpeeds {
    fn default() -> Self {
        Self {
            claimed_down_mbps: 25.0,
            claimed_up_mbps: 3.0,
            actual_down_mbps: 10.0,
            actual_up_mbps: 2.0,
        }
    }
}
