//! GEOID derivation helpers.
//!
//! Census GEOIDs nest by prefix: a 15-character block GEOID starts with
//! the 11-character tract GEOID, which starts with the 5-character county
//! GEOID, which starts with the 2-character state FIPS code. The pipeline
//! joins everything on the county level.

/// Width of a county GEOID (state FIPS + county FIPS).
pub const COUNTY_GEOID_LEN: usize = 5;

/// Width of a state FIPS code.
pub const STATE_FIPS_LEN: usize = 2;

/// Derives the county GEOID from any finer-grained GEOID (block, block
/// group, or tract) by taking the first 5 characters.
///
/// Returns `None` when the input is too short to contain a county prefix.
#[must_use]
pub fn derive_county_geoid(geoid: &str) -> Option<&str> {
    if geoid.len() >= COUNTY_GEOID_LEN {
        Some(&geoid[..COUNTY_GEOID_LEN])
    } else {
        None
    }
}

/// Derives the state FIPS code from any GEOID (first 2 characters).
#[must_use]
pub fn derive_state_fips(geoid: &str) -> Option<&str> {
    if geoid.len() >= STATE_FIPS_LEN {
        Some(&geoid[..STATE_FIPS_LEN])
    } else {
        None
    }
}

/// Whether a string has the exact county GEOID width.
///
/// Identifiers failing this are dropped (and counted) by the join step
/// rather than silently matched against nothing.
#[must_use]
pub const fn is_county_geoid(geoid: &str) -> bool {
    geoid.len() == COUNTY_GEOID_LEN
}
