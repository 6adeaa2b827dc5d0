//! Bing-scheme quadkey decoding.
//!
//! A quadkey addresses a Web Mercator tile; each character is a base-4
//! digit selecting one of four child quadrants, most significant first,
//! and the string length is the zoom level. Decoding is pure integer and
//! floating-point arithmetic with no projection library involved, so
//! identical input produces byte-identical output across runs.

use std::f64::consts::PI;

use geo::{LineString, Polygon};
use thiserror::Error;

/// Northernmost latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Southernmost latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -MAX_LAT;

/// Deepest zoom level accepted by the decoder. The Bing tile scheme tops
/// out at 23; beyond that the tile coordinates would not fit the scheme.
pub const MAX_ZOOM: usize = 23;

/// Error for a quadkey that cannot be decoded: empty, longer than
/// [`MAX_ZOOM`] characters, or containing a character outside `0`-`3`.
///
/// Fatal to the single tile carrying the quadkey, never to the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid quadkey {quadkey:?}: expected 1-{MAX_ZOOM} digits 0-3")]
pub struct InvalidQuadkey {
    /// The offending quadkey string.
    pub quadkey: String,
}

/// A tile's bounding box in degrees, longitude/latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

/// Decodes a quadkey into its tile bounding box.
///
/// Bit 0 of each digit contributes to the tile x coordinate, bit 1 to the
/// tile y coordinate (y grows southward). Longitude is linear in `x/n`;
/// latitude comes from the inverse Web Mercator projection evaluated at
/// `y` (northern edge) and `y + 1` (southern edge).
///
/// # Errors
///
/// Returns [`InvalidQuadkey`] for an empty, over-long, or non-base-4 key.
pub fn quadkey_to_bbox(quadkey: &str) -> Result<TileBounds, InvalidQuadkey> {
    let (x, y, zoom) = decode_tile(quadkey)?;

    #[allow(clippy::cast_precision_loss)]
    let n = f64::from(1u32 << zoom);

    let min_lon = f64::from(x) / n * 360.0 - 180.0;
    let max_lon = f64::from(x + 1) / n * 360.0 - 180.0;

    let max_lat = mercator_y_to_lat(f64::from(y), n);
    let min_lat = mercator_y_to_lat(f64::from(y + 1), n);

    Ok(TileBounds {
        min_lon,
        min_lat,
        max_lon,
        max_lat,
    })
}

/// Decodes a quadkey into its bounding polygon: a closed 5-point ring,
/// counter-clockwise from the southwest corner, first point repeated last.
///
/// # Errors
///
/// Returns [`InvalidQuadkey`] for an empty, over-long, or non-base-4 key.
pub fn quadkey_to_polygon(quadkey: &str) -> Result<Polygon<f64>, InvalidQuadkey> {
    let bounds = quadkey_to_bbox(quadkey)?;
    Ok(Polygon::new(
        LineString::from(vec![
            (bounds.min_lon, bounds.min_lat),
            (bounds.max_lon, bounds.min_lat),
            (bounds.max_lon, bounds.max_lat),
            (bounds.min_lon, bounds.max_lat),
            (bounds.min_lon, bounds.min_lat),
        ]),
        vec![],
    ))
}

/// Encodes the quadkey of the tile containing a point at the given zoom.
///
/// The inverse of [`quadkey_to_bbox`]: forward Web Mercator projection to
/// tile coordinates, then base-4 digit emission most significant first.
/// Returns `None` when the point is outside the Web Mercator latitude
/// range, the longitude is out of range, or the zoom is not in
/// `1..=MAX_ZOOM`.
#[must_use]
pub fn point_to_quadkey(lon: f64, lat: f64, zoom: usize) -> Option<String> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat)
        || !(-180.0..=180.0).contains(&lon)
        || zoom == 0
        || zoom > MAX_ZOOM
    {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = f64::from(1u32 << zoom);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let x = (((lon + 180.0) / 360.0 * n) as u32).min((1 << zoom) - 1);

    let lat_rad = lat.to_radians();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let y = (((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32).min((1 << zoom) - 1);

    let mut quadkey = String::with_capacity(zoom);
    for i in 0..zoom {
        let mask = 1u32 << (zoom - 1 - i);
        let mut digit = 0u8;
        if x & mask != 0 {
            digit += 1;
        }
        if y & mask != 0 {
            digit += 2;
        }
        quadkey.push(char::from(b'0' + digit));
    }

    Some(quadkey)
}

/// Decodes a quadkey into `(x, y, zoom)` tile coordinates.
fn decode_tile(quadkey: &str) -> Result<(u32, u32, usize), InvalidQuadkey> {
    let zoom = quadkey.len();
    if zoom == 0 || zoom > MAX_ZOOM {
        return Err(InvalidQuadkey {
            quadkey: quadkey.to_owned(),
        });
    }

    let mut x = 0u32;
    let mut y = 0u32;

    for (i, ch) in quadkey.chars().enumerate() {
        let digit = match ch {
            '0'..='3' => ch as u32 - '0' as u32,
            _ => {
                return Err(InvalidQuadkey {
                    quadkey: quadkey.to_owned(),
                });
            }
        };

        let mask = 1u32 << (zoom - 1 - i);
        if digit & 1 != 0 {
            x |= mask;
        }
        if digit & 2 != 0 {
            y |= mask;
        }
    }

    Ok((x, y, zoom))
}

/// Inverse Web Mercator: fractional tile y coordinate to latitude degrees.
fn mercator_y_to_lat(y: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees()
}
