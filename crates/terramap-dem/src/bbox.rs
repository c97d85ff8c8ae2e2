//! Geographic bounding boxes sized in kilometers.

use crate::tile::TileCoord;
use crate::{DemError, Result};

/// Default ground extent of a generated map, in kilometers.
pub const DEFAULT_EXTENT_KM: f64 = 18.0;

/// Approximate ground distance of one arc-second at the equator, in meters.
const METERS_PER_ARCSEC: f64 = 30.0;

const ARCSEC_PER_DEG: f64 = 3600.0;

/// Latitudes beyond this are rejected; longitude scaling degenerates near the poles.
pub const MAX_LATITUDE: f64 = 85.0;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Latitude (positive = north).
    pub lat: f64,
    /// Longitude (positive = east).
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point, rejecting latitudes outside (-85, 85) and non-finite input.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() >= MAX_LATITUDE || lon.abs() > 180.0 {
            return Err(DemError::InvalidCoordinate { lat, lon });
        }
        Ok(Self { lat, lon })
    }
}

/// Geographic bounding box in degrees.
///
/// `top > bottom` and `right > left`; boxes crossing the antimeridian are
/// not representable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Northern edge.
    pub top: f64,
    /// Southern edge.
    pub bottom: f64,
    /// Western edge.
    pub left: f64,
    /// Eastern edge.
    pub right: f64,
}

impl BoundingBox {
    /// Build a square box of `extent_km` per side centered on `center`.
    ///
    /// One arc-second is taken as 30 m, so the latitude span is
    /// `extent_m / 108000` degrees. The longitude span is widened by
    /// `1 / cos(lat)` to compensate for meridian convergence.
    pub fn around(center: GeoPoint, extent_km: f64) -> Result<Self> {
        if !extent_km.is_finite() || extent_km <= 0.0 {
            return Err(DemError::InvalidExtent(extent_km));
        }
        if center.lat.abs() >= MAX_LATITUDE {
            return Err(DemError::InvalidCoordinate {
                lat: center.lat,
                lon: center.lon,
            });
        }

        let height = extent_km * 1000.0 / (METERS_PER_ARCSEC * ARCSEC_PER_DEG);
        let width = height / center.lat.to_radians().cos();

        Ok(Self {
            top: center.lat + height / 2.0,
            bottom: center.lat - height / 2.0,
            left: center.lon - width / 2.0,
            right: center.lon + width / 2.0,
        })
    }

    /// Latitude span in degrees.
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Longitude span in degrees.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Corners as `(lat, lon)`: NW, NE, SW, SE.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.top, self.left),
            (self.top, self.right),
            (self.bottom, self.left),
            (self.bottom, self.right),
        ]
    }

    /// Tiles containing the box corners, sorted and de-duplicated.
    ///
    /// For boxes smaller than one tile this is the full set of tiles the
    /// box touches.
    pub fn covering_tiles(&self) -> Vec<TileCoord> {
        let mut tiles: Vec<TileCoord> = self
            .corners()
            .iter()
            .map(|&(lat, lon)| TileCoord::from_lat_lon(lat, lon))
            .collect();
        tiles.sort();
        tiles.dedup();
        tiles
    }
}
