//! Tile coordinates and the names/URLs derived from them.

use crate::affine::AffineTransform;
use crate::profile::DatasetProfile;
use crate::{DemError, Result};
use std::fmt;

/// A one-degree tile, keyed by its south-west corner.
///
/// Derived by flooring a coordinate, so (47.6, -122.3) is tile
/// (47, -123), named `N47W123`. Ordering is by latitude then longitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Latitude of the southern edge.
    pub lat: i32,
    /// Longitude of the western edge.
    pub lon: i32,
}

/// Names and remote locations of the files backing one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLocators {
    /// Elevation archive URL.
    pub elevation_url: String,
    /// Local cache file name of the decompressed elevation tile.
    pub elevation_cache_name: String,
    /// Water-boundary archive URL, if the profile masks water.
    pub water_url: Option<String>,
    /// Local cache stem of the water-boundary shapefile.
    pub water_cache_name: String,
}

impl TileCoord {
    /// Create a tile coordinate from its south-west corner.
    pub fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    /// The tile containing a coordinate.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.floor() as i32,
            lon: lon.floor() as i32,
        }
    }

    /// Parse a canonical name such as `N47W123` (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self> {
        let invalid = || DemError::InvalidTileName(name.to_string());
        let mut chars = name.chars().peekable();

        let is_north = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('N') => true,
            Some('S') => false,
            _ => return Err(invalid()),
        };
        let mut lat_str = String::new();
        while let Some(d) = chars.next_if(|c| c.is_ascii_digit()) {
            lat_str.push(d);
        }

        let is_east = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('E') => true,
            Some('W') => false,
            _ => return Err(invalid()),
        };
        let mut lon_str = String::new();
        while let Some(d) = chars.next_if(|c| c.is_ascii_digit()) {
            lon_str.push(d);
        }

        if lat_str.len() != 2 || lon_str.len() != 3 || chars.next().is_some() {
            return Err(invalid());
        }

        let lat: i32 = lat_str.parse().map_err(|_| invalid())?;
        let lon: i32 = lon_str.parse().map_err(|_| invalid())?;

        Ok(Self {
            lat: if is_north { lat } else { -lat },
            lon: if is_east { lon } else { -lon },
        })
    }

    /// Latitude half of the name, e.g. `N47`.
    pub fn lat_part(&self) -> String {
        if self.lat >= 0 {
            format!("N{:02}", self.lat)
        } else {
            format!("S{:02}", -self.lat)
        }
    }

    /// Longitude half of the name, e.g. `W123`.
    pub fn lon_part(&self) -> String {
        if self.lon >= 0 {
            format!("E{:03}", self.lon)
        } else {
            format!("W{:03}", -self.lon)
        }
    }

    /// Canonical elevation tile name, e.g. `N47W123`.
    pub fn name(&self) -> String {
        format!("{}{}", self.lat_part(), self.lon_part())
    }

    /// Water-boundary tile name: longitude first, lowercase, `e` suffix (`w123n47e`).
    pub fn water_name(&self) -> String {
        format!(
            "{}{}e",
            self.lon_part().to_lowercase(),
            self.lat_part().to_lowercase()
        )
    }

    /// `east` or `west`, as used by the SWBD archive directories.
    pub fn lon_half(&self) -> &'static str {
        if self.lon >= 0 {
            "east"
        } else {
            "west"
        }
    }

    /// Expand a URL template for this tile.
    ///
    /// Supported placeholders: `{name}`, `{lat}`, `{lon}`, `{water_name}`,
    /// `{lat_lower}`, `{lon_lower}`, `{lon_half}`.
    pub fn expand(&self, template: &str) -> String {
        let lat = self.lat_part();
        let lon = self.lon_part();
        template
            .replace("{name}", &self.name())
            .replace("{water_name}", &self.water_name())
            .replace("{lat_lower}", &lat.to_lowercase())
            .replace("{lon_lower}", &lon.to_lowercase())
            .replace("{lon_half}", self.lon_half())
            .replace("{lat}", &lat)
            .replace("{lon}", &lon)
    }

    /// All locators for this tile under a dataset profile.
    pub fn locators(&self, profile: &DatasetProfile) -> TileLocators {
        TileLocators {
            elevation_url: self.expand(&profile.elevation_url),
            elevation_cache_name: format!("{}.hgt", self.name()),
            water_url: profile.water_url.as_deref().map(|t| self.expand(t)),
            water_cache_name: self.water_name(),
        }
    }

    /// Pixel → geographic transform for a tile of `side` samples.
    ///
    /// Anchored at the north-west corner, i.e. one degree north of the key.
    pub fn transform(&self, side: usize) -> AffineTransform {
        AffineTransform::tile_to_geo(f64::from(self.lat + 1), f64::from(self.lon), side)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
