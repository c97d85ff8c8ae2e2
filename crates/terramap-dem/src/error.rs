//! Error types for the DEM crate.

use crate::projection::CropWindow;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building a heightmap.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error reading or writing a cached tile.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error when fetching tiles.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to download a tile or archive from the remote server.
    #[error("Failed to fetch {locator}: {reason}")]
    Fetch {
        /// URL that was requested.
        locator: String,
        /// Reason for failure.
        reason: String,
    },

    /// Downloaded archive could not be unpacked.
    #[error("Failed to unpack archive {locator}: {reason}")]
    Archive {
        /// URL the archive was downloaded from.
        locator: String,
        /// Reason for failure.
        reason: String,
    },

    /// Raw elevation tile has the wrong size.
    #[error("Tile {tile} has {actual} bytes, expected {expected}")]
    Decode {
        /// Tile name, e.g. `N47W123`.
        tile: String,
        /// Expected byte count (2 * side * side).
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },

    /// Water-boundary shapefile could not be read.
    #[error("Failed to read shapefile {}: {reason}", path.display())]
    Shapefile {
        /// Path to the `.shp` file.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Tile set cannot be stitched into a mosaic.
    #[error("Unsupported tile configuration: {0}")]
    Configuration(String),

    /// Crop window does not fit inside the stitched mosaic.
    #[error("Crop window {window} exceeds mosaic extent {rows}x{cols}")]
    Bounds {
        /// Requested window.
        window: CropWindow,
        /// Mosaic rows.
        rows: usize,
        /// Mosaic columns.
        cols: usize,
    },

    /// Coordinate outside the supported latitude range.
    #[error("Coordinate ({lat}, {lon}) is outside the supported range")]
    InvalidCoordinate {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
    },

    /// Ground extent is not a positive finite number.
    #[error("Invalid extent {0} km")]
    InvalidExtent(f64),

    /// Tile name cannot be parsed.
    #[error("Invalid tile name: {0}")]
    InvalidTileName(String),

    /// Dataset profile failed validation.
    #[error("Invalid dataset profile: {0}")]
    InvalidProfile(String),

    /// Dataset profile file is not valid YAML.
    #[error("Failed to parse dataset profile: {0}")]
    ProfileParse(#[from] serde_yaml::Error),
}
