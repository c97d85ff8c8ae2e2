//! # terramap-dem
//!
//! Builds square 16-bit heightmaps from SRTM elevation tiles.
//!
//! ## Overview
//!
//! SRTM tiles cover one degree of latitude and longitude and are named by
//! their south-west corner, e.g. `N47W123` covers 47°N to 48°N and 123°W to
//! 122°W. A 1 arc-second tile has 3601x3601 samples, a 3 arc-second tile
//! 1201x1201; neighbouring tiles share their edge row/column.
//!
//! A request for a point and an extent in kilometres runs these steps:
//!
//! 1. [`BoundingBox::around`] computes the geographic box.
//! 2. [`BoundingBox::covering_tiles`] lists the 1, 2 or 4 tiles it touches.
//! 3. Each tile is fetched through a [`TileSource`], decoded with
//!    [`decode_hgt`] and, if the profile has a water archive, masked with
//!    [`apply_water_mask`].
//! 4. [`assemble`] stitches the tiles into a [`Mosaic`].
//! 5. [`crop_to_bbox`] cuts out the box.
//! 6. [`normalize`] offsets, scales, resamples, smooths and clips to
//!    `[0, 65535]`.
//!
//! All constants come from a [`DatasetProfile`]; `srtm1` and `srtm3`
//! presets are provided.
//!
//! ## Example
//!
//! ```no_run
//! use terramap_dem::{DatasetProfile, GeoPoint, HeightmapPipeline, HttpTileFetcher};
//!
//! let fetcher = HttpTileFetcher::new("./tile_cache")?;
//! let pipeline = HeightmapPipeline::new(DatasetProfile::srtm1(), fetcher)?;
//!
//! let center = GeoPoint::new(47.6062, -122.3321)?;
//! let heightmap = pipeline.generate(center, 18.0)?;
//! println!("{} x {} pixels", heightmap.side(), heightmap.side());
//! # Ok::<(), terramap_dem::DemError>(())
//! ```

mod affine;
mod bbox;
mod error;
mod fetch;
mod grid;
mod hgt;
mod mosaic;
mod normalize;
mod pipeline;
mod profile;
mod projection;
mod tile;
mod water;

pub use affine::AffineTransform;
pub use bbox::{BoundingBox, GeoPoint, DEFAULT_EXTENT_KM, MAX_LATITUDE};
pub use error::DemError;
pub use fetch::{
    DownloadStats, HttpTileFetcher, TileSource, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY,
};
pub use grid::Grid;
pub use hgt::{decode_hgt, encode_hgt, VOID};
pub use mosaic::{assemble, Mosaic, StackOrder};
pub use normalize::{gaussian_blur, normalize, resample, Heightmap, NormalizeParams, HEIGHTMAP_MAX};
pub use pipeline::HeightmapPipeline;
pub use profile::{DatasetProfile, DEFAULT_OUTPUT_SIDE, SRTM1_TILE_SIDE, SRTM3_TILE_SIDE};
pub use projection::{crop_to_bbox, crop_window, CropWindow};
pub use tile::{TileCoord, TileLocators};
pub use water::{apply_water_mask, WaterPolygons};

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
