//! End-to-end heightmap generation.
//!
//! One request runs: bounding box, covering tiles, per-tile fetch + decode +
//! water mask (in parallel), stitch, crop, normalize. The per-tile results
//! are collected before stitching starts; if any tile fails the whole
//! request fails and no partial mosaic is built.

use crate::bbox::{BoundingBox, GeoPoint};
use crate::fetch::TileSource;
use crate::grid::Grid;
use crate::hgt::decode_hgt;
use crate::mosaic::{assemble, Mosaic};
use crate::normalize::{normalize, Heightmap};
use crate::profile::DatasetProfile;
use crate::projection::crop_to_bbox;
use crate::tile::TileCoord;
use crate::water::apply_water_mask;
use crate::Result;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Heightmap generator bound to one dataset profile and tile source.
#[derive(Debug)]
pub struct HeightmapPipeline<S> {
    profile: DatasetProfile,
    source: S,
}

impl<S: TileSource> HeightmapPipeline<S> {
    /// Create a pipeline. The profile is validated here.
    pub fn new(profile: DatasetProfile, source: S) -> Result<Self> {
        profile.validate()?;
        Ok(Self { profile, source })
    }

    /// Get the dataset profile.
    pub fn profile(&self) -> &DatasetProfile {
        &self.profile
    }

    /// Get the tile source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Heightmap for a square of `extent_km` centered on `center`.
    pub fn generate(&self, center: GeoPoint, extent_km: f64) -> Result<Heightmap> {
        let bbox = BoundingBox::around(center, extent_km)?;
        info!(
            "{} km around ({:.5}, {:.5}): lat {:.5}..{:.5}, lon {:.5}..{:.5}",
            extent_km, center.lat, center.lon, bbox.bottom, bbox.top, bbox.left, bbox.right
        );
        self.render(&bbox)
    }

    /// Heightmap for an explicit bounding box.
    pub fn render(&self, bbox: &BoundingBox) -> Result<Heightmap> {
        let mosaic = self.build_mosaic(bbox)?;
        let cropped = crop_to_bbox(bbox, &mosaic)?;
        if let Some((lo, hi)) = cropped.min_max() {
            debug!(
                "cropped {}x{}, elevation {}..{} m",
                cropped.rows(),
                cropped.cols(),
                lo,
                hi
            );
        }

        let heightmap = normalize(&cropped, &self.profile.normalize_params())?;
        info!("heightmap {}x{} ready", heightmap.side(), heightmap.side());
        Ok(heightmap)
    }

    /// Load every tile covering `bbox` and stitch them.
    pub fn build_mosaic(&self, bbox: &BoundingBox) -> Result<Mosaic> {
        let coords = bbox.covering_tiles();
        let names: Vec<String> = coords.iter().map(TileCoord::name).collect();
        info!("tiles: {}", names.join(", "));

        let tiles = coords
            .par_iter()
            .map(|&coord| self.load_tile(coord).map(|grid| (coord, grid)))
            .collect::<Result<BTreeMap<TileCoord, Grid>>>()?;

        let mosaic = assemble(tiles, self.profile.stack_order)?;
        debug!(
            "mosaic {}x{} anchored at {}",
            mosaic.grid().rows(),
            mosaic.grid().cols(),
            mosaic.anchor()
        );
        Ok(mosaic)
    }

    /// Fetch, decode and mask one tile.
    pub fn load_tile(&self, coord: TileCoord) -> Result<Grid> {
        let locators = coord.locators(&self.profile);
        let bytes = self.source.elevation_bytes(&locators)?;
        let mut grid = decode_hgt(&coord.name(), &bytes, self.profile.tile_side)?;

        if let Some(value) = self.profile.zero_elevation_value {
            let replaced = replace_zeros(&mut grid, value);
            debug!("{}: {} zero samples set to {}", coord, replaced, value);
        }

        if locators.water_url.is_some() {
            let water = self.source.water_polygons(&locators)?;
            let transform = coord.transform(self.profile.tile_side);
            let changed = apply_water_mask(&mut grid, &water, &transform, self.profile.seabed)?;
            debug!(
                "{}: {} water polygons, {} pixels set to seabed",
                coord,
                water.len(),
                changed
            );
        }

        Ok(grid)
    }
}

fn replace_zeros(grid: &mut Grid, value: f32) -> usize {
    let mut replaced = 0;
    for v in grid.data_mut().iter_mut().filter(|v| **v == 0.0) {
        *v = value;
        replaced += 1;
    }
    replaced
}
