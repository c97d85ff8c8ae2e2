//! Stitching adjacent tiles into one raster.

use crate::affine::AffineTransform;
use crate::grid::Grid;
use crate::tile::TileCoord;
use crate::{DemError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Vertical placement of tiles that share a longitude.
///
/// SRTM rows run north to south, so the default puts the higher-latitude
/// tile on top. `SouthUp` exists for datasets stored the other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackOrder {
    /// Higher latitude first (row 0 is the northernmost row).
    #[default]
    NorthUp,
    /// Lower latitude first.
    SouthUp,
}

/// A stitched raster of 1, 2 or 4 tiles.
#[derive(Debug, Clone)]
pub struct Mosaic {
    grid: Grid,
    anchor: TileCoord,
    tile_side: usize,
    order: StackOrder,
}

impl Mosaic {
    /// The stitched raster.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// North-west tile: the highest latitude and lowest longitude stitched.
    pub fn anchor(&self) -> TileCoord {
        self.anchor
    }

    /// Samples per tile side.
    pub fn tile_side(&self) -> usize {
        self.tile_side
    }

    /// Vertical order the tiles were stacked in.
    pub fn stack_order(&self) -> StackOrder {
        self.order
    }

    /// Pixel → geographic transform.
    ///
    /// `NorthUp` mosaics are anchored at the north-west corner with rows
    /// running south. `SouthUp` mosaics are anchored at the south-west corner
    /// with rows running north.
    pub fn transform(&self) -> AffineTransform {
        match self.order {
            StackOrder::NorthUp => self.anchor.transform(self.tile_side),
            StackOrder::SouthUp => {
                let tile_rows = self.grid.rows().checked_div(self.tile_side).unwrap_or(0) as i32;
                let south = f64::from(self.anchor.lat + 1 - tile_rows);
                let step = 1.0 / self.tile_side as f64;
                AffineTransform::translation(f64::from(self.anchor.lon), south)
                    * AffineTransform::scale(step, step)
            }
        }
    }

    /// Take the stitched raster.
    pub fn into_grid(self) -> Grid {
        self.grid
    }
}

/// Stitch post-mask tiles into a mosaic.
///
/// Accepts a single tile, two tiles adjacent east-west or north-south, or a
/// full 2x2 block. Every grid must be square with the same side. Anything
/// else is a configuration error.
pub fn assemble(tiles: BTreeMap<TileCoord, Grid>, order: StackOrder) -> Result<Mosaic> {
    let side = check_grids(&tiles)?;
    let coords: Vec<TileCoord> = tiles.keys().copied().collect();
    let anchor = north_west(&coords)?;

    let stack = |south: &Grid, north: &Grid| match order {
        StackOrder::NorthUp => Grid::vconcat(&[north, south]),
        StackOrder::SouthUp => Grid::vconcat(&[south, north]),
    };

    let grid = match coords.as_slice() {
        [only] => tiles[only].clone(),
        [a, b] if a.lat == b.lat && b.lon == a.lon + 1 => Grid::hconcat(&[&tiles[a], &tiles[b]])?,
        [a, b] if a.lon == b.lon && b.lat == a.lat + 1 => stack(&tiles[a], &tiles[b])?,
        [sw, se, nw, ne]
            if sw.lat == se.lat
                && nw.lat == ne.lat
                && nw.lat == sw.lat + 1
                && sw.lon == nw.lon
                && se.lon == ne.lon
                && se.lon == sw.lon + 1 =>
        {
            let south = Grid::hconcat(&[&tiles[sw], &tiles[se]])?;
            let north = Grid::hconcat(&[&tiles[nw], &tiles[ne]])?;
            stack(&south, &north)?
        }
        _ => {
            let names: Vec<String> = coords.iter().map(TileCoord::name).collect();
            return Err(DemError::Configuration(format!(
                "{} tiles [{}] do not form a 1x1, 1x2, 2x1 or 2x2 block",
                coords.len(),
                names.join(", ")
            )));
        }
    };

    Ok(Mosaic {
        grid,
        anchor,
        tile_side: side,
        order,
    })
}

fn check_grids(tiles: &BTreeMap<TileCoord, Grid>) -> Result<usize> {
    let mut side = None;
    for (coord, grid) in tiles {
        if !grid.is_square() {
            return Err(DemError::Configuration(format!(
                "tile {} is {}x{}, expected a square grid",
                coord,
                grid.rows(),
                grid.cols()
            )));
        }
        match side {
            None => side = Some(grid.rows()),
            Some(s) if s != grid.rows() => {
                return Err(DemError::Configuration(format!(
                    "tile {} has side {}, other tiles have {}",
                    coord,
                    grid.rows(),
                    s
                )));
            }
            Some(_) => {}
        }
    }
    side.ok_or_else(|| DemError::Configuration("no tiles to stitch".to_string()))
}

fn north_west(coords: &[TileCoord]) -> Result<TileCoord> {
    let lat = coords.iter().map(|c| c.lat).max();
    let lon = coords.iter().map(|c| c.lon).min();
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(TileCoord::new(lat, lon)),
        _ => Err(DemError::Configuration("no tiles to stitch".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(side: usize, base: f32) -> Grid {
        Grid::from_vec(side, side, (0..side * side).map(|v| base + v as f32).collect()).unwrap()
    }

    fn tiles(entries: &[((i32, i32), Grid)]) -> BTreeMap<TileCoord, Grid> {
        entries
            .iter()
            .map(|((lat, lon), g)| (TileCoord::new(*lat, *lon), g.clone()))
            .collect()
    }

    #[test]
    fn test_single_tile_passes_through() {
        let g = tile(3, 0.0);
        let mosaic = assemble(tiles(&[((47, -123), g.clone())]), StackOrder::NorthUp).unwrap();
        assert_eq!(mosaic.grid(), &g);
        assert_eq!(mosaic.anchor(), TileCoord::new(47, -123));
        assert_eq!(mosaic.transform().apply(0.0, 0.0), (-123.0, 48.0));
    }

    #[test]
    fn test_horizontal_pair() {
        let n = 4;
        let west = tile(n, 0.0);
        let east = tile(n, 1000.0);
        let mosaic = assemble(
            tiles(&[((10, 21), east.clone()), ((10, 20), west.clone())]),
            StackOrder::NorthUp,
        )
        .unwrap();

        let grid = mosaic.grid();
        assert_eq!(grid.dimensions(), (n, 2 * n));
        for r in 0..n {
            for c in 0..n {
                assert_eq!(grid.get(r, c), west.get(r, c));
                assert_eq!(grid.get(r, c + n), east.get(r, c));
            }
        }
        assert_eq!(mosaic.anchor(), TileCoord::new(10, 20));
    }

    #[test]
    fn test_vertical_pair_is_north_up() {
        let n = 3;
        let south = tile(n, 0.0);
        let north = tile(n, 500.0);
        let entries = [((-11, 5), south.clone()), ((-10, 5), north.clone())];

        let mosaic = assemble(tiles(&entries), StackOrder::NorthUp).unwrap();
        let grid = mosaic.grid();
        assert_eq!(grid.dimensions(), (2 * n, n));
        assert_eq!(grid.row(0), north.row(0));
        assert_eq!(grid.row(n), south.row(0));
        assert_eq!(mosaic.anchor(), TileCoord::new(-10, 5));

        let flipped = assemble(tiles(&entries), StackOrder::SouthUp).unwrap();
        assert_eq!(flipped.grid().row(0), south.row(0));
        assert_eq!(flipped.grid().row(n), north.row(0));
    }

    #[test]
    fn test_south_up_transform_starts_at_south_edge() {
        let n = 4;
        let entries = [((-11, 5), tile(n, 0.0)), ((-10, 5), tile(n, 500.0))];
        let mosaic = assemble(tiles(&entries), StackOrder::SouthUp).unwrap();
        let t = mosaic.transform();

        assert_eq!(mosaic.stack_order(), StackOrder::SouthUp);
        assert_eq!(t.apply(0.0, 0.0), (5.0, -11.0));
        assert_eq!(t.apply(0.0, n as f64), (5.0, -10.0));
        assert_eq!(t.apply(n as f64, 2.0 * n as f64), (6.0, -9.0));
    }

    #[test]
    fn test_two_by_two_block() {
        let n = 2;
        let sw = Grid::filled(n, n, 1.0);
        let se = Grid::filled(n, n, 2.0);
        let nw = Grid::filled(n, n, 3.0);
        let ne = Grid::filled(n, n, 4.0);
        let mosaic = assemble(
            tiles(&[((0, 0), sw), ((0, 1), se), ((1, 0), nw), ((1, 1), ne)]),
            StackOrder::NorthUp,
        )
        .unwrap();

        let grid = mosaic.grid();
        assert_eq!(grid.dimensions(), (4, 4));
        assert_eq!(grid.row(0), &[3.0, 3.0, 4.0, 4.0]);
        assert_eq!(grid.row(1), &[3.0, 3.0, 4.0, 4.0]);
        assert_eq!(grid.row(2), &[1.0, 1.0, 2.0, 2.0]);
        assert_eq!(grid.row(3), &[1.0, 1.0, 2.0, 2.0]);
        assert_eq!(mosaic.anchor(), TileCoord::new(1, 0));
    }

    #[test]
    fn test_unsupported_shapes() {
        let g = tile(2, 0.0);
        let cases: Vec<Vec<(i32, i32)>> = vec![
            vec![],
            vec![(0, 0), (0, 2)],
            vec![(0, 0), (1, 1)],
            vec![(0, 0), (0, 1), (1, 0)],
            vec![(0, 0), (0, 1), (2, 0), (2, 1)],
            vec![(0, 0), (0, 1), (0, 2), (0, 3), (1, 0)],
        ];
        for coords in cases {
            let entries: Vec<_> = coords.iter().map(|&c| (c, g.clone())).collect();
            let result = assemble(tiles(&entries), StackOrder::NorthUp);
            assert!(
                matches!(result, Err(DemError::Configuration(_))),
                "{:?} should be rejected",
                coords
            );
        }
    }

    #[test]
    fn test_mismatched_sides_rejected() {
        let result = assemble(
            tiles(&[((0, 0), tile(2, 0.0)), ((0, 1), tile(3, 0.0))]),
            StackOrder::NorthUp,
        );
        assert!(matches!(result, Err(DemError::Configuration(_))));

        let rect = Grid::filled(2, 3, 0.0);
        assert!(assemble(tiles(&[((0, 0), rect)]), StackOrder::NorthUp).is_err());
    }
}
