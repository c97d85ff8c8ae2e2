//! Water masking: burn water-body polygons into an elevation grid.
//!
//! A pixel is water when its center, mapped through the tile transform,
//! lies inside a polygon (and outside that polygon's holes). Water pixels
//! are overwritten with a fixed seabed elevation; every other pixel is left
//! untouched.

use crate::affine::AffineTransform;
use crate::grid::Grid;
use crate::{DemError, Result};
use geo::{BoundingRect, Contains, Coord, LineString, Point, Polygon};
use shapefile::{PolygonRing, Shape};
use std::path::Path;
use tracing::debug;

/// Water-body polygons in geographic coordinates (x = lon, y = lat).
#[derive(Debug, Clone, Default)]
pub struct WaterPolygons {
    polygons: Vec<Polygon<f64>>,
}

impl WaterPolygons {
    /// Wrap polygons already in geographic coordinates.
    pub fn new(polygons: Vec<Polygon<f64>>) -> Self {
        Self { polygons }
    }

    /// Read every polygon from an ESRI shapefile (`.shp`).
    ///
    /// Outer rings become polygons. Each inner ring becomes a hole of the
    /// outer ring containing it, or of the preceding outer ring when none
    /// does. Non-polygon shapes are skipped.
    pub fn from_shapefile<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let shapes = shapefile::read_shapes(path).map_err(|e| DemError::Shapefile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut polygons = Vec::new();
        let mut skipped = 0usize;
        for shape in shapes {
            match shape {
                Shape::Polygon(p) => polygons.extend(assemble_rings(p.rings(), |pt| (pt.x, pt.y))),
                Shape::PolygonM(p) => polygons.extend(assemble_rings(p.rings(), |pt| (pt.x, pt.y))),
                Shape::PolygonZ(p) => polygons.extend(assemble_rings(p.rings(), |pt| (pt.x, pt.y))),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!("{}: skipped {} non-polygon shapes", path.display(), skipped);
        }

        Ok(Self { polygons })
    }

    /// Number of polygons.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// True when there is no water.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Iterate over the polygons.
    pub fn iter(&self) -> impl Iterator<Item = &Polygon<f64>> {
        self.polygons.iter()
    }
}

fn ring_to_line_string<P>(points: &[P], xy: &impl Fn(&P) -> (f64, f64)) -> LineString<f64> {
    points
        .iter()
        .map(|p| {
            let (x, y) = xy(p);
            Coord { x, y }
        })
        .collect::<Vec<_>>()
        .into()
}

fn assemble_rings<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> (f64, f64)) -> Vec<Polygon<f64>> {
    let mut outers: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    let mut orphans = Vec::new();

    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => outers.push((ring_to_line_string(points, &xy), Vec::new())),
            PolygonRing::Inner(points) => {
                let hole = ring_to_line_string(points, &xy);
                let start = hole.0.first().copied();
                let owner = start.and_then(|c| {
                    outers.iter().rposition(|(outer, _)| {
                        Polygon::new(outer.clone(), Vec::new()).contains(&Point::from(c))
                    })
                });
                match owner.or_else(|| outers.len().checked_sub(1)) {
                    Some(idx) => outers[idx].1.push(hole),
                    None => orphans.push(hole),
                }
            }
        }
    }

    if !orphans.is_empty() {
        debug!("dropped {} inner rings without an outer ring", orphans.len());
    }

    outers
        .into_iter()
        .map(|(exterior, holes)| Polygon::new(exterior, holes))
        .collect()
}

/// Overwrite every water pixel of `grid` with `seabed`.
///
/// `transform` maps `(col, row)` pixel coordinates to `(lon, lat)`.
/// Returns the number of pixels whose value changed.
pub fn apply_water_mask(
    grid: &mut Grid,
    water: &WaterPolygons,
    transform: &AffineTransform,
    seabed: f32,
) -> Result<usize> {
    let inverse = transform.inverse().ok_or_else(|| {
        DemError::Configuration("water mask transform is not invertible".to_string())
    })?;
    let axis_aligned = transform.b == 0.0 && transform.d == 0.0;

    let mut changed = 0;
    for polygon in water.iter() {
        let Some(window) = pixel_window(polygon, &inverse, grid.rows(), grid.cols()) else {
            continue;
        };
        changed += if axis_aligned {
            burn_scanline(grid, polygon, transform, window, seabed)
        } else {
            burn_per_pixel(grid, polygon, transform, window, seabed)
        };
    }
    Ok(changed)
}

/// Row/column range `[r0, r1) x [c0, c1)` that can contain pixels of `polygon`.
fn pixel_window(
    polygon: &Polygon<f64>,
    inverse: &AffineTransform,
    rows: usize,
    cols: usize,
) -> Option<(usize, usize, usize, usize)> {
    let rect = polygon.bounding_rect()?;
    let (min, max) = (rect.min(), rect.max());
    let corners = [
        inverse.apply(min.x, min.y),
        inverse.apply(min.x, max.y),
        inverse.apply(max.x, min.y),
        inverse.apply(max.x, max.y),
    ];
    let (mut x0, mut x1, mut y0, mut y1) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for (x, y) in corners {
        x0 = x0.min(x);
        x1 = x1.max(x);
        y0 = y0.min(y);
        y1 = y1.max(y);
    }

    let clamp = |v: f64, hi: usize| v.max(0.0).min(hi as f64) as usize;
    let (c0, c1) = (clamp(x0.floor(), cols), clamp(x1.ceil(), cols));
    let (r0, r1) = (clamp(y0.floor(), rows), clamp(y1.ceil(), rows));
    (c0 < c1 && r0 < r1).then_some((r0, r1, c0, c1))
}

fn burn(grid: &mut Grid, row: usize, col: usize, seabed: f32) -> usize {
    if grid.get(row, col) == seabed {
        0
    } else {
        grid.set(row, col, seabed);
        1
    }
}

/// Even-odd scanline fill at pixel centers. Only valid without rotation/shear.
fn burn_scanline(
    grid: &mut Grid,
    polygon: &Polygon<f64>,
    transform: &AffineTransform,
    (r0, r1, c0, c1): (usize, usize, usize, usize),
    seabed: f32,
) -> usize {
    let mut changed = 0;
    let mut crossings: Vec<f64> = Vec::new();

    for row in r0..r1 {
        let y = transform.e * (row as f64 + 0.5) + transform.f;

        crossings.clear();
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            for line in ring.lines() {
                let (p, q) = (line.start, line.end);
                if (p.y > y) != (q.y > y) {
                    let x = p.x + (y - p.y) * (q.x - p.x) / (q.y - p.y);
                    // Crossing position in pixel space; centers sit at col + 0.5.
                    crossings.push((x - transform.c) / transform.a);
                }
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            let (u0, u1) = (span[0], span[1]);
            // Columns whose center c + 0.5 lies strictly inside (u0, u1).
            let first = ((u0 - 0.5).floor() + 1.0).max(c0 as f64);
            let last = ((u1 - 0.5).ceil() - 1.0).min(c1 as f64 - 1.0);
            if first > last {
                continue;
            }
            for col in first as usize..=last as usize {
                changed += burn(grid, row, col, seabed);
            }
        }
    }
    changed
}

fn burn_per_pixel(
    grid: &mut Grid,
    polygon: &Polygon<f64>,
    transform: &AffineTransform,
    (r0, r1, c0, c1): (usize, usize, usize, usize),
    seabed: f32,
) -> usize {
    let mut changed = 0;
    for row in r0..r1 {
        for col in c0..c1 {
            let (x, y) = transform.apply(col as f64 + 0.5, row as f64 + 0.5);
            if polygon.contains(&Point::new(x, y)) {
                changed += burn(grid, row, col, seabed);
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileCoord;
    use geo::polygon;

    const SEABED: f32 = -20.0;

    fn land(side: usize) -> Grid {
        Grid::from_vec(side, side, (0..side * side).map(|v| 100.0 + v as f32).collect()).unwrap()
    }

    #[test]
    fn test_covered_pixel_becomes_seabed() {
        // Tile N10E020 with 10 samples per degree; pixel (row 2, col 3)
        // has its center at lon 20.35, lat 10.75.
        let tile = TileCoord::new(10, 20);
        let transform = tile.transform(10);
        let water = WaterPolygons::new(vec![polygon![
            (x: 20.31, y: 10.71),
            (x: 20.39, y: 10.71),
            (x: 20.39, y: 10.79),
            (x: 20.31, y: 10.79),
        ]]);

        let mut grid = land(10);
        let before = grid.clone();
        let changed = apply_water_mask(&mut grid, &water, &transform, SEABED).unwrap();

        assert_eq!(changed, 1);
        assert_eq!(grid.get(2, 3), SEABED);
        for row in 0..10 {
            for col in 0..10 {
                if (row, col) != (2, 3) {
                    assert_eq!(grid.get(row, col).to_bits(), before.get(row, col).to_bits());
                }
            }
        }
    }

    #[test]
    fn test_holes_are_kept_as_land() {
        let transform = TileCoord::new(0, 0).transform(10);
        // Covers pixel centers in rows/cols 1..=8, hole over rows/cols 4..=5.
        let water = WaterPolygons::new(vec![Polygon::new(
            LineString::from(vec![(0.1, 0.1), (0.9, 0.1), (0.9, 0.9), (0.1, 0.9)]),
            vec![LineString::from(vec![(0.4, 0.4), (0.6, 0.4), (0.6, 0.6), (0.4, 0.6)])],
        )]);

        let mut grid = land(10);
        let before = grid.clone();
        let changed = apply_water_mask(&mut grid, &water, &transform, SEABED).unwrap();

        assert_eq!(changed, 64 - 4);
        assert_eq!(grid.get(1, 1), SEABED);
        assert_eq!(grid.get(8, 8), SEABED);
        assert_eq!(grid.get(4, 4), before.get(4, 4));
        assert_eq!(grid.get(5, 5), before.get(5, 5));
        assert_eq!(grid.get(0, 0), before.get(0, 0));
        assert_eq!(grid.get(9, 3), before.get(9, 3));
    }

    #[test]
    fn test_polygon_outside_tile_is_ignored() {
        let transform = TileCoord::new(0, 0).transform(10);
        let water = WaterPolygons::new(vec![polygon![
            (x: 5.0, y: 5.0),
            (x: 6.0, y: 5.0),
            (x: 6.0, y: 6.0),
        ]]);
        let mut grid = land(10);
        let before = grid.clone();
        assert_eq!(apply_water_mask(&mut grid, &water, &transform, SEABED).unwrap(), 0);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_scanline_matches_point_in_polygon() {
        // Irregular concave polygon spilling over the tile edge.
        let poly = polygon![
            (x: -0.2, y: 0.13),
            (x: 0.47, y: 0.52),
            (x: 0.81, y: 0.07),
            (x: 1.3, y: 0.66),
            (x: 0.52, y: 1.2),
            (x: 0.33, y: 0.71),
        ];
        let transform = TileCoord::new(0, 0).transform(20);
        let water = WaterPolygons::new(vec![poly.clone()]);

        let mut scan = land(20);
        let changed = apply_water_mask(&mut scan, &water, &transform, SEABED).unwrap();

        let mut brute = land(20);
        let full = (0, 20, 0, 20);
        let brute_changed = burn_per_pixel(&mut brute, &poly, &transform, full, SEABED);

        assert!(changed > 0);
        assert_eq!(changed, brute_changed);
        assert_eq!(scan, brute);
    }

    #[test]
    fn test_inner_rings_attach_to_containing_outer() {
        let pt = |x: f64, y: f64| shapefile::Point::new(x, y);
        let rings = vec![
            PolygonRing::Outer(vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0), pt(1.0, 0.0), pt(0.0, 0.0)]),
            PolygonRing::Outer(vec![pt(5.0, 5.0), pt(5.0, 6.0), pt(6.0, 6.0), pt(6.0, 5.0), pt(5.0, 5.0)]),
            PolygonRing::Inner(vec![pt(0.2, 0.2), pt(0.4, 0.2), pt(0.4, 0.4), pt(0.2, 0.4), pt(0.2, 0.2)]),
        ];
        let polygons = assemble_rings(&rings, |p| (p.x, p.y));
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].interiors().len(), 1);
        assert!(polygons[1].interiors().is_empty());
    }
}
