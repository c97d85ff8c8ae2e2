//! End-to-end tests of the heightmap pipeline over in-memory tiles.
//!
//! No network access: tiles are served from a map keyed by cache name.

use geo::polygon;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use terramap_dem::{
    encode_hgt, BoundingBox, DatasetProfile, DemError, GeoPoint, HeightmapPipeline, Result,
    TileCoord, TileLocators, TileSource, WaterPolygons,
};

#[derive(Default)]
struct MemorySource {
    tiles: HashMap<String, Vec<u8>>,
    water: HashMap<String, WaterPolygons>,
    requests: AtomicUsize,
}

impl MemorySource {
    fn with_constant_tile(mut self, lat: i32, lon: i32, side: usize, value: i16) -> Self {
        let name = format!("{}.hgt", TileCoord::new(lat, lon).name());
        self.tiles.insert(name, encode_hgt(&vec![value; side * side]));
        self
    }
}

impl TileSource for MemorySource {
    fn elevation_bytes(&self, locators: &TileLocators) -> Result<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.tiles
            .get(&locators.elevation_cache_name)
            .cloned()
            .ok_or_else(|| DemError::Fetch {
                locator: locators.elevation_url.clone(),
                reason: "HTTP 404 Not Found".to_string(),
            })
    }

    fn water_polygons(&self, locators: &TileLocators) -> Result<WaterPolygons> {
        Ok(self
            .water
            .get(&locators.water_cache_name)
            .cloned()
            .unwrap_or_default())
    }
}

fn profile(tile_side: usize, output_side: usize) -> DatasetProfile {
    DatasetProfile {
        name: "memory".to_string(),
        tile_side,
        output_side,
        sea_level: 0.0,
        height_scale: 1.0,
        seabed: -20.0,
        smoothing_sigma: None,
        elevation_url: "mem://{lat}/{name}.hgt".to_string(),
        water_url: None,
        zero_elevation_value: None,
        ..DatasetProfile::srtm1()
    }
}

/// Box around the point where tiles (0,0), (0,1), (1,0) and (1,1) meet,
/// a quarter degree on each side.
fn four_corner_box() -> BoundingBox {
    BoundingBox {
        top: 1.25,
        bottom: 0.75,
        left: 0.75,
        right: 1.25,
    }
}

#[test]
fn test_four_tiles_center_block_is_exact() {
    let source = MemorySource::default()
        .with_constant_tile(0, 0, 4, 1) // SW
        .with_constant_tile(0, 1, 4, 2) // SE
        .with_constant_tile(1, 0, 4, 3) // NW
        .with_constant_tile(1, 1, 4, 4); // NE
    let pipeline = HeightmapPipeline::new(profile(4, 2), source).unwrap();

    let heightmap = pipeline.render(&four_corner_box()).unwrap();

    assert_eq!(heightmap.side(), 2);
    assert_eq!(heightmap.grid().data(), &[3.0, 4.0, 1.0, 2.0]);
    assert_eq!(heightmap.to_u16(), vec![3, 4, 1, 2]);
    assert_eq!(pipeline.source().requests.load(Ordering::Relaxed), 4);
}

#[test]
fn test_missing_tile_fails_whole_request() {
    let source = MemorySource::default()
        .with_constant_tile(0, 0, 4, 1)
        .with_constant_tile(0, 1, 4, 2)
        .with_constant_tile(1, 1, 4, 4);
    let pipeline = HeightmapPipeline::new(profile(4, 2), source).unwrap();

    match pipeline.render(&four_corner_box()) {
        Err(DemError::Fetch { locator, .. }) => assert_eq!(locator, "mem://N01/N01E000.hgt"),
        other => panic!("expected fetch error, got {:?}", other),
    }
    assert!(pipeline.build_mosaic(&four_corner_box()).is_err());
}

#[test]
fn test_truncated_tile_names_the_tile() {
    let mut source = MemorySource::default()
        .with_constant_tile(0, 0, 4, 1)
        .with_constant_tile(1, 0, 4, 3)
        .with_constant_tile(1, 1, 4, 4);
    source.tiles.insert("N00E001.hgt".to_string(), vec![0u8; 31]);
    let pipeline = HeightmapPipeline::new(profile(4, 2), source).unwrap();

    match pipeline.render(&four_corner_box()) {
        Err(DemError::Decode {
            tile,
            expected,
            actual,
        }) => {
            assert_eq!(tile, "N00E001");
            assert_eq!(expected, 32);
            assert_eq!(actual, 31);
        }
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[test]
fn test_single_tile_with_water() {
    let mut source = MemorySource::default().with_constant_tile(10, 20, 360, 100);
    // Western half of the tile is water.
    source.water.insert(
        "e020n10e".to_string(),
        WaterPolygons::new(vec![polygon![
            (x: 20.0, y: 10.0),
            (x: 20.5, y: 10.0),
            (x: 20.5, y: 11.0),
            (x: 20.0, y: 11.0),
        ]]),
    );

    let mut profile = profile(360, 8);
    profile.water_url = Some("mem://{water_name}.zip".to_string());
    profile.sea_level = 20.0;
    profile.height_scale = 2.0;
    let pipeline = HeightmapPipeline::new(profile, source).unwrap();

    let center = GeoPoint::new(10.5, 20.5).unwrap();
    let heightmap = pipeline.generate(center, 18.0).unwrap();

    assert_eq!(heightmap.side(), 8);
    let grid = heightmap.grid();
    for r in 0..8 {
        // (seabed + sea level) * scale
        assert_eq!(grid.get(r, 0), 0.0);
        // (100 + sea level) * scale
        assert_eq!(grid.get(r, 7), 240.0);
    }
}

#[test]
fn test_vertical_pair_keeps_north_on_top() {
    let source = MemorySource::default()
        .with_constant_tile(10, 20, 360, 100)
        .with_constant_tile(11, 20, 360, 200);
    let pipeline = HeightmapPipeline::new(profile(360, 8), source).unwrap();

    let center = GeoPoint::new(11.0, 20.5).unwrap();
    let heightmap = pipeline.generate(center, 18.0).unwrap();
    let grid = heightmap.grid();

    assert_eq!(grid.row(0), &[200.0; 8]);
    assert_eq!(grid.row(7), &[100.0; 8]);
}

#[test]
fn test_polar_request_rejected() {
    let pipeline = HeightmapPipeline::new(profile(4, 2), MemorySource::default()).unwrap();
    assert!(GeoPoint::new(86.0, 0.0).is_err());

    // Points built directly still hit the check in the box computation.
    let center = GeoPoint { lat: 86.0, lon: 0.0 };
    assert!(matches!(
        pipeline.generate(center, 18.0),
        Err(DemError::InvalidCoordinate { .. })
    ));
    assert_eq!(pipeline.source().requests.load(Ordering::Relaxed), 0);
}
