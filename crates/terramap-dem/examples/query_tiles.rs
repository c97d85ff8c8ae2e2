//! Example: List the tiles and download URLs behind a heightmap request.
//!
//! Usage: cargo run --example query_tiles -- <lat> <lon> [extent_km] [srtm1|srtm3]

use std::env;
use terramap_dem::{BoundingBox, DatasetProfile, GeoPoint, DEFAULT_EXTENT_KM};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <lat> <lon> [extent_km] [srtm1|srtm3]", args[0]);
        eprintln!("Example: {} 47.6062 -122.3321 18 srtm1", args[0]);
        std::process::exit(1);
    }

    let lat: f64 = args[1].parse().expect("Invalid latitude");
    let lon: f64 = args[2].parse().expect("Invalid longitude");
    let extent_km: f64 = args
        .get(3)
        .map(|s| s.parse().expect("Invalid extent"))
        .unwrap_or(DEFAULT_EXTENT_KM);
    let profile_name = args.get(4).map(|s| s.as_str()).unwrap_or("srtm1");
    let profile = DatasetProfile::preset(profile_name).expect("Unknown profile");

    let center = GeoPoint::new(lat, lon).expect("Invalid coordinate");
    let bbox = BoundingBox::around(center, extent_km).expect("Invalid extent");

    println!(
        "Box: lat {:.5}° to {:.5}°, lon {:.5}° to {:.5}°",
        bbox.bottom, bbox.top, bbox.left, bbox.right
    );

    let tiles = bbox.covering_tiles();
    println!("\n{} tile(s) with profile {}:", tiles.len(), profile.name);
    for coord in tiles {
        let locators = coord.locators(&profile);
        println!("  {}", coord);
        println!("    elevation: {}", locators.elevation_url);
        match &locators.water_url {
            Some(url) => println!("    water:     {}", url),
            None => println!("    water:     (none)"),
        }
    }
}
