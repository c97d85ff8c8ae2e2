//! # terramap-runner
//!
//! Command-line front end for `terramap-dem`: parses arguments, resolves the
//! dataset profile, runs the pipeline against the HTTP tile cache and writes
//! the result as a 16-bit grayscale PNG.

mod output;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use terramap_dem::{DatasetProfile, DemError, GeoPoint, HeightmapPipeline, HttpTileFetcher};
use thiserror::Error;
use tracing::{debug, info};

pub use output::{output_path, write_png};

/// Errors that can occur during a run.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Any failure inside the heightmap pipeline.
    #[error(transparent)]
    Dem(#[from] DemError),

    /// PNG encoding failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error writing the output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `--profile` is neither a preset nor an existing file.
    #[error("Unknown profile '{0}': expected srtm1, srtm3 or a path to a YAML profile")]
    UnknownProfile(String),

    /// Heightmap samples do not fill a `side x side` image.
    #[error("Heightmap does not fill a {side}x{side} image")]
    ImageSize { side: usize },
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Generate a 16-bit heightmap around a point.
#[derive(Debug, Parser)]
#[command(name = "terramap", version, about)]
pub struct Cli {
    /// Output image; `.png` is appended when missing.
    pub output: PathBuf,

    /// Latitude of the center in decimal degrees.
    #[arg(allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the center in decimal degrees.
    #[arg(allow_negative_numbers = true)]
    pub lon: f64,

    /// Side of the square area in kilometres [default: from profile, 18]
    #[arg(long)]
    pub extent_km: Option<f64>,

    /// Dataset preset (srtm1, srtm3) or path to a YAML profile.
    #[arg(long, default_value = "srtm1")]
    pub profile: String,

    /// Directory for downloaded tiles.
    #[arg(long, default_value = "tile_cache")]
    pub cache_dir: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Resolve `--profile`: a preset name first, then a YAML file path.
pub fn resolve_profile(name: &str) -> Result<DatasetProfile> {
    if let Some(profile) = DatasetProfile::preset(name) {
        return Ok(profile);
    }
    let path = Path::new(name);
    if path.is_file() {
        return Ok(DatasetProfile::from_file(path)?);
    }
    Err(RunnerError::UnknownProfile(name.to_string()))
}

/// Run one request end to end. Returns the path written.
pub fn run(cli: &Cli) -> Result<PathBuf> {
    let profile = resolve_profile(&cli.profile)?;
    let center = GeoPoint::new(cli.lat, cli.lon)?;
    let extent_km = cli.extent_km.unwrap_or(profile.default_extent_km);
    debug!("profile: {:?}", profile);

    let fetcher = HttpTileFetcher::new(&cli.cache_dir)?;
    let pipeline = HeightmapPipeline::new(profile, fetcher)?;

    let start = Instant::now();
    let heightmap = pipeline.generate(center, extent_km)?;

    let stats = pipeline.source().download_stats();
    if stats.tiles_downloaded > 0 {
        info!(
            "downloaded {} files ({:.1} MB)",
            stats.tiles_downloaded,
            stats.bytes_downloaded as f64 / 1_000_000.0
        );
    }

    let path = output_path(&cli.output);
    write_png(&path, &heightmap)?;
    info!(
        "wrote {} in {:.1}s",
        path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(path)
}
