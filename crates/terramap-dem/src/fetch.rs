//! Tile retrieval with a local disk cache.
//!
//! Elevation tiles are stored decompressed as `<cache>/<name>.hgt`. Water
//! boundary archives are unpacked to `<cache>/<water_name>.{shp,shx,dbf,prj}`.
//! A file already present in the cache is never downloaded again.
//!
//! ## Thread Safety
//!
//! `HttpTileFetcher` is `Sync`; the pipeline calls it from several rayon
//! workers at once. Each tile owns distinct cache file names, and files are
//! written under a temporary name and renamed into place, so a reader never
//! sees a partial file.

use crate::bbox::BoundingBox;
use crate::profile::DatasetProfile;
use crate::tile::TileLocators;
use crate::water::WaterPolygons;
use crate::{DemError, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Wait before the first retry; doubled for each one after.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Shapefile members extracted from a water-boundary archive.
const SHAPEFILE_EXTENSIONS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

/// Somewhere the pipeline can get raw tile data from.
pub trait TileSource: Sync {
    /// Uncompressed big-endian elevation samples for one tile.
    fn elevation_bytes(&self, locators: &TileLocators) -> Result<Vec<u8>>;

    /// Water polygons for one tile. Empty when the locators carry no water URL.
    fn water_polygons(&self, locators: &TileLocators) -> Result<WaterPolygons>;
}

/// Download statistics for the fetcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadStats {
    /// Number of archives downloaded this session.
    pub tiles_downloaded: usize,
    /// Total bytes downloaded this session (compressed size).
    pub bytes_downloaded: u64,
}

/// Why one download attempt failed.
enum Failure {
    /// Worth another try (connection trouble, 5xx).
    Transient(String),
    /// Retrying will not help (4xx).
    Permanent(String),
}

/// HTTP tile fetcher with a local disk cache and retry on failure.
pub struct HttpTileFetcher {
    /// Cache directory for downloaded tiles.
    cache_dir: PathBuf,
    /// HTTP client for downloading tiles.
    client: reqwest::blocking::Client,
    /// Retries after the first failed attempt.
    max_retries: u32,
    /// Wait before the first retry.
    retry_delay: Duration,
    /// Number of archives downloaded this session (atomic for thread safety).
    tiles_downloaded: AtomicUsize,
    /// Total bytes downloaded this session (atomic for thread safety).
    bytes_downloaded: AtomicU64,
}

impl std::fmt::Debug for HttpTileFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTileFetcher")
            .field("cache_dir", &self.cache_dir)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl HttpTileFetcher {
    /// Create a fetcher caching under `cache_dir`, creating it if needed.
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            cache_dir,
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            tiles_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
        })
    }

    /// Override the retry policy.
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            tiles_downloaded: self.tiles_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }

    /// Reset download statistics.
    pub fn reset_download_stats(&self) {
        self.tiles_downloaded.store(0, Ordering::Relaxed);
        self.bytes_downloaded.store(0, Ordering::Relaxed);
    }

    /// Cache path of the decompressed elevation tile.
    pub fn elevation_path(&self, locators: &TileLocators) -> PathBuf {
        self.cache_dir.join(&locators.elevation_cache_name)
    }

    /// Cache path of the tile's water `.shp`.
    pub fn water_shapefile_path(&self, locators: &TileLocators) -> PathBuf {
        self.cache_dir.join(format!("{}.shp", locators.water_cache_name))
    }

    /// True when every file this tile needs is already on disk.
    pub fn is_cached(&self, locators: &TileLocators) -> bool {
        self.elevation_path(locators).exists()
            && (locators.water_url.is_none() || self.water_shapefile_path(locators).exists())
    }

    /// Download every tile covering `bbox` that is not cached yet.
    ///
    /// Returns the number of tiles fetched (not including already cached).
    pub fn prefetch(&self, bbox: &BoundingBox, profile: &DatasetProfile) -> Result<usize> {
        let tiles = bbox.covering_tiles();
        info!("Prefetching {} tiles for region...", tiles.len());

        let mut fetched = 0;
        for coord in &tiles {
            let locators = coord.locators(profile);
            if self.is_cached(&locators) {
                trace!("{} already cached", coord);
                continue;
            }
            self.ensure_elevation(&locators)?;
            self.ensure_water(&locators)?;
            fetched += 1;
        }

        info!("Prefetch complete: {} new tiles downloaded", fetched);
        Ok(fetched)
    }

    /// Make sure the decompressed elevation tile is on disk.
    fn ensure_elevation(&self, locators: &TileLocators) -> Result<PathBuf> {
        let path = self.elevation_path(locators);
        if path.exists() {
            trace!("cache hit {}", path.display());
            return Ok(path);
        }

        let raw = self.download(&locators.elevation_url)?;
        let bytes = unpack_elevation(&locators.elevation_url, raw)?;
        write_atomic(&path, &bytes)?;
        debug!("cached {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Make sure the water shapefile set is on disk. `None` when the tile has no water URL.
    fn ensure_water(&self, locators: &TileLocators) -> Result<Option<PathBuf>> {
        let Some(url) = locators.water_url.as_deref() else {
            return Ok(None);
        };
        let path = self.water_shapefile_path(locators);
        if path.exists() {
            trace!("cache hit {}", path.display());
            return Ok(Some(path));
        }

        let raw = self.download(url)?;
        extract_shapefile(url, &raw, &self.cache_dir, &locators.water_cache_name)?;
        debug!("cached {}", path.display());
        Ok(Some(path))
    }

    /// GET `url`, retrying transient failures with doubling backoff.
    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut delay = self.retry_delay;
        let mut attempt = 0;
        loop {
            debug!("GET {} (attempt {})", url, attempt + 1);
            let reason = match self.try_download(url) {
                Ok(bytes) => {
                    self.tiles_downloaded.fetch_add(1, Ordering::Relaxed);
                    self.bytes_downloaded
                        .fetch_add(bytes.len() as u64, Ordering::Relaxed);
                    return Ok(bytes);
                }
                Err(Failure::Permanent(reason)) => reason,
                Err(Failure::Transient(reason)) if attempt < self.max_retries => {
                    warn!("{}: {}, retrying in {:?}", url, reason, delay);
                    thread::sleep(delay);
                    delay *= 2;
                    attempt += 1;
                    continue;
                }
                Err(Failure::Transient(reason)) => reason,
            };
            return Err(DemError::Fetch {
                locator: url.to_string(),
                reason,
            });
        }
    }

    fn try_download(&self, url: &str) -> std::result::Result<Vec<u8>, Failure> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Failure::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(Failure::Permanent(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(Failure::Transient(format!("HTTP {}", status)));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| Failure::Transient(e.to_string()))
    }
}

impl TileSource for HttpTileFetcher {
    fn elevation_bytes(&self, locators: &TileLocators) -> Result<Vec<u8>> {
        let path = self.ensure_elevation(locators)?;
        Ok(fs::read(path)?)
    }

    fn water_polygons(&self, locators: &TileLocators) -> Result<WaterPolygons> {
        match self.ensure_water(locators)? {
            Some(path) => WaterPolygons::from_shapefile(path),
            None => Ok(WaterPolygons::default()),
        }
    }
}

fn is_gzip_content(content: &[u8]) -> bool {
    content.starts_with(&[0x1F, 0x8B])
}

fn is_zip_content(content: &[u8]) -> bool {
    content.starts_with(&[0x50, 0x4B, 0x03, 0x04])
}

/// Strip gzip or zip compression from a downloaded elevation tile.
///
/// Anything without a known magic number is assumed to be a bare `.hgt`.
fn unpack_elevation(locator: &str, raw: Vec<u8>) -> Result<Vec<u8>> {
    let archive_error = |reason: String| DemError::Archive {
        locator: locator.to_string(),
        reason,
    };

    if is_gzip_content(&raw) {
        let mut decompressed = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut decompressed)
            .map_err(|e| archive_error(format!("gzip: {}", e)))?;
        debug!("gunzipped {} -> {} bytes", raw.len(), decompressed.len());
        return Ok(decompressed);
    }

    if is_zip_content(&raw) {
        let mut archive = zip::ZipArchive::new(Cursor::new(raw.as_slice()))
            .map_err(|e| archive_error(e.to_string()))?;
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| archive_error(format!("entry {}: {}", i, e)))?;
            if entry.name().to_ascii_lowercase().ends_with(".hgt") {
                debug!("extracting {}", entry.name());
                let mut buffer = Vec::new();
                entry.read_to_end(&mut buffer)?;
                return Ok(buffer);
            }
        }
        return Err(archive_error("no .hgt file in zip archive".to_string()));
    }

    Ok(raw)
}

/// Unpack the shapefile members of a water-boundary zip as `<stem>.<ext>`.
///
/// The `.shp` is written last, so its presence marks a complete set.
fn extract_shapefile(locator: &str, raw: &[u8], dir: &Path, stem: &str) -> Result<()> {
    let archive_error = |reason: String| DemError::Archive {
        locator: locator.to_string(),
        reason,
    };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(raw)).map_err(|e| archive_error(e.to_string()))?;

    let mut members: Vec<(String, Vec<u8>)> = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| archive_error(format!("entry {}: {}", i, e)))?;
        if entry.is_dir() {
            continue;
        }
        let ext = Path::new(entry.name())
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let Some(ext) = ext.filter(|e| SHAPEFILE_EXTENSIONS.contains(&e.as_str())) else {
            continue;
        };
        let mut buffer = Vec::new();
        entry.read_to_end(&mut buffer)?;
        members.push((ext, buffer));
    }

    if !members.iter().any(|(ext, _)| ext == "shp") {
        return Err(archive_error("no .shp file in zip archive".to_string()));
    }

    members.sort_by_key(|(ext, _)| ext == "shp");
    for (ext, bytes) in members {
        write_atomic(&dir.join(format!("{}.{}", stem, ext)), &bytes)?;
    }
    Ok(())
}

/// Write to `<path>.part`, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);
    fs::write(&partial, bytes)?;
    fs::rename(&partial, path)?;
    Ok(())
}
