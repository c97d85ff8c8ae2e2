//! PNG output.

use crate::{Result, RunnerError};
use image::{ImageBuffer, ImageFormat, Luma};
use std::fs;
use std::path::{Path, PathBuf};
use terramap_dem::Heightmap;

/// `path` with `.png` appended unless it already ends in `.png`.
pub fn output_path(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("png") => path.to_path_buf(),
        _ => {
            let mut name = path.as_os_str().to_owned();
            name.push(".png");
            PathBuf::from(name)
        }
    }
}

/// Write the heightmap as a single-channel 16-bit PNG.
pub fn write_png(path: &Path, heightmap: &Heightmap) -> Result<()> {
    let side = heightmap.side();
    let image: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(side as u32, side as u32, heightmap.to_u16())
            .ok_or(RunnerError::ImageSize { side })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
