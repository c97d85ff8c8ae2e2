//! Turning a cropped elevation raster into a 16-bit heightmap.
//!
//! Steps, in order: sea-level offset, height scale, bilinear resample to a
//! square output, optional Gaussian smoothing, clip to `[0, 65535]`.

use crate::grid::Grid;
use crate::{DemError, Result};
use rayon::prelude::*;

/// Largest value representable in a 16-bit heightmap.
pub const HEIGHTMAP_MAX: f32 = 65535.0;

/// Gaussian kernels extend this many standard deviations.
const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Constants for [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeParams {
    /// Side of the square output.
    pub output_side: usize,
    /// Added to every sample first.
    pub sea_level: f32,
    /// Multiplier applied after the offset.
    pub height_scale: f32,
    /// Gaussian sigma in output pixels; `None` or 0 skips smoothing.
    pub smoothing_sigma: Option<f64>,
}

/// Final heightmap, values in `[0, 65535]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    grid: Grid,
}

impl Heightmap {
    /// Side length in pixels.
    pub fn side(&self) -> usize {
        self.grid.rows()
    }

    /// The clipped raster.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Pixel values rounded to `u16`, row-major.
    pub fn to_u16(&self) -> Vec<u16> {
        self.grid
            .data()
            .iter()
            .map(|&v| v.round().clamp(0.0, HEIGHTMAP_MAX) as u16)
            .collect()
    }
}

/// Run the normalization steps on a cropped raster.
pub fn normalize(grid: &Grid, params: &NormalizeParams) -> Result<Heightmap> {
    if grid.rows() == 0 || grid.cols() == 0 {
        return Err(DemError::Configuration("cannot normalize an empty grid".to_string()));
    }
    if params.output_side == 0 {
        return Err(DemError::InvalidProfile("output_side must be positive".to_string()));
    }

    let mut scaled = grid.clone();
    for v in scaled.data_mut() {
        *v = (*v + params.sea_level) * params.height_scale;
    }

    let resampled = resample(&scaled, params.output_side, params.output_side)?;

    let mut smoothed = match params.smoothing_sigma {
        Some(sigma) if sigma > 0.0 => gaussian_blur(&resampled, sigma),
        _ => resampled,
    };

    for v in smoothed.data_mut() {
        *v = v.clamp(0.0, HEIGHTMAP_MAX);
    }

    Ok(Heightmap { grid: smoothed })
}

/// Source position and blend weight for each output index along one axis.
///
/// Corners map onto corners: output `i` samples input `i * (n_in - 1) / (n_out - 1)`.
fn axis_samples(n_in: usize, n_out: usize) -> Vec<(usize, usize, f64)> {
    (0..n_out)
        .map(|i| {
            let src = if n_out > 1 {
                (i * (n_in - 1)) as f64 / (n_out - 1) as f64
            } else {
                0.0
            };
            let i0 = (src.floor() as usize).min(n_in - 1);
            let i1 = (i0 + 1).min(n_in - 1);
            (i0, i1, src - i0 as f64)
        })
        .collect()
}

/// Bilinear resample to `rows x cols`. Axes scale independently.
///
/// Fails when asked to fill a non-empty output from an empty grid.
pub fn resample(grid: &Grid, rows: usize, cols: usize) -> Result<Grid> {
    if grid.dimensions() == (rows, cols) {
        return Ok(grid.clone());
    }
    if (grid.rows() == 0 || grid.cols() == 0) && rows * cols > 0 {
        return Err(DemError::Configuration(format!(
            "cannot resample a {}x{} grid to {}x{}",
            grid.rows(),
            grid.cols(),
            rows,
            cols
        )));
    }
    let ys = axis_samples(grid.rows(), rows);
    let xs = axis_samples(grid.cols(), cols);

    let mut out = vec![0.0f32; rows * cols];
    out.par_chunks_mut(cols.max(1))
        .zip(ys.par_iter())
        .for_each(|(out_row, &(y0, y1, fy))| {
            let top = grid.row(y0);
            let bottom = grid.row(y1);
            for (v, &(x0, x1, fx)) in out_row.iter_mut().zip(&xs) {
                let upper = f64::from(top[x0]) * (1.0 - fx) + f64::from(top[x1]) * fx;
                let lower = f64::from(bottom[x0]) * (1.0 - fx) + f64::from(bottom[x1]) * fx;
                *v = (upper * (1.0 - fy) + lower * fy) as f32;
            }
        });

    Ok(Grid::from_raw(rows, cols, out))
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Half-sample symmetric reflection: `d c b a | a b c d | d c b a`.
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let m = i.rem_euclid(2 * n);
    (if m >= n { 2 * n - 1 - m } else { m }) as usize
}

/// Separable Gaussian blur with reflected edges.
pub fn gaussian_blur(grid: &Grid, sigma: f64) -> Grid {
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let (rows, cols) = grid.dimensions();

    // Horizontal pass
    let mut horizontal = vec![0.0f32; rows * cols];
    horizontal
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(r, out_row)| {
            let src = grid.row(r);
            for (c, v) in out_row.iter_mut().enumerate() {
                let acc: f64 = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * f64::from(src[reflect(c as isize + k as isize - radius, cols)]))
                    .sum();
                *v = acc as f32;
            }
        });

    // Vertical pass
    let mut vertical = vec![0.0f32; rows * cols];
    vertical
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(r, out_row)| {
            for (k, w) in kernel.iter().enumerate() {
                let src_row = reflect(r as isize + k as isize - radius, rows);
                let src = &horizontal[src_row * cols..(src_row + 1) * cols];
                for (v, &s) in out_row.iter_mut().zip(src) {
                    *v += (w * f64::from(s)) as f32;
                }
            }
        });

    Grid::from_raw(rows, cols, vertical)
}
