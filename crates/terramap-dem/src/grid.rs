//! Row-major elevation raster.

use crate::projection::CropWindow;
use crate::{DemError, Result};

/// A `rows x cols` raster of `f32` samples in row-major order.
///
/// Row 0 is the northernmost row and column 0 the westernmost column.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Grid {
    /// A grid with every sample set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f32) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Wrap existing row-major samples.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(DemError::Configuration(format!(
                "grid has {} samples, expected {}x{}",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Wrap samples already known to hold `rows * cols` values.
    pub(crate) fn from_raw(rows: usize, cols: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// True when rows and columns match.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Sample at `(row, col)`.
    ///
    /// # Panics
    /// Panics if the position is outside the grid.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(row < self.rows && col < self.cols, "({}, {}) out of range", row, col);
        self.data[row * self.cols + col]
    }

    /// Overwrite the sample at `(row, col)`.
    ///
    /// # Panics
    /// Panics if the position is outside the grid.
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        assert!(row < self.rows && col < self.cols, "({}, {}) out of range", row, col);
        self.data[row * self.cols + col] = value;
    }

    /// One row of samples.
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// All samples, row-major.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// All samples, row-major, for in-place edits.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Take the samples, row-major.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Lowest and highest sample, or `None` for an empty grid.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut iter = self.data.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Copy out a window. The caller has checked it against the extent.
    pub(crate) fn crop(&self, window: &CropWindow) -> Self {
        let rows = window.bottom - window.top;
        let cols = window.right - window.left;
        let mut data = Vec::with_capacity(rows * cols);
        for r in window.top..window.bottom {
            data.extend_from_slice(&self.row(r)[window.left..window.right]);
        }
        Self { rows, cols, data }
    }

    /// Place grids side by side, west to east. All must share a row count.
    pub(crate) fn hconcat(parts: &[&Grid]) -> Result<Self> {
        let rows = parts.first().map_or(0, |g| g.rows);
        if parts.iter().any(|g| g.rows != rows) {
            return Err(DemError::Configuration(
                "cannot join grids with different row counts".to_string(),
            ));
        }
        let cols = parts.iter().map(|g| g.cols).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for part in parts {
                data.extend_from_slice(part.row(r));
            }
        }
        Ok(Self { rows, cols, data })
    }

    /// Stack grids top to bottom. All must share a column count.
    pub(crate) fn vconcat(parts: &[&Grid]) -> Result<Self> {
        let cols = parts.first().map_or(0, |g| g.cols);
        if parts.iter().any(|g| g.cols != cols) {
            return Err(DemError::Configuration(
                "cannot stack grids with different column counts".to_string(),
            ));
        }
        let rows = parts.iter().map(|g| g.rows).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for part in parts {
            data.extend_from_slice(&part.data);
        }
        Ok(Self { rows, cols, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(rows: usize, cols: usize) -> Grid {
        Grid::from_vec(rows, cols, (0..rows * cols).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Grid::from_vec(2, 3, vec![0.0; 6]).is_ok());
        assert!(matches!(
            Grid::from_vec(2, 3, vec![0.0; 5]),
            Err(DemError::Configuration(_))
        ));
    }

    #[test]
    fn test_crop() {
        let grid = ramp(4, 5);
        let window = CropWindow {
            top: 1,
            bottom: 3,
            left: 2,
            right: 5,
        };
        let cropped = grid.crop(&window);
        assert_eq!(cropped.dimensions(), (2, 3));
        assert_eq!(cropped.data(), &[7.0, 8.0, 9.0, 12.0, 13.0, 14.0]);
    }

    #[test]
    fn test_concat() {
        let a = ramp(2, 2);
        let b = Grid::filled(2, 1, -1.0);
        let h = Grid::hconcat(&[&a, &b]).unwrap();
        assert_eq!(h.data(), &[0.0, 1.0, -1.0, 2.0, 3.0, -1.0]);

        let v = Grid::vconcat(&[&a, &a]).unwrap();
        assert_eq!(v.dimensions(), (4, 2));
        assert_eq!(v.row(3), &[2.0, 3.0]);

        assert!(Grid::vconcat(&[&a, &b]).is_err());
        assert!(Grid::hconcat(&[&a, &ramp(3, 2)]).is_err());
    }

    #[test]
    fn test_min_max() {
        assert_eq!(ramp(3, 3).min_max(), Some((0.0, 8.0)));
        assert_eq!(Grid::filled(0, 0, 1.0).min_max(), None);
    }
}
