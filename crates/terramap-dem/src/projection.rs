//! Projecting a geographic bounding box onto mosaic pixels.

use crate::bbox::BoundingBox;
use crate::grid::Grid;
use crate::mosaic::Mosaic;
use crate::{DemError, Result};
use std::fmt;

/// Integer pixel window. `top`/`left` inclusive, `bottom`/`right` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    /// First row, inclusive.
    pub top: usize,
    /// End row, exclusive.
    pub bottom: usize,
    /// First column, inclusive.
    pub left: usize,
    /// End column, exclusive.
    pub right: usize,
}

impl CropWindow {
    /// Rows in the window.
    pub fn rows(&self) -> usize {
        self.bottom - self.top
    }

    /// Columns in the window.
    pub fn cols(&self) -> usize {
        self.right - self.left
    }
}

impl fmt::Display for CropWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}, {}:{}]",
            self.top, self.bottom, self.left, self.right
        )
    }
}

/// Pixel window of `mosaic` covered by `bbox`.
///
/// The north-west and south-east corners go through the inverse mosaic
/// transform, are ordered into row and column ranges, and are truncated
/// toward zero. Fails with `Bounds` when the
/// window is empty or not fully inside the mosaic, which means the tile set
/// does not cover the box.
pub fn crop_window(bbox: &BoundingBox, mosaic: &Mosaic) -> Result<CropWindow> {
    let (rows, cols) = mosaic.grid().dimensions();
    let inverse = mosaic.transform().inverse().ok_or_else(|| {
        DemError::Configuration("mosaic transform is not invertible".to_string())
    })?;

    let (x0, y0) = inverse.apply(bbox.left, bbox.top);
    let (x1, y1) = inverse.apply(bbox.right, bbox.bottom);
    // Rows run north or south depending on the stack order.
    let (top, bottom) = (y0.min(y1).trunc(), y0.max(y1).trunc());
    let (left, right) = (x0.min(x1).trunc(), x0.max(x1).trunc());

    // Report a clamped window for out-of-range requests; the raw values may be negative.
    let as_index = |v: f64| v.max(0.0) as usize;
    let window = CropWindow {
        top: as_index(top),
        bottom: as_index(bottom),
        left: as_index(left),
        right: as_index(right),
    };

    let inside = top >= 0.0
        && left >= 0.0
        && bottom <= rows as f64
        && right <= cols as f64
        && top < bottom
        && left < right;
    if !inside {
        return Err(DemError::Bounds { window, rows, cols });
    }
    Ok(window)
}

/// Crop the mosaic to `bbox`.
pub fn crop_to_bbox(bbox: &BoundingBox, mosaic: &Mosaic) -> Result<Grid> {
    let window = crop_window(bbox, mosaic)?;
    Ok(mosaic.grid().crop(&window))
}
