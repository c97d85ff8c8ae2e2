//! Affine transforms between pixel and geographic space.

use std::ops::Mul;

/// A 2D affine transform.
///
/// Maps `(x, y)` to `(a*x + b*y + c, d*x + e*y + f)`. For rasters, `x` is
/// the column and `y` the row; the output is `(lon, lat)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    /// x coefficient of the first output.
    pub a: f64,
    /// y coefficient of the first output.
    pub b: f64,
    /// Offset of the first output.
    pub c: f64,
    /// x coefficient of the second output.
    pub d: f64,
    /// y coefficient of the second output.
    pub e: f64,
    /// Offset of the second output.
    pub f: f64,
}

impl AffineTransform {
    /// The transform that leaves every point in place.
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 0.0,
        e: 1.0,
        f: 0.0,
    };

    /// Shift by `(x, y)`.
    pub fn translation(x: f64, y: f64) -> Self {
        Self {
            c: x,
            f: y,
            ..Self::IDENTITY
        }
    }

    /// Scale each axis independently.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            e: sy,
            ..Self::IDENTITY
        }
    }

    /// Pixel → (lon, lat) for a tile or mosaic whose pixel (0, 0) sits at
    /// `(west, north)`, with `1/side` degrees per pixel and rows running
    /// south.
    pub fn tile_to_geo(north: f64, west: f64, side: usize) -> Self {
        let step = 1.0 / side as f64;
        Self::translation(west, north) * Self::scale(step, -step)
    }

    /// Apply the transform to a point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.c,
            self.d * x + self.e * y + self.f,
        )
    }

    /// Determinant of the linear part. Zero means degenerate.
    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// The inverse transform, or `None` if the transform is degenerate.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let ra = self.e / det;
        let rb = -self.b / det;
        let rd = -self.d / det;
        let re = self.a / det;
        Some(Self {
            a: ra,
            b: rb,
            c: -self.c * ra - self.f * rb,
            d: rd,
            e: re,
            f: -self.c * rd - self.f * re,
        })
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Composition: `(lhs * rhs).apply(p) == lhs.apply(rhs.apply(p))`.
impl Mul for AffineTransform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            a: self.a * rhs.a + self.b * rhs.d,
            b: self.a * rhs.b + self.b * rhs.e,
            c: self.a * rhs.c + self.b * rhs.f + self.c,
            d: self.d * rhs.a + self.e * rhs.d,
            e: self.d * rhs.b + self.e * rhs.e,
            f: self.d * rhs.c + self.e * rhs.f + self.f,
        }
    }
}
