//! Horn (1981) 3x3 gradients shared by slope, aspect and hillshade
//!
//! ```text
//! a b c
//! d e f
//! g h i
//! ```
//!
//! dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 · dx)
//! dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 · dy)
//!
//! On the raster border the missing neighbours are replaced by the nearest
//! row/column inside the grid and the divisor shrinks to the distance that is
//! actually spanned, so planes keep their gradient up to the edge.

use super::spacing::CellDimensions;
use sunraster_core::raster::Raster;

/// Gradient at one cell, in elevation units per ground unit.
///
/// `dz_dx` grows eastward, `dz_dy` grows southward (with the row index).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Gradient {
    pub dz_dx: f64,
    pub dz_dy: f64,
}

/// Gradients closer to zero than this are flat
pub(crate) const FLAT_THRESHOLD: f64 = 1e-10;

impl Gradient {
    /// Slope angle in radians
    #[inline]
    pub fn slope_rad(self) -> f64 {
        self.dz_dx.hypot(self.dz_dy).atan()
    }

    #[inline]
    pub fn is_flat(self) -> bool {
        self.dz_dx.abs() < FLAT_THRESHOLD && self.dz_dy.abs() < FLAT_THRESHOLD
    }

    /// Compass bearing of steepest descent in radians, `None` when flat
    #[inline]
    pub fn aspect_rad(self) -> Option<f64> {
        if self.is_flat() {
            return None;
        }
        // descent points along (-dz_dx) east and (+dz_dy) north
        let bearing = (-self.dz_dx).atan2(self.dz_dy);
        Some(bearing.rem_euclid(std::f64::consts::TAU))
    }
}

/// Horn gradient at (row, col), `None` if any cell of the window is no-data
#[inline]
pub(crate) fn gradient(dem: &Raster<f64>, row: usize, col: usize, dims: CellDimensions) -> Option<Gradient> {
    let (rows, cols) = dem.shape();
    let r0 = row.saturating_sub(1);
    let r1 = (row + 1).min(rows - 1);
    let c0 = col.saturating_sub(1);
    let c1 = (col + 1).min(cols - 1);

    // SAFETY: all indices are clamped to the grid
    let at = |r: usize, c: usize| -> Option<f64> {
        let v = unsafe { dem.get_unchecked(r, c) };
        (!dem.is_nodata(v)).then_some(v)
    };

    let a = at(r0, c0)?;
    let b = at(r0, col)?;
    let c = at(r0, c1)?;
    let d = at(row, c0)?;
    at(row, col)?;
    let f = at(row, c1)?;
    let g = at(r1, c0)?;
    let h = at(r1, col)?;
    let i = at(r1, c1)?;

    let span_x = (c1 - c0) as f64;
    let span_y = (r1 - r0) as f64;

    let dz_dx = if span_x > 0.0 {
        ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / (4.0 * span_x * dims.dx)
    } else {
        0.0
    };
    let dz_dy = if span_y > 0.0 {
        ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / (4.0 * span_y * dims.dy)
    } else {
        0.0
    };

    Some(Gradient { dz_dx, dz_dy })
}
