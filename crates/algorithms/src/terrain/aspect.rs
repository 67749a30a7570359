//! Aspect calculation from DEMs
//!
//! Calculates the direction of the steepest slope using the Horn (1981) method.

use super::horn;
use super::spacing::CellSpacing;
use crate::maybe_rayon::*;
use sunraster_core::raster::Raster;
use sunraster_core::{Algorithm, Error, Result};

/// Aspect assigned to flat cells, where the descent direction is undefined
pub const FLAT_ASPECT: f64 = -1.0;

/// Output format for aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectOutput {
    /// Degrees (0-360, 0=North, clockwise)
    #[default]
    Degrees,
    /// Radians (0-2π)
    Radians,
    /// Compass direction (N, NE, E, SE, S, SW, W, NW) as 1-8
    Compass,
}

/// Parameters for aspect calculation
#[derive(Debug, Clone, Default)]
pub struct AspectParams {
    pub output: AspectOutput,
    pub spacing: CellSpacing,
}

/// Aspect algorithm
#[derive(Debug, Clone, Default)]
pub struct Aspect;

impl Algorithm for Aspect {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = AspectParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Aspect"
    }

    fn description(&self) -> &'static str {
        "Calculate aspect (direction of steepest descent) from a DEM"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        aspect(&input, params)
    }
}

/// Calculate aspect from a DEM
///
/// Aspect is measured clockwise from north:
/// - 0° = North
/// - 90° = East
/// - 180° = South
/// - 270° = West
///
/// Flat cells are [`FLAT_ASPECT`]; cells with no-data in their window are NaN.
/// Geographic DEMs need the spacing model: with dx ≠ dy the bearing of a
/// pixel-space gradient is not the ground bearing.
pub fn aspect(dem: &Raster<f64>, params: AspectParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let spacing = params.spacing.resolve(dem, 1.0)?;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let dims = spacing.at(row);
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let Some(grad) = horn::gradient(dem, row, col, dims) else {
                    continue;
                };
                let Some(bearing) = grad.aspect_rad() else {
                    *out = FLAT_ASPECT;
                    continue;
                };

                let deg = bearing.to_degrees();
                let deg = if deg >= 360.0 { 0.0 } else { deg };
                *out = match params.output {
                    AspectOutput::Degrees => deg,
                    AspectOutput::Radians => deg.to_radians(),
                    AspectOutput::Compass => compass_octant(deg),
                };
            }

            row_data
        })
        .collect();

    dem.derive_vec(output_data, Some(f64::NAN))
}

/// 8-direction compass class, 1 = N through 8 = NW
fn compass_octant(deg: f64) -> f64 {
    (((deg + 22.5) / 45.0).floor() as u32 % 8 + 1) as f64
}
