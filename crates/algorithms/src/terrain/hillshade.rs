//! Hillshade (shaded relief) calculation
//!
//! Creates a shaded relief visualization from a DEM based on
//! illumination angle and direction.

use super::horn;
use super::spacing::CellSpacing;
use crate::maybe_rayon::*;
use sunraster_core::raster::Raster;
use sunraster_core::{Algorithm, Error, Result};

/// Parameters for hillshade calculation
#[derive(Debug, Clone)]
pub struct HillshadeParams {
    /// Sun azimuth in degrees (0 = North, clockwise)
    pub azimuth: f64,
    /// Sun altitude in degrees above horizon (0-90)
    pub altitude: f64,
    /// Horizontal scale applied to projected cell sizes
    pub z_factor: f64,
    /// Output range: false = 0-255, true = 0.0-1.0
    pub normalized: bool,
    /// Cell spacing model
    pub spacing: CellSpacing,
}

impl Default for HillshadeParams {
    fn default() -> Self {
        Self {
            azimuth: 315.0,
            altitude: 45.0,
            z_factor: 1.0,
            normalized: false,
            spacing: CellSpacing::Auto,
        }
    }
}

/// Hillshade algorithm
#[derive(Debug, Clone, Default)]
pub struct Hillshade;

impl Algorithm for Hillshade {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = HillshadeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Hillshade"
    }

    fn description(&self) -> &'static str {
        "Calculate shaded relief from a DEM"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        hillshade(&input, params)
    }
}

/// Calculate hillshade from a DEM
///
/// shade = cos(zenith)·cos(slope) + sin(zenith)·sin(slope)·cos(azimuth − aspect),
/// clamped to [0, 1]. Flat cells only see the cos(zenith) term. No-data is NaN.
pub fn hillshade(dem: &Raster<f64>, params: HillshadeParams) -> Result<Raster<f64>> {
    if !(0.0..=90.0).contains(&params.altitude) {
        return Err(Error::InvalidParameter {
            name: "altitude",
            value: params.altitude.to_string(),
            reason: "must lie within 0-90 degrees".into(),
        });
    }

    let (rows, cols) = dem.shape();
    let spacing = params.spacing.resolve(dem, params.z_factor)?;

    let azimuth_rad = params.azimuth.to_radians();
    let zenith_rad = (90.0 - params.altitude).to_radians();
    let (sin_zenith, cos_zenith) = zenith_rad.sin_cos();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let dims = spacing.at(row);
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let Some(grad) = horn::gradient(dem, row, col, dims) else {
                    continue;
                };
                let slope_rad = grad.slope_rad();

                let shade = match grad.aspect_rad() {
                    Some(aspect_rad) => {
                        cos_zenith * slope_rad.cos()
                            + sin_zenith * slope_rad.sin() * (azimuth_rad - aspect_rad).cos()
                    }
                    None => cos_zenith,
                };
                let shade = shade.clamp(0.0, 1.0);

                *out = if params.normalized {
                    shade
                } else {
                    (shade * 255.0).round()
                };
            }

            row_data
        })
        .collect();

    dem.derive_vec(output_data, Some(f64::NAN))
}
